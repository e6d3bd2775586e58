//! Language model implementations and abstractions.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::config::ModelConfig;
use crate::error::{ParleyError, Result};
use crate::message::{ChatMessage, ChatRole};

/// Result of a chat completion request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelCompletion {
    pub content: Option<String>,
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Minimal abstraction around a chat completion provider.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete_chat(&self, messages: &[ChatMessage]) -> Result<ModelCompletion>;
}

fn coalesce_error(status: reqwest::StatusCode, body: &str, provider: &str) -> ParleyError {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return ParleyError::Provider(format!("{provider} rate limit exceeded: {body}"));
    }
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return ParleyError::Provider(format!("{provider} rejected the API key: {body}"));
    }
    ParleyError::Provider(format!("{provider} request failed with {status}: {body}"))
}

/// Client for OpenAI-compatible `/chat/completions` endpoints.
#[derive(Clone)]
pub struct OpenAIClient {
    http: reqwest::Client,
    model: String,
    api_key: String,
    base_url: String,
    organization: Option<String>,
    temperature: Option<f32>,
}

impl OpenAIClient {
    pub fn from_config(cfg: &ModelConfig) -> Result<Self> {
        let api_key = cfg
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ParleyError::Configuration("missing OpenAI API key in model config".into())
            })?;
        Ok(Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(cfg.timeout_secs))
                .build()
                .map_err(|err| ParleyError::Provider(format!("http client error: {err}")))?,
            model: cfg.model.clone(),
            api_key,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            organization: cfg.organization.clone(),
            temperature: cfg.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn to_openai_messages(messages: &[ChatMessage]) -> Vec<OpenAiMessage<'_>> {
        messages
            .iter()
            .map(|message| OpenAiMessage {
                role: match message.role {
                    ChatRole::System => "system",
                    ChatRole::User => "user",
                    ChatRole::Assistant => "assistant",
                },
                content: &message.content,
            })
            .collect()
    }
}

#[async_trait]
impl LanguageModel for OpenAIClient {
    async fn complete_chat(&self, messages: &[ChatMessage]) -> Result<ModelCompletion> {
        let mut payload = json!({
            "model": self.model,
            "messages": Self::to_openai_messages(messages),
        });
        if let Some(temperature) = self.temperature {
            payload["temperature"] = json!(temperature);
        }

        debug!(model = %self.model, messages = messages.len(), "sending chat completion");
        let mut builder = self
            .http
            .post(self.endpoint())
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", self.api_key),
            );
        if let Some(org) = &self.organization {
            builder = builder.header("OpenAI-Organization", org);
        }
        let resp = builder
            .json(&payload)
            .send()
            .await
            .map_err(|err| ParleyError::Provider(format!("OpenAI request error: {err}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(%status, "chat completion failed");
            return Err(coalesce_error(status, &body, "openai"));
        }

        let body: OpenAiResponse = resp.json().await.map_err(|err| {
            ParleyError::Provider(format!("OpenAI response parse error: {err}"))
        })?;
        parse_response(body)
    }
}

fn parse_response(body: OpenAiResponse) -> Result<ModelCompletion> {
    let first = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ParleyError::Provider("OpenAI returned no choices".into()))?;
    if let Some(usage) = &body.usage {
        debug!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "chat completion usage"
        );
    }
    Ok(ModelCompletion {
        content: first.message.content,
        usage: body.usage,
    })
}

/// A deterministic model used for tests and demos. Replies are handed out
/// in order and every request is recorded.
pub struct StubModel {
    responses: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl StubModel {
    pub fn new(responses: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Every message list received so far.
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for StubModel {
    async fn complete_chat(&self, messages: &[ChatMessage]) -> Result<ModelCompletion> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(messages.to_vec());
        }
        let mut locked = self
            .responses
            .lock()
            .map_err(|_| ParleyError::Provider("stub model poisoned".into()))?;
        let content = locked.pop_front().ok_or_else(|| {
            ParleyError::Provider("StubModel ran out of scripted responses".into())
        })?;
        Ok(ModelCompletion {
            content: Some(content),
            usage: None,
        })
    }
}

#[derive(Debug, Serialize)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_roles_for_the_wire() {
        let messages = vec![
            ChatMessage::system("be brief"),
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello"),
        ];
        let wire = serde_json::to_value(OpenAIClient::to_openai_messages(&messages)).unwrap();
        assert_eq!(
            wire,
            json!([
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": "hello"},
            ])
        );
    }

    #[test]
    fn parses_first_choice_and_usage() {
        let body: OpenAiResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "Paris."}, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 12, "completion_tokens": 2, "total_tokens": 14}
        }))
        .unwrap();
        let completion = parse_response(body).unwrap();
        assert_eq!(completion.content.as_deref(), Some("Paris."));
        assert_eq!(completion.usage.map(|u| u.total_tokens), Some(14));
    }

    #[test]
    fn empty_choices_is_a_provider_error() {
        let body: OpenAiResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(matches!(parse_response(body), Err(ParleyError::Provider(_))));
    }

    #[test]
    fn maps_status_codes() {
        let err = coalesce_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "slow down", "openai");
        assert!(err.to_string().contains("rate limit"));
        let err = coalesce_error(reqwest::StatusCode::BAD_GATEWAY, "", "openai");
        assert!(err.to_string().contains("502"));
    }

    #[test]
    fn client_requires_api_key() {
        let cfg = ModelConfig::default();
        assert!(matches!(
            OpenAIClient::from_config(&cfg),
            Err(ParleyError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn stub_model_replays_and_records() {
        let model = StubModel::new(vec!["first".into()]);
        let reply = model.complete_chat(&[ChatMessage::user("a")]).await.unwrap();
        assert_eq!(reply.content.as_deref(), Some("first"));
        assert!(model.complete_chat(&[ChatMessage::user("b")]).await.is_err());
        assert_eq!(model.requests().len(), 2);
    }
}
