use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ParleyError, Result};
use crate::knowledge::{NoteSeed, MAX_IMPORTANCE, MIN_IMPORTANCE};

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant that can use tools to answer questions.
When using tools, follow this format:

Using tool: [tool_name]
Parameters: [parameters as JSON]

After using a tool, incorporate the results into your response.
Be helpful, accurate, and concise.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
            base_url: default_base_url(),
            organization: None,
            timeout_secs: default_timeout_secs(),
            temperature: None,
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_timeout_secs() -> u64 {
    60
}

/// Identity and prompt-construction options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentProfile {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_description")]
    pub description: String,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Prior memory entries replayed to the model. Zero disables history.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Ask the model to think about the request before answering it.
    #[serde(default)]
    pub reflect: bool,
}

impl Default for AgentProfile {
    fn default() -> Self {
        Self {
            name: default_name(),
            description: default_description(),
            system_prompt: default_system_prompt(),
            history_window: default_history_window(),
            reflect: false,
        }
    }
}

fn default_name() -> String {
    "ToolUsingAssistant".into()
}

fn default_description() -> String {
    "An assistant that can use various tools to answer questions".into()
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.into()
}

fn default_history_window() -> usize {
    6
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AgentConfig {
    #[serde(default)]
    pub agent: AgentProfile,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub notes: Vec<NoteSeed>,
}

impl AgentConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|err| {
            ParleyError::Configuration(format!("failed to read `{}`: {err}", path.display()))
        })?;
        toml::from_str(&raw).map_err(|err| {
            ParleyError::Configuration(format!("failed to parse configuration: {err}"))
        })
    }

    /// Read the optional config file, overlay the process environment (with
    /// `.env` as fallback) and validate the result.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        cfg.apply_env(&EnvSource::from_process());
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn apply_env(&mut self, env: &EnvSource) {
        if let Some(key) = env.get(API_KEY_VAR) {
            self.model.api_key = Some(key.to_string());
        }
        if let Some(url) = env.get("OPENAI_BASE_URL") {
            self.model.base_url = url.to_string();
        }
        if let Some(org) = env.get("OPENAI_ORG_ID") {
            self.model.organization = Some(org.to_string());
        }
        if let Some(model) = env.get("PARLEY_MODEL") {
            self.model.model = model.to_string();
        }
        if let Some(timeout) = env.get("PARLEY_TIMEOUT_SECS") {
            if let Ok(parsed) = timeout.parse::<u64>() {
                self.model.timeout_secs = parsed;
            }
        }
        if let Some(window) = env.get("PARLEY_HISTORY_WINDOW") {
            if let Ok(parsed) = window.parse::<usize>() {
                self.agent.history_window = parsed;
            }
        }
        if let Some(reflect) = env.get("PARLEY_REFLECT") {
            self.agent.reflect = matches!(
                reflect.to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self
            .model
            .api_key
            .as_deref()
            .map_or(true, |key| key.trim().is_empty())
        {
            return Err(ParleyError::Configuration(format!(
                "{API_KEY_VAR} environment variable not set. Please set it in a .env file or export it."
            )));
        }
        if self.model.model.trim().is_empty() {
            return Err(ParleyError::Configuration("model name must not be empty".into()));
        }
        if self.model.timeout_secs == 0 {
            return Err(ParleyError::Configuration(
                "timeout_secs must be greater than zero".into(),
            ));
        }
        if let Some(seed) = self
            .notes
            .iter()
            .find(|seed| !(MIN_IMPORTANCE..=MAX_IMPORTANCE).contains(&seed.importance))
        {
            return Err(ParleyError::Configuration(format!(
                "note `{}` has importance {} outside {MIN_IMPORTANCE}..={MAX_IMPORTANCE}",
                seed.content, seed.importance
            )));
        }
        Ok(())
    }
}

/// Variable lookup over the process environment with a `.env` fallback.
/// Values from `.env` never shadow variables that are already set.
#[derive(Debug, Clone, Default)]
pub struct EnvSource {
    vars: HashMap<String, String>,
    fallback: HashMap<String, String>,
}

impl EnvSource {
    pub fn from_process() -> Self {
        let fallback = env::current_dir()
            .ok()
            .map(|dir| dir.join(".env"))
            .and_then(|path| fs::read_to_string(path).ok())
            .map(|contents| parse_dotenv(&contents))
            .unwrap_or_default();
        Self {
            vars: env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
            fallback,
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            fallback: HashMap::new(),
        }
    }

    pub fn with_dotenv(mut self, contents: &str) -> Self {
        self.fallback = parse_dotenv(contents);
        self
    }

    /// Empty values count as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        non_empty(&self.vars, key).or_else(|| non_empty(&self.fallback, key))
    }
}

fn non_empty<'a>(vars: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    vars.get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

/// Parse `KEY=value` lines. Blank lines and `#` comments are skipped and an
/// optional `export ` prefix is dropped. Quoted values keep everything
/// between the quotes; unquoted values lose a trailing ` # comment`.
pub fn parse_dotenv(contents: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        let value = match value.chars().next() {
            Some(quote @ ('"' | '\'')) => match value[1..].find(quote) {
                Some(end) => &value[1..1 + end],
                None => value,
            },
            _ => match value.find(" #") {
                Some(hash) => value[..hash].trim_end(),
                None => value,
            },
        };
        if !key.is_empty() {
            vars.insert(key.to_string(), value.to_string());
        }
    }
    vars
}
