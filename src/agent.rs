use std::fmt::Write as _;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AgentConfig;
use crate::error::{ParleyError, Result};
use crate::journal::{AgentAction, Thought};
use crate::knowledge::KnowledgeBase;
use crate::llm::LanguageModel;
use crate::memory::{ConversationMemory, MemoryEntry};
use crate::message::ChatMessage;
use crate::router::ToolRouter;
use crate::tool::{ToolDescriptor, ToolHandler, ToolRegistry};

const REFLECTION_PROMPT: &str = "You are an AI assistant thinking step by step about how to respond to a user. \
Think through what tools might be useful and how to structure your response.";

/// Everything one turn leaves behind.
struct TurnRecord {
    entry: MemoryEntry,
    action: AgentAction,
    reply: String,
}

impl TurnRecord {
    fn failure(err: ParleyError, tool: Option<String>) -> Self {
        warn!(error = %err, tool = tool.as_deref(), "turn failed");
        let reply = format!("Error: {err}");
        Self {
            entry: MemoryEntry::agent(&reply),
            action: AgentAction::error(&reply, tool),
            reply,
        }
    }
}

/// An agent that answers with a matching tool when it can and with the
/// language model otherwise.
pub struct Agent<M: LanguageModel> {
    id: Uuid,
    config: AgentConfig,
    model: Arc<M>,
    tools: ToolRegistry,
    router: ToolRouter,
    memory: ConversationMemory,
    knowledge: KnowledgeBase,
    thoughts: Vec<Thought>,
    actions: Vec<AgentAction>,
}

impl<M: LanguageModel> Agent<M> {
    /// Create an agent without tools. Notes listed in the config are loaded
    /// into the knowledge base.
    pub fn new(config: AgentConfig, model: Arc<M>) -> Result<Self> {
        let mut knowledge = KnowledgeBase::default();
        for seed in &config.notes {
            knowledge.add_seed(seed)?;
        }
        Ok(Self {
            id: Uuid::new_v4(),
            config,
            model,
            tools: ToolRegistry::new(),
            router: ToolRouter::new(),
            memory: ConversationMemory::default(),
            knowledge,
            thoughts: Vec::new(),
            actions: Vec::new(),
        })
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_router(mut self, router: ToolRouter) -> Self {
        self.router = router;
        self
    }

    pub fn add_tool<H: ToolHandler + 'static>(
        &mut self,
        descriptor: ToolDescriptor,
        handler: H,
    ) -> Result<()> {
        info!(tool = descriptor.name(), "adding tool");
        self.tools.register(descriptor, handler)
    }

    /// Store a note that will accompany future model requests.
    pub fn remember(
        &mut self,
        content: impl Into<String>,
        source: impl Into<String>,
        importance: u8,
    ) -> Result<Uuid> {
        let note = self.knowledge.add(content, source, importance)?;
        info!(note = %note.id, "added note");
        Ok(note.id)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.config.agent.name
    }

    pub fn description(&self) -> &str {
        &self.config.agent.description
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn thoughts(&self) -> &[Thought] {
        &self.thoughts
    }

    pub fn actions(&self) -> &[AgentAction] {
        &self.actions
    }

    /// Run a single turn and return the reply shown to the user. Failures are
    /// rendered into the reply; every turn appends exactly two memory entries.
    pub async fn respond(&mut self, user_input: impl Into<String>) -> String {
        let user_input = user_input.into();
        debug!(agent = %self.id, input = %user_input, "starting turn");

        let record = match self.router.route(&user_input, &self.tools) {
            Some(call) => match self.tools.dispatch(&call) {
                Ok(output) => {
                    let reply = render_tool_output(&output);
                    info!(tool = %call.name, "answered with tool");
                    TurnRecord {
                        entry: MemoryEntry::tool(&call.name, &reply),
                        action: AgentAction::tool_use(call.name, call.arguments, &reply),
                        reply,
                    }
                }
                Err(err) => TurnRecord::failure(err, Some(call.name)),
            },
            None => match self.ask_model(&user_input).await {
                Ok(reply) => TurnRecord {
                    entry: MemoryEntry::agent(&reply),
                    action: AgentAction::response(&reply),
                    reply,
                },
                Err(err) => TurnRecord::failure(err, None),
            },
        };

        self.memory.push(MemoryEntry::user(user_input));
        self.memory.push(record.entry);
        self.actions.push(record.action);
        record.reply
    }

    async fn ask_model(&mut self, user_input: &str) -> Result<String> {
        if self.config.agent.reflect {
            self.reflect(user_input).await?;
        }
        let messages = self.build_messages(user_input);
        let completion = self.model.complete_chat(&messages).await?;
        completion
            .content
            .ok_or_else(|| ParleyError::Provider("model returned no content".into()))
    }

    async fn reflect(&mut self, user_input: &str) -> Result<()> {
        let messages = [
            ChatMessage::system(REFLECTION_PROMPT),
            ChatMessage::user(format!(
                "User input: {user_input}\n\nAvailable tools:\n{}\n\nThink step by step about how to respond to this user request.",
                self.describe_tools()
            )),
        ];
        let completion = self.model.complete_chat(&messages).await?;
        let thought = completion
            .content
            .ok_or_else(|| ParleyError::Provider("model returned no reflection".into()))?;
        debug!(thought = %thought, "recorded thought");
        self.thoughts.push(Thought::new(thought));
        Ok(())
    }

    fn build_messages(&self, user_input: &str) -> Vec<ChatMessage> {
        let mut system = self.config.agent.system_prompt.clone();
        if !self.knowledge.is_empty() {
            system.push_str("\n\nThings you know:\n");
            for note in self.knowledge.ranked() {
                let _ = writeln!(
                    system,
                    "- {} (source: {}, importance: {})",
                    note.content, note.source, note.importance
                );
            }
        }

        let mut messages = vec![ChatMessage::system(system)];
        messages.extend(
            self.memory
                .recent(self.config.agent.history_window)
                .iter()
                .map(MemoryEntry::to_chat_message),
        );
        messages.push(ChatMessage::user(format!(
            "Available tools:\n{}\n\nUser input: {user_input}",
            self.describe_tools()
        )));
        messages
    }

    fn describe_tools(&self) -> String {
        if self.tools.is_empty() {
            return "No tools available.".into();
        }
        self.tools
            .descriptors()
            .iter()
            .map(|descriptor| descriptor.prompt_entry())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Counts and the full transcript, for the `debug` command.
    pub fn debug_report(&self) -> String {
        let mut report = String::from("--- AGENT DEBUG INFO ---\n");
        let _ = writeln!(report, "Agent: {} ({})", self.name(), self.id);
        let _ = writeln!(report, "Memory entries: {}", self.memory.len());
        let _ = writeln!(report, "Thoughts: {}", self.thoughts.len());
        let _ = writeln!(
            report,
            "Latest thought: {}",
            self.thoughts
                .last()
                .map(|thought| thought.content.as_str())
                .unwrap_or("None")
        );
        let _ = writeln!(report, "Actions: {}", self.actions.len());
        let _ = writeln!(report, "Notes: {}", self.knowledge.len());
        for (index, entry) in self.memory.iter().enumerate() {
            let _ = writeln!(report, "{:>3}. {entry}", index + 1);
        }
        report.push_str("--- END DEBUG INFO ---");
        report
    }
}

/// Strings pass through; objects become `key: value` lines. Array fields
/// list one item per line.
fn render_tool_output(output: &Value) -> String {
    match output {
        Value::String(text) => text.clone(),
        Value::Object(fields) => fields
            .iter()
            .map(|(key, value)| match value {
                Value::String(text) => format!("{key}: {text}"),
                Value::Array(items) => {
                    let mut field = format!("{key}:");
                    for item in items {
                        let _ = write!(field, "\n- {}", render_item(item));
                    }
                    field
                }
                other => format!("{key}: {other}"),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

/// Linked items read as `title / url`.
fn render_item(item: &Value) -> String {
    match item {
        Value::String(text) => text.clone(),
        Value::Object(fields) => match (
            fields.get("title").and_then(Value::as_str),
            fields.get("url").and_then(Value::as_str),
        ) {
            (Some(title), Some(url)) => format!("{title} / {url}"),
            _ => fields
                .iter()
                .map(|(key, value)| match value {
                    Value::String(text) => format!("{key}: {text}"),
                    other => format!("{key}: {other}"),
                })
                .collect::<Vec<_>>()
                .join(", "),
        },
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::ActionKind;
    use crate::memory::Role;
    use crate::message::ChatRole;
    use crate::tool::ToolArguments;
    use crate::tools::builtin_toolkit;
    use crate::StubModel;
    use serde_json::json;

    fn agent_with(responses: Vec<&str>) -> (Agent<StubModel>, Arc<StubModel>) {
        let model = StubModel::new(responses.into_iter().map(String::from).collect());
        let agent = Agent::new(AgentConfig::default(), model.clone())
            .unwrap()
            .with_tools(builtin_toolkit().unwrap())
            .with_router(ToolRouter::builtin().unwrap());
        (agent, model)
    }

    #[tokio::test]
    async fn returns_llm_response_without_tools() {
        let (mut agent, model) = agent_with(vec!["Hello!"]);

        let reply = agent.respond("hi").await;

        assert_eq!(reply, "Hello!");
        assert_eq!(agent.memory().len(), 2);
        assert_eq!(agent.memory().entries()[1].role(), Role::Agent);
        assert_eq!(model.requests().len(), 1);
        assert_eq!(agent.actions()[0].kind, ActionKind::Response);
    }

    #[tokio::test]
    async fn arithmetic_goes_to_the_calculator() {
        let (mut agent, model) = agent_with(vec![]);

        let reply = agent.respond("Calculate 15 * 24 + 7").await;

        assert!(reply.contains("result: 367"), "unexpected reply: {reply}");
        assert!(model.requests().is_empty());
        let entries = agent.memory().entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].role(), Role::Tool);
        assert_eq!(entries[1].tool_name(), Some("calculator"));
        let action = &agent.actions()[0];
        assert_eq!(action.kind, ActionKind::ToolUse);
        assert_eq!(
            action.tool_arguments.as_ref().unwrap()["expression"],
            json!("15 * 24 + 7")
        );
    }

    #[tokio::test]
    async fn tool_errors_become_replies() {
        let (mut agent, model) = agent_with(vec![]);

        let reply = agent.respond("What's the weather?").await;

        assert!(reply.starts_with("Error:"));
        assert!(reply.contains("location"));
        assert_eq!(agent.memory().len(), 2);
        assert!(model.requests().is_empty());

        let reply = agent.respond("calculate 1 / 0").await;
        assert!(reply.contains("division by zero"));
        assert_eq!(agent.memory().len(), 4);
        assert_eq!(agent.actions()[1].tool_name.as_deref(), Some("calculator"));
    }

    #[tokio::test]
    async fn provider_errors_become_replies() {
        let (mut agent, _model) = agent_with(vec![]);

        let reply = agent.respond("Tell me a joke").await;

        assert!(reply.starts_with("Error: language model error"));
        assert_eq!(agent.memory().len(), 2);
        assert_eq!(agent.actions()[0].kind, ActionKind::Error);
    }

    #[tokio::test]
    async fn prompt_includes_tools_notes_and_history() {
        let (mut agent, model) = agent_with(vec!["first", "second"]);
        agent
            .remember("The user prefers concise answers.", "analysis", 6)
            .unwrap();

        agent.respond("hello").await;
        agent.respond("and again").await;

        let requests = model.requests();
        let last = requests.last().unwrap();
        assert_eq!(last[0].role, ChatRole::System);
        assert!(last[0].content.contains("The user prefers concise answers."));
        assert_eq!(last[1], ChatMessage::user("hello"));
        assert_eq!(last[2], ChatMessage::assistant("first"));
        let prompt = &last.last().unwrap().content;
        assert!(prompt.contains("Tool: calculator"));
        assert!(prompt.contains("location (required)"));
        assert!(prompt.ends_with("User input: and again"));
    }

    #[tokio::test]
    async fn history_window_of_zero_sends_no_history() {
        let model = StubModel::new(vec!["a".into(), "b".into()]);
        let mut config = AgentConfig::default();
        config.agent.history_window = 0;
        let mut agent = Agent::new(config, model.clone()).unwrap();

        agent.respond("one").await;
        agent.respond("two").await;

        let requests = model.requests();
        assert_eq!(requests[1].len(), 2);
        assert!(requests[1][1].content.contains("No tools available."));
    }

    #[tokio::test]
    async fn reflection_records_a_thought() {
        let model = StubModel::new(vec!["I should just greet them.".into(), "Hi!".into()]);
        let mut config = AgentConfig::default();
        config.agent.reflect = true;
        let mut agent = Agent::new(config, model.clone()).unwrap();

        let reply = agent.respond("hey").await;

        assert_eq!(reply, "Hi!");
        assert_eq!(agent.thoughts().len(), 1);
        assert_eq!(agent.thoughts()[0].content, "I should just greet them.");
        assert_eq!(model.requests()[0][0].content, REFLECTION_PROMPT);
        assert!(agent.debug_report().contains("Latest thought: I should just greet them."));
    }

    #[tokio::test]
    async fn custom_tools_can_be_added() {
        let (mut agent, _model) = agent_with(vec![]);
        agent
            .add_tool(
                ToolDescriptor::new("calculator", "duplicate"),
                |_: &ToolArguments| -> Result<Value> { Ok(Value::Null) },
            )
            .unwrap_err();
        agent
            .add_tool(
                ToolDescriptor::new("shout", "Uppercases text"),
                |args: &ToolArguments| -> Result<Value> {
                    Ok(json!(args
                        .get("text")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_uppercase()))
                },
            )
            .unwrap();
        assert!(agent.tools().contains("shout"));
    }

    #[test]
    fn renders_tool_output() {
        assert_eq!(render_tool_output(&json!("plain")), "plain");
        assert_eq!(
            render_tool_output(&json!({"expression": "1 + 1", "result": 2})),
            "expression: 1 + 1\nresult: 2"
        );
        assert_eq!(render_tool_output(&json!([1, 2])), "[1,2]");
        assert_eq!(
            render_tool_output(&json!({"tags": ["a", {"k": 1}]})),
            "tags:\n- a\n- k: 1"
        );
    }

    #[tokio::test]
    async fn search_results_render_one_per_line() {
        let (mut agent, _model) = agent_with(vec![]);

        let reply = agent.respond("search for tide tables").await;

        let lines: Vec<&str> = reply.lines().collect();
        assert_eq!(lines[0], "query: tide tables");
        assert_eq!(lines[1], "results:");
        assert_eq!(
            lines[2],
            "- Result 1 for 'tide tables' / https://example.com/result1"
        );
        assert_eq!(lines.len(), 2 + 5);
        assert!(!reply.contains("snippet"));
    }

    #[tokio::test]
    async fn runaway_expression_fails_the_turn_only() {
        let (mut agent, _model) = agent_with(vec![]);

        let reply = agent
            .respond(format!("Calculate {}1", "-".repeat(200_000)))
            .await;
        assert!(reply.contains("nested too deeply"), "unexpected reply: {reply}");
        assert_eq!(agent.memory().len(), 2);

        let reply = agent.respond("Calculate 15 * 24 + 7").await;
        assert!(reply.contains("result: 367"));
        assert_eq!(agent.memory().len(), 4);
    }
}
