//! A small command-line agent.
//!
//! The crate provides:
//! - A tool interface (`ToolDescriptor`, `ToolHandler` and `ToolRegistry`) with
//!   built-in weather, calculator, clock and search tools.
//! - A keyword `ToolRouter` that maps raw text to a tool call.
//! - A language model abstraction (`LanguageModel`) with an OpenAI client.
//! - An `Agent` that answers each turn with a tool or the model and keeps an
//!   append-only conversation memory.

mod agent;
mod config;
mod error;
mod journal;
mod knowledge;
mod llm;
mod memory;
mod message;
pub mod repl;
mod router;
mod tool;
pub mod tools;

pub use agent::Agent;
pub use config::{parse_dotenv, AgentConfig, AgentProfile, EnvSource, ModelConfig, API_KEY_VAR};
pub use error::{ParleyError, Result};
pub use journal::{ActionKind, AgentAction, Thought};
pub use knowledge::{KnowledgeBase, KnowledgeNote, NoteSeed};
pub use llm::{LanguageModel, ModelCompletion, OpenAIClient, StubModel, TokenUsage};
pub use memory::{ConversationMemory, MemoryEntry, Role};
pub use message::{ChatMessage, ChatRole};
pub use router::{RouteRule, ToolRouter};
pub use tool::{ToolArguments, ToolCall, ToolDescriptor, ToolHandler, ToolRegistry};
pub use tools::builtin_toolkit;
