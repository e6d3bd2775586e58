//! Records of what the agent thought and did on each turn.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::tool::ToolArguments;

/// Output of the optional reflection step that runs before a model reply.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Thought {
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Thought {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    ToolUse,
    Response,
    Error,
}

/// How a turn was resolved.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AgentAction {
    pub kind: ActionKind,
    pub content: String,
    pub tool_name: Option<String>,
    pub tool_arguments: Option<ToolArguments>,
    pub timestamp: DateTime<Utc>,
}

impl AgentAction {
    pub fn response(content: impl Into<String>) -> Self {
        Self::new(ActionKind::Response, content, None, None)
    }

    pub fn tool_use(
        name: impl Into<String>,
        arguments: ToolArguments,
        content: impl Into<String>,
    ) -> Self {
        Self::new(ActionKind::ToolUse, content, Some(name.into()), Some(arguments))
    }

    pub fn error(content: impl Into<String>, tool_name: Option<String>) -> Self {
        Self::new(ActionKind::Error, content, tool_name, None)
    }

    fn new(
        kind: ActionKind,
        content: impl Into<String>,
        tool_name: Option<String>,
        tool_arguments: Option<ToolArguments>,
    ) -> Self {
        Self {
            kind,
            content: content.into(),
            tool_name,
            tool_arguments,
            timestamp: Utc::now(),
        }
    }
}
