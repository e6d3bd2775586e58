use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::message::ChatMessage;

/// Who produced a memory entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
    Tool,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Role::User => "user",
            Role::Agent => "agent",
            Role::Tool => "tool",
        };
        f.write_str(label)
    }
}

/// A single record of the conversation. Entries are never modified once
/// created.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MemoryEntry {
    role: Role,
    content: String,
    tool_name: Option<String>,
    timestamp: DateTime<Utc>,
}

impl MemoryEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content, None)
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self::new(Role::Agent, content, None)
    }

    pub fn tool(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(Role::Tool, content, Some(name.into()))
    }

    fn new(role: Role, content: impl Into<String>, tool_name: Option<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_name,
            timestamp: Utc::now(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn tool_name(&self) -> Option<&str> {
        self.tool_name.as_deref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Replay this entry as model context. Tool output is presented as an
    /// assistant message that names the tool.
    pub fn to_chat_message(&self) -> ChatMessage {
        match (self.role, &self.tool_name) {
            (Role::User, _) => ChatMessage::user(&self.content),
            (Role::Agent, _) => ChatMessage::assistant(&self.content),
            (Role::Tool, Some(name)) => {
                ChatMessage::assistant(format!("[{name}] {}", self.content))
            }
            (Role::Tool, None) => ChatMessage::assistant(&self.content),
        }
    }
}

impl fmt::Display for MemoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.role)?;
        if let Some(name) = &self.tool_name {
            write!(f, "({name}) ")?;
        }
        f.write_str(&self.content)
    }
}

/// Append-only in-memory transcript.
#[derive(Default, Clone, Debug)]
pub struct ConversationMemory {
    entries: Vec<MemoryEntry>,
}

impl ConversationMemory {
    pub(crate) fn push(&mut self, entry: MemoryEntry) {
        self.entries.push(entry);
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &MemoryEntry> + '_ {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[MemoryEntry] {
        &self.entries
    }

    /// The last `count` entries in chronological order.
    pub fn recent(&self, count: usize) -> &[MemoryEntry] {
        let start = self.entries.len().saturating_sub(count);
        &self.entries[start..]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ChatRole;

    #[test]
    fn recent_keeps_chronological_order() {
        let mut memory = ConversationMemory::default();
        memory.push(MemoryEntry::user("one"));
        memory.push(MemoryEntry::agent("two"));
        memory.push(MemoryEntry::user("three"));

        let recent: Vec<&str> = memory.recent(2).iter().map(|e| e.content()).collect();
        assert_eq!(recent, vec!["two", "three"]);
        assert_eq!(memory.recent(10).len(), 3);
        assert!(memory.recent(0).is_empty());
    }

    #[test]
    fn tool_entries_replay_as_assistant_messages() {
        let entry = MemoryEntry::tool("calculator", "result: 4");
        let message = entry.to_chat_message();
        assert_eq!(message.role, ChatRole::Assistant);
        assert_eq!(message.content, "[calculator] result: 4");
        assert_eq!(entry.to_string(), "[tool] (calculator) result: 4");
    }
}
