use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ParleyError, Result};

pub const MIN_IMPORTANCE: u8 = 1;
pub const MAX_IMPORTANCE: u8 = 10;

/// A piece of background knowledge the agent carries into model prompts.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct KnowledgeNote {
    pub id: Uuid,
    pub content: String,
    pub source: String,
    pub importance: u8,
    pub created_at: DateTime<Utc>,
}

impl KnowledgeNote {
    pub fn new(
        content: impl Into<String>,
        source: impl Into<String>,
        importance: u8,
    ) -> Result<Self> {
        if !(MIN_IMPORTANCE..=MAX_IMPORTANCE).contains(&importance) {
            return Err(ParleyError::InvalidArgument(format!(
                "note importance must be between {MIN_IMPORTANCE} and {MAX_IMPORTANCE}, got {importance}"
            )));
        }
        let content = content.into();
        if content.trim().is_empty() {
            return Err(ParleyError::InvalidArgument(
                "note content must not be empty".into(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            content,
            source: source.into(),
            importance,
            created_at: Utc::now(),
        })
    }
}

/// Note definition as it appears in a configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoteSeed {
    pub content: String,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default = "default_importance")]
    pub importance: u8,
}

fn default_source() -> String {
    "config".into()
}

fn default_importance() -> u8 {
    5
}

#[derive(Default, Clone, Debug)]
pub struct KnowledgeBase {
    notes: Vec<KnowledgeNote>,
}

impl KnowledgeBase {
    pub fn add(
        &mut self,
        content: impl Into<String>,
        source: impl Into<String>,
        importance: u8,
    ) -> Result<&KnowledgeNote> {
        let note = KnowledgeNote::new(content, source, importance)?;
        self.notes.push(note);
        Ok(&self.notes[self.notes.len() - 1])
    }

    pub fn add_seed(&mut self, seed: &NoteSeed) -> Result<&KnowledgeNote> {
        self.add(seed.content.clone(), seed.source.clone(), seed.importance)
    }

    /// Notes ordered by importance, most important first. Ties keep insertion
    /// order.
    pub fn ranked(&self) -> Vec<&KnowledgeNote> {
        let mut ranked: Vec<&KnowledgeNote> = self.notes.iter().collect();
        ranked.sort_by(|a, b| b.importance.cmp(&a.importance));
        ranked
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}
