//! In-memory conversation history for one chat session.

#[cfg(test)]
mod tests;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub at: DateTime<Utc>,
}

/// Append-only list of turns. Never persisted.
#[derive(Debug, Clone)]
pub struct Conversation {
    id: Uuid,
    turns: Vec<Turn>,
}

impl Default for Conversation {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    #[inline]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            turns: Vec::new(),
        }
    }

    #[inline]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[inline]
    pub fn append(&mut self, role: Role, content: impl Into<String>) -> &Turn {
        self.turns.push(Turn {
            role,
            content: content.into(),
            at: Utc::now(),
        });
        &self.turns[self.turns.len() - 1]
    }

    /// All turns, oldest first
    #[inline]
    pub fn all(&self) -> &[Turn] {
        &self.turns
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
