use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sql::ProductRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// Either prose or a product list with the prose summary that introduced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnContent {
    Text {
        text: String,
    },
    Products {
        summary: String,
        items: Vec<ProductRecord>,
    },
}

impl TurnContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// The prose part of the turn.
    pub fn as_text(&self) -> &str {
        match self {
            Self::Text { text } => text,
            Self::Products { summary, .. } => summary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub id: String,
    pub role: Role,
    pub content: TurnContent,
    pub created_at: DateTime<Utc>,
}

impl ChatTurn {
    pub fn new(role: Role, content: TurnContent) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content,
            created_at: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, TurnContent::text(text))
    }

    pub fn assistant(content: TurnContent) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Ordered, in-memory session log. Nothing is persisted.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<ChatTurn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user query followed by the assistant's answer to it.
    pub fn record(&mut self, query: &str, answer: ChatTurn) {
        self.turns.push(ChatTurn::user(query));
        self.turns.push(answer);
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
