use std::sync::Arc;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// The caller
    User,
    /// The assistant
    Model,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Model => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            content: content.into(),
        }
    }
}

/// Ordered turns of one conversation.
///
/// The sequence is immutable: [`with_exchange`](Self::with_exchange) returns
/// a new history and leaves `self` untouched, so a holder of the old value can
/// keep reading it while the connection moves on to the new one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationHistory {
    turns: Arc<Vec<ChatTurn>>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_turns(turns: Vec<ChatTurn>) -> Self {
        Self {
            turns: Arc::new(turns),
        }
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

    /// This history followed by one user/model exchange.
    pub fn with_exchange(&self, user: impl Into<String>, model: impl Into<String>) -> Self {
        let mut turns = Vec::with_capacity(self.turns.len() + 2);
        turns.extend(self.turns.iter().cloned());
        turns.push(ChatTurn::user(user));
        turns.push(ChatTurn::model(model));
        Self::from_turns(turns)
    }

    /// Whether both values share the same underlying sequence.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.turns, &other.turns)
    }
}
