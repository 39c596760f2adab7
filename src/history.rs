//! Conversation messages and the append-only session history.

use serde::{Deserialize, Serialize};

/// Author of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single conversation message.
///
/// Messages are immutable once appended to a [`History`]. The `reasoning`
/// field carries chain-of-thought text some model servers return alongside
/// the visible content; it is stored but never fed into loop decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            reasoning: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Ordered conversation buffer sent to the model each round.
///
/// Append-only for the life of a session. The session controller is the
/// sole owner; clients only ever see `&[Message]` views.
#[derive(Debug, Clone, Default)]
pub struct History {
    messages: Vec<Message>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message at the tail.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Read view for the model endpoint.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Whether the most recent message was authored by `role`.
    pub fn last_role_is(&self, role: Role) -> bool {
        self.messages.last().map(|m| m.role) == Some(role)
    }

    /// Content of the most recent message, if any.
    pub fn tail_content(&self) -> Option<&str> {
        self.messages.last().map(|m| m.content.as_str())
    }
}
