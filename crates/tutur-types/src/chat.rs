//! Chat message and conversation types for tutur.
//!
//! A `Conversation` is the ordered history of one user: a leading system
//! message followed by alternating user and assistant turns. Timestamps are
//! assigned here, when a message is created, never by callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Re-export MessageRole from llm module (it's used in both chat and llm contexts).
pub use crate::llm::MessageRole;

use crate::llm::Message;

/// A single stored message within a conversation.
///
/// Serialized as one JSON object per line in the session log:
/// `{"role":"user","content":"...","timestamp":"2025-01-01T10:00:00.000Z"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a message stamped with the current time.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Whether this message is a user or assistant turn.
    pub fn is_turn(&self) -> bool {
        matches!(self.role, MessageRole::User | MessageRole::Assistant)
    }

    /// Strip bookkeeping fields for an outbound LLM request.
    pub fn to_llm_message(&self) -> Message {
        Message {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// The ordered message history of one user.
///
/// Insertion order is chronological order; nothing in this type reorders.
/// Conversations built with [`Conversation::new`] start with a system
/// message. [`Conversation::from_messages`] accepts whatever was persisted,
/// so callers loading from disk must validate the leading system message.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    /// Start a conversation holding only the system prompt.
    pub fn new(system_prompt: &str) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt)],
        }
    }

    /// Wrap messages as-is, without validation.
    pub fn from_messages(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// User and assistant turns, in order, excluding system messages.
    pub fn turns(&self) -> impl DoubleEndedIterator<Item = &ChatMessage> {
        self.messages.iter().filter(|m| m.is_turn())
    }

    /// Whether element 0 is a system message whose content equals `canonical`
    /// byte for byte.
    pub fn has_system_prompt(&self, canonical: &str) -> bool {
        self.messages
            .first()
            .is_some_and(|m| m.role == MessageRole::System && m.content == canonical)
    }

    /// Replace every system message with a freshly stamped `canonical` one
    /// at the front, keeping the remaining turns in their original order.
    pub fn with_system_prompt(self, canonical: &str) -> Self {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        messages.push(ChatMessage::system(canonical));
        messages.extend(
            self.messages
                .into_iter()
                .filter(|m| m.role != MessageRole::System),
        );
        Self { messages }
    }

    /// Append a user turn stamped now.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::user(content));
    }

    /// Append an assistant turn stamped now.
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(content));
    }

    /// Remove the trailing user turn left by a failed exchange.
    ///
    /// Returns `None` (and leaves the conversation untouched) when the last
    /// message is not a user turn.
    pub fn rollback_user(&mut self) -> Option<ChatMessage> {
        match self.messages.last() {
            Some(m) if m.role == MessageRole::User => self.messages.pop(),
            _ => None,
        }
    }
}
