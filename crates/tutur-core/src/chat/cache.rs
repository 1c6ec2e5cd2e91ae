//! In-memory session cache.

use std::sync::Arc;

use dashmap::DashMap;
use tutur_types::chat::Conversation;

/// Process-wide map of user id to live conversation.
///
/// Cloning the cache shares the underlying map. Reads return a clone so no
/// shard lock is held across an await point. There is no eviction.
#[derive(Debug, Clone, Default)]
pub struct SessionCache {
    sessions: Arc<DashMap<String, Conversation>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user_id: &str) -> Option<Conversation> {
        self.sessions.get(user_id).map(|entry| entry.value().clone())
    }

    /// Replace the cached conversation for `user_id` (last writer wins).
    pub fn set(&self, user_id: &str, conversation: Conversation) {
        self.sessions.insert(user_id.to_string(), conversation);
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.sessions.contains_key(user_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
