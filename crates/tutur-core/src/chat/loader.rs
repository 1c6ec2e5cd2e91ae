//! Session loading with system-prompt validation and repair.

use std::sync::Arc;

use tutur_types::chat::Conversation;

use super::cache::SessionCache;
use super::log::SessionLog;
use crate::report::{ErrorReporter, Severity};

/// Resolves a user's conversation from the cache or the session log.
///
/// Every conversation handed out starts with the canonical system prompt.
/// Conversations loaded from disk whose first message differs are repaired
/// before they reach the cache.
pub struct SessionLoader<L, R> {
    log: Arc<L>,
    cache: SessionCache,
    reporter: Arc<R>,
    system_prompt: Arc<str>,
}

impl<L: SessionLog, R: ErrorReporter> SessionLoader<L, R> {
    pub fn new(
        log: Arc<L>,
        cache: SessionCache,
        reporter: Arc<R>,
        system_prompt: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            log,
            cache,
            reporter,
            system_prompt: system_prompt.into(),
        }
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Return the conversation for `user_id`, creating it if needed.
    ///
    /// Never fails: a log that cannot be read is reported and replaced by a
    /// fresh conversation.
    pub async fn load_or_create(&self, user_id: &str) -> Conversation {
        if let Some(conversation) = self.cache.get(user_id) {
            return conversation;
        }

        let conversation = match self.log.read(user_id).await {
            Ok(Some(stored)) if !stored.is_empty() => self.validate(user_id, stored).await,
            Ok(_) => {
                tracing::debug!(user_id, "no stored session, starting fresh");
                Conversation::new(&self.system_prompt)
            }
            Err(e) => {
                self.reporter
                    .report(
                        &format!("failed to load session for {user_id}"),
                        Some(&e),
                        Severity::Error,
                    )
                    .await;
                Conversation::new(&self.system_prompt)
            }
        };

        self.cache.set(user_id, conversation.clone());
        conversation
    }

    async fn validate(&self, user_id: &str, stored: Conversation) -> Conversation {
        if stored.has_system_prompt(&self.system_prompt) {
            tracing::debug!(user_id, messages = stored.len(), "loaded session");
            return stored;
        }
        self.reporter
            .report(
                &format!("system prompt for {user_id} is missing or outdated, repairing"),
                None,
                Severity::Info,
            )
            .await;
        stored.with_system_prompt(&self.system_prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::testing::MemorySessionLog;
    use crate::report::testing::RecordingReporter;
    use tutur_types::chat::{ChatMessage, MessageRole};

    const PROMPT: &str = "Kamu adalah asisten yang ramah.";

    fn loader(log: MemorySessionLog) -> (SessionLoader<MemorySessionLog, RecordingReporter>, Arc<RecordingReporter>) {
        let reporter = Arc::new(RecordingReporter::default());
        let loader = SessionLoader::new(
            Arc::new(log),
            SessionCache::new(),
            Arc::clone(&reporter),
            PROMPT,
        );
        (loader, reporter)
    }

    #[tokio::test]
    async fn test_new_user_gets_system_only() {
        let (loader, reporter) = loader(MemorySessionLog::default());
        let conv = loader.load_or_create("u1").await;
        assert_eq!(conv.len(), 1);
        assert!(conv.has_system_prompt(PROMPT));
        assert!(loader.cache().contains("u1"));
        assert!(reporter.reports().is_empty());
    }

    #[tokio::test]
    async fn test_empty_stored_log_is_fresh() {
        let (loader, _) = loader(MemorySessionLog::with("u1", Conversation::default()));
        let conv = loader.load_or_create("u1").await;
        assert_eq!(conv.len(), 1);
        assert!(conv.has_system_prompt(PROMPT));
    }

    #[tokio::test]
    async fn test_valid_log_kept_unchanged() {
        let mut stored = Conversation::new(PROMPT);
        stored.push_user("q");
        stored.push_assistant("a");
        let (loader, reporter) = loader(MemorySessionLog::with("u1", stored.clone()));

        let conv = loader.load_or_create("u1").await;
        assert_eq!(conv, stored);
        assert!(reporter.reports().is_empty());
    }

    #[tokio::test]
    async fn test_changed_prompt_is_repaired_in_order() {
        let stored = Conversation::from_messages(vec![
            ChatMessage::system("old prompt"),
            ChatMessage::user("q1"),
            ChatMessage::assistant("a1"),
            ChatMessage::user("q2"),
            ChatMessage::assistant("a2"),
        ]);
        let old_ts = stored.messages()[0].timestamp;
        let (loader, reporter) = loader(MemorySessionLog::with("u1", stored));

        let conv = loader.load_or_create("u1").await;
        assert!(conv.has_system_prompt(PROMPT));
        assert!(conv.messages()[0].timestamp >= old_ts);
        let turns: Vec<&str> = conv.turns().map(|m| m.content.as_str()).collect();
        assert_eq!(turns, vec!["q1", "a1", "q2", "a2"]);
        assert_eq!(reporter.count(Severity::Info), 1);
    }

    #[tokio::test]
    async fn test_missing_system_message_is_prepended() {
        let stored = Conversation::from_messages(vec![
            ChatMessage::user("q1"),
            ChatMessage::assistant("a1"),
        ]);
        let (loader, _) = loader(MemorySessionLog::with("u1", stored));

        let conv = loader.load_or_create("u1").await;
        assert_eq!(conv.len(), 3);
        assert_eq!(conv.messages()[0].role, MessageRole::System);
        assert_eq!(
            conv.messages().iter().filter(|m| m.role == MessageRole::System).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_read_error_degrades_to_fresh() {
        let log = MemorySessionLog {
            fail_reads: true,
            ..Default::default()
        };
        let (loader, reporter) = loader(log);

        let conv = loader.load_or_create("u1").await;
        assert_eq!(conv.len(), 1);
        assert!(conv.has_system_prompt(PROMPT));
        assert_eq!(reporter.count(Severity::Error), 1);
        assert!(reporter.reports()[0].message.contains("u1"));
    }

    #[tokio::test]
    async fn test_cache_hit_skips_log() {
        let (loader, _) = loader(MemorySessionLog {
            fail_reads: true,
            ..Default::default()
        });
        let mut cached = Conversation::new(PROMPT);
        cached.push_user("pending");
        loader.cache().set("u1", cached.clone());

        // A cache hit is returned as-is, even with a failing log behind it.
        assert_eq!(loader.load_or_create("u1").await, cached);
    }
}
