//! TurnController: one question/answer turn against the session store.
//!
//! ```text
//! LOAD -> APPEND_USER -> CALL_BACKEND -> answer   -> APPEND_ASSISTANT -> PERSIST (background)
//!                                     -> withheld -> ROLLBACK_USER (WARN)
//!                                     -> error    -> ROLLBACK_USER (ERROR)
//!                                     -> panic or cancellation -> ROLLBACK_USER (on drop)
//! ```
//!
//! Turns for the same user are serialized by a per-user async mutex. The
//! background persist task owns the user's lock guard until the write
//! finishes, so the next turn for that user only starts once the previous
//! one has fully settled. Different users never contend.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::task::TaskTracker;
use tracing::Instrument;

use tutur_types::chat::Conversation;
use tutur_types::config::ReplyTexts;
use tutur_types::llm::{CompletionRequest, CompletionResponse, LlmError};

use super::assembler::{SystemPromptPlacement, TurnAssembler};
use super::cache::SessionCache;
use super::loader::SessionLoader;
use super::log::SessionLog;
use crate::llm::box_provider::BoxLlmProvider;
use crate::report::{ErrorReporter, Severity};

/// Maximum number of characters of a serialized request included in reports.
const REQUEST_EXCERPT_CHARS: usize = 500;

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The backend answered; the exchange was appended and persisted.
    Answered(String),
    /// The backend returned no usable output; the user turn was rolled back.
    Withheld,
    /// The backend call failed or timed out; the user turn was rolled back.
    Failed,
    /// The text was blank; nothing was stored or sent.
    Ignored,
}

/// Runs turns for every user against a shared session store.
pub struct TurnController<L, R> {
    loader: SessionLoader<L, R>,
    assembler: TurnAssembler,
    provider: Arc<BoxLlmProvider>,
    log: Arc<L>,
    reporter: Arc<R>,
    replies: ReplyTexts,
    backend_timeout: Duration,
    turn_locks: DashMap<String, Arc<Mutex<()>>>,
    persist_tasks: TaskTracker,
}

impl<L, R> TurnController<L, R>
where
    L: SessionLog + 'static,
    R: ErrorReporter + 'static,
{
    pub fn new(
        log: Arc<L>,
        reporter: Arc<R>,
        provider: Arc<BoxLlmProvider>,
        assembler: TurnAssembler,
        replies: ReplyTexts,
        backend_timeout: Duration,
    ) -> Self {
        let loader = SessionLoader::new(
            Arc::clone(&log),
            SessionCache::new(),
            Arc::clone(&reporter),
            Arc::clone(&assembler.system_prompt),
        );
        Self {
            loader,
            assembler,
            provider,
            log,
            reporter,
            replies,
            backend_timeout,
            turn_locks: DashMap::new(),
            persist_tasks: TaskTracker::new(),
        }
    }

    pub fn cache(&self) -> &SessionCache {
        self.loader.cache()
    }

    pub fn replies(&self) -> &ReplyTexts {
        &self.replies
    }

    pub fn reporter(&self) -> &Arc<R> {
        &self.reporter
    }

    /// Number of background writes that have not finished yet.
    pub fn pending_writes(&self) -> usize {
        self.persist_tasks.len()
    }

    /// Handle one inbound text and return the reply to send.
    ///
    /// Returns user-facing text: the backend's answer or one of the
    /// configured apologies. Blank input returns an empty string.
    pub async fn handle_turn(&self, user_id: &str, text: &str) -> String {
        match self.run_turn(user_id, text).await {
            TurnOutcome::Answered(answer) => answer,
            TurnOutcome::Withheld => self.replies.content_withheld.clone(),
            TurnOutcome::Failed => self.replies.backend_failure.clone(),
            TurnOutcome::Ignored => String::new(),
        }
    }

    /// Like [`handle_turn`](Self::handle_turn), but reports how the turn ended.
    pub async fn run_turn(&self, user_id: &str, text: &str) -> TurnOutcome {
        let text = text.trim();
        if text.is_empty() {
            tracing::debug!(user_id, "ignoring blank turn");
            return TurnOutcome::Ignored;
        }

        let guard = self.turn_lock(user_id).lock_owned().await;

        let mut conversation = self.loader.load_or_create(user_id).await;
        conversation.push_user(text);
        self.cache().set(user_id, conversation.clone());
        // Dropped before `guard`, so an unwinding or cancelled turn is
        // rolled back while the user's lock is still held.
        let pending = PendingUserTurn::new(self.cache(), user_id);

        let placement = SystemPromptPlacement::for_capabilities(self.provider.capabilities());
        let request = self.assembler.build_request(&conversation, placement);

        match self.call_backend(&request).await {
            Ok(response) if !response.content.is_empty() => {
                conversation.push_assistant(response.content.clone());
                self.cache().set(user_id, conversation.clone());
                pending.settle();
                self.persist(user_id, conversation, guard);
                TurnOutcome::Answered(response.content)
            }
            Ok(response) => {
                self.rollback(user_id, conversation);
                pending.settle();
                self.reporter
                    .report(
                        &format!(
                            "backend returned no usable output for {user_id} (stop reason: {})",
                            response.stop_reason
                        ),
                        None,
                        Severity::Warn,
                    )
                    .await;
                TurnOutcome::Withheld
            }
            Err(e) => {
                self.rollback(user_id, conversation);
                pending.settle();
                self.reporter
                    .report(
                        &format!(
                            "backend call failed for {user_id}; request: {}",
                            request_excerpt(&request)
                        ),
                        Some(&e),
                        Severity::Error,
                    )
                    .await;
                TurnOutcome::Failed
            }
        }
    }

    /// Close the persist tracker and wait for every pending write.
    pub async fn flush_pending_writes(&self) {
        self.persist_tasks.close();
        self.persist_tasks.wait().await;
        tracing::debug!("pending session writes flushed");
    }

    fn turn_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        self.turn_locks
            .entry(user_id.to_string())
            .or_default()
            .value()
            .clone()
    }

    async fn call_backend(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let span = tracing::info_span!(
            "gen_ai.chat",
            otel.name = %format!("chat {}", request.model),
            gen_ai.operation.name = "chat",
            gen_ai.provider.name = self.provider.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.max_tokens = request.max_tokens,
            gen_ai.request.temperature = ?request.temperature,
            gen_ai.usage.input_tokens = tracing::field::Empty,
            gen_ai.usage.output_tokens = tracing::field::Empty,
            gen_ai.response.finish_reasons = tracing::field::Empty,
        );

        let call = tokio::time::timeout(self.backend_timeout, self.provider.complete(request));
        let result = match call.instrument(span.clone()).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout {
                after_ms: self.backend_timeout.as_millis() as u64,
            }),
        };

        if let Ok(response) = &result {
            span.record("gen_ai.usage.input_tokens", response.usage.input_tokens);
            span.record("gen_ai.usage.output_tokens", response.usage.output_tokens);
            span.record(
                "gen_ai.response.finish_reasons",
                tracing::field::display(&response.stop_reason),
            );
        }
        result
    }

    fn rollback(&self, user_id: &str, mut conversation: Conversation) {
        conversation.rollback_user();
        self.cache().set(user_id, conversation);
    }

    /// Write `conversation` in the background, holding the user's turn lock
    /// until the write settles.
    fn persist(&self, user_id: &str, conversation: Conversation, guard: OwnedMutexGuard<()>) {
        let log = Arc::clone(&self.log);
        let reporter = Arc::clone(&self.reporter);
        let user_id = user_id.to_string();
        self.persist_tasks.spawn(async move {
            let _guard = guard;
            match log.write(&user_id, &conversation).await {
                Ok(()) => tracing::debug!(user_id, messages = conversation.len(), "session persisted"),
                Err(e) => {
                    reporter
                        .report(
                            &format!("failed to persist session for {user_id}"),
                            Some(&e),
                            Severity::Error,
                        )
                        .await;
                }
            }
        });
    }
}

/// Removes the cached user turn of a turn that never reached an outcome.
struct PendingUserTurn<'a> {
    cache: &'a SessionCache,
    user_id: &'a str,
    settled: bool,
}

impl<'a> PendingUserTurn<'a> {
    fn new(cache: &'a SessionCache, user_id: &'a str) -> Self {
        Self {
            cache,
            user_id,
            settled: false,
        }
    }

    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for PendingUserTurn<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let Some(mut conversation) = self.cache.get(self.user_id) else {
            return;
        };
        if conversation.rollback_user().is_some() {
            tracing::warn!(user_id = self.user_id, "discarded user turn of an unfinished turn");
            self.cache.set(self.user_id, conversation);
        }
    }
}

/// Serialize the request's messages and cut them to a bounded excerpt.
fn request_excerpt(request: &CompletionRequest) -> String {
    let json = serde_json::to_string(&request.messages).unwrap_or_default();
    match json.char_indices().nth(REQUEST_EXCERPT_CHARS) {
        Some((idx, _)) => format!("{}...", &json[..idx]),
        None => json,
    }
}
