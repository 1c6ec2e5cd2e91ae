//! Messaging transport port and the inbound dispatcher.
//!
//! A transport delivers `InboundMessage`s and exposes a `ReplyChannel` for
//! the typing indicator and replies. `InboundDispatcher` drives one message
//! through the turn controller and makes sure the sender always gets some
//! reply, even when the turn itself blows up.

use std::sync::Arc;

use tutur_types::error::TransportError;

use crate::chat::controller::TurnController;
use crate::chat::log::SessionLog;
use crate::report::{ErrorReporter, Severity};

/// Sender address used by status broadcasts.
pub const STATUS_BROADCAST: &str = "status@broadcast";

/// One message received from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Sender address; doubles as the user identifier.
    pub from: String,
    pub body: String,
    /// Transport-level status update flag.
    pub is_status: bool,
    /// Set for messages posted inside a group chat.
    pub author: Option<String>,
}

impl InboundMessage {
    /// A plain direct message.
    pub fn direct(from: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            body: body.into(),
            is_status: false,
            author: None,
        }
    }

    /// Status broadcasts, group messages, and blank bodies are not answered.
    pub fn is_ignorable(&self) -> bool {
        self.from == STATUS_BROADCAST
            || self.is_status
            || self.author.is_some()
            || self.body.trim().is_empty()
    }
}

/// Outbound side of a transport, scoped to a chat address.
pub trait ReplyChannel: Send + Sync {
    /// Show the "composing" indicator.
    fn start_typing(
        &self,
        chat_id: &str,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;

    /// Clear the "composing" indicator.
    fn clear_typing(
        &self,
        chat_id: &str,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;

    /// Send `text` as a reply to the last message from `chat_id`.
    fn reply(
        &self,
        chat_id: &str,
        text: &str,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;
}

/// Failures of the turn task itself, as seen by the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("turn task panicked: {0}")]
    Panicked(String),

    #[error("turn task was cancelled")]
    Cancelled,
}

/// How a dispatched message ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Filtered out; nothing was sent.
    Ignored,
    /// The turn's reply was delivered.
    Replied,
    /// Something failed and the unexpected-failure apology was delivered.
    FellBack,
    /// Even the fallback apology could not be delivered.
    Undelivered,
}

/// Runs inbound messages through a [`TurnController`].
pub struct InboundDispatcher<L, R> {
    controller: Arc<TurnController<L, R>>,
}

impl<L, R> Clone for InboundDispatcher<L, R> {
    fn clone(&self) -> Self {
        Self {
            controller: Arc::clone(&self.controller),
        }
    }
}

impl<L, R> InboundDispatcher<L, R>
where
    L: SessionLog + 'static,
    R: ErrorReporter + 'static,
{
    pub fn new(controller: Arc<TurnController<L, R>>) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &Arc<TurnController<L, R>> {
        &self.controller
    }

    /// Handle one inbound message end to end.
    ///
    /// The turn runs on its own task so a panic inside it is caught here
    /// instead of taking the transport loop down.
    pub async fn dispatch<C: ReplyChannel>(
        &self,
        channel: &C,
        message: &InboundMessage,
    ) -> DispatchOutcome {
        if message.is_ignorable() {
            tracing::trace!(from = %message.from, "ignoring inbound message");
            return DispatchOutcome::Ignored;
        }

        let from = message.from.as_str();
        tracing::info!(from, chars = message.body.chars().count(), "message received");

        if let Err(e) = channel.start_typing(from).await {
            tracing::warn!(from, error = %e, "failed to start typing indicator");
        }

        let controller = Arc::clone(&self.controller);
        let user_id = message.from.clone();
        let body = message.body.clone();
        let turn = tokio::spawn(async move { controller.handle_turn(&user_id, &body).await });

        let result = match turn.await {
            Ok(reply) => Ok(reply),
            Err(join_err) if join_err.is_panic() => {
                Err(DispatchError::Panicked(panic_message(join_err.into_panic())))
            }
            Err(_) => Err(DispatchError::Cancelled),
        };

        if let Err(e) = channel.clear_typing(from).await {
            tracing::warn!(from, error = %e, "failed to clear typing indicator");
        }

        match result {
            Ok(reply) => match channel.reply(from, &reply).await {
                Ok(()) => {
                    tracing::info!(from, "reply sent");
                    DispatchOutcome::Replied
                }
                Err(e) => {
                    self.report(&format!("failed to deliver reply to {from}"), &e)
                        .await;
                    self.fall_back(channel, from).await
                }
            },
            Err(e) => {
                self.report(&format!("unexpected failure while handling message from {from}"), &e)
                    .await;
                self.fall_back(channel, from).await
            }
        }
    }

    async fn fall_back<C: ReplyChannel>(&self, channel: &C, from: &str) -> DispatchOutcome {
        let apology = &self.controller.replies().unexpected_failure;
        match channel.reply(from, apology).await {
            Ok(()) => DispatchOutcome::FellBack,
            Err(e) => {
                self.report(&format!("failed to send fallback reply to {from}"), &e)
                    .await;
                DispatchOutcome::Undelivered
            }
        }
    }

    async fn report<E>(&self, message: &str, error: &E)
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.controller
            .reporter()
            .report(message, Some(error), Severity::Error)
            .await;
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
