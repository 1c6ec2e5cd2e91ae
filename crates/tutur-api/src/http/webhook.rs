//! POST /v1/messages - inbound message webhook.
//!
//! The gateway sends one message per request. The dispatcher runs the turn
//! against a per-request [`WebhookChannel`] that collects whatever would have
//! been sent back, and those replies become the response body.

use std::sync::Mutex;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use tutur_core::transport::{DispatchOutcome, InboundMessage, ReplyChannel};
use tutur_types::error::TransportError;

use crate::state::AppState;

/// Inbound message as posted by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundPayload {
    pub from: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub is_status: bool,
    #[serde(default)]
    pub author: Option<String>,
}

impl From<InboundPayload> for InboundMessage {
    fn from(payload: InboundPayload) -> Self {
        Self {
            from: payload.from,
            body: payload.body,
            is_status: payload.is_status,
            author: payload.author,
        }
    }
}

/// Response body: how the message was handled and the texts to deliver.
#[derive(Debug, Serialize)]
pub struct WebhookReply {
    pub outcome: &'static str,
    pub replies: Vec<String>,
}

/// Reply channel buffering replies for the HTTP response.
#[derive(Debug, Default)]
pub struct WebhookChannel {
    replies: Mutex<Vec<String>>,
}

impl WebhookChannel {
    pub fn into_replies(self) -> Vec<String> {
        self.replies
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ReplyChannel for WebhookChannel {
    async fn start_typing(&self, chat_id: &str) -> Result<(), TransportError> {
        tracing::trace!(chat_id, "typing");
        Ok(())
    }

    async fn clear_typing(&self, chat_id: &str) -> Result<(), TransportError> {
        tracing::trace!(chat_id, "typing cleared");
        Ok(())
    }

    async fn reply(&self, _chat_id: &str, text: &str) -> Result<(), TransportError> {
        let mut replies = self.replies.lock().map_err(|_| TransportError::Closed)?;
        replies.push(text.to_string());
        Ok(())
    }
}

pub fn outcome_label(outcome: DispatchOutcome) -> &'static str {
    match outcome {
        DispatchOutcome::Ignored => "ignored",
        DispatchOutcome::Replied => "replied",
        DispatchOutcome::FellBack => "fell_back",
        DispatchOutcome::Undelivered => "undelivered",
    }
}

pub async fn receive_message(
    State(state): State<AppState>,
    Json(payload): Json<InboundPayload>,
) -> Json<WebhookReply> {
    let message = InboundMessage::from(payload);
    let channel = WebhookChannel::default();
    let outcome = state.dispatcher.dispatch(&channel, &message).await;

    Json(WebhookReply {
        outcome: outcome_label(outcome),
        replies: channel.into_replies(),
    })
}
