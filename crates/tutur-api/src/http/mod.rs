//! Webhook transport: an axum server receiving inbound chat messages.
//!
//! A messaging gateway POSTs each inbound message to `/v1/messages` and gets
//! the reply text back in the response body.

pub mod router;
pub mod webhook;
