//! Shared domain types for tutur.
//!
//! This crate contains the types used across the tutur workspace:
//! chat messages and conversations, LLM request/response shapes,
//! configuration, and the associated error types.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
