//! Business logic and port trait definitions for tutur.
//!
//! This crate defines the "ports" (session log, error reporter, LLM provider,
//! reply channel) that the infrastructure layer implements, plus the session
//! store and turn orchestration built on top of them. It depends only on
//! `tutur-types` -- never on `tutur-infra` or any filesystem/HTTP crate.

pub mod chat;
pub mod llm;
pub mod report;
pub mod transport;
