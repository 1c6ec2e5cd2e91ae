//! LLM provider abstractions for tutur.
//!
//! - `LlmProvider`: RPITIT trait for concrete backend implementations
//! - `BoxLlmProvider`: object-safe wrapper for dynamic dispatch

pub mod box_provider;
pub mod provider;
