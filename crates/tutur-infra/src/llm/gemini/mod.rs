//! Google Gemini LLM provider implementation.
//!
//! This module provides the [`GeminiProvider`] which implements the
//! [`LlmProvider`](tutur_core::llm::provider::LlmProvider) trait for the
//! native `generateContent` endpoint.

pub mod client;
pub mod types;

pub use client::GeminiProvider;
