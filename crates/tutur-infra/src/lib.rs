//! Infrastructure layer for tutur.
//!
//! Contains implementations of the port traits defined in `tutur-core`:
//! the JSONL session log, the file-backed error reporter, and the Gemini and
//! OpenAI-compatible LLM providers, plus configuration loading and
//! data-directory resolution.

pub mod config;
pub mod filesystem;
pub mod llm;
pub mod report;
pub mod session_log;
