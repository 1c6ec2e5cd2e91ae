//! LlmProvider trait definition.
//!
//! This is the core abstraction that all LLM backends implement.
//! Uses RPITIT for `complete`; see [`super::box_provider`] for the
//! object-safe wrapper used when the backend is chosen at runtime.

use tutur_types::llm::{CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities};

/// Trait for LLM provider backends (Gemini, OpenAI-compatible, etc.).
///
/// Implementations live in tutur-infra (e.g., `GeminiProvider`).
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "gemini", "openai").
    fn name(&self) -> &str;

    /// What this provider supports, including where it expects the system prompt.
    fn capabilities(&self) -> &ProviderCapabilities;

    /// Send a completion request and receive the full response.
    ///
    /// A response with empty `content` means the backend answered but
    /// withheld its output; transport and API failures are `Err`.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;
}
