//! Configuration types and per-provider defaults for OpenAI-compatible providers.
//!
//! Each backend that speaks the OpenAI chat completions protocol gets a
//! factory function returning an [`OpenAiCompatConfig`] with the correct base
//! URL and capabilities. All of them take the system prompt inline, as the
//! first entry of the message list.

use secrecy::SecretString;

use tutur_types::llm::ProviderCapabilities;

/// Configuration for an OpenAI-compatible LLM provider.
///
/// Used to construct an [`super::OpenAiCompatibleProvider`].
pub struct OpenAiCompatConfig {
    /// Human-readable provider name (e.g., "openai", "gemini").
    pub provider_name: String,
    /// Base URL for the API (e.g., "https://api.openai.com/v1").
    pub base_url: String,
    pub api_key: SecretString,
    /// Model identifier (e.g., "gpt-4o-mini", "gemini-1.5-flash").
    pub model: String,
    pub capabilities: ProviderCapabilities,
}

fn inline_capabilities(max_context_tokens: u32, max_output_tokens: u32) -> ProviderCapabilities {
    ProviderCapabilities {
        separate_system_instruction: false,
        max_context_tokens,
        max_output_tokens,
    }
}

/// OpenAI default configuration.
///
/// Base URL: `https://api.openai.com/v1`
pub fn openai_defaults(api_key: SecretString, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "openai".into(),
        base_url: "https://api.openai.com/v1".into(),
        api_key,
        model: model.into(),
        capabilities: inline_capabilities(128_000, 16_384),
    }
}

/// Google Gemini through its OpenAI-compatible endpoint.
///
/// Base URL: `https://generativelanguage.googleapis.com/v1beta/openai`
pub fn gemini_defaults(api_key: SecretString, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "gemini".into(),
        base_url: "https://generativelanguage.googleapis.com/v1beta/openai".into(),
        api_key,
        model: model.into(),
        capabilities: inline_capabilities(1_048_576, 8_192),
    }
}

/// Mistral AI default configuration.
///
/// Base URL: `https://api.mistral.ai/v1`
pub fn mistral_defaults(api_key: SecretString, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "mistral".into(),
        base_url: "https://api.mistral.ai/v1".into(),
        api_key,
        model: model.into(),
        capabilities: inline_capabilities(128_000, 32_768),
    }
}

/// Any other OpenAI-compatible server at `base_url` (local proxies, vLLM, Ollama).
pub fn custom(provider_name: &str, base_url: &str, api_key: SecretString, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: provider_name.into(),
        base_url: base_url.trim_end_matches('/').into(),
        api_key,
        model: model.into(),
        capabilities: inline_capabilities(32_000, 4_096),
    }
}
