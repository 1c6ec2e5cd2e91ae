//! LLM provider implementations.
//!
//! Contains the concrete [`LlmProvider`](tutur_core::llm::provider::LlmProvider)
//! backends (native Gemini and OpenAI-compatible) and a factory
//! ([`create_provider`]) that builds the right one from a [`ProviderConfig`].

pub mod gemini;
pub mod openai_compat;

use std::time::Duration;

use secrecy::SecretString;

use tutur_core::llm::box_provider::BoxLlmProvider;
use tutur_types::llm::{LlmError, ProviderConfig, ProviderType};

use self::gemini::GeminiProvider;
use self::openai_compat::OpenAiCompatibleProvider;
use self::openai_compat::config;

/// Create a [`BoxLlmProvider`] from a [`ProviderConfig`].
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built, or if an
/// OpenAI-compatible provider has neither a `base_url` nor a well-known name.
pub fn create_provider(
    provider_config: &ProviderConfig,
    api_key: SecretString,
) -> Result<BoxLlmProvider, LlmError> {
    let model = provider_config.model.as_str();

    match provider_config.provider_type {
        ProviderType::Gemini => {
            let mut provider = GeminiProvider::new(
                api_key,
                model.to_string(),
                Duration::from_secs(provider_config.timeout_secs),
            )?;
            if let Some(base_url) = &provider_config.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            Ok(BoxLlmProvider::new(provider))
        }
        ProviderType::OpenAiCompatible => {
            let oai_config = match provider_config.base_url.as_deref() {
                Some(base_url) => config::custom(&provider_config.name, base_url, api_key, model),
                None => match provider_config.name.as_str() {
                    "openai" => config::openai_defaults(api_key, model),
                    "gemini" => config::gemini_defaults(api_key, model),
                    "mistral" => config::mistral_defaults(api_key, model),
                    other => {
                        return Err(LlmError::InvalidRequest(format!(
                            "provider '{other}' needs a base_url"
                        )));
                    }
                },
            };
            Ok(BoxLlmProvider::new(OpenAiCompatibleProvider::new(oai_config)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SecretString {
        SecretString::from("test-key")
    }

    #[test]
    fn test_default_config_builds_native_gemini() {
        let provider = create_provider(&ProviderConfig::default(), key()).unwrap();
        assert_eq!(provider.name(), "gemini");
        assert!(provider.capabilities().separate_system_instruction);
    }

    #[test]
    fn test_openai_compatible_by_name() {
        let config = ProviderConfig {
            name: "mistral".to_string(),
            provider_type: ProviderType::OpenAiCompatible,
            model: "mistral-small-latest".to_string(),
            ..Default::default()
        };
        let provider = create_provider(&config, key()).unwrap();
        assert_eq!(provider.name(), "mistral");
        assert!(!provider.capabilities().separate_system_instruction);
    }

    #[test]
    fn test_openai_compatible_with_base_url() {
        let config = ProviderConfig {
            name: "local".to_string(),
            provider_type: ProviderType::OpenAiCompatible,
            base_url: Some("http://localhost:8000/v1".to_string()),
            ..Default::default()
        };
        let provider = create_provider(&config, key()).unwrap();
        assert_eq!(provider.name(), "local");
    }

    #[test]
    fn test_unknown_openai_compatible_without_base_url_fails() {
        let config = ProviderConfig {
            name: "mystery".to_string(),
            provider_type: ProviderType::OpenAiCompatible,
            ..Default::default()
        };
        assert!(matches!(
            create_provider(&config, key()),
            Err(LlmError::InvalidRequest(_))
        ));
    }
}
