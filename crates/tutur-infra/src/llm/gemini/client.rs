//! GeminiProvider -- concrete [`LlmProvider`] implementation for Google Gemini.
//!
//! Sends requests to `v1beta/models/{model}:generateContent`. The system
//! prompt travels in `system_instruction` and the assistant role is named
//! `model` on the wire.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and only exposed when
//! building the request header.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use tutur_core::llm::provider::LlmProvider;
use tutur_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, MessageRole, ProviderCapabilities,
    StopReason, Usage,
};

use super::types::{
    Content, ErrorEnvelope, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    Part, SystemInstruction,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini LLM provider.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    capabilities: ProviderCapabilities,
}

impl GeminiProvider {
    /// Create a new Gemini provider whose HTTP calls give up after `timeout`.
    pub fn new(api_key: SecretString, model: String, timeout: Duration) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Provider {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        let capabilities = Self::capabilities_for_model(&model);

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model,
            capabilities,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn capabilities_for_model(model: &str) -> ProviderCapabilities {
        let max_context_tokens = if model.contains("pro") {
            2_097_152
        } else {
            1_048_576
        };
        ProviderCapabilities {
            separate_system_instruction: true,
            max_context_tokens,
            max_output_tokens: 8_192,
        }
    }

    fn url(&self, model: &str) -> String {
        format!("{}/models/{model}:generateContent", self.base_url)
    }

    /// Convert a generic [`CompletionRequest`] into a Gemini request body.
    ///
    /// Inline system messages are rejected: this backend only accepts the
    /// prompt through `system_instruction`.
    fn to_gemini_request(request: &CompletionRequest) -> Result<GenerateContentRequest, LlmError> {
        let contents = request
            .messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    MessageRole::User => "user",
                    MessageRole::Assistant => "model",
                    MessageRole::System => {
                        return Err(LlmError::InvalidRequest(
                            "Gemini takes the system prompt via system_instruction, not as a message"
                                .to_string(),
                        ));
                    }
                };
                Ok(Content {
                    role: role.to_string(),
                    parts: vec![Part {
                        text: m.content.clone(),
                    }],
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let system_instruction = request.system.as_ref().map(|text| SystemInstruction {
            parts: vec![Part { text: text.clone() }],
        });

        Ok(GenerateContentRequest {
            contents,
            system_instruction,
            generation_config: Some(GenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: request.temperature,
            }),
        })
    }
}

/// Turn a parsed Gemini response into a [`CompletionResponse`].
///
/// A response with no candidates, or whose first candidate carries no text,
/// yields empty `content` rather than an error: the backend answered but
/// withheld its output.
fn into_completion_response(
    response: GenerateContentResponse,
    requested_model: &str,
) -> CompletionResponse {
    let candidate = response.candidates.into_iter().next();

    let finish_reason = candidate.as_ref().and_then(|c| c.finish_reason.clone());
    let content = candidate
        .and_then(|c| c.content)
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    let stop_reason = match finish_reason.as_deref() {
        _ if content.is_empty() => StopReason::ContentFiltered,
        Some("MAX_TOKENS") => StopReason::MaxTokens,
        Some("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII") => {
            StopReason::ContentFiltered
        }
        _ => StopReason::EndTurn,
    };

    if content.is_empty() {
        let block_reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .or(finish_reason);
        tracing::debug!(reason = ?block_reason, "Gemini returned no text");
    }

    let usage = response.usage_metadata.unwrap_or_default();

    CompletionResponse {
        id: response.response_id.unwrap_or_default(),
        content,
        model: response
            .model_version
            .unwrap_or_else(|| requested_model.to_string()),
        stop_reason,
        usage: Usage {
            input_tokens: usage.prompt_token_count,
            output_tokens: usage.candidates_token_count,
        },
    }
}

/// Map a non-2xx status and its body to an [`LlmError`].
fn map_http_error(status: u16, body: &str) -> LlmError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|env| {
            let msg = env.error.message?;
            Some(match env.error.status {
                Some(status_text) if !status_text.is_empty() => format!("{status_text}: {msg}"),
                _ => msg,
            })
        })
        .unwrap_or_else(|| body.to_string());

    match status {
        401 | 403 => LlmError::AuthenticationFailed,
        400 | 404 => LlmError::InvalidRequest(message),
        429 => LlmError::RateLimited {
            retry_after_ms: None,
        },
        500..=599 => LlmError::Overloaded(message),
        _ => LlmError::Provider {
            message: format!("HTTP {status}: {message}"),
        },
    }
}

impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = Self::to_gemini_request(request)?;
        let model = if request.model.is_empty() {
            self.model.as_str()
        } else {
            request.model.as_str()
        };

        let response = self
            .client
            .post(self.url(model))
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Provider {
                message: format!("HTTP request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(map_http_error(status.as_u16(), &error_body));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            LlmError::Deserialization(format!("failed to parse response: {e}"))
        })?;

        Ok(into_completion_response(parsed, model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutur_types::llm::Message;

    fn make_provider() -> GeminiProvider {
        GeminiProvider::new(
            SecretString::from("test-key-not-real"),
            "gemini-1.5-flash".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn request(messages: Vec<Message>) -> CompletionRequest {
        CompletionRequest {
            model: "gemini-1.5-flash".to_string(),
            messages,
            system: Some("be brief".to_string()),
            max_tokens: 512,
            temperature: Some(0.2),
        }
    }

    #[test]
    fn test_provider_name_and_capabilities() {
        let provider = make_provider();
        assert_eq!(provider.name(), "gemini");
        assert!(provider.capabilities().separate_system_instruction);
        assert_eq!(provider.capabilities().max_context_tokens, 1_048_576);
    }

    #[test]
    fn test_request_maps_assistant_to_model() {
        let body = GeminiProvider::to_gemini_request(&request(vec![
            Message {
                role: MessageRole::User,
                content: "Halo".to_string(),
            },
            Message {
                role: MessageRole::Assistant,
                content: "Hai".to_string(),
            },
        ]))
        .unwrap();

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["contents"][1]["parts"][0]["text"], "Hai");
        assert_eq!(json["system_instruction"]["parts"][0]["text"], "be brief");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 512);
    }

    #[test]
    fn test_request_rejects_inline_system() {
        let result = GeminiProvider::to_gemini_request(&request(vec![Message {
            role: MessageRole::System,
            content: "sys".to_string(),
        }]));
        assert!(matches!(result, Err(LlmError::InvalidRequest(_))));
    }

    #[test]
    fn test_response_text_is_joined() {
        let parsed: GenerateContentResponse = serde_json::from_str(
            r#"{
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "Halo "}, {"text": "juga"}]},
                    "finishReason": "STOP"
                }],
                "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 3},
                "modelVersion": "gemini-1.5-flash-002",
                "responseId": "abc"
            }"#,
        )
        .unwrap();

        let response = into_completion_response(parsed, "gemini-1.5-flash");
        assert_eq!(response.content, "Halo juga");
        assert_eq!(response.stop_reason, StopReason::EndTurn);
        assert_eq!(response.model, "gemini-1.5-flash-002");
        assert_eq!(response.usage.input_tokens, 12);
        assert_eq!(response.usage.output_tokens, 3);
    }

    #[test]
    fn test_no_candidates_is_withheld_not_error() {
        let parsed: GenerateContentResponse = serde_json::from_str(
            r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#,
        )
        .unwrap();
        let response = into_completion_response(parsed, "gemini-1.5-flash");
        assert!(response.content.is_empty());
        assert_eq!(response.stop_reason, StopReason::ContentFiltered);
        assert_eq!(response.model, "gemini-1.5-flash");
    }

    #[test]
    fn test_safety_finish_without_parts() {
        let parsed: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"finishReason": "SAFETY"}]}"#,
        )
        .unwrap();
        let response = into_completion_response(parsed, "m");
        assert!(response.content.is_empty());
        assert_eq!(response.stop_reason, StopReason::ContentFiltered);
    }

    #[test]
    fn test_http_error_mapping() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#;
        match map_http_error(400, body) {
            LlmError::InvalidRequest(msg) => assert_eq!(msg, "INVALID_ARGUMENT: API key not valid"),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(map_http_error(403, ""), LlmError::AuthenticationFailed));
        assert!(matches!(map_http_error(429, ""), LlmError::RateLimited { .. }));
        assert!(matches!(map_http_error(503, "busy"), LlmError::Overloaded(m) if m == "busy"));
        assert!(matches!(map_http_error(418, "teapot"), LlmError::Provider { .. }));
    }

    #[test]
    fn test_with_base_url_trims_slash() {
        let provider = make_provider().with_base_url("http://localhost:9000/v1beta/".to_string());
        assert_eq!(
            provider.url("gemini-1.5-flash"),
            "http://localhost:9000/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }
}
