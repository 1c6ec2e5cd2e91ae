//! Global configuration types for tutur.
//!
//! `GlobalConfig` represents the top-level `config.toml` that controls the
//! session store, the LLM backend, the fixed user-facing replies, and the
//! webhook server.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::llm::ProviderConfig;

/// Built-in system prompt used when config.toml supplies none.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a friendly, helpful and professional virtual assistant. \
Answer only from the information you were given. If a question cannot be answered from that \
information, say that you do not have specific information about it.";

/// Top-level configuration for tutur.
///
/// Loaded from `{data_dir}/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Directory holding one `.jsonl` log per user, relative to the data dir.
    #[serde(default = "default_conversations_dir")]
    pub conversations_dir: PathBuf,

    /// File receiving ERROR reports, relative to the data dir.
    #[serde(default = "default_error_log")]
    pub error_log: PathBuf,

    /// Number of most recent user/assistant turns sent to the backend.
    #[serde(default = "default_max_history_messages")]
    pub max_history_messages: usize,

    /// Inline canonical system prompt.
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// File holding the canonical system prompt; wins over `system_prompt`.
    #[serde(default)]
    pub system_prompt_path: Option<PathBuf>,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub replies: ReplyTexts,

    #[serde(default)]
    pub server: ServerConfig,
}

fn default_conversations_dir() -> PathBuf {
    PathBuf::from("conversations")
}

fn default_error_log() -> PathBuf {
    PathBuf::from("error.log")
}

fn default_max_history_messages() -> usize {
    12
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            conversations_dir: default_conversations_dir(),
            error_log: default_error_log(),
            max_history_messages: default_max_history_messages(),
            system_prompt: None,
            system_prompt_path: None,
            provider: ProviderConfig::default(),
            replies: ReplyTexts::default(),
            server: ServerConfig::default(),
        }
    }
}

/// Fixed, non-technical replies sent to users when a turn cannot be answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyTexts {
    /// The backend answered but withheld its output (e.g. safety filter).
    #[serde(default = "default_content_withheld")]
    pub content_withheld: String,

    /// The backend call failed or timed out.
    #[serde(default = "default_backend_failure")]
    pub backend_failure: String,

    /// Anything else went wrong while handling the message.
    #[serde(default = "default_unexpected_failure")]
    pub unexpected_failure: String,
}

fn default_content_withheld() -> String {
    "Mohon maaf, saya tidak dapat memberikan respons saat ini karena konten mungkin tidak sesuai \
     dengan kebijakan. Silakan coba dengan pertanyaan lain."
        .to_string()
}

fn default_backend_failure() -> String {
    "Mohon maaf, terjadi masalah saat memproses permintaan Anda. Tim teknis kami telah \
     diberitahu. Silakan coba lagi nanti."
        .to_string()
}

fn default_unexpected_failure() -> String {
    "Mohon maaf, terjadi kesalahan tak terduga. Tim kami telah diberitahu dan sedang \
     menanganinya."
        .to_string()
}

impl Default for ReplyTexts {
    fn default() -> Self {
        Self {
            content_withheld: default_content_withheld(),
            backend_failure: default_backend_failure(),
            unexpected_failure: default_unexpected_failure(),
        }
    }
}

/// Bind address of the webhook transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8088
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ProviderType;

    #[test]
    fn test_global_config_default_values() {
        let config = GlobalConfig::default();
        assert_eq!(config.max_history_messages, 12);
        assert_eq!(config.conversations_dir, PathBuf::from("conversations"));
        assert_eq!(config.error_log, PathBuf::from("error.log"));
        assert!(config.system_prompt.is_none());
        assert_eq!(config.server.port, 8088);
    }

    #[test]
    fn test_global_config_deserialize_with_defaults() {
        let config: GlobalConfig = toml::from_str("").unwrap();
        assert_eq!(config.max_history_messages, 12);
        assert_eq!(config.provider.model, "gemini-1.5-flash");
        assert_eq!(config.replies, ReplyTexts::default());
    }

    #[test]
    fn test_global_config_deserialize_with_values() {
        let toml_str = r#"
conversations_dir = "/var/lib/tutur/conversations"
max_history_messages = 20
system_prompt = "Anda adalah asisten virtual."

[provider]
name = "openai"
provider_type = "openai_compatible"
model = "gpt-4o-mini"
api_key_env = "OPENAI_API_KEY"
timeout_secs = 30

[replies]
backend_failure = "Sorry, try again later."

[server]
port = 9000
"#;
        let config: GlobalConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.conversations_dir,
            PathBuf::from("/var/lib/tutur/conversations")
        );
        assert_eq!(config.max_history_messages, 20);
        assert_eq!(config.system_prompt.as_deref(), Some("Anda adalah asisten virtual."));
        assert_eq!(config.provider.provider_type, ProviderType::OpenAiCompatible);
        assert_eq!(config.provider.model, "gpt-4o-mini");
        assert_eq!(config.provider.timeout_secs, 30);
        assert_eq!(config.replies.backend_failure, "Sorry, try again later.");
        // Untouched reply keeps its default.
        assert_eq!(config.replies.content_withheld, default_content_withheld());
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_default_replies_are_distinct() {
        let replies = ReplyTexts::default();
        assert_ne!(replies.content_withheld, replies.backend_failure);
        assert_ne!(replies.backend_failure, replies.unexpected_failure);
        assert!(replies.backend_failure.starts_with("Mohon maaf"));
    }
}
