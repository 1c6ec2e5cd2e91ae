//! Global configuration loader for tutur.
//!
//! Reads `config.toml` from the data directory (`~/.tutur/` in production)
//! and deserializes it into [`GlobalConfig`]. Falls back to defaults when the
//! file is missing or malformed. Also resolves the pieces of configuration
//! that live outside the file: the system prompt file and the API key.

use std::path::{Path, PathBuf};

use secrecy::SecretString;

use tutur_types::config::{DEFAULT_SYSTEM_PROMPT, GlobalConfig};
use tutur_types::error::ConfigError;

/// Load global configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`GlobalConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
pub async fn load_global_config(data_dir: &Path) -> GlobalConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
    };

    match toml::from_str::<GlobalConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            GlobalConfig::default()
        }
    }
}

/// Load configuration from an explicitly named file.
///
/// Unlike [`load_global_config`], a missing or malformed file is an error.
pub async fn load_config_file(path: &Path) -> Result<GlobalConfig, ConfigError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    toml::from_str(&content).map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))
}

/// Resolve `path` against `data_dir` unless it is already absolute.
pub fn resolve_path(data_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        data_dir.join(path)
    }
}

/// Resolve the canonical system prompt.
///
/// Priority:
/// 1. `system_prompt_path` (relative to `data_dir`), trailing whitespace trimmed
/// 2. inline `system_prompt`
/// 3. [`DEFAULT_SYSTEM_PROMPT`]
pub async fn resolve_system_prompt(
    config: &GlobalConfig,
    data_dir: &Path,
) -> Result<String, ConfigError> {
    let prompt = if let Some(rel) = &config.system_prompt_path {
        let path = resolve_path(data_dir, rel);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ConfigError::Read { path, source })?;
        content.trim_end().to_string()
    } else if let Some(inline) = &config.system_prompt {
        inline.clone()
    } else {
        DEFAULT_SYSTEM_PROMPT.to_string()
    };

    if prompt.trim().is_empty() {
        return Err(ConfigError::EmptySystemPrompt);
    }
    Ok(prompt)
}

/// Read the API key from the environment variable named in the provider config.
pub fn resolve_api_key(config: &GlobalConfig) -> Result<SecretString, ConfigError> {
    let var = &config.provider.api_key_env;
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(SecretString::from(value)),
        _ => Err(ConfigError::MissingApiKey(var.clone())),
    }
}
