use std::path::PathBuf;

use thiserror::Error;

/// Errors from session log operations (used by trait definitions in tutur-core).
#[derive(Debug, Error)]
pub enum SessionLogError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Errors from the messaging transport (typing indicator, reply delivery).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to send: {0}")]
    Send(String),

    #[error("transport closed")]
    Closed,
}

/// Errors raised while bootstrapping configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("environment variable '{0}' holding the API key is not set")]
    MissingApiKey(String),

    #[error("system prompt is empty")]
    EmptySystemPrompt,
}
