//! File-backed error reporter.
//!
//! Every report becomes a `tracing` event at the matching level. ERROR
//! reports are additionally appended to the error log as a block:
//!
//! ```text
//! [2025-01-01T10:00:00.000Z] [ERROR] failed to persist session for 62811@c.us
//! Detail: I/O error on 'conversations/62811@c.us.jsonl': Permission denied
//! Cause: Permission denied (os error 13)
//! ---
//! ```

use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use tokio::io::AsyncWriteExt;

use tutur_core::report::{ErrorReporter, ReportedError, Severity, emit};

/// Reporter appending ERROR blocks to a log file.
#[derive(Debug, Clone)]
pub struct FileErrorReporter {
    path: PathBuf,
}

impl FileErrorReporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, block: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(block.as_bytes()).await?;
        file.flush().await
    }
}

/// Render one error log block.
pub fn format_block(
    timestamp: &str,
    message: &str,
    error: Option<ReportedError<'_>>,
    severity: Severity,
) -> String {
    let mut block = format!("[{timestamp}] [{severity}] {message}\n");
    if let Some(err) = error {
        block.push_str(&format!("Detail: {err}\n"));
        let mut source = err.source();
        while let Some(cause) = source {
            block.push_str(&format!("Cause: {cause}\n"));
            source = cause.source();
        }
    }
    block.push_str("---\n");
    block
}

impl ErrorReporter for FileErrorReporter {
    async fn report(&self, message: &str, error: Option<ReportedError<'_>>, severity: Severity) {
        emit(message, error, severity);

        if severity < Severity::Error {
            return;
        }

        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let block = format_block(&timestamp, message, error, severity);
        if let Err(e) = self.append(&block).await {
            tracing::error!(
                path = %self.path.display(),
                error = %e,
                "Failed to write to error log"
            );
        }
    }
}
