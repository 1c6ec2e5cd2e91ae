//! JSONL-backed session log.
//!
//! Each user id maps to `{base_dir}/{encoded_id}.jsonl`, where each line is
//! one JSON-serialized `ChatMessage`. Writes replace the whole file through a
//! temporary sibling and a rename, so a crash mid-write never leaves a
//! truncated log behind.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::Serialize;

use tutur_core::chat::log::{SessionLog, decode_lines, encode_lines};
use tutur_types::chat::Conversation;
use tutur_types::error::SessionLogError;

/// Metadata about a stored session (without keeping its messages).
#[derive(Debug, Clone, Serialize)]
pub struct SessionMeta {
    /// User id decoded from the file name.
    pub key: String,
    pub message_count: usize,
    pub file_size: u64,
    pub modified: DateTime<Utc>,
}

/// Session log storing one `.jsonl` file per user.
#[derive(Debug, Clone)]
pub struct JsonlSessionLog {
    base_dir: PathBuf,
}

impl JsonlSessionLog {
    /// Create a log rooted at `base_dir`. The directory is created lazily on
    /// first write; call [`ensure_dir`](Self::ensure_dir) to create it eagerly.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Create the storage directory if it does not exist.
    pub async fn ensure_dir(&self) -> Result<(), SessionLogError> {
        tokio::fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|source| SessionLogError::Io {
                path: self.base_dir.clone(),
                source,
            })
    }

    /// Path of the log file for `user_id`.
    pub fn session_path(&self, user_id: &str) -> PathBuf {
        self.base_dir.join(format!("{}.jsonl", encode_key(user_id)))
    }

    /// List all stored sessions, most recently modified first.
    ///
    /// A missing storage directory yields an empty list.
    pub async fn list(&self) -> Result<Vec<SessionMeta>, SessionLogError> {
        let io_err = |source: std::io::Error| SessionLogError::Io {
            path: self.base_dir.clone(),
            source,
        };

        let mut entries = match tokio::fs::read_dir(&self.base_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_err(e)),
        };

        let mut sessions = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "jsonl") {
                continue;
            }

            let key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(decode_key)
                .unwrap_or_default();
            if key.is_empty() {
                continue;
            }

            let metadata = entry.metadata().await.map_err(io_err)?;
            let content = tokio::fs::read_to_string(&path).await.unwrap_or_default();
            let message_count = decode_lines(&content).messages.len();

            sessions.push(SessionMeta {
                key,
                message_count,
                file_size: metadata.len(),
                modified: metadata
                    .modified()
                    .unwrap_or(SystemTime::UNIX_EPOCH)
                    .into(),
            });
        }

        sessions.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(sessions)
    }
}

impl SessionLog for JsonlSessionLog {
    async fn read(&self, user_id: &str) -> Result<Option<Conversation>, SessionLogError> {
        let path = self.session_path(user_id);

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(SessionLogError::Io { path, source }),
        };

        let decoded = decode_lines(&content);
        for skipped in &decoded.skipped {
            tracing::warn!(
                line = skipped.line,
                error = %skipped.error,
                path = %path.display(),
                "Skipping malformed session line"
            );
        }

        Ok(Some(Conversation::from_messages(decoded.messages)))
    }

    async fn write(
        &self,
        user_id: &str,
        conversation: &Conversation,
    ) -> Result<(), SessionLogError> {
        self.ensure_dir().await?;

        let path = self.session_path(user_id);
        let tmp_path = path.with_extension("jsonl.tmp");
        let content = encode_lines(conversation)?;

        tokio::fs::write(&tmp_path, content.as_bytes())
            .await
            .map_err(|source| SessionLogError::Io {
                path: tmp_path.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|source| SessionLogError::Io {
                path: path.clone(),
                source,
            })?;

        tracing::trace!(path = %path.display(), messages = conversation.len(), "session log written");
        Ok(())
    }
}

/// Encode a user id as a file stem.
///
/// Percent-encodes every byte outside `[A-Za-z0-9-._~]` except `@`, so
/// transport addresses such as `62811@c.us` keep readable names while
/// distinct ids always get distinct files. A leading `.` is encoded too, so
/// no hidden or relative names are produced.
pub fn encode_key(user_id: &str) -> String {
    let encoded = urlencoding::encode(user_id).replace("%40", "@");
    match encoded.strip_prefix('.') {
        Some(rest) => format!("%2E{rest}"),
        None => encoded,
    }
}

/// Inverse of [`encode_key`]. Stems that are not valid encodings (e.g.
/// hand-made files) are returned unchanged.
pub fn decode_key(stem: &str) -> String {
    urlencoding::decode(stem)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| stem.to_string())
}
