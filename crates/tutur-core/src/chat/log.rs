//! SessionLog trait and the line-delimited message codec.
//!
//! A session log holds one user's conversation as newline-delimited JSON,
//! one `ChatMessage` per line in chronological order. The trait is the
//! storage port; `encode_lines` / `decode_lines` are shared by every
//! implementation so they agree on the format.

use tutur_types::chat::{ChatMessage, Conversation};
use tutur_types::error::SessionLogError;

/// Durable per-user conversation storage.
///
/// Implementations live in tutur-infra (e.g., `JsonlSessionLog`).
pub trait SessionLog: Send + Sync {
    /// Read the stored conversation for `user_id`.
    ///
    /// Returns `Ok(None)` when nothing has been stored for the user yet.
    /// Lines that fail to parse are skipped; only I/O failures are errors.
    fn read(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<Conversation>, SessionLogError>> + Send;

    /// Overwrite the stored conversation for `user_id` with `conversation`.
    fn write(
        &self,
        user_id: &str,
        conversation: &Conversation,
    ) -> impl std::future::Future<Output = Result<(), SessionLogError>> + Send;
}

/// A line that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number within the log.
    pub line: usize,
    pub error: String,
}

/// Result of decoding a log: the recovered messages plus what was skipped.
#[derive(Debug, Clone, Default)]
pub struct DecodedLog {
    pub messages: Vec<ChatMessage>,
    pub skipped: Vec<SkippedLine>,
}

/// Serialize a conversation as one JSON object per line, with a trailing newline.
pub fn encode_lines(conversation: &Conversation) -> Result<String, SessionLogError> {
    let mut out = String::new();
    for message in conversation.messages() {
        let line = serde_json::to_string(message)
            .map_err(|e| SessionLogError::Serialization(e.to_string()))?;
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

/// Decode a newline-delimited log, skipping blank and malformed lines.
pub fn decode_lines(content: &str) -> DecodedLog {
    let mut decoded = DecodedLog::default();
    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<ChatMessage>(line) {
            Ok(message) => decoded.messages.push(message),
            Err(e) => decoded.skipped.push(SkippedLine {
                line: idx + 1,
                error: e.to_string(),
            }),
        }
    }
    decoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutur_types::chat::MessageRole;

    fn sample() -> Conversation {
        let mut conv = Conversation::new("sys");
        conv.push_user("Halo");
        conv.push_assistant("Halo juga!\nAda yang bisa dibantu?");
        conv
    }

    #[test]
    fn test_encode_one_line_per_message() {
        let text = encode_lines(&sample()).unwrap();
        assert!(text.ends_with('\n'));
        assert_eq!(text.lines().count(), 3);
        // Embedded newlines stay escaped inside a single line.
        assert!(text.lines().nth(2).unwrap().contains("\\n"));
    }

    #[test]
    fn test_write_then_read_preserves_fields() {
        let conv = sample();
        let decoded = decode_lines(&encode_lines(&conv).unwrap());
        assert!(decoded.skipped.is_empty());
        assert_eq!(decoded.messages, conv.messages());
    }

    #[test]
    fn test_malformed_line_is_skipped() {
        let conv = sample();
        let mut text = encode_lines(&conv).unwrap();
        text.insert_str(0, "{not json\n");
        text.push_str("{\"role\":\"wizard\",\"content\":\"x\",\"timestamp\":\"2024-01-01T00:00:00Z\"}\n");

        let decoded = decode_lines(&text);
        assert_eq!(decoded.messages.len(), 3);
        assert_eq!(decoded.skipped.len(), 2);
        assert_eq!(decoded.skipped[0].line, 1);
        assert_eq!(decoded.skipped[1].line, 5);
    }

    #[test]
    fn test_blank_lines_are_ignored() {
        let text = "\n\n{\"role\":\"system\",\"content\":\"s\",\"timestamp\":\"2024-01-01T00:00:00.000Z\"}\n   \n";
        let decoded = decode_lines(text);
        assert_eq!(decoded.messages.len(), 1);
        assert_eq!(decoded.messages[0].role, MessageRole::System);
        assert!(decoded.skipped.is_empty());
    }

    #[test]
    fn test_empty_conversation_encodes_empty() {
        let text = encode_lines(&Conversation::default()).unwrap();
        assert!(text.is_empty());
    }
}
