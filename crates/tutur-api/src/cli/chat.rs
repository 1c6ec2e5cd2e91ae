//! Console transport: chat with the assistant from a terminal.
//!
//! Each line read from stdin becomes an inbound message from `user`; replies
//! go back to stdout through the same dispatcher the webhook server uses.

use anyhow::Result;
use console::{Term, style};
use tokio::io::{AsyncBufReadExt, BufReader};

use tutur_core::transport::{InboundMessage, ReplyChannel};
use tutur_types::error::TransportError;

use crate::state::AppState;

/// Reply channel writing to the terminal.
pub struct ConsoleChannel {
    term: Term,
}

fn send_error(e: std::io::Error) -> TransportError {
    TransportError::Send(e.to_string())
}

impl ReplyChannel for ConsoleChannel {
    async fn start_typing(&self, _chat_id: &str) -> Result<(), TransportError> {
        if !self.term.is_term() {
            return Ok(());
        }
        self.term
            .write_str(&format!("  {}", style("typing...").dim().italic()))
            .map_err(send_error)
    }

    async fn clear_typing(&self, _chat_id: &str) -> Result<(), TransportError> {
        if !self.term.is_term() {
            return Ok(());
        }
        self.term.clear_line().map_err(send_error)
    }

    async fn reply(&self, _chat_id: &str, text: &str) -> Result<(), TransportError> {
        self.term
            .write_line(&format!("{} {}", style("bot>").cyan().bold(), text))
            .map_err(send_error)?;
        self.term.write_line("").map_err(send_error)
    }
}

/// Run the interactive loop until EOF or `/quit`.
pub async fn run_chat(state: &AppState, user_id: &str) -> Result<()> {
    let channel = ConsoleChannel {
        term: Term::stdout(),
    };

    println!();
    println!(
        "  Chatting as '{}'. Type {} or press Ctrl+D to leave.",
        style(user_id).cyan().bold(),
        style("/quit").yellow()
    );
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if channel.term.is_term() {
            channel.term.write_str(&format!("{} ", style("you>").green().bold()))?;
        }

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if is_quit(&line) {
            break;
        }

        let message = InboundMessage::direct(user_id, line);
        let outcome = state.dispatcher.dispatch(&channel, &message).await;
        tracing::debug!(?outcome, "console turn finished");
    }

    state.shutdown().await;
    println!();
    println!("  {}", style("Bye.").dim());
    Ok(())
}

fn is_quit(line: &str) -> bool {
    matches!(line.trim(), "/quit" | "/exit")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_quit() {
        assert!(is_quit("/quit"));
        assert!(is_quit("  /exit \n"));
        assert!(!is_quit("quit"));
        assert!(!is_quit("/quit now"));
    }
}
