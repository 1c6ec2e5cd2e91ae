//! Read-only inspection of stored conversations: `history` and `sessions`.

use anyhow::Result;
use console::style;

use tutur_core::chat::log::SessionLog;
use tutur_infra::session_log::SessionMeta;
use tutur_types::chat::{ChatMessage, MessageRole};

use crate::state::Settings;

/// Print the stored conversation of `user_id`.
///
/// # Examples
///
/// ```bash
/// tutur history 62811@c.us
/// tutur history 62811@c.us --json
/// ```
pub async fn show_history(settings: &Settings, user_id: &str, json: bool) -> Result<()> {
    let log = settings.session_log();
    let conversation = log.read(user_id).await?;

    if json {
        let messages = conversation.map(|c| c.into_messages()).unwrap_or_default();
        println!("{}", serde_json::to_string_pretty(&messages)?);
        return Ok(());
    }

    let Some(conversation) = conversation else {
        println!();
        println!(
            "  {} No conversation stored for '{}' in {}",
            style("i").blue().bold(),
            style(user_id).cyan(),
            style(log.base_dir().display()).dim()
        );
        println!();
        return Ok(());
    };

    println!();
    println!(
        "  Conversation with '{}' ({} messages)",
        style(user_id).cyan().bold(),
        conversation.len()
    );
    println!();
    for message in conversation.messages() {
        println!("{}", render_message(message));
    }
    println!();
    Ok(())
}

fn render_message(message: &ChatMessage) -> String {
    let time = message.timestamp.format("%Y-%m-%d %H:%M:%S");
    let role = match message.role {
        MessageRole::System => style("system").magenta(),
        MessageRole::User => style("user").green(),
        MessageRole::Assistant => style("assistant").cyan(),
    };
    let content = if message.role == MessageRole::System {
        truncate(&message.content, 80)
    } else {
        message.content.clone()
    };
    format!("  {} {:>9}  {}", style(time).dim(), role.bold(), content)
}

/// List every stored conversation, most recently active first.
pub async fn list_sessions(settings: &Settings, json: bool) -> Result<()> {
    let log = settings.session_log();
    let sessions = log.list().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!();
        println!(
            "  {} No conversations stored yet in {}",
            style("i").blue().bold(),
            style(log.base_dir().display()).dim()
        );
        println!();
        return Ok(());
    }

    println!();
    println!(
        "  {:<32} {:>8} {:>10}  {}",
        style("User").bold(),
        style("Messages").bold(),
        style("Size").bold(),
        style("Last active").bold()
    );
    for session in &sessions {
        println!("{}", render_session(session));
    }
    println!();
    println!(
        "  {} conversation{}",
        style(sessions.len()).bold(),
        if sessions.len() == 1 { "" } else { "s" }
    );
    println!();
    Ok(())
}

fn render_session(session: &SessionMeta) -> String {
    format!(
        "  {:<32} {:>8} {:>10}  {}",
        style(&session.key).cyan(),
        session.message_count,
        format_size(session.file_size),
        style(session.modified.format("%Y-%m-%d %H:%M")).dim()
    )
}

fn format_size(bytes: u64) -> String {
    match bytes {
        b if b < 1024 => format!("{b} B"),
        b if b < 1024 * 1024 => format!("{:.1} KB", b as f64 / 1024.0),
        b => format!("{:.1} MB", b as f64 / (1024.0 * 1024.0)),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    let first_line = text.lines().next().unwrap_or("");
    if first_line.chars().count() > max_chars || text.lines().nth(1).is_some() {
        let cut: String = first_line.chars().take(max_chars).collect();
        format!("{cut}...")
    } else {
        first_line.to_string()
    }
}
