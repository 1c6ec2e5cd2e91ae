//! CLI command definitions for the `tutur` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod chat;
pub mod history;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Answer chat messages with an LLM, keeping one conversation per user.
#[derive(Parser)]
#[command(name = "tutur", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Data directory (defaults to $TUTUR_DATA_DIR, then ~/.tutur).
    #[arg(long, global = true, env = "TUTUR_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Explicit config file; unlike {data_dir}/config.toml it must exist and parse.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the webhook server that receives inbound messages.
    Serve {
        /// Port to listen on (overrides [server].port).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides [server].host).
        #[arg(long)]
        host: Option<String>,
    },

    /// Chat from the terminal as a given user.
    Chat {
        /// User id the conversation is stored under.
        #[arg(short, long, default_value = "console")]
        user: String,
    },

    /// Print the stored conversation of a user.
    History {
        /// User id (transport address).
        user: String,
    },

    /// List stored conversations.
    #[command(alias = "ls")]
    Sessions,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

/// Tracing filter selected by the verbosity flags.
pub fn log_filter(verbose: u8, quiet: bool) -> &'static str {
    match verbose {
        0 if quiet => "error",
        0 => "warn",
        1 => "info,tutur=debug",
        _ => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_overrides_are_optional() {
        let cli = Cli::try_parse_from(["tutur", "serve"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Serve {
                port: None,
                host: None
            }
        ));

        let cli = Cli::try_parse_from(["tutur", "serve", "-p", "9000", "--host", "0.0.0.0"]).unwrap();
        match cli.command {
            Commands::Serve { port, host } => {
                assert_eq!(port, Some(9000));
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["tutur", "history", "62811@c.us", "--json", "-vv"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::History { user } if user == "62811@c.us"));
    }

    #[test]
    fn test_chat_user_defaults_to_console() {
        let cli = Cli::try_parse_from(["tutur", "chat"]).unwrap();
        assert!(matches!(cli.command, Commands::Chat { user } if user == "console"));
    }

    #[test]
    fn test_log_filter() {
        assert_eq!(log_filter(0, true), "error");
        assert_eq!(log_filter(0, false), "warn");
        assert!(log_filter(1, false).starts_with("info"));
        assert_eq!(log_filter(3, true), "trace");
    }
}
