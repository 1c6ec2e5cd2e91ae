//! tutur CLI and webhook server entry point.

mod cli;
mod http;
mod state;

use clap::{CommandFactory, Parser};
use console::style;

use tutur_observe::{LogFormat, init_tracing, shutdown_tracing};

use cli::{Cli, Commands};
use state::{AppState, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = cli::log_filter(cli.verbose, cli.quiet);
    let format = if cli.json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    if let Err(e) = init_tracing(filter, format, cli.otel) {
        eprintln!("Warning: failed to initialize tracing: {e}");
    }

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Cli {
        command,
        json,
        quiet,
        data_dir,
        config,
        ..
    } = cli;
    let load_settings = || Settings::load(data_dir.clone(), config.as_deref());

    match command {
        Commands::Serve { port, host } => {
            let settings = load_settings().await?;
            let host = host.unwrap_or_else(|| settings.config.server.host.clone());
            let port = port.unwrap_or(settings.config.server.port);
            let state = AppState::init(settings).await?;
            serve(state, &host, port, quiet).await?;
        }

        Commands::Chat { user } => {
            let state = AppState::init(load_settings().await?).await?;
            cli::chat::run_chat(&state, &user).await?;
        }

        Commands::History { user } => {
            cli::history::show_history(&load_settings().await?, &user, json).await?;
        }

        Commands::Sessions => {
            cli::history::list_sessions(&load_settings().await?, json).await?;
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "tutur", &mut std::io::stdout());
        }
    }

    Ok(())
}

async fn serve(state: AppState, host: &str, port: u16, quiet: bool) -> anyhow::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => return Err(state.fatal(&format!("failed to bind {addr}"), e).await),
    };

    if !quiet {
        println!();
        println!(
            "  {} tutur listening on {}",
            style("▶").green().bold(),
            style(format!("http://{addr}")).cyan().underlined()
        );
        println!(
            "  {} POST /v1/messages, GET /health",
            style("i").blue().bold()
        );
        println!(
            "  {} conversations in {}",
            style("i").blue().bold(),
            style(state.settings.conversations_dir().display()).dim()
        );
        println!();
    }
    tracing::info!(%addr, "webhook server started");

    let router = http::router::build_router(state.clone());
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.shutdown().await;
    if !quiet {
        println!("  Server stopped");
    }
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
