//! Application state wiring all services together.
//!
//! `Settings` is the cheap part (data dir + parsed config) used by every
//! command. `AppState` adds the turn controller and dispatcher, pinned to the
//! concrete infra implementations, and is only built by commands that answer
//! messages.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tutur_core::chat::assembler::TurnAssembler;
use tutur_core::chat::controller::TurnController;
use tutur_core::llm::box_provider::BoxLlmProvider;
use tutur_core::report::{ErrorReporter, Severity};
use tutur_core::transport::InboundDispatcher;
use tutur_infra::config::{
    load_config_file, load_global_config, resolve_api_key, resolve_path, resolve_system_prompt,
};
use tutur_infra::filesystem::resolve_data_dir;
use tutur_infra::llm::create_provider;
use tutur_infra::report::FileErrorReporter;
use tutur_infra::session_log::JsonlSessionLog;
use tutur_types::config::GlobalConfig;

/// Concrete type aliases for the core generics pinned to infra implementations.
pub type ConcreteController = TurnController<JsonlSessionLog, FileErrorReporter>;
pub type ConcreteDispatcher = InboundDispatcher<JsonlSessionLog, FileErrorReporter>;

/// Data directory and configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub config: GlobalConfig,
}

impl Settings {
    /// Resolve the data directory and load the configuration.
    ///
    /// An explicit `config_path` must exist and parse; the implicit
    /// `{data_dir}/config.toml` falls back to defaults.
    pub async fn load(data_dir: Option<PathBuf>, config_path: Option<&Path>) -> anyhow::Result<Self> {
        let data_dir = data_dir.unwrap_or_else(resolve_data_dir);
        let config = match config_path {
            Some(path) => load_config_file(path).await?,
            None => load_global_config(&data_dir).await,
        };
        tracing::debug!(data_dir = %data_dir.display(), "settings loaded");
        Ok(Self { data_dir, config })
    }

    pub fn conversations_dir(&self) -> PathBuf {
        resolve_path(&self.data_dir, &self.config.conversations_dir)
    }

    pub fn error_log(&self) -> PathBuf {
        resolve_path(&self.data_dir, &self.config.error_log)
    }

    pub fn session_log(&self) -> JsonlSessionLog {
        JsonlSessionLog::new(self.conversations_dir())
    }
}

/// Shared application state used by the webhook server and the console chat.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub dispatcher: ConcreteDispatcher,
}

impl AppState {
    /// Build the session store, the model backend, and the dispatcher.
    ///
    /// Any failure here is fatal: it is written to the error log and returned.
    pub async fn init(settings: Settings) -> anyhow::Result<Self> {
        let reporter = Arc::new(FileErrorReporter::new(settings.error_log()));

        let log = settings.session_log();
        if let Err(e) = log.ensure_dir().await {
            return Err(fatal(&reporter, "failed to create the conversations directory", e).await);
        }

        let system_prompt = match resolve_system_prompt(&settings.config, &settings.data_dir).await {
            Ok(prompt) => prompt,
            Err(e) => return Err(fatal(&reporter, "failed to resolve the system prompt", e).await),
        };

        let provider_config = &settings.config.provider;
        let api_key = match resolve_api_key(&settings.config) {
            Ok(key) => key,
            Err(e) => return Err(fatal(&reporter, "failed to read the API key", e).await),
        };
        let provider = match create_provider(provider_config, api_key) {
            Ok(provider) => provider,
            Err(e) => return Err(fatal(&reporter, "failed to build the model backend client", e).await),
        };
        tracing::info!(
            provider = provider.name(),
            model = %provider_config.model,
            "model backend ready"
        );

        let assembler = TurnAssembler {
            max_history_messages: settings.config.max_history_messages,
            system_prompt: Arc::from(system_prompt),
            model: provider_config.model.clone(),
            max_tokens: provider_config.max_tokens,
            temperature: provider_config.temperature,
        };
        let backend_timeout = Duration::from_secs(provider_config.timeout_secs);

        Ok(Self::from_parts(
            settings,
            Arc::new(log),
            reporter,
            provider,
            assembler,
            backend_timeout,
        ))
    }

    /// Assemble the state from already-built parts.
    pub fn from_parts(
        settings: Settings,
        log: Arc<JsonlSessionLog>,
        reporter: Arc<FileErrorReporter>,
        provider: BoxLlmProvider,
        assembler: TurnAssembler,
        backend_timeout: Duration,
    ) -> Self {
        let replies = settings.config.replies.clone();
        let controller = TurnController::new(
            log,
            reporter,
            Arc::new(provider),
            assembler,
            replies,
            backend_timeout,
        );
        Self {
            settings: Arc::new(settings),
            dispatcher: InboundDispatcher::new(Arc::new(controller)),
        }
    }

    pub fn controller(&self) -> &Arc<ConcreteController> {
        self.dispatcher.controller()
    }

    /// Report a fatal error and turn it into the process exit error.
    pub async fn fatal<E>(&self, message: &str, error: E) -> anyhow::Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        fatal(self.controller().reporter(), message, error).await
    }

    /// Wait for background persist tasks before exiting.
    pub async fn shutdown(&self) {
        let pending = self.controller().pending_writes();
        if pending > 0 {
            tracing::info!(pending, "waiting for pending session writes");
        }
        self.controller().flush_pending_writes().await;
    }
}

async fn fatal<E>(reporter: &FileErrorReporter, message: &str, error: E) -> anyhow::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    reporter.report(message, Some(&error), Severity::Error).await;
    anyhow::Error::new(error).context(message.to_string())
}
