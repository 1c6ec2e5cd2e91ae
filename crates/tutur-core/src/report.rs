//! ErrorReporter trait: the sink for recoverable failures.
//!
//! Every failure that is swallowed rather than propagated (a failed persist,
//! a backend error, an undeliverable reply) goes through a reporter so it
//! leaves a trace. Reporting is best-effort: implementations must never
//! panic or surface their own failures to the caller.

use std::fmt;

/// Severity attached to a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warn => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Error payload accepted by [`ErrorReporter::report`].
pub type ReportedError<'a> = &'a (dyn std::error::Error + Send + Sync + 'static);

/// Append-only, best-effort failure reporting.
///
/// Implementations live in tutur-infra (e.g., `FileErrorReporter`).
pub trait ErrorReporter: Send + Sync {
    fn report(
        &self,
        message: &str,
        error: Option<ReportedError<'_>>,
        severity: Severity,
    ) -> impl std::future::Future<Output = ()> + Send;
}

/// Emit a report as a `tracing` event at the matching level.
pub fn emit(message: &str, error: Option<ReportedError<'_>>, severity: Severity) {
    match (severity, error) {
        (Severity::Info, _) => tracing::info!("{message}"),
        (Severity::Warn, Some(err)) => tracing::warn!(error = %err, "{message}"),
        (Severity::Warn, None) => tracing::warn!("{message}"),
        (Severity::Error, Some(err)) => tracing::error!(error = %err, "{message}"),
        (Severity::Error, None) => tracing::error!("{message}"),
    }
}
