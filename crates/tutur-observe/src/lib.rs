//! Observability setup for tutur: structured logging with `tracing` and
//! optional OpenTelemetry span export.

pub mod tracing_setup;

pub use tracing_setup::{LogFormat, init_tracing, shutdown_tracing};
