use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::error::{Result, RttError};

/// Install the global subscriber: `log_level` for this crate's events,
/// `otel_log_level` for the metrics SDK's own diagnostics.
///
/// `RUST_LOG`, when set, replaces both.
pub fn init_tracing(log_level: &str, show_target: bool, otel_log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("{log_level},opentelemetry={otel_log_level}")))
        .map_err(|e| RttError::Telemetry(format!("Invalid log level {log_level:?}: {e}")))?;

    let subscriber = Registry::default()
        .with(filter)
        .with(fmt::layer().with_target(show_target));

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| RttError::Telemetry(format!("Failed to install tracing subscriber: {e}")))
}
