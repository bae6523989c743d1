mod capture;
mod correlation;
mod export;
mod loader;
mod root;
mod telemetry;

pub use capture::CaptureConfig;
pub use correlation::CorrelationConfig;
pub use export::ExportConfig;
pub use loader::{load_from_path, load_from_str, validate};
pub use root::Config;
pub use telemetry::{LoggingConfig, TelemetryConfig};
