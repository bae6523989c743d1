use serde::Deserialize;

use super::capture::CaptureConfig;
use super::correlation::CorrelationConfig;
use super::export::ExportConfig;
use super::telemetry::{LoggingConfig, TelemetryConfig};

/// Main configuration structure
/// Every section is optional; an empty file yields the defaults
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// Where and what to sniff
    #[serde(default)]
    pub capture: CaptureConfig,
    /// Handshake correlation settings
    #[serde(default)]
    pub correlation: CorrelationConfig,
    /// Where RTT samples are written on shutdown
    #[serde(default)]
    pub export: ExportConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Telemetry configuration
    /// Controls the metrics server and OpenTelemetry log level
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}
