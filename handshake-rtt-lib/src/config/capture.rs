use serde::Deserialize;

/// Capture configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CaptureConfig {
    /// Network interface to monitor
    /// Default: "eth0"
    #[serde(default = "default_interface")]
    pub interface: String,
    /// Port to monitor for TCP handshakes (either direction)
    /// 0 captures handshakes on every port
    /// Default: 443
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum number of bytes read per frame
    /// Handshake segments only need the headers
    /// Default: 1600
    #[serde(default = "default_snaplen")]
    pub snaplen: usize,
    /// Depth of the queue between the capture thread and the correlation consumer
    /// When full, the capture thread blocks rather than dropping packets
    /// Default: 4096
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interface: default_interface(),
            port: default_port(),
            snaplen: default_snaplen(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_interface() -> String {
    "eth0".to_string()
}

fn default_port() -> u16 {
    443
}

fn default_snaplen() -> usize {
    1600
}

fn default_channel_capacity() -> usize {
    4096
}
