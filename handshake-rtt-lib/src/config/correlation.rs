use serde::Deserialize;
use std::time::Duration;

use crate::correlation::{Vantage, DEFAULT_EXPIRY};

/// Correlation configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CorrelationConfig {
    /// This host initiates the measured handshakes
    /// When true: RTT = SYN/ACK received - SYN sent
    /// When false: RTT = ACK received - SYN/ACK sent
    /// Default: false
    #[serde(default)]
    pub client_side: bool,
    /// Seconds without any packet after which an incomplete handshake is pruned
    /// Default: 30
    #[serde(default = "default_expiry_secs")]
    pub expiry_secs: u64,
}

impl CorrelationConfig {
    pub fn vantage(&self) -> Vantage {
        Vantage::from_client_side(self.client_side)
    }

    pub fn expiry(&self) -> Duration {
        Duration::from_secs(self.expiry_secs)
    }
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self { client_side: false, expiry_secs: default_expiry_secs() }
    }
}

fn default_expiry_secs() -> u64 {
    DEFAULT_EXPIRY.as_secs()
}
