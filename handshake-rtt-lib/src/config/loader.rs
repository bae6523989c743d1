use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::error::{Result, RttError};

pub fn load_from_path<P: AsRef<Path>>(p: P) -> Result<Config> {
    let txt = fs::read_to_string(p)
        .map_err(|e| RttError::Config(format!("Failed to read config file: {e}")))?;
    load_from_str(&txt)
}

pub fn load_from_str(txt: &str) -> Result<Config> {
    let cfg: Config = toml::from_str(txt)
        .map_err(|e| RttError::Config(format!("Failed to parse config: {e}")))?;

    validate(&cfg)?;

    Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
    if cfg.capture.interface.trim().is_empty() {
        return Err(RttError::Config("capture.interface cannot be empty".into()));
    }
    if cfg.capture.snaplen < 64 {
        return Err(RttError::Config(format!(
            "capture.snaplen must be >= 64, got {}",
            cfg.capture.snaplen
        )));
    }
    if cfg.capture.channel_capacity == 0 {
        return Err(RttError::Config("capture.channel_capacity must be > 0".into()));
    }
    if cfg.correlation.expiry_secs == 0 {
        return Err(RttError::Config("correlation.expiry_secs must be > 0".into()));
    }
    if cfg.export.prefix.is_empty() {
        return Err(RttError::Config("export.prefix cannot be empty".into()));
    }
    Ok(())
}
