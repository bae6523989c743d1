//! RTT sample export.
//!
//! The format is a single `us` header line followed by one sample per line,
//! in whole microseconds.

use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use crate::config::ExportConfig;
use crate::error::{Result, RttError};

pub const HEADER: &str = "us";

pub fn write_samples<W: Write>(writer: W, samples: &[Duration]) -> std::io::Result<()> {
    let mut out = BufWriter::new(writer);
    writeln!(out, "{HEADER}")?;
    for rtt in samples {
        writeln!(out, "{}", rtt.as_micros())?;
    }
    out.flush()
}

/// Write `samples` to a fresh, uniquely named file and return its path.
pub fn export_samples(config: &ExportConfig, samples: &[Duration]) -> Result<PathBuf> {
    let file = tempfile::Builder::new()
        .prefix(&config.prefix)
        .tempfile_in(&config.directory)
        .map_err(|e| {
            RttError::Export(format!(
                "Failed to create sample file in {}: {e}",
                config.directory.display()
            ))
        })?;
    let (file, path) = file
        .keep()
        .map_err(|e| RttError::Export(format!("Failed to persist sample file: {e}")))?;

    write_samples(file, samples)?;

    info!(count = samples.len(), path = %path.display(), "wrote RTT samples");
    Ok(path)
}
