use std::time::Duration;

use thiserror::Error;

/// Errors that can occur outside the per-packet path
#[derive(Error, Debug)]
pub enum RttError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Telemetry error: {0}")]
    Telemetry(String),

    #[error("Export error: {0}")]
    Export(String),
}

pub type Result<T> = std::result::Result<T, RttError>;

/// Why a packet could not be mapped to a four-tuple.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TupleError {
    #[error("not an IPv4 or IPv6 packet")]
    NotIp,

    #[error("IP packet does not carry a TCP segment")]
    NotTcp,
}

/// Per-packet correlation failures.
///
/// None of these are fatal: the offending packet is dropped and the engine
/// keeps consuming.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeError {
    #[error("failed to extract TCP four-tuple: {0}")]
    NoFourTuple(#[source] TupleError),

    #[error("got SYN/ACK for non-existing SYN")]
    NoSyn,

    #[error("got ACK for non-existing SYN/ACK")]
    NoSynAck,

    #[error("ignoring segment that is not part of the tracked handshake")]
    NonHandshakeAck,

    #[error("TCP handshake incomplete")]
    HandshakeIncomplete,

    /// The later segment was captured before the earlier one.
    #[error("handshake timestamps run backwards by {0:?}")]
    NegativeRtt(Duration),
}

impl HandshakeError {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            HandshakeError::NoFourTuple(TupleError::NotIp) => "not_ip",
            HandshakeError::NoFourTuple(TupleError::NotTcp) => "not_tcp",
            HandshakeError::NoSyn => "no_syn",
            HandshakeError::NoSynAck => "no_syn_ack",
            HandshakeError::NonHandshakeAck => "non_handshake_ack",
            HandshakeError::HandshakeIncomplete => "handshake_incomplete",
            HandshakeError::NegativeRtt(_) => "negative_rtt",
        }
    }
}

impl From<TupleError> for HandshakeError {
    fn from(err: TupleError) -> Self {
        HandshakeError::NoFourTuple(err)
    }
}
