//! TCP handshake correlation.
//!
//! Packets flow through [`CorrelationEngine::process`]: each one is mapped to a
//! direction-independent [`FourTuple`], attributed to that connection's
//! [`HandshakeState`] inside the [`ConnectionTable`], and classified as SYN,
//! SYN/ACK, ACK or noise. Once all three segments are present and correlate
//! by sequence number, one RTT sample is recorded and the state is retired.

pub mod classify;
mod clock;
mod engine;
mod handshake;
mod table;
mod tuple;

pub use clock::{Clock, SystemClock};
pub use engine::{CorrelationEngine, Progress};
pub use handshake::{HandshakeState, Vantage};
pub use table::{ConnectionTable, ConnectionsMut, DEFAULT_EXPIRY};
pub use tuple::{extract_tuple, FourTuple};
