use std::time::{Duration, SystemTime};

use crate::error::HandshakeError;
use crate::packet::PacketView;

/// Which end of the handshake the observing host sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Vantage {
    /// Initiator: RTT spans our SYN and the peer's SYN/ACK.
    Client,
    /// Responder: RTT spans our SYN/ACK and the peer's final ACK.
    #[default]
    Server,
}

impl Vantage {
    pub fn from_client_side(client_side: bool) -> Self {
        if client_side {
            Vantage::Client
        } else {
            Vantage::Server
        }
    }
}

/// Segments of one TCP three-way handshake observed so far.
#[derive(Debug, Clone)]
pub struct HandshakeState<P> {
    pub(crate) syn: Option<P>,
    pub(crate) syn_ack: Option<P>,
    pub(crate) ack: Option<P>,
    last_seen: SystemTime,
}

impl<P: PacketView> HandshakeState<P> {
    pub fn new(last_seen: SystemTime) -> Self {
        Self { syn: None, syn_ack: None, ack: None, last_seen }
    }

    pub fn syn(&self) -> Option<&P> {
        self.syn.as_ref()
    }

    pub fn syn_ack(&self) -> Option<&P> {
        self.syn_ack.as_ref()
    }

    pub fn ack(&self) -> Option<&P> {
        self.ack.as_ref()
    }

    /// Timestamp of the latest packet attributed to this connection.
    pub fn last_seen(&self) -> SystemTime {
        self.last_seen
    }

    /// All three segments are present.
    pub fn is_complete(&self) -> bool {
        self.syn.is_some() && self.syn_ack.is_some() && self.ack.is_some()
    }

    /// Reset the expiry clock. Never moves `last_seen` backwards.
    pub fn heartbeat(&mut self, timestamp: SystemTime) {
        if timestamp > self.last_seen {
            self.last_seen = timestamp;
        }
    }

    /// True if nothing was attributed to this connection for longer than `expiry`.
    pub fn is_expired(&self, now: SystemTime, expiry: Duration) -> bool {
        // A last_seen in the future (clock skew) never expires.
        now.duration_since(self.last_seen)
            .map(|idle| idle > expiry)
            .unwrap_or(false)
    }

    /// Round trip time as perceived from `vantage`.
    pub fn rtt(&self, vantage: Vantage) -> Result<Duration, HandshakeError> {
        let (Some(syn), Some(syn_ack), Some(ack)) = (&self.syn, &self.syn_ack, &self.ack) else {
            return Err(HandshakeError::HandshakeIncomplete);
        };

        let (t1, t2) = match vantage {
            Vantage::Client => (syn.timestamp(), syn_ack.timestamp()),
            Vantage::Server => (syn_ack.timestamp(), ack.timestamp()),
        };

        t2.duration_since(t1)
            .map_err(|err| HandshakeError::NegativeRtt(err.duration()))
    }
}
