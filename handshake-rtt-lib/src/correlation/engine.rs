use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::classify::{is_ack, is_syn, is_syn_ack, share_handshake};
use super::clock::{Clock, SystemClock};
use super::handshake::Vantage;
use super::table::ConnectionTable;
use super::tuple::extract_tuple;
use crate::error::HandshakeError;
use crate::packet::PacketView;
use crate::telemetry::Metrics;

/// What a successfully processed packet did to its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Attributed to a connection (heartbeat) but not a handshake segment.
    Ignored,
    Syn,
    SynAck,
    /// Final ACK accepted; the sample was recorded and the state retired.
    Completed(Duration),
}

/// Drives handshake correlation for one sequential packet source.
///
/// `process` must be called from a single consumer in capture order. Other
/// threads may read samples and table size from the shared
/// [`ConnectionTable`] at any time.
pub struct CorrelationEngine<P> {
    table: Arc<ConnectionTable<P>>,
    vantage: Vantage,
    clock: Arc<dyn Clock>,
    metrics: Option<Arc<Metrics>>,
}

impl<P: PacketView> CorrelationEngine<P> {
    pub fn new(table: Arc<ConnectionTable<P>>, vantage: Vantage) -> Self {
        Self { table, vantage, clock: Arc::new(SystemClock), metrics: None }
    }

    /// Replace the clock used for pruning.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn table(&self) -> &Arc<ConnectionTable<P>> {
        &self.table
    }

    pub fn vantage(&self) -> Vantage {
        self.vantage
    }

    /// Correlate one captured packet.
    ///
    /// Errors describe why the packet was dropped; none of them leave the
    /// table inconsistent and the caller should keep consuming.
    pub fn process(&self, packet: P) -> Result<Progress, HandshakeError> {
        if let Some(m) = &self.metrics {
            m.record_packet();
        }

        let result = self.correlate(packet);

        if let Some(m) = &self.metrics {
            match &result {
                Ok(Progress::Completed(rtt)) => m.record_handshake(*rtt),
                Ok(_) => {}
                Err(err) => m.record_packet_error(err.kind()),
            }
            m.record_connections_tracked(self.table.len());
        }
        result
    }

    fn correlate(&self, packet: P) -> Result<Progress, HandshakeError> {
        let pruned = self.table.prune(self.clock.now());
        if pruned > 0 {
            info!(pruned, remaining = self.table.len(), "pruned expired connections");
            if let Some(m) = &self.metrics {
                m.record_pruned(pruned);
            }
        }

        let tuple = extract_tuple(&packet)?;
        let seen = packet.timestamp();

        let mut connections = self.table.write();
        let state = connections.state_for(&tuple, seen)?;
        state.heartbeat(seen);

        let progress = if is_syn(&packet) {
            if state.syn.is_some() {
                debug!(tuple = %tuple, "replacing retransmitted SYN");
            } else {
                debug!(tuple = %tuple, "adding SYN segment");
            }
            state.syn = Some(packet);
            Some(Progress::Syn)
        } else if is_syn_ack(&packet) {
            let syn = state.syn.as_ref().ok_or(HandshakeError::NoSyn)?;
            if !share_handshake(syn, &packet) {
                return Err(HandshakeError::NonHandshakeAck);
            }
            debug!(tuple = %tuple, "adding SYN/ACK segment");
            state.syn_ack = Some(packet);
            Some(Progress::SynAck)
        } else if is_ack(&packet) {
            let syn_ack = state.syn_ack.as_ref().ok_or(HandshakeError::NoSynAck)?;
            if !share_handshake(syn_ack, &packet) {
                return Err(HandshakeError::NonHandshakeAck);
            }
            debug!(tuple = %tuple, "adding ACK segment");
            state.ack = Some(packet);
            None
        } else {
            return Ok(Progress::Ignored);
        };

        if !state.is_complete() {
            // An accepted ACK always completes the handshake.
            return progress.ok_or(HandshakeError::HandshakeIncomplete);
        }

        match state.rtt(self.vantage) {
            Ok(rtt) => {
                debug!(tuple = %tuple, rtt_us = rtt.as_micros(), "handshake complete");
                connections.retire(&tuple, rtt);
                Ok(Progress::Completed(rtt))
            }
            Err(err @ HandshakeError::NegativeRtt(by)) => {
                warn!(
                    tuple = %tuple,
                    behind_us = by.as_micros(),
                    "handshake timestamps out of order; discarding sample"
                );
                if let Some(m) = &self.metrics {
                    m.record_rtt_anomaly();
                }
                connections.remove(&tuple);
                Err(err)
            }
            Err(err) => {
                error!(tuple = %tuple, %err, "failed to determine RTT of completed handshake");
                Err(err)
            }
        }
    }
}
