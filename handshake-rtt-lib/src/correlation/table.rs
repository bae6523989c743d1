use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, SystemTime};

use ahash::AHashMap;
use tracing::{debug, warn};

use super::handshake::HandshakeState;
use super::tuple::FourTuple;
use crate::error::HandshakeError;
use crate::packet::PacketView;

/// A connection with no attributable packet for this long is pruned.
pub const DEFAULT_EXPIRY: Duration = Duration::from_secs(30);

/// Concurrent store of in-flight handshakes and completed RTT samples.
///
/// Every key denotes an incomplete handshake: the engine records the sample
/// and retires the state under the same exclusive lock that completed it.
///
/// Lock order is connections, then samples. Sample readers only ever take
/// the samples lock, so exporting never stalls on the connection map.
pub struct ConnectionTable<P> {
    connections: RwLock<AHashMap<FourTuple, HandshakeState<P>>>,
    samples: RwLock<Vec<Duration>>,
    expiry: Duration,
}

impl<P: PacketView> Default for ConnectionTable<P> {
    fn default() -> Self {
        Self::new(DEFAULT_EXPIRY)
    }
}

impl<P: PacketView> ConnectionTable<P> {
    pub fn new(expiry: Duration) -> Self {
        Self {
            connections: RwLock::new(AHashMap::new()),
            samples: RwLock::new(Vec::new()),
            expiry,
        }
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    /// Delete every connection idle for longer than the expiry window.
    ///
    /// Returns the number of connections deleted.
    pub fn prune(&self, now: SystemTime) -> usize {
        let mut connections = write_lock(&self.connections);
        let before = connections.len();
        connections.retain(|_, state| !state.is_expired(now, self.expiry));
        before - connections.len()
    }

    /// Exclusive access to the connection map for a multi-step update.
    pub fn write(&self) -> ConnectionsMut<'_, P> {
        ConnectionsMut { guard: write_lock(&self.connections), table: self }
    }

    /// Delete the state for `tuple`. Deleting an absent key is a no-op.
    pub fn remove(&self, tuple: &FourTuple) {
        write_lock(&self.connections).remove(tuple);
    }

    pub fn contains(&self, tuple: &FourTuple) -> bool {
        read_lock(&self.connections).contains_key(tuple)
    }

    /// Number of handshakes currently tracked.
    pub fn len(&self) -> usize {
        read_lock(&self.connections).len()
    }

    pub fn is_empty(&self) -> bool {
        read_lock(&self.connections).is_empty()
    }

    /// Append a completed RTT sample.
    pub fn record_sample(&self, rtt: Duration) {
        write_lock(&self.samples).push(rtt);
    }

    /// Point-in-time copy of the recorded samples.
    pub fn samples(&self) -> Vec<Duration> {
        read_lock(&self.samples).clone()
    }

    pub fn sample_count(&self) -> usize {
        read_lock(&self.samples).len()
    }

    /// Take every recorded sample, leaving the list empty.
    pub fn drain_samples(&self) -> Vec<Duration> {
        std::mem::take(&mut *write_lock(&self.samples))
    }
}

impl<P: PacketView + Clone> ConnectionTable<P> {
    /// Cloned snapshot of the state for `tuple`, if tracked.
    pub fn get(&self, tuple: &FourTuple) -> Option<HandshakeState<P>> {
        read_lock(&self.connections).get(tuple).cloned()
    }
}

/// Write guard over the connection map.
///
/// Holding it serializes lookup, mutation, sample recording and retirement of
/// a handshake into one step.
pub struct ConnectionsMut<'a, P> {
    guard: RwLockWriteGuard<'a, AHashMap<FourTuple, HandshakeState<P>>>,
    table: &'a ConnectionTable<P>,
}

impl<P: PacketView> ConnectionsMut<'_, P> {
    /// Look up the state for `tuple`, creating it with `last_seen = seen` if absent.
    ///
    /// Fails with [`HandshakeError::NonHandshakeAck`] if the state is already
    /// complete and awaiting retirement.
    pub fn state_for(
        &mut self,
        tuple: &FourTuple,
        seen: SystemTime,
    ) -> Result<&mut HandshakeState<P>, HandshakeError> {
        let state = self.guard.entry(*tuple).or_insert_with(|| {
            debug!(tuple = %tuple, "creating new connection state");
            HandshakeState::new(seen)
        });
        if state.is_complete() {
            return Err(HandshakeError::NonHandshakeAck);
        }
        Ok(state)
    }

    /// Record `rtt` and delete the state for `tuple`.
    pub fn retire(&mut self, tuple: &FourTuple, rtt: Duration) {
        self.table.record_sample(rtt);
        self.guard.remove(tuple);
    }

    /// Delete the state for `tuple` without recording a sample.
    pub fn remove(&mut self, tuple: &FourTuple) {
        self.guard.remove(tuple);
    }

    pub fn len(&self) -> usize {
        self.guard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard.is_empty()
    }
}

// The guarded data is plain in-memory state; a panic elsewhere leaves it usable.
fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| {
        warn!("connection table lock poisoned, recovering");
        PoisonError::into_inner(poisoned)
    })
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| {
        warn!("connection table lock poisoned, recovering");
        PoisonError::into_inner(poisoned)
    })
}
