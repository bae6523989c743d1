//! Shared fixtures for correlation tests

#![allow(dead_code)]

use handshake_rtt_lib::{
    Clock, ConnectionTable, CorrelationEngine, DecodedPacket, NetworkLayer, TcpFlags, TcpView,
    Vantage,
};
use prometheus::{Encoder, Registry, TextEncoder};
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub type TestResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

pub const CLIENT: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 10);
pub const SERVER: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
pub const CLIENT_PORT: u16 = 50123;
pub const SERVER_PORT: u16 = 443;

/// Fixed capture epoch so timestamps are deterministic
pub fn base() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(1_700_000_000)
}

/// `ms` milliseconds after [`base`]
pub fn at(ms: u64) -> SystemTime {
    base() + Duration::from_millis(ms)
}

#[allow(clippy::too_many_arguments)]
pub fn tcp_v4(
    timestamp: SystemTime,
    src: Ipv4Addr,
    src_port: u16,
    dst: Ipv4Addr,
    dst_port: u16,
    seq: u32,
    ack: u32,
    flags: TcpFlags,
) -> DecodedPacket {
    DecodedPacket::new(
        timestamp,
        NetworkLayer::Ipv4 { src, dst, protocol: 6 },
        Some(TcpView { src_port, dst_port, seq, ack, flags }),
    )
}

pub fn client_syn(ms: u64, seq: u32) -> DecodedPacket {
    tcp_v4(at(ms), CLIENT, CLIENT_PORT, SERVER, SERVER_PORT, seq, 0, TcpFlags::SYN)
}

pub fn server_syn_ack(ms: u64, seq: u32, ack: u32) -> DecodedPacket {
    tcp_v4(at(ms), SERVER, SERVER_PORT, CLIENT, CLIENT_PORT, seq, ack, TcpFlags::SYN | TcpFlags::ACK)
}

pub fn client_ack(ms: u64, seq: u32, ack: u32) -> DecodedPacket {
    tcp_v4(at(ms), CLIENT, CLIENT_PORT, SERVER, SERVER_PORT, seq, ack, TcpFlags::ACK)
}

pub fn client_data(ms: u64, seq: u32, ack: u32) -> DecodedPacket {
    tcp_v4(at(ms), CLIENT, CLIENT_PORT, SERVER, SERVER_PORT, seq, ack, TcpFlags::ACK | TcpFlags::PSH)
}

/// Full handshake with ISNs 1000 (client) and 5000 (server): SYN at t0,
/// SYN/ACK at t1, ACK at t2 (milliseconds)
pub fn handshake(t0: u64, t1: u64, t2: u64) -> [DecodedPacket; 3] {
    [client_syn(t0, 1000), server_syn_ack(t1, 5000, 1001), client_ack(t2, 1001, 5001)]
}

/// Test clock that only moves when told to
pub struct ManualClock(Mutex<SystemTime>);

impl ManualClock {
    pub fn new(now: SystemTime) -> Self {
        Self(Mutex::new(now))
    }

    pub fn set(&self, now: SystemTime) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct Harness {
    pub engine: CorrelationEngine<DecodedPacket>,
    pub table: Arc<ConnectionTable<DecodedPacket>>,
    pub clock: Arc<ManualClock>,
}

/// Engine with a manual clock parked at [`base`]
pub fn harness(vantage: Vantage) -> Harness {
    let table = Arc::new(ConnectionTable::default());
    let clock = Arc::new(ManualClock::new(base()));
    let engine = CorrelationEngine::new(table.clone(), vantage).with_clock(clock.clone());
    Harness { engine, table, clock }
}

/// Prometheus text exposition of `registry`
pub fn scrape(registry: &Registry) -> String {
    let mut buf = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&registry.gather(), &mut buf) {
        panic!("failed to encode metrics: {e}");
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Value of the first sample named `name` whose labels contain `label`
pub fn sample_value(text: &str, name: &str, label: &str) -> Option<f64> {
    text.lines()
        .filter(|line| !line.starts_with('#'))
        .filter(|line| {
            line.strip_prefix(name)
                .is_some_and(|rest| rest.starts_with('{') || rest.starts_with(' '))
        })
        .find(|line| line.contains(label))
        .and_then(|line| line.rsplit(' ').next())
        .and_then(|value| value.parse().ok())
}
