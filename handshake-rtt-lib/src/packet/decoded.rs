use std::time::SystemTime;

use super::{NetworkLayer, PacketView, TcpView};

/// Owned, already-decoded packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPacket {
    pub timestamp: SystemTime,
    pub network: NetworkLayer,
    pub tcp: Option<TcpView>,
}

impl DecodedPacket {
    pub fn new(timestamp: SystemTime, network: NetworkLayer, tcp: Option<TcpView>) -> Self {
        Self { timestamp, network, tcp }
    }
}

impl PacketView for DecodedPacket {
    fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    fn network(&self) -> NetworkLayer {
        self.network
    }

    fn tcp(&self) -> Option<TcpView> {
        self.tcp
    }
}
