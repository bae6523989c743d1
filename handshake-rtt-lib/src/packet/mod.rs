//! Decoded packet capability consumed by the correlation engine.
//!
//! The engine never touches raw bytes. Anything that can report a capture
//! timestamp, a network layer and (optionally) a TCP view can be correlated:
//! the capture adapter's [`DecodedPacket`], test fixtures, or another back end.

mod decoded;
pub mod frame;
mod tcp;

use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::SystemTime;

pub use decoded::DecodedPacket;
pub use tcp::{TcpFlags, TcpView};

/// IANA protocol number for TCP.
pub const IPPROTO_TCP: u8 = 6;

/// Network layer of a captured packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkLayer {
    Ipv4 { src: Ipv4Addr, dst: Ipv4Addr, protocol: u8 },
    Ipv6 { src: Ipv6Addr, dst: Ipv6Addr, next_header: u8 },
    /// ARP, unknown ethertypes, or no network layer at all.
    Other,
}

impl NetworkLayer {
    /// Next-protocol field of an IP header.
    pub fn next_protocol(&self) -> Option<u8> {
        match self {
            NetworkLayer::Ipv4 { protocol, .. } => Some(*protocol),
            NetworkLayer::Ipv6 { next_header, .. } => Some(*next_header),
            NetworkLayer::Other => None,
        }
    }
}

/// Read-only access to the fields the handshake correlation needs.
pub trait PacketView {
    /// Capture timestamp.
    fn timestamp(&self) -> SystemTime;

    fn network(&self) -> NetworkLayer;

    /// Transport view, present only when the packet carries a TCP segment.
    fn tcp(&self) -> Option<TcpView>;
}

impl<P: PacketView + ?Sized> PacketView for &P {
    fn timestamp(&self) -> SystemTime {
        (**self).timestamp()
    }

    fn network(&self) -> NetworkLayer {
        (**self).network()
    }

    fn tcp(&self) -> Option<TcpView> {
        (**self).tcp()
    }
}
