//! Ethernet frame decoding for the capture adapter.

use std::time::SystemTime;

use etherparse::{NetSlice, SlicedPacket, TransportSlice};

use super::{DecodedPacket, NetworkLayer, TcpFlags, TcpView};

/// Decode an Ethernet II frame into a [`DecodedPacket`].
///
/// Returns `None` when the frame is truncated or malformed. The IP protocol
/// reported is the one after any IPv6 extension headers. Frames that parse
/// but carry no IP layer come back as [`NetworkLayer::Other`], so the engine
/// can still report them as non-IP.
pub fn decode(frame: &[u8], timestamp: SystemTime) -> Option<DecodedPacket> {
    let sliced = SlicedPacket::from_ethernet(frame).ok()?;

    let network = match &sliced.net {
        Some(NetSlice::Ipv4(ip)) => {
            let header = ip.header();
            NetworkLayer::Ipv4 {
                src: header.source_addr(),
                dst: header.destination_addr(),
                protocol: ip.payload().ip_number.0,
            }
        }
        Some(NetSlice::Ipv6(ip)) => {
            let header = ip.header();
            NetworkLayer::Ipv6 {
                src: header.source_addr(),
                dst: header.destination_addr(),
                next_header: ip.payload().ip_number.0,
            }
        }
        _ => NetworkLayer::Other,
    };

    let tcp = match &sliced.transport {
        Some(TransportSlice::Tcp(tcp)) => {
            let mut flags = TcpFlags::empty();
            for (set, flag) in [
                (tcp.fin(), TcpFlags::FIN),
                (tcp.syn(), TcpFlags::SYN),
                (tcp.rst(), TcpFlags::RST),
                (tcp.psh(), TcpFlags::PSH),
                (tcp.ack(), TcpFlags::ACK),
                (tcp.urg(), TcpFlags::URG),
                (tcp.ece(), TcpFlags::ECE),
                (tcp.cwr(), TcpFlags::CWR),
                (tcp.ns(), TcpFlags::NS),
            ] {
                if set {
                    flags.insert(flag);
                }
            }
            Some(TcpView {
                src_port: tcp.source_port(),
                dst_port: tcp.destination_port(),
                seq: tcp.sequence_number(),
                ack: tcp.acknowledgment_number(),
                flags,
            })
        }
        _ => None,
    };

    Some(DecodedPacket::new(timestamp, network, tcp))
}
