use std::cmp::Ordering;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::error::TupleError;
use crate::packet::{NetworkLayer, PacketView, IPPROTO_TCP};

/// Direction-independent identifier of a TCP connection.
///
/// Both directions of one connection canonicalize to the same value: the
/// endpoint with the larger port comes first; on equal ports the byte-wise
/// smaller address comes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourTuple {
    pub addr_a: IpAddr,
    pub port_a: u16,
    pub addr_b: IpAddr,
    pub port_b: u16,
}

impl FourTuple {
    pub fn canonicalize(src_addr: IpAddr, src_port: u16, dst_addr: IpAddr, dst_port: u16) -> Self {
        let src_first = match src_port.cmp(&dst_port) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => addr_bytes(src_addr) <= addr_bytes(dst_addr),
        };

        if src_first {
            Self { addr_a: src_addr, port_a: src_port, addr_b: dst_addr, port_b: dst_port }
        } else {
            Self { addr_a: dst_addr, port_a: dst_port, addr_b: src_addr, port_b: src_port }
        }
    }
}

impl fmt::Display for FourTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}",
            SocketAddr::new(self.addr_a, self.port_a),
            SocketAddr::new(self.addr_b, self.port_b)
        )
    }
}

// IPv4 compares in its IPv6-mapped form so mixed families still order totally.
fn addr_bytes(addr: IpAddr) -> [u8; 16] {
    match addr {
        IpAddr::V4(v4) => v4.to_ipv6_mapped().octets(),
        IpAddr::V6(v6) => v6.octets(),
    }
}

/// Extract the canonical four-tuple of a packet.
pub fn extract_tuple<P: PacketView + ?Sized>(packet: &P) -> Result<FourTuple, TupleError> {
    let (src, dst) = match packet.network() {
        NetworkLayer::Ipv4 { src, dst, protocol } => {
            if protocol != IPPROTO_TCP {
                return Err(TupleError::NotTcp);
            }
            (IpAddr::V4(src), IpAddr::V4(dst))
        }
        NetworkLayer::Ipv6 { src, dst, next_header } => {
            if next_header != IPPROTO_TCP {
                return Err(TupleError::NotTcp);
            }
            (IpAddr::V6(src), IpAddr::V6(dst))
        }
        NetworkLayer::Other => return Err(TupleError::NotIp),
    };

    // The protocol field claims TCP but the segment did not decode.
    let tcp = packet.tcp().ok_or(TupleError::NotTcp)?;

    Ok(FourTuple::canonicalize(src, tcp.src_port, dst, tcp.dst_port))
}
