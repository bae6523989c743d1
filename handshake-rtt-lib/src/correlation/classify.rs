//! Handshake segment classification.

use crate::packet::{PacketView, TcpFlags};

/// True if the packet is a TCP segment whose SYN and ACK bits equal the
/// expected values and none of the other control flags are set.
pub fn is_handshake_flag_set<P: PacketView + ?Sized>(
    expected_syn: bool,
    expected_ack: bool,
    packet: &P,
) -> bool {
    let Some(tcp) = packet.tcp() else {
        return false;
    };
    if tcp.flags.intersects(TcpFlags::NON_HANDSHAKE) {
        return false;
    }
    tcp.flags.contains(TcpFlags::SYN) == expected_syn
        && tcp.flags.contains(TcpFlags::ACK) == expected_ack
}

/// Only SYN set.
pub fn is_syn<P: PacketView + ?Sized>(packet: &P) -> bool {
    is_handshake_flag_set(true, false, packet)
}

/// Only SYN and ACK set.
pub fn is_syn_ack<P: PacketView + ?Sized>(packet: &P) -> bool {
    is_handshake_flag_set(true, true, packet)
}

/// Only ACK set.
pub fn is_ack<P: PacketView + ?Sized>(packet: &P) -> bool {
    is_handshake_flag_set(false, true, packet)
}

/// True if `second` acknowledges `first`, i.e. both belong to the same
/// three-way handshake. Accepts a SYN and SYN/ACK pair or a SYN/ACK and ACK
/// pair.
///
/// Sequence numbers wrap: a SYN with `seq == u32::MAX` is acknowledged by 0.
pub fn share_handshake<A, B>(first: &A, second: &B) -> bool
where
    A: PacketView + ?Sized,
    B: PacketView + ?Sized,
{
    match (first.tcp(), second.tcp()) {
        (Some(t1), Some(t2)) => t1.seq == t2.ack.wrapping_sub(1),
        _ => false,
    }
}
