use crate::correlation::classify::{is_ack, is_syn, is_syn_ack};
use crate::packet::PacketView;

/// Selects handshake segments on one port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureFilter {
    /// 0 matches any port.
    pub port: u16,
}

impl CaptureFilter {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    /// Equivalent pcap filter expression, for kernel-side filtering by an
    /// external capture tool.
    pub fn bpf_expression(&self) -> String {
        let flags = "(tcp[tcpflags] == tcp-syn or \
                     tcp[tcpflags] == tcp-ack or \
                     tcp[tcpflags] == tcp-syn|tcp-ack)";
        if self.port == 0 {
            flags.to_string()
        } else {
            format!("{flags} and port {}", self.port)
        }
    }

    /// User-space version of [`bpf_expression`](Self::bpf_expression).
    pub fn matches<P: PacketView + ?Sized>(&self, packet: &P) -> bool {
        let Some(tcp) = packet.tcp() else {
            return false;
        };
        if self.port != 0 && tcp.src_port != self.port && tcp.dst_port != self.port {
            return false;
        }
        is_syn(packet) || is_syn_ack(packet) || is_ack(packet)
    }
}
