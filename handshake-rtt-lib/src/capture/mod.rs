//! Capture collaborator: turns live traffic into [`DecodedPacket`]s.
//!
//! [`DecodedPacket`]: crate::packet::DecodedPacket

mod filter;
#[cfg(target_os = "linux")]
pub mod socket;

pub use filter::CaptureFilter;
#[cfg(target_os = "linux")]
pub use socket::{spawn_capture, CaptureHandle, PacketSocket};
