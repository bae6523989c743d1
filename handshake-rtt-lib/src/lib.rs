// Unsafe is confined to one narrow, documented site:
//   - capture/socket.rs: binding the AF_PACKET socket to an interface (libc FFI)
// All other unsafe is denied.
#![deny(unsafe_code)]

pub mod capture;
pub mod config;
pub mod correlation;
pub mod error;
pub mod export;
pub mod packet;
pub mod telemetry;

pub use config::{load_from_path, Config};
pub use correlation::{
    Clock, ConnectionTable, CorrelationEngine, FourTuple, HandshakeState, Progress, SystemClock,
    Vantage,
};
pub use error::{HandshakeError, Result, RttError, TupleError};
pub use packet::{DecodedPacket, NetworkLayer, PacketView, TcpFlags, TcpView};
