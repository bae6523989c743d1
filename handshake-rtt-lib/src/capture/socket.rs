use std::ffi::CString;
use std::io::{self, Read};
use std::mem;
use std::os::fd::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::CaptureFilter;
use crate::config::CaptureConfig;
use crate::error::{Result, RttError};
use crate::packet::{frame, DecodedPacket};

/// Every ethertype, both directions.
const ETH_P_ALL: u16 = 0x0003;

/// Upper bound on how long a stop request goes unnoticed.
const READ_TIMEOUT: Duration = Duration::from_millis(250);

/// Raw `AF_PACKET` socket attached to one interface.
///
/// Requires `CAP_NET_RAW`. Frames are timestamped when read, which is close
/// enough to the kernel timestamp for handshake RTTs in the millisecond range.
pub struct PacketSocket {
    socket: Socket,
    interface: String,
    buf: Vec<u8>,
}

impl PacketSocket {
    pub fn open(interface: &str, snaplen: usize) -> Result<Self> {
        let protocol = Protocol::from(i32::from(ETH_P_ALL.to_be()));
        let socket = Socket::new(Domain::PACKET, Type::RAW, Some(protocol)).map_err(|e| {
            RttError::Capture(format!("Failed to open packet socket (requires CAP_NET_RAW): {e}"))
        })?;
        bind_to_interface(&socket, interface).map_err(|e| {
            RttError::Capture(format!("Failed to bind packet socket to {interface}: {e}"))
        })?;
        socket.set_read_timeout(Some(READ_TIMEOUT))?;

        info!(interface, snaplen, "packet socket attached");

        Ok(Self { socket, interface: interface.to_string(), buf: vec![0u8; snaplen] })
    }

    /// Read the next frame. Returns `Ok(None)` when the read timed out.
    pub fn next_frame(&mut self) -> io::Result<Option<(&[u8], SystemTime)>> {
        match self.socket.read(&mut self.buf) {
            Ok(n) => Ok(Some((&self.buf[..n], SystemTime::now()))),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }
}

// SO_BINDTODEVICE is not honoured by packet sockets; bind(2) with a
// sockaddr_ll carrying the interface index is.
#[allow(unsafe_code)]
fn bind_to_interface(socket: &Socket, interface: &str) -> io::Result<()> {
    let name = CString::new(interface)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "interface name contains NUL"))?;

    // SAFETY: `name` is a valid NUL-terminated string that outlives the call.
    let ifindex = unsafe { libc::if_nametoindex(name.as_ptr()) };
    if ifindex == 0 {
        return Err(io::Error::last_os_error());
    }

    // SAFETY: sockaddr_ll is plain old data; all zeroes is a valid value.
    let mut addr: libc::sockaddr_ll = unsafe { mem::zeroed() };
    addr.sll_family = libc::AF_PACKET as libc::c_ushort;
    addr.sll_protocol = ETH_P_ALL.to_be();
    addr.sll_ifindex = ifindex as libc::c_int;

    // SAFETY: `addr` is a fully initialised sockaddr_ll and the length passed
    // is its exact size; the fd is owned by `socket` and open.
    let rc = unsafe {
        libc::bind(
            socket.as_raw_fd(),
            &addr as *const libc::sockaddr_ll as *const libc::sockaddr,
            mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
        )
    };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Running capture thread.
pub struct CaptureHandle {
    stop: Arc<AtomicBool>,
    task: Option<JoinHandle<Result<u64>>>,
}

impl CaptureHandle {
    /// Ask the capture thread to exit after its current read.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Wait for the capture thread to exit on its own; yields the number of
    /// packets forwarded.
    ///
    /// Cancel safe: dropping the future leaves the thread joinable.
    pub async fn finished(&mut self) -> Result<u64> {
        let task = self
            .task
            .as_mut()
            .ok_or_else(|| RttError::Capture("capture thread already joined".into()))?;
        let outcome = task.await;
        self.task = None;
        outcome.map_err(|e| RttError::Capture(format!("capture task failed: {e}")))?
    }

    /// Stop the capture thread and wait for it.
    pub async fn join(mut self) -> Result<u64> {
        self.stop();
        self.finished().await
    }
}

/// Open the configured interface and forward matching handshake segments to `tx`
/// from a blocking thread.
///
/// The thread exits when stopped, when `tx`'s receiver is dropped, or on a read
/// error. Must be called from within a tokio runtime.
pub fn spawn_capture(
    config: &CaptureConfig,
    tx: mpsc::Sender<DecodedPacket>,
) -> Result<CaptureHandle> {
    let mut socket = PacketSocket::open(&config.interface, config.snaplen)?;
    let filter = CaptureFilter::new(config.port);
    info!(filter = %filter.bpf_expression(), "capturing TCP handshakes");

    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    let task = tokio::task::spawn_blocking(move || capture_loop(&mut socket, filter, &tx, &flag));

    Ok(CaptureHandle { stop, task: Some(task) })
}

fn capture_loop(
    socket: &mut PacketSocket,
    filter: CaptureFilter,
    tx: &mpsc::Sender<DecodedPacket>,
    stop: &AtomicBool,
) -> Result<u64> {
    let interface = socket.interface().to_string();
    let mut forwarded = 0u64;

    while !stop.load(Ordering::Relaxed) {
        let next = socket
            .next_frame()
            .map_err(|e| RttError::Capture(format!("read from {interface} failed: {e}")))?;
        let Some((bytes, timestamp)) = next else {
            continue;
        };
        let Some(packet) = frame::decode(bytes, timestamp) else {
            continue;
        };
        if !filter.matches(&packet) {
            continue;
        }
        if tx.blocking_send(packet).is_err() {
            debug!("correlation consumer gone, stopping capture");
            break;
        }
        forwarded += 1;
    }

    info!(interface, forwarded, "capture stopped");
    Ok(forwarded)
}
