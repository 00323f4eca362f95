//! Socket Transport
//!
//! The driver talks to its socket only through [`Transport`], and creates
//! sockets only through [`Connector`]. [`TcpConnector`] is the production
//! pair: a non-blocking `mio` TCP stream polled with [`poll_ready`].

use crate::connection::poller::{poll_ready, Direction};
use std::io::{self, Read, Write};
use std::net::{SocketAddr, ToSocketAddrs};
use std::os::unix::io::AsRawFd;
use std::time::Duration;
use tracing::{debug, trace};

/// A non-blocking byte stream.
///
/// `write` and `read` never block; they return `WouldBlock` when the socket
/// is not ready. Dropping the transport closes the socket.
pub trait Transport {
    /// Waits up to `timeout` for readiness in `direction`.
    fn poll_ready(&self, direction: Direction, timeout: Duration) -> io::Result<bool>;

    /// Writes as much of `buf` as the socket accepts.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Reads available bytes into `buf`. `Ok(0)` means the peer closed.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Takes the pending socket error (`SO_ERROR`), if any.
    fn take_error(&self) -> io::Result<Option<io::Error>>;
}

/// Starts connection attempts.
pub trait Connector {
    type Transport: Transport;

    /// Opens a socket and issues a non-blocking connect to `address:port`.
    ///
    /// Returning `Ok` means the attempt is in flight, not that it succeeded.
    fn connect(&mut self, address: &str, port: u16) -> io::Result<Self::Transport>;
}

/// TCP over a non-blocking `mio` stream.
#[derive(Debug)]
pub struct TcpTransport {
    stream: mio::net::TcpStream,
}

impl Transport for TcpTransport {
    fn poll_ready(&self, direction: Direction, timeout: Duration) -> io::Result<bool> {
        poll_ready(self.stream.as_raw_fd(), direction, timeout)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }

    fn take_error(&self) -> io::Result<Option<io::Error>> {
        self.stream.take_error()
    }
}

/// Connects [`TcpTransport`]s.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    nodelay: bool,
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self { nodelay: true }
    }
}

impl TcpConnector {
    pub fn new(nodelay: bool) -> Self {
        Self { nodelay }
    }
}

impl Connector for TcpConnector {
    type Transport = TcpTransport;

    /// Resolves `address` (blocking on the system resolver for host names)
    /// and tries each result until one accepts a non-blocking connect.
    fn connect(&mut self, address: &str, port: u16) -> io::Result<TcpTransport> {
        let addrs = (address, port).to_socket_addrs()?;
        let stream = first_accepted(addrs, |peer_addr| {
            let stream = mio::net::TcpStream::connect(peer_addr)?;
            trace!(peer = %peer_addr, "Connect issued");
            Ok(stream)
        })
        .map_err(|e| match e {
            Some(e) => e,
            None => io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{}:{} did not resolve to any address", address, port),
            ),
        })?;

        if self.nodelay {
            if let Err(e) = stream.set_nodelay(true) {
                debug!(error = %e, "Could not set TCP_NODELAY");
            }
        }
        Ok(TcpTransport { stream })
    }
}

/// Calls `open` on each address in order and returns the first success.
///
/// Fails with the last error seen, or `None` when there were no addresses.
fn first_accepted<T, I, F>(addrs: I, mut open: F) -> Result<T, Option<io::Error>>
where
    I: IntoIterator<Item = SocketAddr>,
    F: FnMut(SocketAddr) -> io::Result<T>,
{
    let mut last_error = None;
    for addr in addrs {
        match open(addr) {
            Ok(opened) => return Ok(opened),
            Err(e) => {
                debug!(peer = %addr, error = %e, "Connect attempt rejected, trying next address");
                last_error = Some(e);
            }
        }
    }
    Err(last_error)
}
