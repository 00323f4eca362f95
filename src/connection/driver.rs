//! Pipelined Driver
//!
//! [`Client`] owns one connection and moves it forward each time the host
//! calls [`Client::update`]. Nothing happens between calls: there is no
//! thread, and no call blocks for longer than the budget it was given.
//!
//! ## One `update` while open
//!
//! ```text
//!   ┌──────────────────────────────┐
//!   │ Flush                        │  write pending commands while the
//!   │  send-ready? ──> write       │  socket accepts them
//!   └──────────────┬───────────────┘
//!                  ▼
//!   ┌──────────────────────────────┐
//!   │ Receive                      │  read what arrived, decode every
//!   │  recv-ready? ──> read        │  complete reply and hand each one
//!   │    └─> decode ──> on_reply   │  to the sink
//!   └──────────────┬───────────────┘
//!                  ▼
//!        faulted? ──> close + on_disconnect
//! ```
//!
//! Replies arrive in the order commands were written, and that is the
//! order they are dispatched in.

use crate::config::ClientConfig;
use crate::connection::pipeline::{CommandError, Pipeline};
use crate::connection::poller::Direction;
use crate::connection::sink::ReplySink;
use crate::connection::state::{ConnectProgress, ConnectionState, Link};
use crate::connection::transport::{Connector, TcpConnector, Transport};
use crate::protocol::{ParseError, RespCodec};
use std::io;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// Rejected `connect()` arguments.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConnectError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

/// Why an open connection was torn down.
#[derive(Debug, Error)]
enum Fault {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Connection closed by server")]
    Closed,

    #[error("Read buffer limit exceeded: {0} bytes")]
    BufferFull(usize),
}

/// Counters for one client, across reconnects.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStats {
    pub connects_attempted: u64,
    pub commands_enqueued: u64,
    pub replies_dispatched: u64,
    pub bytes_written: u64,
    pub bytes_read: u64,
    pub disconnects: u64,
}

/// Time left in one `update` call.
struct Budget {
    deadline: Option<Instant>,
}

impl Budget {
    fn start(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
        }
    }

    fn remaining(&self) -> Duration {
        match self.deadline {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()),
            None => Duration::MAX,
        }
    }

    fn expired(&self) -> bool {
        self.remaining().is_zero()
    }
}

/// A poll-driven RESP client.
///
/// ```no_run
/// use pollkv::{Client, SinkEvent};
/// use std::time::Duration;
///
/// let mut client: Client = Client::default();
/// let mut events: Vec<SinkEvent> = Vec::new();
///
/// client.connect("127.0.0.1", 6379, Duration::from_secs(1)).unwrap();
/// while !events.contains(&SinkEvent::Connect(true)) {
///     client.update(Duration::from_millis(10), &mut events);
/// }
/// client.command(&["SET", "name", "Ariz"]).unwrap();
/// client.command(&["GET", "name"]).unwrap();
/// client.update(Duration::from_millis(10), &mut events);
/// ```
pub struct Client<C: Connector = TcpConnector> {
    connector: C,
    config: ClientConfig,
    link: Link<C::Transport>,
    pipeline: Pipeline,
    codec: RespCodec,
    read_buf: Vec<u8>,
    stats: ConnectionStats,
}

impl Default for Client<TcpConnector> {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl Client<TcpConnector> {
    /// Creates a TCP client.
    pub fn new(config: ClientConfig) -> Self {
        let connector = TcpConnector::new(config.nodelay);
        Self::with_connector(connector, config)
    }
}

impl<C: Connector> Client<C> {
    /// Creates a client that opens its sockets through `connector`.
    pub fn with_connector(connector: C, config: ClientConfig) -> Self {
        Self {
            connector,
            read_buf: vec![0u8; config.read_chunk_size.max(1)],
            config,
            link: Link::Closed,
            pipeline: Pipeline::default(),
            codec: RespCodec::new(),
            stats: ConnectionStats::default(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.link.state()
    }

    /// Bytes of enqueued commands not yet written.
    pub fn pending_bytes(&self) -> usize {
        self.pipeline.pending()
    }

    pub fn stats(&self) -> ConnectionStats {
        ConnectionStats {
            commands_enqueued: self.pipeline.enqueued(),
            ..self.stats
        }
    }

    /// Starts a new connection attempt, abandoning any current connection.
    ///
    /// The outcome is reported by a later [`update`](Self::update) through
    /// `on_connect`. Invalid arguments are rejected before anything changes.
    ///
    /// A host name is resolved here, synchronously, and may block for as
    /// long as the system resolver takes. Pass a numeric address to keep
    /// `connect` non-blocking. Each resolved address is tried in turn until
    /// one accepts a connect attempt.
    pub fn connect(&mut self, address: &str, port: u16, timeout: Duration) -> Result<(), ConnectError> {
        if address.is_empty() {
            return Err(ConnectError::InvalidArgument("empty address"));
        }
        if port == 0 {
            return Err(ConnectError::InvalidArgument("port must be positive"));
        }

        self.disconnect();

        let attempt = self.connector.connect(address, port);
        if let Err(e) = &attempt {
            warn!(address = address, port = port, error = %e, "Could not start connect");
        } else {
            debug!(address = address, port = port, timeout_ms = timeout.as_millis() as u64, "Connecting");
        }
        self.link.begin(attempt, timeout);
        self.stats.connects_attempted += 1;
        Ok(())
    }

    /// Drops the connection or attempt and every unsent command.
    ///
    /// Idempotent, and silent: no notification is made.
    pub fn disconnect(&mut self) {
        if self.link.close() {
            debug!("Disconnected");
        }
        self.pipeline.clear();
        self.codec.reset();
    }

    /// Enqueues one command for the next flush.
    ///
    /// Never performs I/O.
    pub fn command<A: AsRef<[u8]>>(&mut self, args: &[A]) -> Result<(), CommandError> {
        if self.link.state() != ConnectionState::Open {
            debug!("Command rejected: connection is not open");
            return Err(CommandError::NotOpen);
        }
        self.pipeline.command(args)
    }

    /// Drives the connection for at most `timeout`.
    ///
    /// Returns the number of replies dispatched to `sink` during this call;
    /// always 0 while connecting.
    pub fn update<S: ReplySink + ?Sized>(&mut self, timeout: Duration, sink: &mut S) -> usize {
        let budget = Budget::start(timeout);
        match self.link.state() {
            ConnectionState::Closed => 0,
            ConnectionState::Connecting => {
                self.check_connecting(&budget, sink);
                0
            }
            ConnectionState::Open => self.drive(&budget, sink),
        }
    }

    fn check_connecting<S: ReplySink + ?Sized>(&mut self, budget: &Budget, sink: &mut S) {
        match self.link.poll_connecting(budget.remaining()) {
            ConnectProgress::Pending => {}
            ConnectProgress::Connected => {
                info!("Connected");
                sink.on_connect(true);
            }
            ConnectProgress::Failed(reason) => {
                warn!(error = %reason, "Connect failed");
                sink.on_connect(false);
            }
        }
    }

    fn drive<S: ReplySink + ?Sized>(&mut self, budget: &Budget, sink: &mut S) -> usize {
        let mut count = 0;
        let result = self
            .flush(budget)
            .and_then(|()| self.receive(budget, sink, &mut count));

        if let Err(fault) = result {
            match &fault {
                Fault::Closed => info!("Connection closed by server"),
                _ => warn!(error = %fault, "Connection fault"),
            }
            self.disconnect();
            self.stats.disconnects += 1;
            sink.on_disconnect();
        }
        count
    }

    /// Writes pending commands while the socket accepts them.
    fn flush(&mut self, budget: &Budget) -> Result<(), Fault> {
        while !self.pipeline.is_empty() {
            let Some(transport) = self.link.open_mut() else {
                return Ok(());
            };
            if !transport.poll_ready(Direction::Send, budget.remaining())? {
                break;
            }

            match transport.write(self.pipeline.unsent()) {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::WriteZero).into()),
                Ok(n) => {
                    self.pipeline.consume(n);
                    self.stats.bytes_written += n as u64;
                    trace!(bytes = n, pending = self.pipeline.pending(), "Wrote commands");
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }

            if budget.expired() {
                break;
            }
        }
        Ok(())
    }

    /// Reads what has arrived and dispatches every complete reply.
    fn receive<S: ReplySink + ?Sized>(
        &mut self,
        budget: &Budget,
        sink: &mut S,
        count: &mut usize,
    ) -> Result<(), Fault> {
        loop {
            let Some(transport) = self.link.open_mut() else {
                return Ok(());
            };
            if !transport.poll_ready(Direction::Recv, budget.remaining())? {
                return Ok(());
            }

            let n = match transport.read(&mut self.read_buf) {
                Ok(0) => return Err(Fault::Closed),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            self.codec.feed(&self.read_buf[..n]);
            self.stats.bytes_read += n as u64;
            trace!(bytes = n, buffered = self.codec.buffered(), "Read data");

            while let Some(reply) = self.codec.try_decode()? {
                *count += 1;
                self.stats.replies_dispatched += 1;
                sink.on_reply(reply, &mut self.pipeline);
            }

            if self.codec.unclaimed() > self.config.max_read_buffer {
                return Err(Fault::BufferFull(self.codec.buffered()));
            }
            if budget.expired() {
                return Ok(());
            }
        }
    }
}
