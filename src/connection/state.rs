//! Connection State Machine
//!
//! ```text
//!              connect()                 send-ready + SO_ERROR == 0
//!   Closed ──────────────> Connecting ─────────────────────────────> Open
//!     ▲                        │                                      │
//!     │   timeout / refused    │          fault / disconnect()        │
//!     └────────────────────────┴──────────────────────────────────────┘
//! ```
//!
//! The socket lives inside the state it belongs to, so leaving a state
//! always drops (and closes) its socket. There is never more than one.

use crate::connection::poller::Direction;
use crate::connection::transport::Transport;
use std::io;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Lifecycle state visible to the embedder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Connecting,
    Open,
}

/// Why a connection attempt ended without opening.
#[derive(Debug, Error)]
pub enum ConnectFailure {
    #[error("connect timed out")]
    Timeout,

    #[error("could not start connect: {0}")]
    Socket(io::Error),

    #[error("connect failed: {0}")]
    Refused(io::Error),
}

/// Result of one readiness check on an outstanding attempt.
#[derive(Debug)]
pub enum ConnectProgress {
    /// Not ready yet; try again on a later update.
    Pending,
    Connected,
    Failed(ConnectFailure),
}

#[derive(Debug)]
pub enum Link<T> {
    Closed,
    Connecting {
        /// A failed socket setup is kept here and reported on the next poll.
        attempt: io::Result<T>,
        /// `None` when the timeout is too large to represent.
        deadline: Option<Instant>,
    },
    Open(T),
}

impl<T: Transport> Link<T> {
    pub fn state(&self) -> ConnectionState {
        match self {
            Link::Closed => ConnectionState::Closed,
            Link::Connecting { .. } => ConnectionState::Connecting,
            Link::Open(_) => ConnectionState::Open,
        }
    }

    /// Replaces whatever is held with a new attempt.
    pub fn begin(&mut self, attempt: io::Result<T>, timeout: Duration) {
        self.close();
        *self = Link::Connecting {
            attempt,
            deadline: Instant::now().checked_add(timeout),
        };
    }

    /// Releases the socket, if any. Returns whether one was held.
    pub fn close(&mut self) -> bool {
        !matches!(std::mem::replace(self, Link::Closed), Link::Closed)
    }

    pub fn open_mut(&mut self) -> Option<&mut T> {
        match self {
            Link::Open(transport) => Some(transport),
            _ => None,
        }
    }

    /// Advances an outstanding attempt, waiting at most `timeout`.
    ///
    /// Any outcome other than `Pending` leaves the link `Open` or `Closed`.
    pub fn poll_connecting(&mut self, timeout: Duration) -> ConnectProgress {
        let (attempt, deadline) = match self {
            Link::Connecting { attempt, deadline } => (attempt, *deadline),
            _ => return ConnectProgress::Pending,
        };

        if deadline.is_some_and(|deadline| Instant::now() > deadline) {
            self.close();
            return ConnectProgress::Failed(ConnectFailure::Timeout);
        }

        let transport = match attempt {
            Ok(transport) => transport,
            Err(e) => {
                let e = io::Error::new(e.kind(), e.to_string());
                self.close();
                return ConnectProgress::Failed(ConnectFailure::Socket(e));
            }
        };

        match transport.poll_ready(Direction::Send, timeout) {
            Ok(false) => return ConnectProgress::Pending,
            Ok(true) => {}
            Err(e) => {
                self.close();
                return ConnectProgress::Failed(ConnectFailure::Refused(e));
            }
        }

        match transport.take_error() {
            Ok(None) => {
                if let Link::Connecting {
                    attempt: Ok(transport),
                    ..
                } = std::mem::replace(self, Link::Closed)
                {
                    *self = Link::Open(transport);
                }
                ConnectProgress::Connected
            }
            Ok(Some(e)) | Err(e) => {
                self.close();
                ConnectProgress::Failed(ConnectFailure::Refused(e))
            }
        }
    }
}
