//! Outbound command buffer.
//!
//! Commands are encoded as they are enqueued and appended to one byte
//! buffer, so transmission order is enqueue order and a partial write simply
//! leaves the unsent tail at the front.

use crate::protocol::{encode_command, EncodeError};
use bytes::{Buf, BytesMut};
use thiserror::Error;
use tracing::{debug, trace};

/// Why a command was not accepted.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// The connection is not open
    #[error("connection is not open")]
    NotOpen,

    /// The argument list cannot be sent
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] EncodeError),
}

/// Commands waiting to be written.
///
/// A [`ReplySink`](crate::connection::ReplySink) receives this handle while a
/// reply is dispatched and may enqueue follow-up commands through it; they go
/// out on the next flush.
#[derive(Debug, Default)]
pub struct Pipeline {
    outbound: BytesMut,
    enqueued: u64,
}

impl Pipeline {
    /// Encodes one command and appends it to the outbound buffer.
    pub fn command<A: AsRef<[u8]>>(&mut self, args: &[A]) -> Result<(), CommandError> {
        if let Err(e) = encode_command(args, &mut self.outbound) {
            debug!(error = %e, "Command rejected");
            return Err(e.into());
        }
        self.enqueued += 1;
        trace!(pending = self.outbound.len(), "Command enqueued");
        Ok(())
    }

    /// Bytes not yet accepted by the socket.
    pub fn pending(&self) -> usize {
        self.outbound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outbound.is_empty()
    }

    pub(crate) fn unsent(&self) -> &[u8] {
        &self.outbound
    }

    pub(crate) fn consume(&mut self, written: usize) {
        self.outbound.advance(written);
    }

    pub(crate) fn clear(&mut self) {
        self.outbound.clear();
    }

    pub(crate) fn enqueued(&self) -> u64 {
        self.enqueued
    }
}
