//! Wire Codec
//!
//! Encodes commands into RESP arrays of bulk strings and decodes replies out
//! of an internal buffer that survives partial reads.
//!
//! ```
//! use pollkv::protocol::{encode_command, Reply, RespCodec};
//!
//! let mut out = Vec::new();
//! encode_command(&[b"GET".as_slice(), b"name".as_slice()], &mut out).unwrap();
//! assert_eq!(out, b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n");
//!
//! let mut codec = RespCodec::new();
//! codec.feed(b"$4\r\nAr");
//! assert_eq!(codec.try_decode().unwrap(), None);
//! codec.feed(b"iz\r\n");
//! assert_eq!(codec.try_decode().unwrap(), Some(Reply::string("Ariz")));
//! ```

use crate::protocol::parser::{
    declared_bulk_len, element_capacity, parse_frame, Frame, ParseError, ParseResult,
    MAX_NESTING_DEPTH,
};
use crate::protocol::types::{prefix, put_header, Reply, CRLF};
use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;
use tracing::trace;

/// Initial decode buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Reasons a command cannot be encoded.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// A command needs at least its name
    #[error("command has no arguments")]
    EmptyCommand,

    /// Zero-length arguments are refused
    #[error("argument {index} is empty")]
    EmptyArgument { index: usize },
}

/// Encodes `args` as one RESP command and appends it to `out`.
///
/// Nothing is written when an error is returned.
pub fn encode_command<A, B>(args: &[A], out: &mut B) -> Result<(), EncodeError>
where
    A: AsRef<[u8]>,
    B: BufMut,
{
    if args.is_empty() {
        return Err(EncodeError::EmptyCommand);
    }
    if let Some(index) = args.iter().position(|arg| arg.as_ref().is_empty()) {
        return Err(EncodeError::EmptyArgument { index });
    }

    put_header(out, prefix::ARRAY, args.len() as i64);
    for arg in args {
        let arg = arg.as_ref();
        put_header(out, prefix::BULK_STRING, arg.len() as i64);
        out.put_slice(arg);
        out.put_slice(CRLF);
    }
    Ok(())
}

/// An array still waiting for some of its elements.
#[derive(Debug)]
struct OpenArray {
    remaining: usize,
    elements: Vec<Reply>,
}

/// Incremental reply decoder with its own input buffer.
///
/// Complete frames are taken off the buffer as soon as they arrive, and
/// arrays under construction are kept on a stack, so every received byte
/// is parsed once no matter how many reads a reply is split over.
#[derive(Debug)]
pub struct RespCodec {
    buffer: BytesMut,
    open_arrays: Vec<OpenArray>,
}

impl Default for RespCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl RespCodec {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            open_arrays: Vec::new(),
        }
    }

    /// Appends received bytes to the decode buffer.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Decodes the next complete reply, if the buffer holds one.
    ///
    /// An error means the stream is no longer RESP and the connection
    /// should be dropped.
    pub fn try_decode(&mut self) -> ParseResult<Option<Reply>> {
        loop {
            let Some((frame, consumed)) = parse_frame(&self.buffer)? else {
                trace!(
                    buffered = self.buffer.len(),
                    open_arrays = self.open_arrays.len(),
                    "Incomplete reply, need more data"
                );
                return Ok(None);
            };
            self.buffer.advance(consumed);

            let value = match frame {
                Frame::Value(reply) => reply,
                Frame::ArrayStart(0) => Reply::Array(Vec::new()),
                Frame::ArrayStart(count) => {
                    if self.open_arrays.len() >= MAX_NESTING_DEPTH {
                        return Err(ParseError::TooDeep(MAX_NESTING_DEPTH));
                    }
                    self.open_arrays.push(OpenArray {
                        remaining: count,
                        elements: Vec::with_capacity(element_capacity(count, self.buffer.len())),
                    });
                    continue;
                }
            };

            if let Some(reply) = self.complete(value) {
                trace!(remaining = self.buffer.len(), kind = reply.kind(), "Decoded reply");
                return Ok(Some(reply));
            }
        }
    }

    /// Places a finished value into the innermost open array, closing every
    /// array it completes. Returns the reply once the outermost one closes.
    fn complete(&mut self, mut value: Reply) -> Option<Reply> {
        loop {
            let Some(top) = self.open_arrays.last_mut() else {
                return Some(value);
            };
            top.elements.push(value);
            top.remaining -= 1;
            if top.remaining > 0 {
                return None;
            }
            let finished = self.open_arrays.pop()?;
            value = Reply::Array(finished.elements);
        }
    }

    /// Number of received bytes not yet decoded.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Buffered bytes beyond what a bulk string at the front has announced.
    ///
    /// A large bulk string legitimately sits in the buffer until its last
    /// byte arrives; anything past its declared length, or any unfinished
    /// line, counts here.
    pub fn unclaimed(&self) -> usize {
        let claimed = declared_bulk_len(&self.buffer).unwrap_or(0);
        self.buffer.len().saturating_sub(claimed)
    }

    /// Drops any partially received reply.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.open_arrays.clear();
    }
}
