//! RESP Protocol Implementation
//!
//! This module provides the client side of the Redis Serialization Protocol
//! (RESP): command encoding, incremental reply decoding, and the reply value
//! model handed to embedders.
//!
//! ## Modules
//!
//! - `types`: Defines the `Reply` enum
//! - `parser`: Incremental parser for incoming replies
//! - `codec`: Command encoder and buffered reply decoder
//! - `policy`: Ways to flatten a `Reply` for a host environment
//!
//! ## Example
//!
//! ```
//! use pollkv::protocol::{encode_command, Reply, RespCodec};
//!
//! let mut wire = Vec::new();
//! encode_command(&["PING"], &mut wire).unwrap();
//! assert_eq!(wire, b"*1\r\n$4\r\nPING\r\n");
//!
//! let mut codec = RespCodec::new();
//! codec.feed(b"+PONG\r\n");
//! assert_eq!(codec.try_decode().unwrap(), Some(Reply::status("PONG")));
//! ```

pub mod codec;
pub mod parser;
pub mod policy;
pub mod types;

// Re-export commonly used types for convenience
pub use codec::{encode_command, EncodeError, RespCodec};
pub use parser::{parse_reply, ParseError, ParseResult, ReplyParser};
pub use policy::{LooseValue, TaggedReply};
pub use types::Reply;
