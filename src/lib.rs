//! # PollKV - A Poll-Driven, Pipelined RESP Client
//!
//! PollKV is a client driver for Redis-compatible servers, built for hosts
//! that own the only thread and hand out time in slices. The host calls
//! [`Client::update`] with a timeout; all socket work happens inside that
//! call and never runs past it.
//!
//! ## Features
//!
//! - **Non-blocking connect** with its own deadline, independent of the
//!   per-update budget
//! - **Pipelining**: commands are buffered and flushed together, replies are
//!   dispatched in request order
//! - **Partial I/O**: short writes and split replies resume on the next call
//! - **No ambient state**: notifications go to a [`ReplySink`] passed in by
//!   the caller
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                               PollKV                                    │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │   Client    │───>│  Pipeline   │───>│  Transport  │──> socket        │
//! │  │ (update)    │    │ (outbound)  │    │ (poll(2))   │                  │
//! │  └──────┬──────┘    └─────────────┘    └──────┬──────┘                  │
//! │         │                                     │                         │
//! │         ▼                                     ▼                         │
//! │  ┌─────────────┐                       ┌─────────────┐                  │
//! │  │  ReplySink  │<──────────────────────│  RespCodec  │                  │
//! │  │ (embedder)  │        Reply          │  (decode)   │                  │
//! │  └─────────────┘                       └─────────────┘                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use pollkv::{Client, ClientConfig, Pipeline, Reply, ReplySink};
//! use std::time::Duration;
//!
//! struct Printer;
//!
//! impl ReplySink for Printer {
//!     fn on_connect(&mut self, success: bool) {
//!         println!("connected: {}", success);
//!     }
//!
//!     fn on_reply(&mut self, reply: Reply, _pipeline: &mut Pipeline) {
//!         println!("{}", reply);
//!     }
//! }
//!
//! let mut client = Client::new(ClientConfig::default());
//! client.connect("127.0.0.1", 6379, Duration::from_secs(1)).unwrap();
//!
//! loop {
//!     // The host's frame loop.
//!     client.update(Duration::from_millis(5), &mut Printer);
//!     let _ = client.command(&["INCR", "frames"]);
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: Reply values, command encoding, and the reply decoder
//! - [`connection`]: Connection state machine, pipelined driver, sockets
//! - [`config`]: Client tunables

pub mod config;
pub mod connection;
pub mod protocol;

// Re-export commonly used types for convenience
pub use config::ClientConfig;
pub use connection::{
    Client, CommandError, ConnectError, ConnectionState, ConnectionStats, Pipeline, ReplySink,
    SinkEvent,
};
pub use protocol::{LooseValue, ParseError, Reply, RespCodec, TaggedReply};

/// The default Redis port
pub const DEFAULT_PORT: u16 = 6379;

/// The default host to connect to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of PollKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
