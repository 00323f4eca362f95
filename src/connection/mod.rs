//! Connection Driver Module
//!
//! This module owns the single connection a [`Client`] manages and drives
//! it from the host's `update` calls.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Host application                        │
//! │        connect() / command() / update() / disconnect()      │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Client                               │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │  │    Link     │    │  Pipeline   │    │  RespCodec  │      │
//! │  │ (state +    │    │ (outbound   │    │ (decode     │      │
//! │  │  socket)    │    │  commands)  │    │  buffer)    │      │
//! │  └──────┬──────┘    └─────────────┘    └─────────────┘      │
//! │         │                                                   │
//! │         ▼                                                   │
//! │  Transport ── poll_ready() ──> poll(2)                      │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │ on_connect / on_reply / on_disconnect
//!                        ▼
//!                   ReplySink
//! ```
//!
//! ## Features
//!
//! - **Non-blocking connect**: Connection attempts finish across `update` calls,
//!   bounded by their own deadline
//! - **Pipelining**: Any number of commands can be in flight
//! - **Bounded waits**: One `update` never blocks past its budget
//! - **Explicit collaborators**: Sockets come from a [`Connector`], replies go
//!   to a [`ReplySink`]

pub mod driver;
pub mod pipeline;
pub mod poller;
pub mod sink;
pub mod state;
pub mod transport;

// Re-export commonly used types
pub use driver::{Client, ConnectError, ConnectionStats};
pub use pipeline::{CommandError, Pipeline};
pub use poller::{poll_ready, Direction};
pub use sink::{ReplySink, SinkEvent};
pub use state::{ConnectFailure, ConnectionState};
pub use transport::{Connector, TcpConnector, TcpTransport, Transport};
