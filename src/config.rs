//! Client configuration.

/// Tunables for a [`Client`](crate::connection::Client).
///
/// The connect timeout and the per-`update` budget are not here: both are
/// passed on each call and are independent of one another.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Bytes requested from the socket per read (default: 16 KiB)
    pub read_chunk_size: usize,

    /// Undecoded bytes allowed to pile up before the connection is dropped
    /// (default: 64 MiB). The announced body of a bulk string being received
    /// does not count, so replies up to the 512 MiB bulk limit still arrive.
    pub max_read_buffer: usize,

    /// Disable Nagle's algorithm on new sockets (default: true)
    pub nodelay: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: 16 * 1024,
            max_read_buffer: 64 * 1024 * 1024,
            nodelay: true,
        }
    }
}
