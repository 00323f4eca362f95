//! Reply Values
//!
//! What the server sends back, one value per command, in command order.
//! The first byte of each reply on the wire names its type:
//!
//! | Byte | Reply              | Example                          |
//! |------|--------------------|----------------------------------|
//! | `+`  | [`Reply::Status`]  | `+OK\r\n`                        |
//! | `-`  | [`Reply::Error`]   | `-ERR unknown command\r\n`       |
//! | `:`  | [`Reply::Integer`] | `:1000\r\n`                      |
//! | `$`  | [`Reply::String`]  | `$5\r\nhello\r\n` (`$-1\r\n` nil)  |
//! | `*`  | [`Reply::Array`]   | `*2\r\n$3\r\nfoo\r\n:7\r\n`        |

use bytes::{BufMut, Bytes};
use std::fmt;

/// Line terminator.
pub const CRLF: &[u8] = b"\r\n";

/// Type bytes.
pub mod prefix {
    pub const STATUS: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// Writes a `<type><number>\r\n` line: integers and length headers.
pub(crate) fn put_header<B: BufMut>(out: &mut B, type_byte: u8, n: i64) {
    out.put_u8(type_byte);
    out.put_slice(n.to_string().as_bytes());
    out.put_slice(CRLF);
}

/// A decoded server reply.
///
/// Text-like variants keep the raw bytes; nothing assumes UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Binary-safe bulk string.
    String(Bytes),
    /// Status line such as `OK` or `PONG`.
    Status(Bytes),
    /// Error line sent in place of a result.
    Error(Bytes),
    Integer(i64),
    /// Null bulk string or null array.
    Nil,
    Array(Vec<Reply>),
}

impl Reply {
    /// Creates a bulk string reply.
    ///
    /// # Example
    /// ```
    /// use pollkv::protocol::types::Reply;
    /// let value = Reply::string("hello");
    /// assert_eq!(value.as_bytes(), Some(&b"hello"[..]));
    /// ```
    pub fn string(data: impl Into<Bytes>) -> Self {
        Reply::String(data.into())
    }

    /// Creates a status reply.
    pub fn status(data: impl Into<Bytes>) -> Self {
        Reply::Status(data.into())
    }

    /// Creates an error reply.
    pub fn error(data: impl Into<Bytes>) -> Self {
        Reply::Error(data.into())
    }

    /// The `+OK` status.
    pub fn ok() -> Self {
        Reply::Status(Bytes::from_static(b"OK"))
    }

    /// Short lowercase name of the variant, e.g. `"status"`.
    pub fn kind(&self) -> &'static str {
        match self {
            Reply::String(_) => "string",
            Reply::Status(_) => "status",
            Reply::Error(_) => "error",
            Reply::Integer(_) => "integer",
            Reply::Nil => "nil",
            Reply::Array(_) => "array",
        }
    }

    /// The reply as a server would send it.
    ///
    /// Used by test servers and benchmarks; a client never sends replies.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(&mut out);
        out
    }

    pub fn write_to<B: BufMut>(&self, out: &mut B) {
        match self {
            Reply::Status(line) | Reply::Error(line) => {
                let type_byte = if self.is_error() { prefix::ERROR } else { prefix::STATUS };
                out.put_u8(type_byte);
                out.put_slice(line);
                out.put_slice(CRLF);
            }
            Reply::Integer(n) => put_header(out, prefix::INTEGER, *n),
            Reply::String(data) => {
                put_header(out, prefix::BULK_STRING, data.len() as i64);
                out.put_slice(data);
                out.put_slice(CRLF);
            }
            Reply::Nil => put_header(out, prefix::BULK_STRING, -1),
            Reply::Array(elements) => {
                put_header(out, prefix::ARRAY, elements.len() as i64);
                for element in elements {
                    element.write_to(out);
                }
            }
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Reply::Nil)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    /// Raw bytes of a string, status or error reply.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Reply::String(b) | Reply::Status(b) | Reply::Error(b) => Some(b),
            _ => None,
        }
    }

    /// Same as [`Reply::as_bytes`] but only when the bytes are valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Reply::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Reply]> {
        match self {
            Reply::Array(elements) => Some(elements),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<Vec<Reply>> {
        match self {
            Reply::Array(elements) => Some(elements),
            _ => None,
        }
    }
}

/// Formats replies the way `redis-cli` prints them.
impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Status(line) => f.write_str(&String::from_utf8_lossy(line)),
            Reply::Error(line) => write!(f, "(error) {}", String::from_utf8_lossy(line)),
            Reply::Integer(n) => write!(f, "(integer) {}", n),
            Reply::String(data) => write!(f, "\"{}\"", data.escape_ascii()),
            Reply::Nil => f.write_str("(nil)"),
            Reply::Array(elements) if elements.is_empty() => f.write_str("(empty array)"),
            Reply::Array(elements) => {
                let mut first = true;
                for (n, element) in (1..).zip(elements) {
                    if !first {
                        f.write_str("\n")?;
                    }
                    first = false;
                    write!(f, "{}) {}", n, element)?;
                }
                Ok(())
            }
        }
    }
}
