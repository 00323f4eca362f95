//! Incremental RESP Reply Parser
//!
//! Parses server replies out of a byte buffer that may hold zero, one, or
//! many complete replies followed by a partial one.
//!
//! `parse` answers with one of:
//! - `Ok(Some((reply, consumed)))`: the first reply and its length on the wire
//! - `Ok(None)`: the first reply has not fully arrived
//! - `Err(ParseError)`: the server sent something that is not RESP
//!
//! `parse` keeps no state between calls: a partial reply is re-read from
//! its first byte once more data has arrived. [`RespCodec`] decodes frame by
//! frame instead, so a reply spread over many reads is only scanned once.
//!
//! [`RespCodec`]: crate::protocol::RespCodec

use crate::protocol::types::{prefix, Reply, CRLF};
use bytes::Bytes;
use thiserror::Error;

/// A reply that cannot be decoded. Always fatal for the connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown reply type byte: {0:#04x}")]
    UnknownPrefix(u8),

    #[error("invalid integer: {0:?}")]
    InvalidInteger(String),

    /// A negative length other than the `-1` nil marker.
    #[error("invalid length: {0}")]
    InvalidLength(i64),

    #[error("bulk string is not terminated by CRLF")]
    MissingTerminator,

    #[error("bulk string of {size} bytes exceeds the {max} byte limit")]
    TooLarge { size: usize, max: usize },

    #[error("arrays nested deeper than {0} levels")]
    TooDeep(usize),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Largest bulk string accepted (512 MB, as the server enforces).
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Deepest array nesting accepted.
pub const MAX_NESTING_DEPTH: usize = 32;

/// Returns `Ok(None)` from the enclosing function when input ran out.
macro_rules! need {
    ($e:expr) => {
        match $e {
            Some(value) => value,
            None => return Ok(None),
        }
    };
}

/// Read position within the buffer being parsed.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn next_byte(&mut self) -> Option<u8> {
        let byte = *self.buf.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    /// Everything up to the next CRLF, which is skipped.
    fn line(&mut self) -> Option<&'a [u8]> {
        let rest = &self.buf[self.pos..];
        let end = rest.windows(2).position(|w| w == CRLF)?;
        self.pos += end + CRLF.len();
        Some(&rest[..end])
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let bytes = self.buf.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    /// A signed decimal line, as used by integers and length headers.
    fn number(&mut self) -> ParseResult<Option<i64>> {
        let digits = need!(self.line());
        std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Some)
            .ok_or_else(|| ParseError::InvalidInteger(String::from_utf8_lossy(digits).into_owned()))
    }
}

/// A RESP reply parser.
///
/// ```
/// use pollkv::protocol::parser::ReplyParser;
/// use pollkv::protocol::types::Reply;
///
/// let parser = ReplyParser::new();
/// let (reply, consumed) = parser.parse(b"+OK\r\n:1\r\n").unwrap().unwrap();
/// assert_eq!(reply, Reply::ok());
/// assert_eq!(consumed, 5);
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct ReplyParser;

impl ReplyParser {
    pub fn new() -> Self {
        ReplyParser
    }

    /// Parses the reply at the front of `buf`.
    pub fn parse(&self, buf: &[u8]) -> ParseResult<Option<(Reply, usize)>> {
        let mut cursor = Cursor { buf, pos: 0 };
        let reply = need!(read_reply(&mut cursor, 0)?);
        Ok(Some((reply, cursor.pos)))
    }
}

/// One step of a reply: a finished value, or the header of an array whose
/// elements follow.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Frame {
    Value(Reply),
    ArrayStart(usize),
}

/// Parses the frame at the front of `buf` without descending into arrays.
///
/// Lets a caller keep partially built arrays between reads and never look
/// at an element twice.
pub(crate) fn parse_frame(buf: &[u8]) -> ParseResult<Option<(Frame, usize)>> {
    let mut cursor = Cursor { buf, pos: 0 };
    let frame = need!(read_frame(&mut cursor)?);
    Ok(Some((frame, cursor.pos)))
}

/// Total wire length of the bulk string starting `buf`, once its header
/// has arrived.
pub(crate) fn declared_bulk_len(buf: &[u8]) -> Option<usize> {
    const MAX_HEADER: usize = 32;
    if buf.first() != Some(&prefix::BULK_STRING) {
        return None;
    }
    let mut cursor = Cursor {
        buf: &buf[..buf.len().min(MAX_HEADER)],
        pos: 1,
    };
    match cursor.number() {
        Ok(Some(len)) if (0..=MAX_BULK_SIZE as i64).contains(&len) => {
            Some(cursor.pos + len as usize + CRLF.len())
        }
        _ => None,
    }
}

fn read_frame(cursor: &mut Cursor<'_>) -> ParseResult<Option<Frame>> {
    let reply = match need!(cursor.next_byte()) {
        prefix::STATUS => Reply::Status(Bytes::copy_from_slice(need!(cursor.line()))),
        prefix::ERROR => Reply::Error(Bytes::copy_from_slice(need!(cursor.line()))),
        prefix::INTEGER => Reply::Integer(need!(cursor.number()?)),
        prefix::BULK_STRING => need!(read_bulk(cursor)?),
        prefix::ARRAY => match need!(cursor.number()?) {
            -1 => Reply::Nil,
            n if n < 0 => return Err(ParseError::InvalidLength(n)),
            n => return Ok(Some(Frame::ArrayStart(n as usize))),
        },
        other => return Err(ParseError::UnknownPrefix(other)),
    };
    Ok(Some(Frame::Value(reply)))
}

fn read_reply(cursor: &mut Cursor<'_>, depth: usize) -> ParseResult<Option<Reply>> {
    match need!(read_frame(cursor)?) {
        Frame::Value(reply) => Ok(Some(reply)),
        Frame::ArrayStart(count) => read_elements(cursor, count, depth),
    }
}

/// `$<len>\r\n<bytes>\r\n`, or `$-1\r\n` for nil.
fn read_bulk(cursor: &mut Cursor<'_>) -> ParseResult<Option<Reply>> {
    let len = match need!(cursor.number()?) {
        -1 => return Ok(Some(Reply::Nil)),
        n if n < 0 => return Err(ParseError::InvalidLength(n)),
        n => n as usize,
    };
    if len > MAX_BULK_SIZE {
        return Err(ParseError::TooLarge {
            size: len,
            max: MAX_BULK_SIZE,
        });
    }

    let data = need!(cursor.take(len));
    if need!(cursor.take(CRLF.len())) != CRLF {
        return Err(ParseError::MissingTerminator);
    }
    Ok(Some(Reply::String(Bytes::copy_from_slice(data))))
}

fn read_elements(cursor: &mut Cursor<'_>, count: usize, depth: usize) -> ParseResult<Option<Reply>> {
    if depth >= MAX_NESTING_DEPTH {
        return Err(ParseError::TooDeep(MAX_NESTING_DEPTH));
    }

    let mut elements = Vec::with_capacity(element_capacity(count, cursor.buf.len() - cursor.pos));
    for _ in 0..count {
        elements.push(need!(read_reply(cursor, depth + 1)?));
    }
    Ok(Some(Reply::Array(elements)))
}

/// Every element needs at least 3 bytes; a bogus count must not reserve
/// more than `available` bytes could ever hold.
pub(crate) fn element_capacity(count: usize, available: usize) -> usize {
    count.min(available / 3)
}

/// Parses one reply from the front of `buf`.
pub fn parse_reply(buf: &[u8]) -> ParseResult<Option<(Reply, usize)>> {
    ReplyParser::new().parse(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete(input: &[u8]) -> (Reply, usize) {
        parse_reply(input)
            .expect("valid RESP")
            .expect("complete reply")
    }

    #[test]
    fn test_status_and_error_lines() {
        assert_eq!(complete(b"+OK\r\n"), (Reply::ok(), 5));
        assert_eq!(
            complete(b"-ERR unknown command\r\n"),
            (Reply::error("ERR unknown command"), 22)
        );
    }

    #[test]
    fn test_status_bytes_kept_raw() {
        let (reply, _) = complete(b"+\xff\xfe\r\n");
        assert_eq!(reply, Reply::Status(Bytes::from_static(b"\xff\xfe")));
    }

    #[test]
    fn test_integers() {
        assert_eq!(complete(b":1000\r\n"), (Reply::Integer(1000), 7));
        assert_eq!(complete(b":-42\r\n").0, Reply::Integer(-42));
        assert_eq!(
            parse_reply(b":12a\r\n"),
            Err(ParseError::InvalidInteger("12a".to_string()))
        );
    }

    #[test]
    fn test_bulk_strings() {
        assert_eq!(complete(b"$5\r\nhello\r\n"), (Reply::string("hello"), 11));
        assert_eq!(complete(b"$0\r\n\r\n"), (Reply::string(""), 6));
        assert_eq!(
            complete(b"$5\r\nhel\x00o\r\n").0,
            Reply::string(&b"hel\x00o"[..])
        );
    }

    #[test]
    fn test_bulk_string_bad_terminator() {
        assert_eq!(parse_reply(b"$2\r\nabXY"), Err(ParseError::MissingTerminator));
    }

    #[test]
    fn test_bulk_string_over_limit() {
        let header = format!("${}\r\n", MAX_BULK_SIZE + 1);
        assert!(matches!(
            parse_reply(header.as_bytes()),
            Err(ParseError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_nil_forms() {
        assert_eq!(complete(b"$-1\r\n"), (Reply::Nil, 5));
        assert_eq!(complete(b"*-1\r\n"), (Reply::Nil, 5));
        assert_eq!(parse_reply(b"$-2\r\n"), Err(ParseError::InvalidLength(-2)));
        assert_eq!(parse_reply(b"*-5\r\n"), Err(ParseError::InvalidLength(-5)));
    }

    #[test]
    fn test_incomplete_input() {
        let inputs: [&[u8]; 10] = [
            b"",
            b"+OK",
            b"+OK\r",
            b":12",
            b"$5",
            b"$5\r\nhel",
            b"$5\r\nhello",
            b"$5\r\nhello\r",
            b"*2\r\n:1\r\n",
            b"*2\r\n:1\r\n*1\r\n",
        ];
        for input in inputs {
            assert_eq!(parse_reply(input), Ok(None), "input {:?}", input);
        }
    }

    #[test]
    fn test_arrays() {
        assert_eq!(complete(b"*0\r\n").0, Reply::Array(vec![]));

        let (reply, consumed) = complete(b"*2\r\n:1\r\n*2\r\n+a\r\n$-1\r\n");
        assert_eq!(
            reply,
            Reply::Array(vec![
                Reply::Integer(1),
                Reply::Array(vec![Reply::status("a"), Reply::Nil]),
            ])
        );
        assert_eq!(consumed, 21);
    }

    #[test]
    fn test_huge_array_count_with_little_data() {
        assert_eq!(parse_reply(b"*1000000000\r\n:1\r\n"), Ok(None));
    }

    #[test]
    fn test_unknown_prefix() {
        assert_eq!(parse_reply(b"@oops\r\n"), Err(ParseError::UnknownPrefix(b'@')));
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |levels: usize| {
            let mut input = b"*1\r\n".repeat(levels);
            input.extend_from_slice(b":1\r\n");
            input
        };
        assert!(parse_reply(&nested(MAX_NESTING_DEPTH)).unwrap().is_some());
        assert_eq!(
            parse_reply(&nested(MAX_NESTING_DEPTH + 1)),
            Err(ParseError::TooDeep(MAX_NESTING_DEPTH))
        );
    }

    #[test]
    fn test_consumes_only_the_first_reply() {
        let input = b"+OK\r\n:2\r\n$1\r\nx\r\n";
        let (first, consumed) = complete(input);
        assert_eq!(first, Reply::ok());
        let (second, more) = complete(&input[consumed..]);
        assert_eq!(second, Reply::Integer(2));
        assert_eq!(complete(&input[consumed + more..]).0, Reply::string("x"));
    }

    #[test]
    fn test_frames_stop_at_array_headers() {
        assert_eq!(
            parse_frame(b"*3\r\n:1\r\n"),
            Ok(Some((Frame::ArrayStart(3), 4)))
        );
        assert_eq!(
            parse_frame(b"*-1\r\n"),
            Ok(Some((Frame::Value(Reply::Nil), 5)))
        );
        assert_eq!(
            parse_frame(b":9\r\n"),
            Ok(Some((Frame::Value(Reply::Integer(9)), 4)))
        );
        assert_eq!(parse_frame(b"*3\r"), Ok(None));
    }

    #[test]
    fn test_declared_bulk_len() {
        assert_eq!(declared_bulk_len(b"$5\r\nhe"), Some(11));
        assert_eq!(declared_bulk_len(b"$0\r\n"), Some(6));
        assert_eq!(declared_bulk_len(b"$5"), None);
        assert_eq!(declared_bulk_len(b"$-1\r\n"), None);
        assert_eq!(declared_bulk_len(b"+OK"), None);
    }
}
