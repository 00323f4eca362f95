//! Embedder Flattening Policies
//!
//! Host environments rarely want [`Reply`] as is. Two common shapes are
//! provided here:
//!
//! - [`TaggedReply`]: keeps the reply kind next to its payload, for hosts that
//!   need to tell a status from a bulk string or an error from a value.
//! - [`LooseValue`]: collapses text-like replies into plain bytes and nil into
//!   `false`, for hosts that only care about the data.

use crate::protocol::types::Reply;
use bytes::Bytes;

/// A reply with its kind spelled out.
///
/// Only the fields relevant to the kind are set. Arrays carry `elements` and
/// no kind tag.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaggedReply {
    pub kind: Option<&'static str>,
    pub str: Option<Bytes>,
    pub integer: Option<i64>,
    pub elements: Option<Vec<TaggedReply>>,
}

impl From<Reply> for TaggedReply {
    fn from(reply: Reply) -> Self {
        let kind = reply.kind();
        match reply {
            Reply::String(s) | Reply::Status(s) | Reply::Error(s) => TaggedReply {
                kind: Some(kind),
                str: Some(s),
                ..Default::default()
            },
            Reply::Integer(n) => TaggedReply {
                kind: Some(kind),
                integer: Some(n),
                ..Default::default()
            },
            Reply::Nil => TaggedReply {
                kind: Some(kind),
                ..Default::default()
            },
            Reply::Array(items) => TaggedReply {
                elements: Some(items.into_iter().map(TaggedReply::from).collect()),
                ..Default::default()
            },
        }
    }
}

/// A reply reduced to plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LooseValue {
    /// Bulk string, status or error text.
    Bytes(Bytes),
    Integer(i64),
    /// Only ever `false`; nil maps here.
    Bool(bool),
    List(Vec<LooseValue>),
}

impl From<Reply> for LooseValue {
    fn from(reply: Reply) -> Self {
        match reply {
            Reply::String(s) | Reply::Status(s) | Reply::Error(s) => LooseValue::Bytes(s),
            Reply::Integer(n) => LooseValue::Integer(n),
            Reply::Nil => LooseValue::Bool(false),
            Reply::Array(items) => {
                LooseValue::List(items.into_iter().map(LooseValue::from).collect())
            }
        }
    }
}
