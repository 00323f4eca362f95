//! Reply Sink contract.

use crate::connection::pipeline::Pipeline;
use crate::protocol::Reply;

/// Receives lifecycle notifications and replies from
/// [`Client::update`](crate::connection::Client::update).
///
/// Calls are synchronous and never overlap. Notifications are only ever
/// made from `update`, never from `connect` or `disconnect`.
pub trait ReplySink {
    /// Called exactly once per `connect()`: on success, timeout, or failure.
    fn on_connect(&mut self, _success: bool) {}

    /// Called when an open connection fails during `update`.
    fn on_disconnect(&mut self) {}

    /// Called once per decoded reply, in the order commands were sent.
    ///
    /// Commands enqueued through `pipeline` are written on the next flush.
    fn on_reply(&mut self, reply: Reply, pipeline: &mut Pipeline);
}

/// A notification as a plain value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Connect(bool),
    Disconnect,
    Reply(Reply),
}

/// Collects every notification, in order.
impl ReplySink for Vec<SinkEvent> {
    fn on_connect(&mut self, success: bool) {
        self.push(SinkEvent::Connect(success));
    }

    fn on_disconnect(&mut self) {
        self.push(SinkEvent::Disconnect);
    }

    fn on_reply(&mut self, reply: Reply, _pipeline: &mut Pipeline) {
        self.push(SinkEvent::Reply(reply));
    }
}
