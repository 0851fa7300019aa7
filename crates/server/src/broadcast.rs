//! Message fan-out.
//!
//! Relay operations return [`Outbound`] values; delivery happens here,
//! through whatever transport the embedding process provides via
//! [`MessageSink`]. A broadcast is encoded exactly once, so every recipient
//! receives byte-identical frames.
//!
//! Delivery is best-effort per connection: a send failure (the connection is
//! mid-teardown, its buffer is gone) is logged and skipped. It never aborts
//! the rest of the batch and never propagates into the operation that
//! triggered the broadcast.

use prost::Message as _;
use relaychess_wire::{ServerEnvelope, ServerMsg};
use tracing::warn;

use crate::session::ConnectionId;

/// Who a message is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    One(ConnectionId),
    All,
}

/// One message produced by a relay operation, not yet delivered.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub to: Recipient,
    pub msg: ServerMsg,
}

impl Outbound {
    pub fn one(conn: ConnectionId, msg: ServerMsg) -> Self {
        Self {
            to: Recipient::One(conn),
            msg,
        }
    }

    pub fn all(msg: ServerMsg) -> Self {
        Self {
            to: Recipient::All,
            msg,
        }
    }
}

/// The connection's send half is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkClosed;

/// Transport-side send capability, one frame to one connection.
///
/// Send is fire-and-forget; implementations must not block on delivery
/// acknowledgment.
pub trait MessageSink {
    fn send(&mut self, conn: ConnectionId, frame: &[u8]) -> Result<(), SinkClosed>;
}

/// Deliver a batch of outbound messages.
///
/// `connections` is the session's current membership, used to expand
/// [`Recipient::All`].
pub fn deliver<S: MessageSink>(outbound: &[Outbound], connections: &[ConnectionId], sink: &mut S) {
    for out in outbound {
        let frame = ServerEnvelope {
            msg: Some(out.msg.clone()),
        }
        .encode_to_vec();

        match out.to {
            Recipient::One(conn) => send_one(sink, conn, &frame),
            Recipient::All => {
                for &conn in connections {
                    send_one(sink, conn, &frame);
                }
            }
        }
    }
}

fn send_one<S: MessageSink>(sink: &mut S, conn: ConnectionId, frame: &[u8]) {
    if sink.send(conn, frame).is_err() {
        warn!(conn, "dropping frame for closed connection");
    }
}
