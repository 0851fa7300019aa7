//! Shared-relay wrapper for threaded dispatchers.
//!
//! Each relay operation reads then mutates session state, so two operations
//! interleaving on the same relay would race (validate against a stale board,
//! then apply). A single-threaded event loop serializes them naturally; when
//! frames arrive from multiple worker threads, [`SharedRelay`] makes the
//! boundary explicit with one mutex around the whole relay. Operations hold
//! the lock for their full read-then-mutate span and never block on I/O
//! inside it.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::broadcast::Outbound;
use crate::session::ConnectionId;
use crate::{Relay, RelayConfig};

/// Cloneable handle to a mutex-guarded [`Relay`].
#[derive(Clone)]
pub struct SharedRelay {
    inner: Arc<Mutex<Relay>>,
}

impl SharedRelay {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Relay::new(config))),
        }
    }

    pub fn connect(&self) -> (ConnectionId, Vec<Outbound>) {
        self.inner.lock().connect()
    }

    pub fn disconnect(&self, conn: ConnectionId) -> Vec<Outbound> {
        self.inner.lock().disconnect(conn)
    }

    pub fn handle_frame(&self, conn: ConnectionId, frame: &[u8]) -> Vec<Outbound> {
        self.inner.lock().handle_frame(conn, frame)
    }

    /// Run a closure against the relay under the lock, for inspection.
    pub fn with<R>(&self, f: impl FnOnce(&Relay) -> R) -> R {
        f(&self.inner.lock())
    }
}
