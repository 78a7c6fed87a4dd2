//! The message bus — one bounded queue per directed connection.
//!
//! Owned by the driver; agents only hold the [`Connection`] keys they were
//! wired with. Queues are lossy at the bounds: a full channel drops its
//! oldest entry, and the listen phase clears whatever it did not drain.

use std::collections::{HashMap, VecDeque};

use tangle_types::TxId;
use tracing::trace;

use crate::error::NetworkError;
use crate::topology::{Connection, Topology};

/// Default per-connection channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// Registry of per-connection gossip channels.
pub struct MessageBus {
    channels: HashMap<Connection, VecDeque<TxId>>,
    capacity: usize,
}

impl MessageBus {
    /// Create an empty bus whose channels hold at most `capacity` ids each.
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: HashMap::new(),
            capacity,
        }
    }

    /// Create a bus with one channel per connection in `topology`.
    pub fn for_topology(topology: &Topology, capacity: usize) -> Self {
        let mut bus = Self::new(capacity);
        for conn in topology.connections() {
            bus.register(*conn);
        }
        bus
    }

    /// Register a connection, creating its (empty) channel.
    pub fn register(&mut self, conn: Connection) {
        self.channels.entry(conn).or_default();
    }

    /// Append an id to a connection's channel, dropping the oldest entry if
    /// the channel is full.
    pub fn push(&mut self, conn: Connection, id: TxId) -> Result<(), NetworkError> {
        let channel = self
            .channels
            .get_mut(&conn)
            .ok_or(NetworkError::UnknownConnection(conn))?;
        if channel.len() >= self.capacity {
            channel.pop_front();
            trace!(%conn, "channel full, dropping oldest");
        }
        channel.push_back(id);
        Ok(())
    }

    /// Take the oldest id off a connection's channel.
    pub fn pop(&mut self, conn: Connection) -> Option<TxId> {
        self.channels.get_mut(&conn).and_then(VecDeque::pop_front)
    }

    /// Discard everything left on a connection's channel.
    pub fn clear(&mut self, conn: Connection) {
        if let Some(channel) = self.channels.get_mut(&conn) {
            channel.clear();
        }
    }

    /// Number of ids pending on a connection's channel.
    pub fn pending(&self, conn: Connection) -> usize {
        self.channels.get(&conn).map(VecDeque::len).unwrap_or(0)
    }

    pub fn is_registered(&self, conn: Connection) -> bool {
        self.channels.contains_key(&conn)
    }
}
