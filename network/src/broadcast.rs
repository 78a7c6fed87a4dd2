//! Per-agent outbound broadcast queue.
//!
//! A bounded ring: when a new id is pushed onto a full queue, the oldest
//! entry is evicted — an agent that falls behind forgets its oldest unsent
//! gossip rather than growing without bound.

use std::collections::VecDeque;

use tangle_types::TxId;
use tracing::trace;

/// Default broadcast backlog per agent.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 100;

/// Oldest-evicted ring buffer of transaction ids awaiting gossip.
pub struct BroadcastQueue {
    items: VecDeque<TxId>,
    capacity: usize,
}

impl BroadcastQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Enqueue an id for broadcast, evicting the oldest entry when full.
    /// Returns the evicted id, if any.
    pub fn push(&mut self, id: TxId) -> Option<TxId> {
        let evicted = if self.items.len() >= self.capacity {
            let old = self.items.pop_front();
            if let Some(old) = old {
                trace!(evicted = ?old, "broadcast backlog full, dropping oldest");
            }
            old
        } else {
            None
        };
        self.items.push_back(id);
        evicted
    }

    /// Dequeue the oldest pending id.
    pub fn pop(&mut self) -> Option<TxId> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for BroadcastQueue {
    fn default() -> Self {
        Self::new(DEFAULT_BROADCAST_CAPACITY)
    }
}
