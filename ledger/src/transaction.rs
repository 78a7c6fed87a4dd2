//! The immutable transaction record.

use serde::{Deserialize, Serialize};
use tangle_types::{AgentId, Timestep, TxId};

/// A single transaction in the tangle.
///
/// Once created, the id, creator, timestamp, and parent list never change.
/// Only the genesis transaction has no creator, no timestamp, and no parents;
/// every other transaction approves exactly two parents (which may repeat —
/// both approvals can point at the same transaction).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transaction {
    id: TxId,
    creator: Option<AgentId>,
    timestamp: Option<Timestep>,
    parents: Vec<TxId>,
}

impl Transaction {
    /// Create a transaction, deriving its id from the content.
    ///
    /// Pure — no graph is touched; insertion happens separately via
    /// [`crate::Tangle::insert`].
    pub fn new(creator: AgentId, timestamp: Timestep, parents: Vec<TxId>) -> Self {
        let id = TxId::derive(Some(creator), Some(timestamp), &parents);
        Self {
            id,
            creator: Some(creator),
            timestamp: Some(timestamp),
            parents,
        }
    }

    /// Create a transaction carrying a precomputed id.
    ///
    /// Used for the double-spend conjugate, whose id is the conjugate of an
    /// existing transaction rather than a fresh content hash.
    pub fn with_id(
        id: TxId,
        creator: AgentId,
        timestamp: Timestep,
        parents: Vec<TxId>,
    ) -> Self {
        Self {
            id,
            creator: Some(creator),
            timestamp: Some(timestamp),
            parents,
        }
    }

    /// The unique genesis transaction: no creator, no timestamp, no parents.
    pub fn genesis() -> Self {
        Self {
            id: TxId::derive(None, None, &[]),
            creator: None,
            timestamp: None,
            parents: Vec::new(),
        }
    }

    pub fn id(&self) -> TxId {
        self.id
    }

    pub fn creator(&self) -> Option<AgentId> {
        self.creator
    }

    pub fn timestamp(&self) -> Option<Timestep> {
        self.timestamp
    }

    /// The exact ordered parent list supplied at creation.
    pub fn parents(&self) -> &[TxId] {
        &self.parents
    }

    pub fn is_genesis(&self) -> bool {
        self.parents.is_empty()
    }
}
