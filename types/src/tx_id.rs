//! Content-derived transaction identifiers.
//!
//! A transaction id is the Blake2b-256 hash of the creating agent, the
//! logical timestamp, and the exact ordered list of parent ids. The genesis
//! transaction runs through the same derivation with none of the three.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::agent_id::AgentId;
use crate::time::Timestep;

type Blake2b256 = Blake2b<U32>;

/// Marker bit toggled by [`TxId::conjugate`]. Two ids that differ only in
/// this bit represent mutually exclusive spends of the same resource.
const CONJUGATE_MARK: u8 = 0x80;

/// A 32-byte content-derived transaction id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxId([u8; 32]);

impl TxId {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive the id of a transaction from its immutable content.
    ///
    /// The genesis transaction passes `None`, `None`, `&[]`.
    pub fn derive(creator: Option<AgentId>, timestamp: Option<Timestep>, parents: &[TxId]) -> Self {
        let mut hasher = Blake2b256::new();
        match creator {
            Some(agent) => {
                hasher.update([1u8]);
                hasher.update(agent.as_u32().to_le_bytes());
            }
            None => hasher.update([0u8]),
        }
        match timestamp {
            Some(at) => {
                hasher.update([1u8]);
                hasher.update(at.as_u64().to_le_bytes());
            }
            None => hasher.update([0u8]),
        }
        for parent in parents {
            hasher.update(parent.0);
        }
        let digest = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        // The marker bit is reserved for conjugate pairs; derived ids always
        // start on the unmarked side so a spend and its double-spend never
        // collide with two independent derivations.
        bytes[0] &= !CONJUGATE_MARK;
        Self(bytes)
    }

    /// The conjugate id: the other half of a mutually exclusive spend pair.
    ///
    /// Involutive — `id.conjugate().conjugate() == id`.
    pub fn conjugate(&self) -> Self {
        let mut bytes = self.0;
        bytes[0] ^= CONJUGATE_MARK;
        Self(bytes)
    }

    /// Whether this id sits on the marked (conjugate) side of its pair.
    pub fn is_conjugate(&self) -> bool {
        self.0[0] & CONJUGATE_MARK != 0
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

// Inline hex encoding to avoid adding the `hex` crate as a dependency of types.
mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let parents = [TxId::new([1u8; 32]), TxId::new([2u8; 32])];
        let a = TxId::derive(Some(AgentId::new(3)), Some(Timestep::new(7)), &parents);
        let b = TxId::derive(Some(AgentId::new(3)), Some(Timestep::new(7)), &parents);
        assert_eq!(a, b);
    }

    #[test]
    fn derivation_depends_on_every_field() {
        let parents = [TxId::new([1u8; 32]), TxId::new([2u8; 32])];
        let base = TxId::derive(Some(AgentId::new(3)), Some(Timestep::new(7)), &parents);

        let other_creator = TxId::derive(Some(AgentId::new(4)), Some(Timestep::new(7)), &parents);
        let other_time = TxId::derive(Some(AgentId::new(3)), Some(Timestep::new(8)), &parents);
        let swapped = [parents[1], parents[0]];
        let other_parents = TxId::derive(Some(AgentId::new(3)), Some(Timestep::new(7)), &swapped);

        assert_ne!(base, other_creator);
        assert_ne!(base, other_time);
        assert_ne!(base, other_parents);
    }

    #[test]
    fn genesis_derivation_is_stable() {
        let g1 = TxId::derive(None, None, &[]);
        let g2 = TxId::derive(None, None, &[]);
        assert_eq!(g1, g2);
    }

    #[test]
    fn conjugate_is_involutive() {
        let id = TxId::derive(Some(AgentId::new(1)), Some(Timestep::new(1)), &[]);
        assert_ne!(id, id.conjugate());
        assert_eq!(id, id.conjugate().conjugate());
    }

    #[test]
    fn derived_ids_are_unmarked() {
        let id = TxId::derive(Some(AgentId::new(9)), Some(Timestep::new(42)), &[]);
        assert!(!id.is_conjugate());
        assert!(id.conjugate().is_conjugate());
    }

    #[test]
    fn display_is_full_hex() {
        let id = TxId::new([0xab; 32]);
        assert_eq!(id.to_string().len(), 64);
        assert!(id.to_string().starts_with("abab"));
    }
}
