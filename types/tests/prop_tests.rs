use proptest::prelude::*;

use tangle_types::{AgentId, Timestep, TxId};

proptest! {
    /// TxId roundtrip: new -> as_bytes -> new produces identical id.
    #[test]
    fn tx_id_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let id = TxId::new(bytes);
        prop_assert_eq!(id.as_bytes(), &bytes);
    }

    /// The conjugate transform is involutive and never a fixed point.
    #[test]
    fn conjugate_is_an_involution(bytes in prop::array::uniform32(0u8..)) {
        let id = TxId::new(bytes);
        prop_assert_ne!(id.conjugate(), id);
        prop_assert_eq!(id.conjugate().conjugate(), id);
    }

    /// Exactly one side of a conjugate pair carries the marker.
    #[test]
    fn conjugate_pair_has_one_marked_side(bytes in prop::array::uniform32(0u8..)) {
        let id = TxId::new(bytes);
        prop_assert_ne!(id.is_conjugate(), id.conjugate().is_conjugate());
    }

    /// Derivation is a pure function of its inputs.
    #[test]
    fn derivation_is_pure(
        creator in 0u32..10_000,
        at in 0u64..1_000_000,
        a in prop::array::uniform32(0u8..),
        b in prop::array::uniform32(0u8..),
    ) {
        let parents = [TxId::new(a), TxId::new(b)];
        let first = TxId::derive(Some(AgentId::new(creator)), Some(Timestep::new(at)), &parents);
        let second = TxId::derive(Some(AgentId::new(creator)), Some(Timestep::new(at)), &parents);
        prop_assert_eq!(first, second);
        // Derived ids never collide with their own conjugates by construction.
        prop_assert!(!first.is_conjugate());
    }

    /// Different creators never derive the same id.
    #[test]
    fn derivation_separates_creators(
        creator in 0u32..10_000,
        at in 0u64..1_000_000,
    ) {
        let first = TxId::derive(Some(AgentId::new(creator)), Some(Timestep::new(at)), &[]);
        let second = TxId::derive(Some(AgentId::new(creator + 1)), Some(Timestep::new(at)), &[]);
        prop_assert_ne!(first, second);
    }
}
