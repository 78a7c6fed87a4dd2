//! The tangle graph structure.
//!
//! Transactions live in a dense slot table; the id→slot index and the
//! per-slot adjacency lists replace the recursive memoized lookups of a
//! pointer-chasing design. Slots are tombstoned on removal so indices stay
//! stable. Within a round the graph is append-only; every structural
//! mutation bumps [`Tangle::revision`] so walk caches held elsewhere know
//! when to invalidate.

use std::collections::{HashMap, HashSet};

use tangle_types::{AgentId, Timestep, TxId};
use tracing::{trace, warn};

use crate::error::LedgerError;
use crate::transaction::Transaction;

struct Slot {
    tx: Transaction,
    /// Ordered, deduplicated parent edges. A transaction approving the same
    /// parent twice ([p, p]) contributes a single edge, while the record
    /// itself keeps the duplicate (see [`Transaction::parents`]).
    parent_edges: Vec<TxId>,
    children: Vec<TxId>,
    weight: u64,
    removed: bool,
}

/// The append-only transaction DAG with tip and weight bookkeeping.
pub struct Tangle {
    slots: Vec<Slot>,
    index: HashMap<TxId, usize>,
    /// Tips in insertion order — recency-biased selection modes index from
    /// the back, so order must be preserved across removals.
    tips: Vec<TxId>,
    tip_set: HashSet<TxId>,
    blacklist: HashSet<TxId>,
    genesis: TxId,
    revision: u64,
    recorded_tips: usize,
}

impl Tangle {
    /// Create a graph containing only the genesis transaction, which starts
    /// as the sole tip.
    pub fn new() -> Self {
        let genesis = Transaction::genesis();
        let genesis_id = genesis.id();
        let mut index = HashMap::new();
        index.insert(genesis_id, 0);
        Self {
            slots: vec![Slot {
                tx: genesis,
                parent_edges: Vec::new(),
                children: Vec::new(),
                weight: 0,
                removed: false,
            }],
            index,
            tips: vec![genesis_id],
            tip_set: HashSet::from([genesis_id]),
            blacklist: HashSet::new(),
            genesis: genesis_id,
            revision: 0,
            recorded_tips: 1,
        }
    }

    /// The genesis transaction id.
    pub fn genesis(&self) -> TxId {
        self.genesis
    }

    /// Insert an existing transaction record.
    ///
    /// Every parent must already be present ([`LedgerError::UnknownParent`]
    /// otherwise — checked before any mutation). Re-inserting a known id is
    /// a no-op: ids are content-derived, so the record cannot differ.
    /// The new transaction enters the tip set; each parent gains a child
    /// edge and leaves the tip set.
    pub fn insert(&mut self, tx: Transaction) -> Result<(), LedgerError> {
        let id = tx.id();
        if self.index.contains_key(&id) {
            trace!(tx = ?id, "already present, skipping insert");
            return Ok(());
        }

        let mut parent_edges: Vec<TxId> = Vec::with_capacity(tx.parents().len());
        for parent in tx.parents() {
            if !self.index.contains_key(parent) {
                return Err(LedgerError::UnknownParent(*parent));
            }
            if !parent_edges.contains(parent) {
                parent_edges.push(*parent);
            }
        }

        let slot_idx = self.slots.len();
        for parent in &parent_edges {
            let parent_idx = self.index[parent];
            self.slots[parent_idx].children.push(id);
            self.drop_tip(parent);
        }
        self.slots.push(Slot {
            tx,
            parent_edges,
            children: Vec::new(),
            weight: 0,
            removed: false,
        });
        self.index.insert(id, slot_idx);
        self.tips.push(id);
        self.tip_set.insert(id);
        self.revision += 1;
        Ok(())
    }

    /// Derive and insert a new transaction, returning its id.
    pub fn add(
        &mut self,
        creator: AgentId,
        timestamp: Timestep,
        parents: Vec<TxId>,
    ) -> Result<TxId, LedgerError> {
        for parent in &parents {
            if !self.index.contains_key(parent) {
                return Err(LedgerError::UnknownParent(*parent));
            }
        }
        let tx = Transaction::new(creator, timestamp, parents);
        let id = tx.id();
        self.insert(tx)?;
        Ok(id)
    }

    /// Remove a transaction and, transitively, everything that approves it.
    ///
    /// Every removed id is permanently blacklisted. Surviving parents left
    /// childless re-enter the tip set. The genesis transaction is never
    /// removed.
    pub fn remove(&mut self, id: TxId) {
        if id == self.genesis {
            warn!("refusing to remove the genesis transaction");
            return;
        }
        if !self.index.contains_key(&id) {
            self.blacklist.insert(id);
            return;
        }

        let mut detached_parents: Vec<TxId> = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(&slot_idx) = self.index.get(&current) else {
                continue;
            };
            self.blacklist.insert(current);
            self.drop_tip(&current);
            stack.extend(self.slots[slot_idx].children.iter().copied());

            let parent_edges = std::mem::take(&mut self.slots[slot_idx].parent_edges);
            for parent in parent_edges {
                if let Some(&parent_idx) = self.index.get(&parent) {
                    self.slots[parent_idx].children.retain(|c| *c != current);
                    if !detached_parents.contains(&parent) {
                        detached_parents.push(parent);
                    }
                }
            }

            self.slots[slot_idx].removed = true;
            self.slots[slot_idx].children.clear();
            self.index.remove(&current);
        }

        // A parent that lost its last approver is a tip again.
        for parent in detached_parents {
            if let Some(&parent_idx) = self.index.get(&parent) {
                if self.slots[parent_idx].children.is_empty() && !self.tip_set.contains(&parent) {
                    self.tips.push(parent);
                    self.tip_set.insert(parent);
                }
            }
        }
        self.revision += 1;
    }

    /// Ordered direct predecessors of `id` (graph edges, deduplicated).
    /// Empty if the id is absent.
    pub fn parents(&self, id: TxId) -> &[TxId] {
        match self.index.get(&id) {
            Some(&idx) => &self.slots[idx].parent_edges,
            None => &[],
        }
    }

    /// Ordered direct successors of `id`. Empty if the id is absent.
    pub fn children(&self, id: TxId) -> &[TxId] {
        match self.index.get(&id) {
            Some(&idx) => &self.slots[idx].children,
            None => &[],
        }
    }

    /// The current tip set in insertion order.
    pub fn tips(&self) -> &[TxId] {
        &self.tips
    }

    /// Record the tip-set size for observability; structurally a no-op.
    /// Called once per round by the driver.
    pub fn step(&mut self, now: Timestep) {
        self.recorded_tips = self.tips.len();
        trace!(%now, tips = self.recorded_tips, "tip census");
    }

    /// The tip count captured by the last [`Tangle::step`] call.
    pub fn recorded_tip_count(&self) -> usize {
        self.recorded_tips
    }

    /// Whether a descendant path exists from `from` to `to`.
    pub fn is_reachable(&self, from: TxId, to: TxId) -> bool {
        if !self.index.contains_key(&from) || !self.index.contains_key(&to) {
            return false;
        }
        if from == to {
            return true;
        }
        let mut visited: HashSet<TxId> = HashSet::new();
        let mut stack = vec![from];
        while let Some(current) = stack.pop() {
            for child in self.children(current) {
                if *child == to {
                    return true;
                }
                if visited.insert(*child) {
                    stack.push(*child);
                }
            }
        }
        false
    }

    /// The stochastic cumulative weight counter for `id` (0 if absent).
    ///
    /// This is a walk-bias byproduct, not an exact approver count — see the
    /// tip-selection walk, which bumps it.
    pub fn cumulative_weight(&self, id: TxId) -> u64 {
        match self.index.get(&id) {
            Some(&idx) => self.slots[idx].weight,
            None => 0,
        }
    }

    /// Increment the cumulative weight counter for `id`.
    pub fn bump_weight(&mut self, id: TxId) {
        if let Some(&idx) = self.index.get(&id) {
            self.slots[idx].weight += 1;
        }
    }

    pub fn contains(&self, id: TxId) -> bool {
        self.index.contains_key(&id)
    }

    /// Permanently exclude an id from this graph, without removing anything.
    /// Used to suppress a transaction before it is ever integrated.
    pub fn blacklist(&mut self, id: TxId) {
        self.blacklist.insert(id);
    }

    pub fn is_blacklisted(&self, id: TxId) -> bool {
        self.blacklist.contains(&id)
    }

    /// Fetch the transaction record for `id`.
    pub fn transaction(&self, id: TxId) -> Option<&Transaction> {
        self.index.get(&id).map(|&idx| &self.slots[idx].tx)
    }

    /// Number of live transactions (genesis included).
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Bumped on every structural mutation; lets walk caches detect staleness.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn drop_tip(&mut self, id: &TxId) {
        if self.tip_set.remove(id) {
            self.tips.retain(|t| t != id);
        }
    }
}

impl Default for Tangle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_tx(graph: &mut Tangle, creator: u32, at: u64, parents: Vec<TxId>) -> TxId {
        graph
            .add(AgentId::new(creator), Timestep::new(at), parents)
            .expect("parents should exist")
    }

    /// Full-scan check: the maintained tip set equals the zero-children set.
    fn assert_tips_consistent(graph: &Tangle) {
        let mut scanned: Vec<TxId> = Vec::new();
        for (&id, _) in graph.index.iter() {
            if graph.children(id).is_empty() {
                scanned.push(id);
            }
        }
        let mut maintained = graph.tips().to_vec();
        scanned.sort();
        maintained.sort();
        assert_eq!(maintained, scanned);
    }

    #[test]
    fn new_graph_has_only_genesis_as_tip() {
        let graph = Tangle::new();
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.tips(), &[graph.genesis()]);
        assert!(graph.contains(graph.genesis()));
    }

    #[test]
    fn insert_moves_tip_from_parent_to_child() {
        let mut graph = Tangle::new();
        let g = graph.genesis();
        let t1 = add_tx(&mut graph, 0, 1, vec![g, g]);

        assert_eq!(graph.tips(), &[t1]);
        assert_eq!(graph.children(g), &[t1]);
        assert_eq!(graph.parents(t1), &[g]); // [g, g] is a single edge
        assert_tips_consistent(&graph);
    }

    #[test]
    fn unknown_parent_rejected_without_mutation() {
        let mut graph = Tangle::new();
        let ghost = TxId::new([9; 32]);
        let before = graph.len();

        let result = graph.add(AgentId::new(0), Timestep::new(1), vec![ghost, graph.genesis()]);
        assert!(matches!(result, Err(LedgerError::UnknownParent(p)) if p == ghost));
        assert_eq!(graph.len(), before);
        assert_eq!(graph.tips(), &[graph.genesis()]);
    }

    #[test]
    fn reinsert_is_a_noop() {
        let mut graph = Tangle::new();
        let g = graph.genesis();
        let tx = Transaction::new(AgentId::new(0), Timestep::new(1), vec![g, g]);
        graph.insert(tx.clone()).unwrap();
        let len = graph.len();
        let tips = graph.tips().to_vec();

        graph.insert(tx).unwrap();
        assert_eq!(graph.len(), len);
        assert_eq!(graph.tips(), tips.as_slice());
    }

    #[test]
    fn round_trip_preserves_creation_fields() {
        let mut graph = Tangle::new();
        let g = graph.genesis();
        let id = add_tx(&mut graph, 7, 13, vec![g, g]);

        let tx = graph.transaction(id).expect("present");
        assert_eq!(tx.creator(), Some(AgentId::new(7)));
        assert_eq!(tx.timestamp(), Some(Timestep::new(13)));
        assert_eq!(tx.parents(), &[g, g]);
    }

    #[test]
    fn remove_cascades_and_blacklists() {
        // g ← t1 ← t2 : removing t1 takes t2 with it, re-tipping g.
        let mut graph = Tangle::new();
        let g = graph.genesis();
        let t1 = add_tx(&mut graph, 0, 1, vec![g, g]);
        let t2 = add_tx(&mut graph, 0, 2, vec![t1, t1]);
        assert_eq!(graph.tips(), &[t2]);

        graph.remove(t1);

        assert!(!graph.contains(t1));
        assert!(!graph.contains(t2));
        assert!(graph.is_blacklisted(t1));
        assert!(graph.is_blacklisted(t2));
        assert_eq!(graph.tips(), &[g]);
        assert_eq!(graph.children(g), &[] as &[TxId]);
        assert_tips_consistent(&graph);
    }

    #[test]
    fn remove_leaves_siblings_intact() {
        //      g
        //     / \
        //   t1   t2     removing t1 must not disturb t2.
        let mut graph = Tangle::new();
        let g = graph.genesis();
        let t1 = add_tx(&mut graph, 0, 1, vec![g, g]);
        let t2 = add_tx(&mut graph, 1, 1, vec![g, g]);

        graph.remove(t1);

        assert!(!graph.contains(t1));
        assert!(graph.contains(t2));
        // g still has an approver, so it must not re-enter the tip set.
        assert_eq!(graph.tips(), &[t2]);
        assert_tips_consistent(&graph);
    }

    #[test]
    fn remove_diamond_descendants() {
        //      g
        //     / \
        //   t1   t2
        //     \ /
        //      t3     removing t2 removes t3; t1 becomes a tip again.
        let mut graph = Tangle::new();
        let g = graph.genesis();
        let t1 = add_tx(&mut graph, 0, 1, vec![g, g]);
        let t2 = add_tx(&mut graph, 1, 1, vec![g, g]);
        let t3 = add_tx(&mut graph, 2, 2, vec![t1, t2]);
        assert_eq!(graph.tips(), &[t3]);

        graph.remove(t2);

        assert!(graph.contains(t1));
        assert!(!graph.contains(t2));
        assert!(!graph.contains(t3));
        assert_eq!(graph.tips(), &[t1]);
        assert_tips_consistent(&graph);
    }

    #[test]
    fn genesis_is_never_removed() {
        let mut graph = Tangle::new();
        let g = graph.genesis();
        add_tx(&mut graph, 0, 1, vec![g, g]);

        graph.remove(g);
        assert!(graph.contains(g));
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn removing_absent_id_still_blacklists_it() {
        let mut graph = Tangle::new();
        let ghost = TxId::new([3; 32]);
        graph.remove(ghost);
        assert!(graph.is_blacklisted(ghost));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn reachability_follows_approval_edges() {
        let mut graph = Tangle::new();
        let g = graph.genesis();
        let t1 = add_tx(&mut graph, 0, 1, vec![g, g]);
        let t2 = add_tx(&mut graph, 1, 1, vec![g, g]);
        let t3 = add_tx(&mut graph, 2, 2, vec![t1, t1]);

        assert!(graph.is_reachable(g, t3));
        assert!(graph.is_reachable(t1, t3));
        assert!(!graph.is_reachable(t2, t3));
        assert!(!graph.is_reachable(t3, g));
        assert!(graph.is_reachable(t2, t2));
        assert!(!graph.is_reachable(t1, TxId::new([8; 32])));
    }

    #[test]
    fn weight_bumps_accumulate() {
        let mut graph = Tangle::new();
        let g = graph.genesis();
        assert_eq!(graph.cumulative_weight(g), 0);
        graph.bump_weight(g);
        graph.bump_weight(g);
        assert_eq!(graph.cumulative_weight(g), 2);
        // Absent ids have zero weight and bumps on them are ignored.
        let ghost = TxId::new([4; 32]);
        graph.bump_weight(ghost);
        assert_eq!(graph.cumulative_weight(ghost), 0);
    }

    #[test]
    fn revision_tracks_structural_changes() {
        let mut graph = Tangle::new();
        let g = graph.genesis();
        let r0 = graph.revision();
        let t1 = add_tx(&mut graph, 0, 1, vec![g, g]);
        assert!(graph.revision() > r0);

        let r1 = graph.revision();
        graph.bump_weight(t1); // weight is not structure
        assert_eq!(graph.revision(), r1);

        graph.remove(t1);
        assert!(graph.revision() > r1);
    }

    #[test]
    fn step_records_tip_count() {
        let mut graph = Tangle::new();
        let g = graph.genesis();
        add_tx(&mut graph, 0, 1, vec![g, g]);
        add_tx(&mut graph, 1, 1, vec![g, g]);
        graph.step(Timestep::new(1));
        assert_eq!(graph.recorded_tip_count(), 2);
    }

    #[test]
    fn tips_preserve_insertion_order() {
        let mut graph = Tangle::new();
        let g = graph.genesis();
        let t1 = add_tx(&mut graph, 0, 1, vec![g, g]);
        let t2 = add_tx(&mut graph, 1, 2, vec![g, g]);
        let t3 = add_tx(&mut graph, 2, 3, vec![g, g]);
        assert_eq!(graph.tips(), &[t1, t2, t3]);

        // Approving t2 removes it without disturbing the order of the rest.
        let t4 = add_tx(&mut graph, 3, 4, vec![t2, t2]);
        assert_eq!(graph.tips(), &[t1, t3, t4]);
    }
}
