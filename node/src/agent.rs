//! Agent state and the per-round protocol.
//!
//! One `Agent` type covers both honest participants and the attacker: the
//! divergent behavior is two extra named actions plus a step-kind switch,
//! not a subtype. The shared global graph (ground truth written by every
//! agent's publish) and the message bus are owned by the driver and passed
//! in each round; the agent owns only its local graph, its broadcast
//! backlog, and its RNG.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Poisson};
use tracing::{debug, info, trace, warn};

use tangle_consensus::{conflict, SelectionMode, TipSelector};
use tangle_ledger::{Tangle, Transaction};
use tangle_network::{BroadcastQueue, Connection, MessageBus};
use tangle_types::{AgentId, Timestep, TxId};

use crate::config::AgentConfig;
use crate::error::NodeError;

/// Behavior mode of an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentMode {
    Honest,
    Adversary,
}

/// Which per-round protocol a step runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepKind {
    /// listen → transact → gossip.
    Standard,
    /// listen → double-spend → gossip. Adversary only, scheduled by the
    /// driver for the attack round.
    DoubleSpend,
}

/// What integration did with a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntegrationOutcome {
    /// The transaction is in the local graph; safe to relay.
    Kept,
    /// The transaction was suppressed (blacklisted, pruned branch, or lost
    /// conflict resolution). It must not be relayed.
    Rejected,
}

/// Attack bookkeeping, present only on adversary-mode agents.
#[derive(Clone, Debug, Default)]
struct AdversaryState {
    /// The honest-looking transaction that will later be double-spent.
    original: Option<TxId>,
    /// The conflicting conjugate, once the attack is launched.
    double_spend: Option<TxId>,
}

/// A participant in the simulated network.
pub struct Agent {
    id: AgentId,
    mode: AgentMode,
    adversary: Option<AdversaryState>,
    local: Tangle,
    selector: TipSelector,
    selection_mode: SelectionMode,
    check_conflicts: bool,
    rate: f64,
    bandwidth: usize,
    inbound: Vec<Connection>,
    outbound: Vec<Connection>,
    broadcast: BroadcastQueue,
    clock: Timestep,
    rng: StdRng,
}

impl Agent {
    /// Create an agent wired to the given connections.
    ///
    /// The local graph starts with the genesis transaction integrated — the
    /// derivation is deterministic, so every agent's genesis id matches the
    /// shared graph's.
    pub fn new(
        id: AgentId,
        mode: AgentMode,
        config: &AgentConfig,
        inbound: Vec<Connection>,
        outbound: Vec<Connection>,
        seed: u64,
    ) -> Self {
        Self {
            id,
            mode,
            adversary: match mode {
                AgentMode::Adversary => Some(AdversaryState::default()),
                AgentMode::Honest => None,
            },
            local: Tangle::new(),
            selector: TipSelector::new(config.n_sites, config.walk_depth, config.alpha),
            selection_mode: config.selection_mode,
            check_conflicts: config.check_conflicts,
            rate: config.rate,
            bandwidth: config.bandwidth,
            inbound,
            outbound,
            broadcast: BroadcastQueue::new(config.broadcast_capacity),
            clock: Timestep::ZERO,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Run one round of the protocol: listen, transact (or double-spend),
    /// gossip, then advance the logical clock.
    pub fn step(
        &mut self,
        kind: StepKind,
        global: &mut Tangle,
        bus: &mut MessageBus,
    ) -> Result<(), NodeError> {
        self.listen(global, bus)?;
        match kind {
            StepKind::Standard => self.transact(global)?,
            StepKind::DoubleSpend => match self.double_spend(global) {
                Ok(_) => {}
                // The attack aborts with state unchanged; the round goes on.
                Err(NodeError::NoDisjointTips) => {
                    warn!(agent = %self.id, "double-spend aborted: no disjoint tips");
                }
                Err(err) => return Err(err),
            },
        }
        self.gossip(bus)?;
        let now = self.clock;
        self.local.step(now);
        self.clock = self.clock.next();
        Ok(())
    }

    /// Listen phase: drain up to `bandwidth` ids round-robin across inbound
    /// connections, then clear every inbound queue — unread excess is
    /// dropped, modeling a lossy bounded channel rather than backpressure.
    fn listen(&mut self, global: &mut Tangle, bus: &mut MessageBus) -> Result<(), NodeError> {
        let mut incast: Vec<TxId> = Vec::with_capacity(self.bandwidth);
        if !self.inbound.is_empty() {
            'drain: loop {
                let mut empty = 0;
                for conn in &self.inbound {
                    if incast.len() >= self.bandwidth {
                        break 'drain;
                    }
                    match bus.pop(*conn) {
                        Some(id) => incast.push(id),
                        None => empty += 1,
                    }
                }
                if empty == self.inbound.len() {
                    break;
                }
            }
            for conn in &self.inbound {
                bus.clear(*conn);
            }
        }

        for id in incast {
            if self.local.contains(id) {
                continue;
            }
            if self.check_conflicts && self.local.is_blacklisted(id) {
                continue;
            }
            if let IntegrationOutcome::Kept = self.integrate(id, global)? {
                self.broadcast.push(id);
            }
        }
        Ok(())
    }

    /// Transact phase: mint a Poisson-distributed number of transactions,
    /// each approving two tips chosen from the local view.
    fn transact(&mut self, global: &mut Tangle) -> Result<(), NodeError> {
        let count = self.draw_mint_count();
        for _ in 0..count {
            let parents = self
                .selector
                .select_by_mode(self.selection_mode, &mut self.local, &mut self.rng)?;
            if parents.len() < 2 {
                break;
            }
            let tx = Transaction::new(self.id, self.clock, parents);
            let id = tx.id();
            self.publish(tx, global)?;
            if let IntegrationOutcome::Kept = self.integrate(id, global)? {
                self.broadcast.push(id);
            }
            trace!(agent = %self.id, tx = ?id, "minted transaction");
        }
        Ok(())
    }

    /// Gossip phase: pop up to `bandwidth` ids oldest-first and append each
    /// to every outbound connection's channel.
    fn gossip(&mut self, bus: &mut MessageBus) -> Result<(), NodeError> {
        for _ in 0..self.bandwidth {
            let Some(id) = self.broadcast.pop() else {
                break;
            };
            for conn in &self.outbound {
                bus.push(*conn, id)?;
            }
        }
        Ok(())
    }

    /// Insert a transaction into the shared global graph.
    fn publish(&self, tx: Transaction, global: &mut Tangle) -> Result<(), NodeError> {
        global.insert(tx)?;
        Ok(())
    }

    /// Integrate a transaction (and any locally missing ancestry, pulled
    /// from the shared graph) into the local view.
    ///
    /// Ancestry that cannot be resolved from the shared graph is a
    /// [`NodeError::DanglingReference`] — the shared graph is append-only,
    /// so a hole in it is a driver bug and surfaces as a hard failure.
    pub fn integrate(
        &mut self,
        id: TxId,
        global: &Tangle,
    ) -> Result<IntegrationOutcome, NodeError> {
        if self.check_conflicts && self.local.is_blacklisted(id) {
            return Ok(IntegrationOutcome::Rejected);
        }
        if self.local.contains(id) {
            return Ok(IntegrationOutcome::Kept);
        }

        // Missing ancestry, children after parents (iterative post-order).
        let mut order: Vec<TxId> = Vec::new();
        let mut pending: Vec<(TxId, bool)> = vec![(id, false)];
        let mut discovered: std::collections::HashSet<TxId> = std::collections::HashSet::new();
        while let Some((current, expanded)) = pending.pop() {
            if expanded {
                order.push(current);
                continue;
            }
            if self.local.contains(current) || !discovered.insert(current) {
                continue;
            }
            if self.check_conflicts && self.local.is_blacklisted(current) {
                // An ancestor was already pruned away locally; everything
                // built on it stays out.
                debug!(agent = %self.id, tx = ?current, "ancestry hits local blacklist");
                return Ok(IntegrationOutcome::Rejected);
            }
            let Some(tx) = global.transaction(current) else {
                return Err(NodeError::DanglingReference(current));
            };
            pending.push((current, true));
            for parent in tx.parents() {
                if !self.local.contains(*parent) {
                    pending.push((*parent, false));
                }
            }
        }

        for current in order {
            let record = global
                .transaction(current)
                .cloned()
                .ok_or(NodeError::DanglingReference(current))?;
            // Conflict resolution below may have pruned this branch already.
            if record
                .parents()
                .iter()
                .any(|parent| !self.local.contains(*parent))
            {
                return Ok(IntegrationOutcome::Rejected);
            }
            self.local.insert(record)?;

            if self.check_conflicts && conflict::has_conflict(&self.local, current) {
                let incumbent = current.conjugate();
                let winner = conflict::resolve(&self.local, incumbent, current);
                if winner == current {
                    self.local.remove(incumbent);
                } else {
                    self.local.remove(current);
                    debug!(agent = %self.id, tx = ?current, "integration lost conflict resolution");
                    return Ok(IntegrationOutcome::Rejected);
                }
            }
        }

        if self.local.contains(id) {
            Ok(IntegrationOutcome::Kept)
        } else {
            Ok(IntegrationOutcome::Rejected)
        }
    }

    /// Adversary action: mint a transaction but keep it locally suppressed.
    ///
    /// The transaction is published to the shared graph and queued for
    /// broadcast like any other, but the agent blacklists it in its own view
    /// so the later double-spend is not rejected as a duplicate of it — and
    /// records it as the "original" to be double-spent.
    pub fn single_spend(&mut self, global: &mut Tangle) -> Result<TxId, NodeError> {
        if self.adversary.is_none() {
            return Err(NodeError::NotAdversary);
        }
        let parents = self
            .selector
            .select_by_mode(self.selection_mode, &mut self.local, &mut self.rng)?;
        if parents.len() < 2 {
            return Err(NodeError::Other(
                "no tips available for the single-spend".into(),
            ));
        }
        let tx = Transaction::new(self.id, self.clock, parents);
        let id = tx.id();
        self.publish(tx, global)?;
        self.local.blacklist(id);
        self.broadcast.push(id);
        if let Some(state) = self.adversary.as_mut() {
            state.original = Some(id);
        }
        info!(agent = %self.id, tx = ?id, "made original transaction");
        Ok(id)
    }

    /// Adversary action: publish the conjugate of the recorded original,
    /// attached to global tips that do not approve the original.
    ///
    /// Fails with [`NodeError::NoDisjointTips`] when fewer than two such
    /// tips exist — the attack needs an independent branch to attach its
    /// conflicting claim to.
    pub fn double_spend(&mut self, global: &mut Tangle) -> Result<TxId, NodeError> {
        let Some(state) = self.adversary.as_ref() else {
            return Err(NodeError::NotAdversary);
        };
        let original = state.original.ok_or(NodeError::MissingOriginal)?;

        let disjoint: Vec<TxId> = global
            .tips()
            .iter()
            .copied()
            .filter(|tip| !global.is_reachable(original, *tip))
            .collect();
        if disjoint.len() < 2 {
            return Err(NodeError::NoDisjointTips);
        }

        let id = original.conjugate();
        let tx = Transaction::with_id(id, self.id, self.clock, disjoint[..2].to_vec());
        self.publish(tx, global)?;
        // The attack depends on resolution running from here on.
        self.check_conflicts = true;
        if let IntegrationOutcome::Kept = self.integrate(id, global)? {
            self.broadcast.push(id);
        }
        if let Some(state) = self.adversary.as_mut() {
            state.double_spend = Some(id);
        }
        info!(agent = %self.id, tx = ?id, "made double-spend transaction");
        Ok(id)
    }

    fn draw_mint_count(&mut self) -> u64 {
        if self.rate <= 0.0 {
            return 0;
        }
        match Poisson::new(self.rate) {
            Ok(dist) => dist.sample(&mut self.rng) as u64,
            Err(_) => 0,
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn mode(&self) -> AgentMode {
        self.mode
    }

    /// The agent's private view of the tangle.
    pub fn local(&self) -> &Tangle {
        &self.local
    }

    pub fn clock(&self) -> Timestep {
        self.clock
    }

    /// The "original" transaction recorded by `single_spend`, if any.
    pub fn original(&self) -> Option<TxId> {
        self.adversary.as_ref().and_then(|s| s.original)
    }

    /// The double-spend transaction recorded by `double_spend`, if any.
    pub fn double_spend_id(&self) -> Option<TxId> {
        self.adversary.as_ref().and_then(|s| s.double_spend)
    }

    /// Number of ids awaiting gossip.
    pub fn backlog(&self) -> usize {
        self.broadcast.len()
    }
}
