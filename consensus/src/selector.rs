//! Weighted random-walk tip selection.
//!
//! To approve new transactions, an agent picks tips by releasing walkers
//! onto its local graph: each walker starts from a sampled tip, walks *back*
//! toward the genesis for a fixed number of steps (accumulating cumulative
//! weight along single-parent edges as a side effect), then walks *forward*
//! again, at each step preferring children whose cumulative weight is close
//! to its own. Heavier branches therefore attract more walkers — and more
//! approvals — without any global weight computation.
//!
//! Walk-back results are cached per graph revision: the backward walk is
//! fully deterministic given the structure, so a cached entry is exact, and
//! serving it also skips the duplicate weight bumps a re-walk would apply.

use std::collections::HashMap;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tangle_ledger::Tangle;
use tangle_types::TxId;
use tracing::trace;

use crate::error::ConsensusError;

/// Default number of walker sites released per selection.
pub const DEFAULT_N_SITES: usize = 10;
/// Default backward walk depth.
pub const DEFAULT_WALK_DEPTH: usize = 14;
/// Default forward-walk weight bias.
pub const DEFAULT_ALPHA: f64 = 0.001;

/// How an agent picks the tips its next transaction approves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Uniform over the whole tip set.
    Uniform,
    /// Uniform over the most recent 10% of tips.
    PrioritySoft,
    /// Uniform over the most recent 100 tips.
    PriorityHard,
    /// The weighted random walk.
    #[default]
    Mcmc,
}

/// The MCMC tip-selection walk.
pub struct TipSelector {
    n_sites: usize,
    depth: usize,
    alpha: f64,
    /// (start, remaining depth) → walk-back destination, valid for
    /// `cache_revision` only.
    walk_cache: HashMap<(TxId, usize), TxId>,
    cache_revision: u64,
}

impl TipSelector {
    pub fn new(n_sites: usize, depth: usize, alpha: f64) -> Self {
        Self {
            n_sites,
            depth,
            alpha,
            walk_cache: HashMap::new(),
            cache_revision: 0,
        }
    }

    /// Select `n` tips (normally 2) from `graph`.
    ///
    /// Fails with [`ConsensusError::InsufficientSites`] if `n` exceeds the
    /// configured walker count. An empty tip set yields an empty selection —
    /// the caller stops minting. The same transaction may appear more than
    /// once when fewer distinct walks complete than `n`.
    pub fn select<R: Rng>(
        &mut self,
        graph: &mut Tangle,
        n: usize,
        rng: &mut R,
    ) -> Result<Vec<TxId>, ConsensusError> {
        if self.n_sites < n {
            return Err(ConsensusError::InsufficientSites {
                requested: n,
                available: self.n_sites,
            });
        }
        if n == 0 {
            return Ok(Vec::new());
        }
        self.refresh_cache(graph);

        let mut walkers = self.sites(graph, rng);
        if walkers.is_empty() {
            return Ok(Vec::new());
        }

        let mut selected: Vec<TxId> = Vec::with_capacity(n);
        loop {
            let pass = walkers.clone();
            for old_site in pass {
                match self.walk_forward(graph, old_site, rng) {
                    // Site vanished from the graph: finalize where it stood.
                    None => {
                        selected.push(old_site);
                        remove_first(&mut walkers, old_site);
                    }
                    // No children — the walker reached a current tip.
                    Some(new_site) if new_site == old_site => {
                        selected.push(new_site);
                        remove_first(&mut walkers, old_site);
                    }
                    Some(new_site) => {
                        remove_first(&mut walkers, old_site);
                        walkers.push(new_site);
                    }
                }
                if selected.len() == n {
                    return Ok(selected);
                }
            }
            if walkers.is_empty() {
                // Fewer distinct completions than requested: recycle.
                let base = selected.clone();
                let mut i = 0;
                while selected.len() < n {
                    selected.push(base[i % base.len()]);
                    i += 1;
                }
                trace!(distinct = base.len(), n, "recycled walk completions");
                return Ok(selected);
            }
        }
    }

    /// Select a pair of tips using the given mode.
    ///
    /// The non-walk modes sample uniformly (with replacement) from a recency
    /// window over the insertion-ordered tip set.
    pub fn select_by_mode<R: Rng>(
        &mut self,
        mode: SelectionMode,
        graph: &mut Tangle,
        rng: &mut R,
    ) -> Result<Vec<TxId>, ConsensusError> {
        if mode == SelectionMode::Mcmc {
            return self.select(graph, 2, rng);
        }
        let tips = graph.tips();
        if tips.is_empty() {
            return Ok(Vec::new());
        }
        let window = match mode {
            SelectionMode::Uniform => tips.len(),
            // 10% of the tip set; a window of zero means the set is small
            // enough to use whole.
            SelectionMode::PrioritySoft => match tips.len() / 10 {
                0 => tips.len(),
                last_n => last_n,
            },
            SelectionMode::PriorityHard => tips.len().min(100),
            SelectionMode::Mcmc => unreachable!(),
        };
        let base = tips.len() - window;
        Ok((0..2)
            .map(|_| tips[base + rng.gen_range(0..window)])
            .collect())
    }

    /// Choose the walker starting sites.
    ///
    /// With at least `depth` tips, sample without replacement and walk each
    /// site back `depth` steps. With fewer, the tip set is still too young
    /// for deep walks — cycle the available tips instead.
    fn sites<R: Rng>(&mut self, graph: &mut Tangle, rng: &mut R) -> Vec<TxId> {
        let tips = graph.tips().to_vec();
        if tips.is_empty() {
            return Vec::new();
        }
        if tips.len() >= self.depth {
            let amount = self.n_sites.min(tips.len());
            let picked = rand::seq::index::sample(rng, tips.len(), amount);
            let mut starts: Vec<TxId> = picked.iter().map(|i| tips[i]).collect();
            let mut i = 0;
            while starts.len() < self.n_sites {
                starts.push(starts[i % amount]);
                i += 1;
            }
            let mut sites = Vec::with_capacity(starts.len());
            for start in starts {
                sites.push(self.walk_back(graph, start, self.depth));
            }
            sites
        } else {
            let mut walkers = Vec::with_capacity(self.n_sites);
            while walkers.len() < self.n_sites {
                walkers.extend_from_slice(&tips);
            }
            walkers.truncate(self.n_sites);
            walkers
        }
    }

    /// Walk backward from `start` for up to `depth` steps.
    ///
    /// More than one parent: take the first, deterministically. Exactly one
    /// parent: take it and bump its cumulative weight — this is the only
    /// place weight accumulates. No parents: stop early.
    pub fn walk_back(&mut self, graph: &mut Tangle, start: TxId, depth: usize) -> TxId {
        self.refresh_cache(graph);
        if let Some(&site) = self.walk_cache.get(&(start, depth)) {
            return site;
        }

        let mut visited: Vec<(TxId, usize)> = Vec::new();
        let mut current = start;
        let mut remaining = depth;
        while remaining > 0 {
            if let Some(&site) = self.walk_cache.get(&(current, remaining)) {
                current = site;
                break;
            }
            visited.push((current, remaining));
            let (next, single_parent) = {
                let parents = graph.parents(current);
                match parents.first() {
                    None => break,
                    Some(&first) => (first, parents.len() == 1),
                }
            };
            if single_parent {
                graph.bump_weight(next);
            }
            current = next;
            remaining -= 1;
        }

        for key in visited {
            self.walk_cache.insert(key, current);
        }
        self.walk_cache.insert((start, depth), current);
        current
    }

    /// One forward step from `site`.
    ///
    /// `None` if the site is no longer in the graph; the site itself if it
    /// has no children (it is a current tip); otherwise a child chosen with
    /// probability proportional to
    /// `exp(-alpha * ((weight(site)+1) - (weight(child)+1)))`.
    pub fn walk_forward<R: Rng>(&self, graph: &Tangle, site: TxId, rng: &mut R) -> Option<TxId> {
        if !graph.contains(site) {
            return None;
        }
        let children = graph.children(site).to_vec();
        if children.is_empty() {
            return Some(site);
        }
        let probabilities = self.transition_probabilities(graph, site);
        match children.len() {
            1 => Some(children[0]),
            2 => {
                if rng.gen::<f64>() < probabilities[0] {
                    Some(children[0])
                } else {
                    Some(children[1])
                }
            }
            _ => match WeightedIndex::new(&probabilities) {
                Ok(dist) => Some(children[dist.sample(rng)]),
                // All weights underflowed to zero: fall back to uniform.
                Err(_) => Some(children[rng.gen_range(0..children.len())]),
            },
        }
    }

    /// Normalized forward-walk transition probabilities for `site`'s
    /// children. Empty if the site has none.
    pub fn transition_probabilities(&self, graph: &Tangle, site: TxId) -> Vec<f64> {
        let children = graph.children(site);
        if children.is_empty() {
            return Vec::new();
        }
        let site_weight = graph.cumulative_weight(site) as f64 + 1.0;
        let raw: Vec<f64> = children
            .iter()
            .map(|child| {
                let child_weight = graph.cumulative_weight(*child) as f64 + 1.0;
                (-self.alpha * (site_weight - child_weight)).exp()
            })
            .collect();
        let total: f64 = raw.iter().sum();
        if total > 0.0 && total.is_finite() {
            raw.iter().map(|p| p / total).collect()
        } else {
            vec![1.0 / children.len() as f64; children.len()]
        }
    }

    fn refresh_cache(&mut self, graph: &Tangle) {
        if self.cache_revision != graph.revision() {
            self.walk_cache.clear();
            self.cache_revision = graph.revision();
        }
    }
}

impl Default for TipSelector {
    fn default() -> Self {
        Self::new(DEFAULT_N_SITES, DEFAULT_WALK_DEPTH, DEFAULT_ALPHA)
    }
}

fn remove_first(walkers: &mut Vec<TxId>, site: TxId) {
    if let Some(pos) = walkers.iter().position(|w| *w == site) {
        walkers.remove(pos);
    }
}
