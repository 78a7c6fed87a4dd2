//! Random connected topology generation.
//!
//! Builds a random graph where every agent has the same number of undirected
//! neighbors (the pairing model), rejecting self-loops, duplicate edges, and
//! disconnected outcomes. Generation is deterministic under the run seed.

use anyhow::{bail, Context};
use rand::seq::SliceRandom;
use rand::Rng;
use tangle_network::Topology;
use tangle_types::AgentId;

/// Attempts at a clean pairing before giving up on one topology draw.
const MAX_PAIRING_ATTEMPTS: usize = 1000;
/// Topology draws (pairing + connectivity) before failing the run.
const MAX_TOPOLOGY_ATTEMPTS: usize = 100;

/// Generate a random connected `degree`-regular topology over `nodes` agents.
pub fn random_regular<R: Rng>(nodes: u32, degree: usize, rng: &mut R) -> anyhow::Result<Topology> {
    if nodes == 0 {
        bail!("topology needs at least one agent");
    }
    if degree >= nodes as usize {
        bail!("degree {degree} is not achievable with {nodes} agents");
    }
    if (nodes as usize * degree) % 2 != 0 {
        bail!("{nodes} agents of degree {degree} leave an unmatched half-edge");
    }

    for _ in 0..MAX_TOPOLOGY_ATTEMPTS {
        let Some(edges) = try_pairing(nodes, degree, rng) else {
            continue;
        };
        let topology = Topology::from_edges(nodes, &edges);
        if topology.is_connected() {
            return Ok(topology);
        }
    }
    bail!("could not draw a connected {degree}-regular topology for {nodes} agents")
}

/// One pairing-model attempt: shuffle every agent's half-edges and match
/// them up pairwise. `None` if the matching produces a self-loop or a
/// duplicate edge.
fn try_pairing<R: Rng>(nodes: u32, degree: usize, rng: &mut R) -> Option<Vec<(AgentId, AgentId)>> {
    let mut half_edges: Vec<u32> = (0..nodes)
        .flat_map(|agent| std::iter::repeat(agent).take(degree))
        .collect();

    for _ in 0..MAX_PAIRING_ATTEMPTS {
        half_edges.shuffle(rng);
        let mut edges: Vec<(AgentId, AgentId)> = Vec::with_capacity(half_edges.len() / 2);
        let mut clean = true;
        for pair in half_edges.chunks_exact(2) {
            let (a, b) = (pair[0].min(pair[1]), pair[0].max(pair[1]));
            if a == b || edges.contains(&(AgentId::new(a), AgentId::new(b))) {
                clean = false;
                break;
            }
            edges.push((AgentId::new(a), AgentId::new(b)));
        }
        if clean {
            return Some(edges);
        }
    }
    None
}

/// Convenience wrapper used by the runner: context-tagged generation.
pub fn generate<R: Rng>(nodes: u32, degree: usize, rng: &mut R) -> anyhow::Result<Topology> {
    random_regular(nodes, degree, rng)
        .with_context(|| format!("generating topology ({nodes} agents, degree {degree})"))
}
