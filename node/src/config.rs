//! Per-agent configuration.

use serde::{Deserialize, Serialize};
use tangle_consensus::selector::{DEFAULT_ALPHA, DEFAULT_N_SITES, DEFAULT_WALK_DEPTH};
use tangle_consensus::SelectionMode;
use tangle_network::broadcast::DEFAULT_BROADCAST_CAPACITY;

/// Tuning knobs for one agent.
///
/// Usually built once by the driver from the experiment configuration and
/// shared by every agent in a run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Mean number of transactions minted per round (Poisson).
    #[serde(default = "default_rate")]
    pub rate: f64,

    /// Maximum transactions processed per round on each of the listen and
    /// gossip sides.
    #[serde(default = "default_bandwidth")]
    pub bandwidth: usize,

    /// Whether this agent detects and resolves double-spends. Disabled to
    /// model naive nodes.
    #[serde(default = "default_true")]
    pub check_conflicts: bool,

    /// How tips are chosen for new transactions.
    #[serde(default)]
    pub selection_mode: SelectionMode,

    /// Walker sites released per MCMC selection.
    #[serde(default = "default_n_sites")]
    pub n_sites: usize,

    /// Backward walk depth for MCMC selection.
    #[serde(default = "default_walk_depth")]
    pub walk_depth: usize,

    /// Forward-walk weight bias for MCMC selection.
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Broadcast backlog bound (oldest-evicted).
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_rate() -> f64 {
    0.2
}

fn default_bandwidth() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_n_sites() -> usize {
    DEFAULT_N_SITES
}

fn default_walk_depth() -> usize {
    DEFAULT_WALK_DEPTH
}

fn default_alpha() -> f64 {
    DEFAULT_ALPHA
}

fn default_broadcast_capacity() -> usize {
    DEFAULT_BROADCAST_CAPACITY
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            rate: default_rate(),
            bandwidth: default_bandwidth(),
            check_conflicts: true,
            selection_mode: SelectionMode::default(),
            n_sites: default_n_sites(),
            walk_depth: default_walk_depth(),
            alpha: default_alpha(),
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_constants() {
        let config = AgentConfig::default();
        assert_eq!(config.bandwidth, 10);
        assert_eq!(config.n_sites, 10);
        assert_eq!(config.walk_depth, 14);
        assert!(config.check_conflicts);
        assert_eq!(config.selection_mode, SelectionMode::Mcmc);
    }

    #[test]
    fn partial_toml_overrides() {
        let config: AgentConfig = toml::from_str(
            r#"
                rate = 1.5
                bandwidth = 3
                selection_mode = "uniform"
            "#,
        )
        .expect("should parse");
        assert_eq!(config.rate, 1.5);
        assert_eq!(config.bandwidth, 3);
        assert_eq!(config.selection_mode, SelectionMode::Uniform);
        assert_eq!(config.walk_depth, 14); // default
    }
}
