//! Experiment configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use tangle_consensus::selector::{DEFAULT_ALPHA, DEFAULT_N_SITES, DEFAULT_WALK_DEPTH};
use tangle_consensus::SelectionMode;
use tangle_node::AgentConfig;

/// Order in which agents are stepped within a round.
///
/// Message channels are ordinary queues, so an agent stepped earlier in a
/// round can have its gossip visible to a later agent in the same round.
/// That same-round visibility is an artifact of this ordering, not a
/// causality guarantee — which is why the order is explicit and configurable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOrder {
    #[default]
    Ascending,
    Descending,
}

/// The double-spend attack schedule.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdversaryConfig {
    /// Which agent mounts the attack.
    #[serde(default)]
    pub agent: u32,

    /// Round at which the original (to-be-double-spent) transaction is made.
    #[serde(default = "default_single_spend_round")]
    pub single_spend_round: u64,

    /// Round at which the conflicting conjugate is published.
    #[serde(default = "default_double_spend_round")]
    pub double_spend_round: u64,
}

impl Default for AdversaryConfig {
    fn default() -> Self {
        Self {
            agent: 0,
            single_spend_round: default_single_spend_round(),
            double_spend_round: default_double_spend_round(),
        }
    }
}

/// Configuration for one simulation run.
///
/// Can be loaded from a TOML file via [`SimConfig::from_toml_file`] or built
/// programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimConfig {
    /// Number of agents in the network.
    #[serde(default = "default_nodes")]
    pub nodes: u32,

    /// Undirected neighbors per agent.
    #[serde(default = "default_neighbors")]
    pub neighbors_per_node: usize,

    /// Network-wide mean transactions per round; each agent mints at
    /// `tps / nodes`.
    #[serde(default = "default_tps")]
    pub tps: f64,

    /// Per-agent bandwidth cap (items per round on each of listen/gossip).
    #[serde(default = "default_bandwidth")]
    pub bandwidth: usize,

    /// Rounds to run.
    #[serde(default = "default_rounds")]
    pub rounds: u64,

    /// Master RNG seed — fixes topology, agent RNGs, and observations.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Whether agents detect and resolve double-spends.
    #[serde(default = "default_true")]
    pub check_conflicts: bool,

    /// Tip-selection mode used by every agent.
    #[serde(default)]
    pub selection_mode: SelectionMode,

    /// MCMC walker sites.
    #[serde(default = "default_n_sites")]
    pub n_sites: usize,

    /// MCMC backward walk depth.
    #[serde(default = "default_walk_depth")]
    pub walk_depth: usize,

    /// MCMC forward-walk weight bias.
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Broadcast backlog bound per agent.
    #[serde(default = "default_capacity")]
    pub broadcast_capacity: usize,

    /// Per-connection channel bound.
    #[serde(default = "default_capacity")]
    pub channel_capacity: usize,

    /// Agent iteration order within a round.
    #[serde(default)]
    pub step_order: StepOrder,

    /// Tips sampled per round for the reachable-tip weight observations.
    #[serde(default = "default_tip_sample")]
    pub tip_sample_size: usize,

    /// Where to write the JSON trace (`None` skips the export).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_path: Option<PathBuf>,

    /// Attack schedule; `None` runs an all-honest network.
    /// Last field: TOML emits plain values before tables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adversary: Option<AdversaryConfig>,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_nodes() -> u32 {
    100
}

fn default_neighbors() -> usize {
    8
}

fn default_tps() -> f64 {
    20.0
}

fn default_bandwidth() -> usize {
    10
}

fn default_rounds() -> u64 {
    1000
}

fn default_seed() -> u64 {
    42
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

fn default_capacity() -> usize {
    100
}

fn default_tip_sample() -> usize {
    10
}

fn default_single_spend_round() -> u64 {
    200
}

fn default_double_spend_round() -> u64 {
    400
}

// ── Impl ───────────────────────────────────────────────────────────────

impl SimConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_toml_str(&content)?)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("SimConfig is always serializable to TOML")
    }

    /// The per-agent configuration this experiment implies.
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            rate: self.tps / self.nodes.max(1) as f64,
            bandwidth: self.bandwidth,
            check_conflicts: self.check_conflicts,
            selection_mode: self.selection_mode,
            n_sites: self.n_sites,
            walk_depth: self.walk_depth,
            alpha: self.alpha,
            broadcast_capacity: self.broadcast_capacity,
        }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            nodes: default_nodes(),
            neighbors_per_node: default_neighbors(),
            tps: default_tps(),
            bandwidth: default_bandwidth(),
            rounds: default_rounds(),
            seed: default_seed(),
            check_conflicts: true,
            selection_mode: SelectionMode::default(),
            n_sites: default_n_sites(),
            walk_depth: default_walk_depth(),
            alpha: default_alpha(),
            broadcast_capacity: default_capacity(),
            channel_capacity: default_capacity(),
            step_order: StepOrder::default(),
            tip_sample_size: default_tip_sample(),
            trace_path: None,
            adversary: Some(AdversaryConfig::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = SimConfig::default();
        let toml_str = config.to_toml_string();
        let parsed = SimConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.nodes, config.nodes);
        assert_eq!(parsed.rounds, config.rounds);
        assert_eq!(parsed.step_order, config.step_order);
        assert!(parsed.adversary.is_some());
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = SimConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.nodes, 100);
        assert_eq!(config.neighbors_per_node, 8);
        assert_eq!(config.bandwidth, 10);
        assert!(config.adversary.is_none());
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            nodes = 20
            rounds = 50
            selection_mode = "uniform"
            step_order = "descending"

            [adversary]
            agent = 3
            single_spend_round = 10
        "#;
        let config = SimConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.nodes, 20);
        assert_eq!(config.rounds, 50);
        assert_eq!(config.selection_mode, SelectionMode::Uniform);
        assert_eq!(config.step_order, StepOrder::Descending);
        let adversary = config.adversary.expect("adversary section");
        assert_eq!(adversary.agent, 3);
        assert_eq!(adversary.single_spend_round, 10);
        assert_eq!(adversary.double_spend_round, 400); // default
    }

    #[test]
    fn agent_config_splits_network_rate() {
        let config = SimConfig {
            nodes: 50,
            tps: 10.0,
            ..SimConfig::default()
        };
        let agent = config.agent_config();
        assert!((agent.rate - 0.2).abs() < 1e-12);
        assert_eq!(agent.bandwidth, config.bandwidth);
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = SimConfig::from_toml_file(Path::new("/nonexistent/tangle.toml"));
        assert!(result.is_err());
    }
}
