//! The round loop — steps every agent once per round in a fixed order.
//!
//! Agents are stepped strictly one at a time, so no locking is needed
//! anywhere: the shared graph and the bus are handed to each agent in turn.
//! Because channels are plain queues, an agent stepped earlier in a round
//! can have its gossip seen by a later agent within the same round; the
//! iteration order is explicit and configurable to keep that artifact
//! deterministic and reproducible.

use anyhow::Context;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use tangle_ledger::Tangle;
use tangle_network::MessageBus;
use tangle_node::{Agent, AgentMode, StepKind};
use tangle_types::{AgentId, Timestep, TxId};
use tangle_utils::StatsCounter;

use crate::config::{SimConfig, StepOrder};
use crate::topology;
use crate::trace::{AttackPhase, RoundRecord, Trace};

const STAT_NAMES: &[&str] = &[
    "rounds",
    "transactions",
    "single_spends",
    "double_spends",
];

/// One configured simulation run.
pub struct Simulation {
    config: SimConfig,
    global: Tangle,
    agents: Vec<Agent>,
    bus: MessageBus,
    stats: StatsCounter,
    trace: Trace,
    observer_rng: StdRng,
}

impl Simulation {
    /// Wire up the network: topology, bus, and one agent per node.
    pub fn new(config: SimConfig) -> anyhow::Result<Self> {
        let mut topology_rng = StdRng::seed_from_u64(config.seed);
        let topology =
            topology::generate(config.nodes, config.neighbors_per_node, &mut topology_rng)?;
        let bus = MessageBus::for_topology(&topology, config.channel_capacity);

        let agent_config = config.agent_config();
        let mut agents = Vec::with_capacity(config.nodes as usize);
        for i in 0..config.nodes {
            let id = AgentId::new(i);
            let mode = match &config.adversary {
                Some(schedule) if schedule.agent == i => AgentMode::Adversary,
                _ => AgentMode::Honest,
            };
            let seed = config
                .seed
                .wrapping_add(0x9E37_79B9_7F4A_7C15u64.wrapping_mul(u64::from(i) + 1));
            agents.push(Agent::new(
                id,
                mode,
                &agent_config,
                topology.inbound(id).to_vec(),
                topology.outbound(id).to_vec(),
                seed,
            ));
        }

        let observer_rng = StdRng::seed_from_u64(config.seed.wrapping_add(0xC0FF_EE));
        Ok(Self {
            config,
            global: Tangle::new(),
            agents,
            bus,
            stats: StatsCounter::new(STAT_NAMES),
            trace: Trace::default(),
            observer_rng,
        })
    }

    /// Run the configured number of rounds to completion.
    pub fn run(&mut self) -> anyhow::Result<()> {
        info!(
            nodes = self.config.nodes,
            rounds = self.config.rounds,
            seed = self.config.seed,
            "starting run"
        );
        for round in 0..self.config.rounds {
            self.run_round(round)
                .with_context(|| format!("round {round}"))?;
        }
        self.stats
            .add("transactions", self.global.len() as u64 - 1);
        info!(
            transactions = self.global.len() - 1,
            tips = self.global.tips().len(),
            "run complete"
        );
        Ok(())
    }

    fn run_round(&mut self, round: u64) -> anyhow::Result<()> {
        let order: Vec<usize> = match self.config.step_order {
            StepOrder::Ascending => (0..self.agents.len()).collect(),
            StepOrder::Descending => (0..self.agents.len()).rev().collect(),
        };

        for idx in order {
            let schedule = match &self.config.adversary {
                Some(schedule) if schedule.agent as usize == idx => Some(schedule.clone()),
                _ => None,
            };

            if let Some(schedule) = &schedule {
                if round == schedule.single_spend_round {
                    self.agents[idx].single_spend(&mut self.global)?;
                    self.stats.increment("single_spends");
                }
                if round == schedule.double_spend_round {
                    self.agents[idx].step(
                        StepKind::DoubleSpend,
                        &mut self.global,
                        &mut self.bus,
                    )?;
                    if self.agents[idx].double_spend_id().is_some() {
                        self.stats.increment("double_spends");
                    } else {
                        warn!(round, "double-spend round passed without an attack");
                    }
                    continue;
                }
            }

            self.agents[idx].step(StepKind::Standard, &mut self.global, &mut self.bus)?;
        }

        self.global.step(Timestep::new(round));
        self.stats.increment("rounds");
        self.observe(round);
        Ok(())
    }

    /// Record the per-round trace entry.
    fn observe(&mut self, round: u64) {
        let sample_size = self.config.tip_sample_size;
        let attacker = self
            .config
            .adversary
            .as_ref()
            .map(|schedule| &self.agents[schedule.agent as usize]);
        let original = attacker.and_then(|agent| agent.original());
        let double_spend = attacker.and_then(|agent| agent.double_spend_id());

        let mut record = RoundRecord {
            round,
            global_transactions: self.global.len(),
            global_tips: self.global.tips().len(),
            adversary_tips: attacker.map(|agent| agent.local().tips().len()),
            weight_original: None,
            weight_double_spend: None,
            observed_weight_original: None,
            observed_weight_double_spend: None,
            phase: None,
        };

        let adversary_tips: Option<Vec<TxId>> =
            attacker.map(|agent| agent.local().tips().to_vec());
        let global_tips = self.global.tips().to_vec();

        if let Some(target) = original {
            record.phase = Some(AttackPhase::Wait);
            record.weight_original = Some(sampled_weight(
                &self.global,
                &global_tips,
                target,
                sample_size,
                &mut self.observer_rng,
            ));
            if let Some(tips) = &adversary_tips {
                record.observed_weight_original = Some(sampled_weight(
                    &self.global,
                    tips,
                    target,
                    sample_size,
                    &mut self.observer_rng,
                ));
            }
        }
        if let Some(target) = double_spend {
            record.phase = Some(AttackPhase::Build);
            record.weight_double_spend = Some(sampled_weight(
                &self.global,
                &global_tips,
                target,
                sample_size,
                &mut self.observer_rng,
            ));
            if let Some(tips) = &adversary_tips {
                record.observed_weight_double_spend = Some(sampled_weight(
                    &self.global,
                    tips,
                    target,
                    sample_size,
                    &mut self.observer_rng,
                ));
            }
        }

        self.trace.push(record);
    }

    /// Write the trace if the configuration asked for one.
    pub fn write_trace(&self) -> anyhow::Result<Option<std::path::PathBuf>> {
        match &self.config.trace_path {
            Some(path) => {
                self.trace
                    .write_json(path)
                    .with_context(|| format!("writing trace to {}", path.display()))?;
                Ok(Some(path.clone()))
            }
            None => Ok(None),
        }
    }

    pub fn global(&self) -> &Tangle {
        &self.global
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn stats(&self) -> &StatsCounter {
        &self.stats
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}

/// Estimate how many of `tip_pool`'s tips a transaction reaches, from a
/// bounded sample: count reachable tips in the sample and scale back up to
/// the nominal sample size, floored.
fn sampled_weight(
    global: &Tangle,
    tip_pool: &[TxId],
    target: TxId,
    sample_size: usize,
    rng: &mut StdRng,
) -> u64 {
    if tip_pool.is_empty() || sample_size == 0 {
        return 0;
    }
    let sampled: Vec<TxId> = if tip_pool.len() > sample_size {
        rand::seq::index::sample(rng, tip_pool.len(), sample_size)
            .iter()
            .map(|i| tip_pool[i])
            .collect()
    } else {
        tip_pool.to_vec()
    };
    let reachable = sampled
        .iter()
        .filter(|tip| global.is_reachable(target, **tip))
        .count();
    (reachable as f64 * (sample_size as f64 / sampled.len() as f64)).floor() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdversaryConfig;

    fn small_config() -> SimConfig {
        SimConfig {
            nodes: 8,
            neighbors_per_node: 2,
            tps: 8.0,
            bandwidth: 10,
            rounds: 30,
            seed: 5,
            adversary: None,
            ..SimConfig::default()
        }
    }

    #[test]
    fn honest_run_grows_the_tangle() {
        let mut sim = Simulation::new(small_config()).unwrap();
        sim.run().unwrap();

        assert!(sim.global().len() > 1);
        assert!(!sim.global().tips().is_empty());
        assert_eq!(sim.trace().len(), 30);
        assert_eq!(sim.stats().get("rounds"), 30);
        assert_eq!(sim.stats().get("single_spends"), 0);

        // Every agent's local view is a subset of the shared graph.
        for agent in sim.agents() {
            assert!(agent.local().len() <= sim.global().len());
            assert_eq!(agent.clock(), Timestep::new(30));
        }
        // No attack, so no attack observations.
        assert!(sim.trace().records.iter().all(|r| r.phase.is_none()));
    }

    #[test]
    fn runs_are_reproducible_under_a_seed() {
        let mut first = Simulation::new(small_config()).unwrap();
        first.run().unwrap();
        let mut second = Simulation::new(small_config()).unwrap();
        second.run().unwrap();

        assert_eq!(first.global().len(), second.global().len());
        assert_eq!(first.global().tips(), second.global().tips());
        assert_eq!(
            first.trace().to_json_string().unwrap(),
            second.trace().to_json_string().unwrap()
        );
    }

    #[test]
    fn different_seeds_diverge() {
        let mut first = Simulation::new(small_config()).unwrap();
        first.run().unwrap();
        let mut second = Simulation::new(SimConfig {
            seed: 6,
            ..small_config()
        })
        .unwrap();
        second.run().unwrap();

        assert_ne!(
            first.trace().to_json_string().unwrap(),
            second.trace().to_json_string().unwrap()
        );
    }

    #[test]
    fn descending_order_also_runs_to_completion() {
        let mut sim = Simulation::new(SimConfig {
            step_order: StepOrder::Descending,
            ..small_config()
        })
        .unwrap();
        sim.run().unwrap();
        assert_eq!(sim.trace().len(), 30);
    }

    #[test]
    fn attack_schedule_fires() {
        let config = SimConfig {
            rounds: 16,
            tps: 16.0,
            adversary: Some(AdversaryConfig {
                agent: 0,
                single_spend_round: 2,
                double_spend_round: 8,
            }),
            ..small_config()
        };
        let mut sim = Simulation::new(config).unwrap();
        sim.run().unwrap();

        let attacker = &sim.agents()[0];
        assert_eq!(attacker.mode(), AgentMode::Adversary);
        let original = attacker.original().expect("single-spend fired");
        let double_spend = attacker.double_spend_id().expect("double-spend fired");
        assert_eq!(double_spend, original.conjugate());
        assert!(sim.global().contains(original));
        assert!(sim.global().contains(double_spend));
        assert_eq!(sim.stats().get("single_spends"), 1);
        assert_eq!(sim.stats().get("double_spends"), 1);

        // Observations switch from wait to build across the attack rounds.
        let records = &sim.trace().records;
        assert!(records[..2].iter().all(|r| r.phase.is_none()));
        assert_eq!(records[2].phase, Some(AttackPhase::Wait));
        assert!(records[2].weight_original.is_some());
        assert_eq!(records[8].phase, Some(AttackPhase::Build));
        assert!(records[8].weight_double_spend.is_some());
    }

    #[test]
    fn sampled_weight_scales_and_floors() {
        let mut graph = Tangle::new();
        let g = graph.genesis();
        let t1 = graph
            .add(AgentId::new(0), Timestep::new(1), vec![g, g])
            .unwrap();
        let t2 = graph
            .add(AgentId::new(1), Timestep::new(1), vec![g, g])
            .unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        // Pool smaller than the sample size: exact counting, scaled up.
        let tips = vec![t1, t2];
        // t1 reaches only itself among the tips: 1 × (4 / 2) = 2.
        assert_eq!(sampled_weight(&graph, &tips, t1, 4, &mut rng), 2);
        // Genesis reaches both tips: 2 × (4 / 2) = 4.
        assert_eq!(sampled_weight(&graph, &tips, g, 4, &mut rng), 4);
        // Absent target reaches nothing.
        let ghost = TxId::new([9; 32]);
        assert_eq!(sampled_weight(&graph, &tips, ghost, 4, &mut rng), 0);
        // Empty pool or zero sample short-circuit.
        assert_eq!(sampled_weight(&graph, &[], g, 4, &mut rng), 0);
        assert_eq!(sampled_weight(&graph, &tips, g, 0, &mut rng), 0);
    }
}
