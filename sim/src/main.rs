//! tangle-sim — entry point for running a simulation.

use clap::Parser;
use std::path::PathBuf;

mod config;
mod runner;
mod topology;
mod trace;

use config::SimConfig;
use runner::Simulation;

#[derive(Parser)]
#[command(name = "tangle-sim", about = "DAG-ledger gossip network simulator")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings are
    /// used as the base; CLI flags and env vars override them.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of agents in the network.
    #[arg(long, env = "TANGLE_NODES")]
    nodes: Option<u32>,

    /// Rounds to run.
    #[arg(long, env = "TANGLE_ROUNDS")]
    rounds: Option<u64>,

    /// Network-wide mean transactions per round.
    #[arg(long, env = "TANGLE_TPS")]
    tps: Option<f64>,

    /// Per-agent bandwidth cap.
    #[arg(long, env = "TANGLE_BANDWIDTH")]
    bandwidth: Option<usize>,

    /// Master RNG seed for a reproducible run.
    #[arg(long, env = "TANGLE_SEED")]
    seed: Option<u64>,

    /// Run an all-honest network, ignoring any configured adversary.
    #[arg(long)]
    no_adversary: bool,

    /// Where to write the JSON trace.
    #[arg(long, env = "TANGLE_TRACE_OUT")]
    trace_out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tangle_utils::init_tracing();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => {
            let loaded = SimConfig::from_toml_file(path)?;
            tracing::info!("loaded config from {}", path.display());
            loaded
        }
        None => SimConfig::default(),
    };

    if let Some(nodes) = cli.nodes {
        config.nodes = nodes;
    }
    if let Some(rounds) = cli.rounds {
        config.rounds = rounds;
    }
    if let Some(tps) = cli.tps {
        config.tps = tps;
    }
    if let Some(bandwidth) = cli.bandwidth {
        config.bandwidth = bandwidth;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if cli.no_adversary {
        config.adversary = None;
    }
    if let Some(path) = cli.trace_out {
        config.trace_path = Some(path);
    }

    let mut sim = Simulation::new(config)?;
    sim.run()?;

    if let Some(path) = sim.write_trace()? {
        tracing::info!("trace written to {}", path.display());
    }

    let stats = sim.stats();
    tracing::info!(
        transactions = stats.get("transactions"),
        tips = sim.global().tips().len(),
        single_spends = stats.get("single_spends"),
        double_spends = stats.get("double_spends"),
        "simulation finished"
    );

    Ok(())
}
