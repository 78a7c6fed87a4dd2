//! The per-participant agent.
//!
//! Each agent owns a private local view of the tangle and runs the same
//! three-phase protocol once per round: **listen** (drain inbound gossip
//! into the local graph), **transact** (mint new transactions onto tips
//! chosen from the local view), **gossip** (forward known transactions to
//! neighbors, bandwidth permitting). An adversary-mode agent additionally
//! mounts a double-spend attack through two explicitly scheduled actions.
//!
//! ## Module overview
//!
//! - [`agent`] — agent state and the protocol phases.
//! - [`config`] — per-agent tuning knobs.
//! - [`error`] — node error types.

pub mod agent;
pub mod config;
pub mod error;

pub use agent::{Agent, AgentMode, IntegrationOutcome, StepKind};
pub use config::AgentConfig;
pub use error::NodeError;
