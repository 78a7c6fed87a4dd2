//! Fundamental types for the tangle simulator.
//!
//! This crate defines the types shared across every other crate in the
//! workspace: transaction ids, agent ids, and the logical clock.

pub mod agent_id;
pub mod time;
pub mod tx_id;

pub use agent_id::AgentId;
pub use time::Timestep;
pub use tx_id::TxId;
