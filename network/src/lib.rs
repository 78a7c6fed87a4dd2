//! Simulated gossip plumbing.
//!
//! There is no real transport: gossip is transaction ids moving through
//! in-memory queues. The [`bus::MessageBus`] owns one bounded queue per
//! directed connection and is held by the driver — agents receive their
//! connection lists at construction and a `&mut` bus each round, never
//! ambient global access.
//!
//! ## Module overview
//!
//! - [`bus`] — the per-connection channel registry.
//! - [`broadcast`] — an agent's outbound ring buffer (oldest-evicted).
//! - [`topology`] — who is connected to whom.
//! - [`error`] — network error types.

pub mod broadcast;
pub mod bus;
pub mod error;
pub mod topology;

pub use broadcast::BroadcastQueue;
pub use bus::MessageBus;
pub use error::NetworkError;
pub use topology::{Connection, Topology};
