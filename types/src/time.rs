//! Logical simulation time.
//!
//! The simulation is round-based: every agent's clock advances by exactly one
//! step per round. There is no wall-clock anywhere in the protocol.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A logical timestep (round number).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Timestep(u64);

impl Timestep {
    /// Time zero — the round in which the simulation starts.
    pub const ZERO: Self = Self(0);

    pub fn new(step: u64) -> Self {
        Self(step)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// The following timestep.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Timestep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}
