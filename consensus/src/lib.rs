//! Consensus — how agents agree on which branch of the tangle grows.
//!
//! Two mechanisms:
//!
//! - **Tip selection** ([`selector`]): a Markov-chain random walk biased
//!   toward transactions with higher cumulative weight. Heavier branches
//!   attract more approvals, lighter branches keep a nonzero chance, and no
//!   global weight computation is ever needed.
//! - **Conflict resolution** ([`conflict`]): when two mutually exclusive
//!   spends are both present, the one reaching more current tips wins and
//!   the loser's entire approving subgraph is pruned.

pub mod conflict;
pub mod error;
pub mod selector;

pub use error::ConsensusError;
pub use selector::{SelectionMode, TipSelector};
