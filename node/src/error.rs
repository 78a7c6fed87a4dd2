use tangle_types::TxId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("ledger error: {0}")]
    Ledger(#[from] tangle_ledger::LedgerError),

    #[error("consensus error: {0}")]
    Consensus(#[from] tangle_consensus::ConsensusError),

    #[error("network error: {0}")]
    Network(#[from] tangle_network::NetworkError),

    /// Integration could not resolve a transaction's full ancestry from the
    /// shared graph. The shared graph is append-only and fully populated, so
    /// this signals a driver bug, not an expected runtime case.
    #[error("dangling reference: ancestry of {0:?} is missing from the shared graph")]
    DanglingReference(TxId),

    /// The double-spend could not find two global tips independent of the
    /// original transaction. The attack is aborted, state unchanged.
    #[error("no disjoint tips available to attach the double-spend")]
    NoDisjointTips,

    /// `double_spend` was invoked before `single_spend`.
    #[error("no original transaction recorded to double-spend")]
    MissingOriginal,

    /// An attack action was invoked on an honest-mode agent.
    #[error("action requires an adversary-mode agent")]
    NotAdversary,

    #[error("{0}")]
    Other(String),
}
