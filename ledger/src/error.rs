use tangle_types::TxId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// A transaction referenced a parent that is not present in the graph.
    /// Rejected before any mutation — the graph is left unchanged.
    #[error("unknown parent transaction: {0:?}")]
    UnknownParent(TxId),
}
