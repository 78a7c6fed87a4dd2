use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    /// Tip selection was asked for more tips than it has walker sites.
    /// The caller must not proceed with a malformed selection.
    #[error("tip selection needs {requested} tips but only {available} sites are configured")]
    InsufficientSites { requested: usize, available: usize },
}
