//! Double-spend detection and resolution.
//!
//! A transaction and its conjugate id represent two mutually exclusive
//! claims on the same resource. When both are present in a graph, the one
//! whose approving subgraph reaches more of the current tips wins; the loser
//! (and everything approving it) is pruned by the caller via
//! [`Tangle::remove`], which also blacklists the whole subtree.

use tangle_ledger::Tangle;
use tangle_types::TxId;
use tracing::debug;

/// Whether `id` conflicts with a transaction already in `graph` — i.e. its
/// conjugate is present.
pub fn has_conflict(graph: &Tangle, id: TxId) -> bool {
    graph.contains(id.conjugate())
}

/// Decide between two conflicting transactions.
///
/// Each side scores 1 plus the number of current tips its approval subgraph
/// reaches. The challenger wins only on a strictly greater score; ties keep
/// the incumbent.
pub fn resolve(graph: &Tangle, incumbent: TxId, challenger: TxId) -> TxId {
    let mut incumbent_weight: u64 = 1;
    let mut challenger_weight: u64 = 1;

    for tip in graph.tips() {
        if graph.is_reachable(incumbent, *tip) {
            incumbent_weight += 1;
        }
        if graph.is_reachable(challenger, *tip) {
            challenger_weight += 1;
        }
    }

    let winner = if challenger_weight > incumbent_weight {
        challenger
    } else {
        incumbent
    };
    debug!(
        ?incumbent,
        ?challenger,
        incumbent_weight,
        challenger_weight,
        ?winner,
        "resolved double-spend"
    );
    winner
}
