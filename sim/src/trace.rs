//! Per-round run trace, exported as JSON for downstream analysis.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Where the attack stands at observation time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackPhase {
    /// The original transaction is out; the attacker is letting it gather
    /// approvals.
    Wait,
    /// The conflicting claim is out; the attacker builds on it.
    Build,
}

/// One round's observations.
///
/// Weights are sampled reachable-tip counts: the ground-truth pair uses the
/// global tip set, the observed pair uses the adversary's local tips —
/// modeling what the attacker can actually see.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: u64,
    pub global_transactions: usize,
    pub global_tips: usize,
    pub adversary_tips: Option<usize>,
    pub weight_original: Option<u64>,
    pub weight_double_spend: Option<u64>,
    pub observed_weight_original: Option<u64>,
    pub observed_weight_double_spend: Option<u64>,
    pub phase: Option<AttackPhase>,
}

/// The full run trace.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Trace {
    pub records: Vec<RoundRecord>,
}

impl Trace {
    pub fn push(&mut self, record: RoundRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serialize the trace as pretty-printed JSON.
    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Write the trace to a JSON file.
    pub fn write_json(&self, path: &Path) -> anyhow::Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}
