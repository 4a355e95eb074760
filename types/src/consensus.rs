use crate::parameter::ConsensusMode;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The output of aggregating one parameter for one tick (§3). Produced
/// atomically — every field is derived from the same buffer snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub parameter: String,
    pub value: f64,
    pub confidence: f64,
    pub input_count: usize,
    pub timestamp: u64,
    pub mode: ConsensusMode,
    pub raw_mean: f64,
    pub weighted_mean: f64,
    pub std_dev: f64,
    pub participation_rate: f64,
    /// Set when the cluster-analysis step (majority-vote mode) found two
    /// comparably-weighted clusters (§4.3, GLOSSARY "Bimodality").
    pub bimodality: bool,
    /// Shannon entropy (log base 2) over cluster probabilities; `None`
    /// outside majority-vote mode, where no clusters are computed.
    pub entropy: Option<f64>,
}

/// An ordered `parameter → ConsensusResult` mapping for a single tick.
/// Ordering is preserved so `state:update` messages enumerate parameters in
/// registration order, matching the bus's per-kind delivery ordering
/// guarantee (§5).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsensusSnapshot {
    pub timestamp: u64,
    pub results: IndexMap<String, ConsensusResult>,
}

impl ConsensusSnapshot {
    pub fn new(timestamp: u64) -> Self {
        Self { timestamp, results: IndexMap::new() }
    }

    pub fn insert(&mut self, result: ConsensusResult) {
        self.results.insert(result.parameter.clone(), result);
    }

    pub fn get(&self, parameter: &str) -> Option<&ConsensusResult> {
        self.results.get(parameter)
    }

    /// True iff every result in the snapshot shares the snapshot's own
    /// timestamp (P7: cross-parameter consistency).
    pub fn is_consistent(&self) -> bool {
        self.results.values().all(|r| r.timestamp == self.timestamp)
    }
}
