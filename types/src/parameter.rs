use serde::{Deserialize, Serialize};

/// How an [`crate::ConsensusResult`] is derived from its surviving weighted
/// inputs (§4.3 step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusMode {
    WeightedAverage,
    Median,
    MajorityVote,
}

/// A registered output parameter (e.g. `mood`, `tempo`). Parameters may be
/// added at runtime via `parameter:register` but never removed (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub default: f64,
    pub smoothing_factor: f64,
    pub mode: ConsensusMode,
}

impl Parameter {
    pub fn new(name: impl Into<String>, mode: ConsensusMode, smoothing_factor: f64, default: f64) -> Self {
        Self { name: name.into(), min: 0.0, max: 1.0, default: default.clamp(0.0, 1.0), smoothing_factor: smoothing_factor.clamp(0.0, 1.0), mode }
    }

    pub fn in_bounds(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}
