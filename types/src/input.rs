use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single audience submission for one parameter. Immutable once accepted
/// into the Input Buffer (§3 I1-adjacent: a `WeightedInput` never outlives
/// the tick that derived it, but the `AudienceInput` itself is retained for
/// the buffer's window).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudienceInput {
    pub id: Uuid,
    pub session_id: Uuid,
    pub value: f64,
    /// Monotonic milliseconds, per the engine's timestamp convention.
    pub timestamp: u64,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
}

impl Location {
    pub fn distance(&self, other: &Location) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl AudienceInput {
    pub fn new(id: Uuid, session_id: Uuid, value: f64, timestamp: u64, location: Option<Location>) -> Self {
        Self { id, session_id, value, timestamp, location }
    }

    /// The dedup key the Input Buffer uses to discard repeat appends (§4.1).
    /// Parameter is not part of `AudienceInput` itself (the buffer is keyed
    /// per-parameter already), so the key is `(session_id, timestamp)`
    /// within a single parameter's ring.
    pub fn dedup_key(&self) -> (Uuid, u64) {
        (self.session_id, self.timestamp)
    }
}

/// An [`AudienceInput`] augmented with the weights computed by the Weighting
/// Core (§4.2). Derived; never persisted beyond a single tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedInput {
    pub input: AudienceInput,
    pub spatial_weight: f64,
    pub temporal_weight: f64,
    pub agreement_weight: f64,
    pub weight: f64,
}

/// Lower bound on any [`WeightedInput::weight`] (invariant I1).
pub const MIN_WEIGHT: f64 = 0.001;
pub const MAX_WEIGHT: f64 = 1.0;

impl WeightedInput {
    pub fn new(input: AudienceInput, spatial_weight: f64, temporal_weight: f64, agreement_weight: f64, raw_weight: f64) -> Self {
        Self {
            input,
            spatial_weight,
            temporal_weight,
            agreement_weight,
            weight: raw_weight.clamp(MIN_WEIGHT, MAX_WEIGHT),
        }
    }

    pub fn value(&self) -> f64 {
        self.input.value
    }
}
