//! The Weighting Core (C2, spec §4.2): pure functions from
//! `(input, peers, stage, now, config) → weight`. Nothing here touches the
//! buffer or the bus — callers gather the inputs for one parameter/tick and
//! pass them through.

use aggregator_types::Location;

/// Venue-units normalization constant in the spatial weight formula.
const STAGE_DISTANCE_NORM: f64 = 100.0;
/// Temporal weight floor once an input's age exceeds the window.
const TEMPORAL_FLOOR: f64 = 0.01;

/// `exp(-α·d/D)` if the input carries a location, else `0.5` (§4.2).
/// Monotonically decreasing in distance; always in `(0, 1]`.
pub fn spatial_weight(location: Option<Location>, stage: Location, alpha: f64) -> f64 {
    match location {
        None => 0.5,
        Some(loc) => {
            let d = loc.distance(&stage);
            (-alpha * d / STAGE_DISTANCE_NORM).exp()
        }
    }
}

/// `exp(-β·age/window)` while `age ≤ window`, else the floor `0.01` (§4.2).
pub fn temporal_weight(age_ms: u64, window_ms: u64, beta: f64) -> f64 {
    if window_ms == 0 || age_ms > window_ms {
        return TEMPORAL_FLOOR;
    }
    (-beta * (age_ms as f64 / window_ms as f64)).exp()
}

/// Precomputed, sorted view over one parameter/tick's surviving values,
/// letting [`AgreementIndex::agreement`] answer each input's peer-agreement
/// query in `O(log N)` instead of the naive `O(N)` pairwise scan — the
/// "bucket by value" optimization spec §4.2 calls for at large N.
pub struct AgreementIndex {
    sorted: Vec<f64>,
}

impl AgreementIndex {
    pub fn build(values: &[f64]) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        Self { sorted }
    }

    /// Fraction of peers within `threshold` of `value`, excluding one
    /// occurrence of `value` itself. With `≤1` peer, returns `1.0` (§4.2).
    pub fn agreement(&self, value: f64, threshold: f64) -> f64 {
        let total_peers = self.sorted.len().saturating_sub(1);
        if total_peers <= 1 {
            return 1.0;
        }
        let lo = value - threshold;
        let hi = value + threshold;
        let lo_idx = self.sorted.partition_point(|&v| v < lo);
        let hi_idx = self.sorted.partition_point(|&v| v <= hi);
        let within = hi_idx.saturating_sub(lo_idx).saturating_sub(1);
        within as f64 / total_peers as f64
    }
}

/// `clamp(w_s·α_s + w_t·α_t + w_c·α_c, 0.001, 1)` (§4.2).
pub fn combined_weight(spatial: f64, temporal: f64, agreement: f64, spatial_alpha: f64, temporal_beta: f64, consensus_gamma: f64) -> f64 {
    (spatial * spatial_alpha + temporal * temporal_beta + agreement * consensus_gamma).clamp(aggregator_types::MIN_WEIGHT, aggregator_types::MAX_WEIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spatial_weight_defaults_without_location() {
        assert_eq!(spatial_weight(None, Location { x: 0.0, y: 0.0 }, 2.0), 0.5);
    }

    #[test]
    fn spatial_weight_decreases_with_distance() {
        let stage = Location { x: 0.0, y: 0.0 };
        let near = spatial_weight(Some(Location { x: 10.0, y: 0.0 }), stage, 2.0);
        let far = spatial_weight(Some(Location { x: 80.0, y: 0.0 }), stage, 2.0);
        assert!(near > far);
        assert!(near <= 1.0 && far > 0.0);
    }

    #[test]
    fn temporal_weight_floors_past_window() {
        assert_eq!(temporal_weight(10_000, 5_000, 1.5), TEMPORAL_FLOOR);
    }

    #[test]
    fn temporal_weight_decays_within_window() {
        let fresh = temporal_weight(0, 5_000, 1.5);
        let stale = temporal_weight(4_000, 5_000, 1.5);
        assert_eq!(fresh, 1.0);
        assert!(stale < fresh);
    }

    #[test]
    fn agreement_is_one_with_one_or_no_peers() {
        let idx = AgreementIndex::build(&[0.5]);
        assert_eq!(idx.agreement(0.5, 0.15), 1.0);
    }

    #[test]
    fn agreement_counts_nearby_values_excluding_self() {
        let idx = AgreementIndex::build(&[0.5, 0.5, 0.5, 0.9]);
        // three peers total (excluding self): two at 0.5 agree, one at 0.9 does not.
        assert!((idx.agreement(0.5, 0.15) - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn combined_weight_is_clamped() {
        assert_eq!(combined_weight(1.0, 1.0, 1.0, 0.4, 0.4, 0.2), 1.0);
        assert_eq!(combined_weight(0.0, 0.0, 0.0, 0.4, 0.4, 0.2), aggregator_types::MIN_WEIGHT);
    }
}
