use aggregator_types::{OverrideMode, PerformerOverride};

/// The Override Mixer (C4, §4.4): `(consensus, override) → effective`.
/// Returns the effective value and whether the *next* tick should skip
/// smoothing (true only just after an active `lock`).
pub fn apply_override(consensus: f64, active_override: Option<&PerformerOverride>, now: u64) -> (f64, bool) {
    match active_override {
        Some(ov) if ov.is_active(now) => {
            let value = ov.apply(consensus);
            (value, ov.mode == OverrideMode::Lock)
        }
        _ => (consensus, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_or_expired_passes_consensus_through() {
        assert_eq!(apply_override(0.4, None, 100).0, 0.4);
        let expired = PerformerOverride::new(OverrideMode::Absolute, 0.9, None, Some(50));
        assert_eq!(apply_override(0.4, Some(&expired), 100).0, 0.4);
    }

    #[test]
    fn lock_signals_skip_smoothing_next_tick() {
        let lock = PerformerOverride::new(OverrideMode::Lock, 0.9, None, None);
        let (value, skip_next) = apply_override(0.4, Some(&lock), 100);
        assert_eq!(value, 0.9);
        assert!(skip_next);
    }

    #[test]
    fn blend_mixes_and_does_not_skip_next_smoothing() {
        let blend = PerformerOverride::new(OverrideMode::Blend, 0.9, Some(0.5), None);
        let (value, skip_next) = apply_override(0.4, Some(&blend), 100);
        assert!((value - 0.65).abs() < 1e-9);
        assert!(!skip_next);
    }
}
