/// `vₜ = vₜ₋₁ + f·(v* − vₜ₋₁)` when a previous value exists (§4.3 step 5).
/// `skip` forces the instantaneous jump `vₜ = v*` even when a previous value
/// exists — set for the tick right after an active `lock` override, per
/// §4.4's "Scheduler skips smoothing the next tick".
pub fn smooth(previous: Option<f64>, target: f64, factor: f64, skip: bool) -> f64 {
    match previous {
        Some(prev) if !skip => prev + factor * (target - prev),
        _ => target,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_previous_value_is_instantaneous() {
        assert_eq!(smooth(None, 0.8, 0.3, false), 0.8);
    }

    #[test]
    fn interpolates_toward_target() {
        let v = smooth(Some(0.5), 0.8, 0.3, false);
        assert!((v - 0.59).abs() < 1e-9);
    }

    #[test]
    fn skip_forces_instantaneous_jump() {
        assert_eq!(smooth(Some(0.1), 0.9, 0.3, true), 0.9);
    }

    #[test]
    fn converges_within_contraction_bound() {
        // P4: with constant target v and factor f, distance to v shrinks by
        // (1 - f) every tick.
        let target = 0.7;
        let mut value = 0.0;
        for _ in 0..50 {
            value = smooth(Some(value), target, 0.3, false);
        }
        assert!((value - target).abs() < 1e-3);
    }
}
