use serde::{Deserialize, Serialize};

/// Performer-issued directive that pins or biases one parameter (§3, §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformerOverride {
    pub mode: OverrideMode,
    pub value: f64,
    pub blend_factor: Option<f64>,
    /// Monotonic ms; `None` means it never expires on its own (cleared
    /// explicitly via `override:clear`).
    pub expires_at: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideMode {
    Absolute,
    Lock,
    Blend,
}

impl PerformerOverride {
    pub fn new(mode: OverrideMode, value: f64, blend_factor: Option<f64>, expires_at: Option<u64>) -> Self {
        Self { mode, value, blend_factor: blend_factor.map(|k| k.clamp(0.0, 1.0)), expires_at }
    }

    /// Invariant I3: honored iff `expires_at` is absent or still in the
    /// future relative to `now`. Evaluated at the moment of application, not
    /// at the moment of a tick's snapshot (§4.4: "Expiry is evaluated at the
    /// moment of application").
    pub fn is_active(&self, now: u64) -> bool {
        match self.expires_at {
            Some(expires_at) => now < expires_at,
            None => true,
        }
    }

    /// Applies this override to `consensus`, per the Override Mixer table
    /// (§4.4). Callers must have already confirmed [`PerformerOverride::is_active`];
    /// an expired override is simply absent from the active-override table.
    pub fn apply(&self, consensus: f64) -> f64 {
        match self.mode {
            OverrideMode::Absolute | OverrideMode::Lock => self.value,
            OverrideMode::Blend => {
                let k = self.blend_factor.unwrap_or(0.5);
                (1.0 - k) * consensus + k * self.value
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blend_mixes_linearly() {
        let ov = PerformerOverride::new(OverrideMode::Blend, 0.9, Some(0.5), None);
        assert!((ov.apply(0.4) - 0.65).abs() < 1e-9);
    }

    #[test]
    fn absolute_and_lock_replace_consensus() {
        let ov = PerformerOverride::new(OverrideMode::Absolute, 0.9, None, None);
        assert_eq!(ov.apply(0.1), 0.9);
        let ov = PerformerOverride::new(OverrideMode::Lock, 0.9, None, None);
        assert_eq!(ov.apply(0.1), 0.9);
    }

    #[test]
    fn expiry_is_exclusive_of_now() {
        let ov = PerformerOverride::new(OverrideMode::Absolute, 0.9, None, Some(1000));
        assert!(ov.is_active(999));
        assert!(!ov.is_active(1000));
        assert!(!ov.is_active(1001));
    }

    #[test]
    fn no_expiry_is_always_active() {
        let ov = PerformerOverride::new(OverrideMode::Absolute, 0.9, None, None);
        assert!(ov.is_active(u64::MAX));
    }
}
