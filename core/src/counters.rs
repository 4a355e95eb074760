use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counters for conditions that are a metric, not an error:
/// buffer drops, subscriber overruns, tick overruns. Snapshotted and diffed
/// periodically by a monitor task rather than logged on every increment.
#[derive(Default)]
pub struct Counters {
    pub buffer_drops: AtomicU64,
    pub subscriber_drops: AtomicU64,
    pub tick_overruns: AtomicU64,
    pub inputs_rejected: AtomicU64,
    pub ticks_completed: AtomicU64,
}

/// Point-in-time snapshot of [`Counters`], suitable for logging a diff
/// between two samples.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CountersSnapshot {
    pub buffer_drops: u64,
    pub subscriber_drops: u64,
    pub tick_overruns: u64,
    pub inputs_rejected: u64,
    pub ticks_completed: u64,
}

impl Counters {
    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            buffer_drops: self.buffer_drops.load(Ordering::Relaxed),
            subscriber_drops: self.subscriber_drops.load(Ordering::Relaxed),
            tick_overruns: self.tick_overruns.load(Ordering::Relaxed),
            inputs_rejected: self.inputs_rejected.load(Ordering::Relaxed),
            ticks_completed: self.ticks_completed.load(Ordering::Relaxed),
        }
    }
}

impl CountersSnapshot {
    /// Returns the per-field delta since an earlier snapshot. Assumes
    /// monotonically increasing counters, matching the mining monitor's
    /// own snapshot-and-diff convention.
    pub fn diff(&self, earlier: &CountersSnapshot) -> CountersSnapshot {
        CountersSnapshot {
            buffer_drops: self.buffer_drops.saturating_sub(earlier.buffer_drops),
            subscriber_drops: self.subscriber_drops.saturating_sub(earlier.subscriber_drops),
            tick_overruns: self.tick_overruns.saturating_sub(earlier.tick_overruns),
            inputs_rejected: self.inputs_rejected.saturating_sub(earlier.inputs_rejected),
            ticks_completed: self.ticks_completed.saturating_sub(earlier.ticks_completed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_reports_deltas_only() {
        let c = Counters::default();
        let before = c.snapshot();
        c.buffer_drops.fetch_add(3, Ordering::Relaxed);
        c.ticks_completed.fetch_add(10, Ordering::Relaxed);
        let after = c.snapshot();
        let delta = after.diff(&before);
        assert_eq!(delta.buffer_drops, 3);
        assert_eq!(delta.ticks_completed, 10);
        assert_eq!(delta.subscriber_drops, 0);
    }
}
