use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Returns the number of milliseconds since UNIX EPOCH.
///
/// All timestamps in the engine (`AudienceInput`, `ConsensusResult`, ...) are
/// expressed in this unit, per spec.md's "monotonic ms" convention.
#[inline]
pub fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_millis() as u64
}

/// A stopwatch that logs on drop if the timed operation exceeded the
/// threshold `TR` (milliseconds). Wrapped around tick computation and lock
/// acquisition to surface the rare slow path without instrumenting every call
/// site by hand.
pub struct Stopwatch<const TR: u64 = 1000> {
    name: &'static str,
    start: Instant,
}

impl<const TR: u64> Stopwatch<TR> {
    pub fn with_threshold(name: &'static str) -> Self {
        Self { name, start: Instant::now() }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl<const TR: u64> Drop for Stopwatch<TR> {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        if elapsed > Duration::from_millis(TR) {
            crate::warn!("[{}] slow path: {:?} (threshold {}ms)", self.name, elapsed, TR);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_now_is_monotonically_plausible() {
        let a = unix_now();
        std::thread::sleep(Duration::from_millis(5));
        let b = unix_now();
        assert!(b >= a);
    }
}
