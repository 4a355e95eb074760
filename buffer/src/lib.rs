//! The Input Buffer (C1, spec §4.1): a per-parameter, time-bounded ring of
//! recent [`AudienceInput`]s. Adapted from the grounding repository's
//! `database::Cache` (`IndexMap` under a `parking_lot::RwLock`), but FIFO
//! rather than random-eviction: the buffer's access pattern is "evict the
//! oldest on overflow, prune by age", not "evict a random entry to respect a
//! memory budget", so the ring itself is a `VecDeque` with a side `HashSet`
//! for the idempotency check.

use aggregator_core::Counters;
use aggregator_types::AudienceInput;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use uuid::Uuid;

/// One parameter's sliding window plus its drop counter.
struct ParameterRing {
    entries: VecDeque<AudienceInput>,
    keys: HashSet<(Uuid, u64)>,
    drops: u64,
}

impl ParameterRing {
    fn new() -> Self {
        Self { entries: VecDeque::new(), keys: HashSet::new(), drops: 0 }
    }
}

/// The Input Buffer. One instance serves every registered parameter; each
/// parameter owns its own ring, so a burst on one parameter never evicts
/// another's entries.
pub struct InputBuffer {
    rings: RwLock<HashMap<String, ParameterRing>>,
    /// Sliding window size, milliseconds (`temporalWindowMs`).
    window_ms: u64,
    /// Hard cap on entries per parameter, independent of window.
    hard_cap: usize,
    counters: Arc<Counters>,
}

impl InputBuffer {
    pub fn new(window_ms: u64, hard_cap: usize, counters: Arc<Counters>) -> Self {
        Self { rings: RwLock::new(HashMap::new()), window_ms, hard_cap, counters }
    }

    /// Appends `input` to `parameter`'s ring. Idempotent on
    /// `(sessionId, timestamp)` within the parameter: a duplicate is
    /// silently discarded (§4.1). On overflow the oldest entry is evicted
    /// and the drop counter incremented — never blocks the caller.
    pub fn append(&self, parameter: &str, input: AudienceInput) {
        let mut rings = self.rings.write();
        let ring = rings.entry(parameter.to_string()).or_insert_with(ParameterRing::new);

        if !ring.keys.insert(input.dedup_key()) {
            return;
        }
        ring.entries.push_back(input);

        while ring.entries.len() > self.hard_cap {
            if let Some(evicted) = ring.entries.pop_front() {
                ring.keys.remove(&evicted.dedup_key());
                ring.drops += 1;
                self.counters.buffer_drops.fetch_add(1, Ordering::Relaxed);
                aggregator_core::debug!("buffer overflow for '{parameter}', dropped input from session {}", evicted.session_id);
            }
        }
    }

    /// Returns an immutable snapshot of `parameter`'s currently-buffered
    /// inputs, already restricted to the temporal window as of `now`. Used
    /// by the scheduler to derive a single, consistent view per tick.
    pub fn snapshot(&self, parameter: &str, now: u64) -> Vec<AudienceInput> {
        let rings = self.rings.read();
        match rings.get(parameter) {
            Some(ring) => ring.entries.iter().filter(|i| now.saturating_sub(i.timestamp) <= self.window_ms).copied().collect(),
            None => Vec::new(),
        }
    }

    /// Drops entries older than the window for every parameter. Called
    /// periodically (e.g. once per tick) rather than on every append, so a
    /// burst of appends doesn't pay an O(n) prune per input.
    pub fn prune(&self, now: u64) {
        let mut rings = self.rings.write();
        for ring in rings.values_mut() {
            while let Some(front) = ring.entries.front() {
                if now.saturating_sub(front.timestamp) > self.window_ms {
                    let evicted = ring.entries.pop_front().unwrap();
                    ring.keys.remove(&evicted.dedup_key());
                } else {
                    break;
                }
            }
        }
    }

    /// Total inputs dropped (overflow only, not prune) for `parameter`, for
    /// the overrun metric (§4.8).
    pub fn drop_count(&self, parameter: &str) -> u64 {
        self.rings.read().get(parameter).map(|r| r.drops).unwrap_or(0)
    }

    /// Registers a parameter ahead of any input for it, so its ring (and
    /// drop counter) exist even before the first append.
    pub fn ensure_parameter(&self, parameter: &str) {
        self.rings.write().entry(parameter.to_string()).or_insert_with(ParameterRing::new);
    }
}
