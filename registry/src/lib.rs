//! The Session Registry (C7, spec §4.7): admits participants, enforces a
//! per-session token-bucket rate limit, and removes sessions after an idle
//! timeout or a post-disconnect grace period. Modeled on the grounding
//! repository's `protocol::p2p::Hub` (a single `RwLock<HashMap<Uuid, _>>`
//! mutated by exactly one owner, read by many); the token-bucket refill is
//! adapted from `utils::sync::Semaphore`'s atomic-counter style into a
//! time-based float budget, since rate limiting replenishes continuously
//! rather than being released by a paired acquire/release.

use aggregator_types::{InputRejection, Location, Session};
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

struct Entry {
    session: Session,
    /// Set when the transport reports a disconnect; the session is kept
    /// around for `grace_period_ms` in case the client reconnects with the
    /// same id (§4.7 "Reconnection... restores the bucket state").
    disconnected_at: Option<u64>,
}

pub struct SessionRegistry {
    entries: RwLock<HashMap<Uuid, Entry>>,
    rate_hz: f64,
    burst: f64,
    idle_timeout_ms: u64,
    grace_period_ms: u64,
}

impl SessionRegistry {
    pub fn new(rate_hz: f64, burst: f64, idle_timeout_ms: u64, grace_period_ms: u64) -> Self {
        Self { entries: RwLock::new(HashMap::new()), rate_hz, burst, idle_timeout_ms, grace_period_ms }
    }

    /// Admits a new participant with a full token bucket. The caller is
    /// responsible for emitting `PARTICIPANT_JOIN` on the bus.
    pub fn admit(&self, now: u64, location: Option<Location>) -> Uuid {
        let session_id = Uuid::new_v4();
        let session = Session::new(session_id, now, self.burst, location);
        self.entries.write().insert(session_id, Entry { session, disconnected_at: None });
        session_id
    }

    /// Records an incoming input against `session_id`'s rate limit,
    /// refilling tokens for elapsed time first. Returns
    /// [`InputRejection::RateLimited`] if the bucket is empty, or
    /// [`InputRejection::UnknownSession`] if the session doesn't exist (or
    /// has finished its grace period).
    pub fn record_input(&self, session_id: Uuid, now: u64) -> Result<(), InputRejection> {
        let mut entries = self.entries.write();
        let entry = entries.get_mut(&session_id).ok_or(InputRejection::UnknownSession)?;

        let elapsed_ms = now.saturating_sub(entry.session.last_input_at) as f64;
        entry.session.throttle_budget = (entry.session.throttle_budget + elapsed_ms / 1000.0 * self.rate_hz).min(self.burst);
        entry.session.last_input_at = now;

        if entry.session.throttle_budget < 1.0 {
            return Err(InputRejection::RateLimited);
        }
        entry.session.throttle_budget -= 1.0;
        Ok(())
    }

    /// Marks `session_id` as disconnected without removing it yet. The
    /// caller emits `PARTICIPANT_LEAVE` only once [`SessionRegistry::sweep`]
    /// actually drops the session (i.e. the grace period elapsed without a
    /// reconnect).
    pub fn disconnect(&self, session_id: Uuid, now: u64) {
        if let Some(entry) = self.entries.write().get_mut(&session_id) {
            entry.disconnected_at = Some(now);
        }
    }

    /// Updates `session_id`'s known location, e.g. from an `audience:hello`
    /// message received after admission. A no-op if the session is unknown.
    pub fn set_location(&self, session_id: Uuid, location: Option<Location>) {
        if let Some(entry) = self.entries.write().get_mut(&session_id) {
            entry.session.location = location;
        }
    }

    /// Reconnects `session_id` within its grace window, restoring the
    /// existing token bucket rather than issuing a fresh one. Returns
    /// `false` if the session is unknown or its grace period already
    /// expired; the caller should [`SessionRegistry::admit`] a new session
    /// in that case.
    pub fn reconnect(&self, session_id: Uuid, now: u64) -> bool {
        let mut entries = self.entries.write();
        match entries.get_mut(&session_id) {
            Some(entry) if entry.disconnected_at.is_some() => {
                entry.disconnected_at = None;
                entry.session.last_input_at = now;
                true
            }
            _ => false,
        }
    }

    /// Removes sessions that are idle past `idleTimeout` or whose grace
    /// period has elapsed since disconnect. Returns the removed session ids
    /// so the caller can emit `PARTICIPANT_LEAVE` for each.
    pub fn sweep(&self, now: u64) -> Vec<Uuid> {
        let mut entries = self.entries.write();
        let expired: Vec<Uuid> = entries
            .iter()
            .filter(|(_, entry)| {
                let idle = entry.session.is_idle(now, self.idle_timeout_ms);
                let grace_elapsed = entry.disconnected_at.is_some_and(|d| now.saturating_sub(d) >= self.grace_period_ms);
                idle || grace_elapsed
            })
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            entries.remove(id);
            aggregator_core::debug!("session {id} removed (idle timeout or grace period elapsed)");
        }
        expired
    }

    pub fn session(&self, session_id: Uuid) -> Option<Session> {
        self.entries.read().get(&session_id).map(|e| e.session.clone())
    }

    pub fn active_count(&self) -> usize {
        self.entries.read().values().filter(|e| e.disconnected_at.is_none()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admitted_session_accepts_one_input_immediately() {
        let registry = SessionRegistry::new(20.0, 40.0, 60_000, 2_000);
        let id = registry.admit(0, None);
        assert!(registry.record_input(id, 0).is_ok());
    }

    #[test]
    fn set_location_updates_an_existing_session() {
        let registry = SessionRegistry::new(20.0, 40.0, 60_000, 2_000);
        let id = registry.admit(0, None);
        let location = Location { x: 12.0, y: 34.0 };
        registry.set_location(id, Some(location));
        assert_eq!(registry.session(id).unwrap().location, Some(location));
    }

    #[test]
    fn set_location_on_unknown_session_is_a_no_op() {
        let registry = SessionRegistry::new(20.0, 40.0, 60_000, 2_000);
        registry.set_location(Uuid::new_v4(), Some(Location { x: 1.0, y: 1.0 }));
    }

    #[test]
    fn burst_then_rate_limited() {
        let registry = SessionRegistry::new(20.0, 40.0, 60_000, 2_000);
        let id = registry.admit(0, None);
        for _ in 0..40 {
            assert!(registry.record_input(id, 0).is_ok());
        }
        assert!(matches!(registry.record_input(id, 0), Err(InputRejection::RateLimited)));
    }

    #[test]
    fn tokens_refill_over_time() {
        let registry = SessionRegistry::new(20.0, 40.0, 60_000, 2_000);
        let id = registry.admit(0, None);
        for _ in 0..40 {
            registry.record_input(id, 0).unwrap();
        }
        assert!(registry.record_input(id, 50).is_ok());
    }

    #[test]
    fn unknown_session_is_rejected() {
        let registry = SessionRegistry::new(20.0, 40.0, 60_000, 2_000);
        assert!(matches!(registry.record_input(Uuid::new_v4(), 0), Err(InputRejection::UnknownSession)));
    }

    #[test]
    fn sweep_removes_idle_sessions() {
        let registry = SessionRegistry::new(20.0, 40.0, 1_000, 2_000);
        let id = registry.admit(0, None);
        assert!(registry.sweep(500).is_empty());
        assert_eq!(registry.sweep(2_000), vec![id]);
    }

    #[test]
    fn reconnect_within_grace_restores_bucket() {
        let registry = SessionRegistry::new(20.0, 40.0, 60_000, 2_000);
        let id = registry.admit(0, None);
        registry.record_input(id, 0).unwrap();
        registry.disconnect(id, 100);
        assert!(registry.reconnect(id, 200));
        assert!(registry.sweep(300).is_empty());
    }

    #[test]
    fn sweep_removes_after_grace_period_without_reconnect() {
        let registry = SessionRegistry::new(20.0, 40.0, 60_000, 2_000);
        let id = registry.admit(0, None);
        registry.disconnect(id, 100);
        assert_eq!(registry.sweep(2_200), vec![id]);
    }
}
