use crate::input::Location;
use uuid::Uuid;

/// A connected audience participant (§3). Owned exclusively by the Session
/// Registry; no `AudienceInput` outlives its session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub session_id: Uuid,
    pub connected_at: u64,
    pub last_input_at: u64,
    /// Current token count in the rate-limiting bucket (§4.7).
    pub throttle_budget: f64,
    pub location: Option<Location>,
}

impl Session {
    pub fn new(session_id: Uuid, now: u64, burst: f64, location: Option<Location>) -> Self {
        Self { session_id, connected_at: now, last_input_at: now, throttle_budget: burst, location }
    }

    pub fn is_idle(&self, now: u64, idle_timeout_ms: u64) -> bool {
        now.saturating_sub(self.last_input_at) >= idle_timeout_ms
    }
}
