use serde::{Deserialize, Serialize};

/// Every configuration option named in spec.md §6, with the documented
/// default. Loaded from TOML by `aggregator-config`; unknown keys are
/// rejected at startup via `deny_unknown_fields` (§9: "Dynamic option bags
/// become the enumerated configuration struct").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct EngineConfig {
    /// Scheduler tick cadence, milliseconds. Default 50 (20 Hz).
    pub tick_period_ms: u64,
    /// Input Buffer sliding-window size, milliseconds. Default 5000.
    pub temporal_window_ms: u64,
    /// Hard cap on buffered inputs per parameter, regardless of window.
    pub buffer_hard_cap: usize,
    /// `β` in the temporal weight formula. Default 1.5.
    pub temporal_decay_rate: f64,
    /// `α` in the spatial weight formula. Default 2.0.
    pub spatial_decay_rate: f64,
    /// Value-distance threshold for agreement weight and cluster splitting.
    /// Default 0.15.
    pub cluster_threshold: f64,
    /// Z-score threshold for outlier rejection. Default 2.5.
    pub outlier_threshold: f64,
    /// `f` in the smoothing recurrence. Default 0.3.
    pub smoothing_factor: f64,
    /// `α_s` weight-mix coefficient. Default 0.4.
    pub spatial_alpha: f64,
    /// `α_t` weight-mix coefficient. Default 0.4.
    pub temporal_beta: f64,
    /// `α_c` weight-mix coefficient. Default 0.2.
    pub consensus_gamma: f64,
    /// Session inactivity timeout, milliseconds. Default 60_000.
    pub session_idle_timeout_ms: u64,
    /// Grace period after disconnect before a session is dropped, ms.
    /// Default 2000.
    pub session_grace_period_ms: u64,
    /// Token-bucket sustained rate, Hz. Default 20.0.
    pub rate_limit_hz: f64,
    /// Token-bucket burst capacity. Default 40.0.
    pub rate_limit_burst: f64,
    /// Bounded per-subscriber bus queue size. Default 64.
    pub subscriber_queue_size: usize,
    pub stage_position_x: f64,
    pub stage_position_y: f64,
    pub osc_enabled: bool,
    pub osc_prefix: String,
    pub osc_local_port: u16,
    pub osc_remote_host: String,
    pub osc_remote_port: u16,
    /// Console/file log level ("trace".."error"). Not named in spec.md §6
    /// (ambient concern, carried regardless of Non-goals).
    pub log_level: String,
    /// When set, `aggregator-server` also writes a rolling log file here.
    pub log_dir: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 50,
            temporal_window_ms: 5_000,
            buffer_hard_cap: 10_000,
            temporal_decay_rate: 1.5,
            spatial_decay_rate: 2.0,
            cluster_threshold: 0.15,
            outlier_threshold: 2.5,
            smoothing_factor: 0.3,
            spatial_alpha: 0.4,
            temporal_beta: 0.4,
            consensus_gamma: 0.2,
            session_idle_timeout_ms: 60_000,
            session_grace_period_ms: 2_000,
            rate_limit_hz: 20.0,
            rate_limit_burst: 40.0,
            subscriber_queue_size: 64,
            stage_position_x: 50.0,
            stage_position_y: 50.0,
            osc_enabled: false,
            osc_prefix: "/consensus".to_string(),
            osc_local_port: 9000,
            osc_remote_host: "127.0.0.1".to_string(),
            osc_remote_port: 9001,
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl EngineConfig {
    /// Startup validation (§7 kind 5: "configuration invalid: core refuses
    /// to run"). Returns a human-readable description of the first problem
    /// found; callers surface this as a fatal error.
    pub fn validate(&self) -> Result<(), String> {
        if self.tick_period_ms == 0 {
            return Err("tick_period_ms must be > 0".into());
        }
        if !(0.0..=1.0).contains(&self.smoothing_factor) {
            return Err("smoothing_factor must be in [0, 1]".into());
        }
        if self.rate_limit_hz <= 0.0 {
            return Err("rate_limit_hz must be > 0".into());
        }
        if self.rate_limit_burst < self.rate_limit_hz {
            return Err("rate_limit_burst must be >= rate_limit_hz".into());
        }
        if self.subscriber_queue_size == 0 {
            return Err("subscriber_queue_size must be > 0".into());
        }
        let mix = self.spatial_alpha + self.temporal_beta + self.consensus_gamma;
        if !(0.9..=1.1).contains(&mix) {
            return Err(format!("spatial_alpha + temporal_beta + consensus_gamma must be ~1.0, got {mix}"));
        }
        Ok(())
    }
}
