//! The Scheduler (C5, spec §4.5): a single logical clock that, each tick,
//! snapshots every registered parameter's buffer and drives
//! Weighting Core → Aggregator → Override Mixer → Parameter Bus from that
//! one snapshot, so the emitted [`ConsensusSnapshot`] is cross-parameter
//! consistent. Implements [`AsyncService`] the way the grounding
//! repository's long-running subsystems do, using its `tick`/`TickReason`
//! helper for the sleep-or-shutdown race.

use aggregator_aggregation::{aggregate_parameter, TickContext};
use aggregator_buffer::InputBuffer;
use aggregator_bus::{BusEvent, ParameterBus};
use aggregator_core::{AsyncService, AsyncServiceFuture, Counters, TickReason};
use aggregator_types::{ConsensusSnapshot, EngineConfig, Location, Parameter, PerformerOverride};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

/// `idle → running → (stopping) → stopped`; only `running` produces ticks
/// (§4.5). Transitions are idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

struct ParameterState {
    previous_value: Option<f64>,
    skip_smoothing_next: bool,
}

pub struct Scheduler {
    state: RwLock<SchedulerState>,
    config: EngineConfig,
    stage: Location,
    buffer: Arc<InputBuffer>,
    bus: Arc<ParameterBus>,
    counters: Arc<Counters>,
    parameters: RwLock<IndexMap<String, Parameter>>,
    parameter_state: RwLock<HashMap<String, ParameterState>>,
    overrides: RwLock<HashMap<String, PerformerOverride>>,
    shutdown: triggered::Listener,
}

impl Scheduler {
    pub fn new(config: EngineConfig, buffer: Arc<InputBuffer>, bus: Arc<ParameterBus>, counters: Arc<Counters>, shutdown: triggered::Listener) -> Self {
        let stage = Location { x: config.stage_position_x, y: config.stage_position_y };
        Self {
            state: RwLock::new(SchedulerState::Idle),
            config,
            stage,
            buffer,
            bus,
            counters,
            parameters: RwLock::new(IndexMap::new()),
            parameter_state: RwLock::new(HashMap::new()),
            overrides: RwLock::new(HashMap::new()),
            shutdown,
        }
    }

    /// Registers a parameter. Parameters may be added at runtime but never
    /// removed (§3); registering an already-known name is a no-op.
    pub fn register_parameter(&self, parameter: Parameter) {
        self.buffer.ensure_parameter(&parameter.name);
        let mut parameters = self.parameters.write();
        if !parameters.contains_key(&parameter.name) {
            self.parameter_state
                .write()
                .insert(parameter.name.clone(), ParameterState { previous_value: None, skip_smoothing_next: false });
            parameters.insert(parameter.name.clone(), parameter);
        }
    }

    pub fn parameter(&self, name: &str) -> Option<Parameter> {
        self.parameters.read().get(name).cloned()
    }

    /// Sets (or atomically replaces) the active override for `parameter`
    /// (§4.4: "setting a new override... replaces the previous one
    /// atomically").
    pub fn set_override(&self, parameter: &str, override_: PerformerOverride) {
        self.overrides.write().insert(parameter.to_string(), override_);
        self.bus.publish(BusEvent::OverrideSet { parameter: parameter.to_string(), override_ });
    }

    pub fn clear_override(&self, parameter: &str, now: u64) {
        self.overrides.write().remove(parameter);
        self.bus.publish(BusEvent::OverrideCleared { parameter: parameter.to_string(), at: now });
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.read()
    }

    pub fn request_start(&self) {
        let mut state = self.state.write();
        if matches!(*state, SchedulerState::Idle | SchedulerState::Stopped) {
            *state = SchedulerState::Running;
        }
    }

    /// Processed before the next tick; an in-flight tick always completes
    /// (§5). Idempotent.
    pub fn request_stop(&self) {
        let mut state = self.state.write();
        if *state == SchedulerState::Running {
            *state = SchedulerState::Stopping;
        }
    }

    /// Runs one tick across every registered parameter from a single
    /// buffer snapshot, publishes `CONSENSUS_UPDATE` per parameter and a
    /// final `CONSENSUS_SNAPSHOT`, and returns the snapshot (§4.5).
    pub fn tick(&self, now: u64) -> ConsensusSnapshot {
        self.buffer.prune(now);

        let parameters: Vec<Parameter> = self.parameters.read().values().cloned().collect();
        let overrides = self.overrides.read().clone();
        let mut snapshot = ConsensusSnapshot::new(now);

        for parameter in &parameters {
            let inputs = self.buffer.snapshot(&parameter.name, now);
            let active_override = overrides.get(&parameter.name);

            let mut parameter_state = self.parameter_state.write();
            let state = parameter_state
                .entry(parameter.name.clone())
                .or_insert_with(|| ParameterState { previous_value: None, skip_smoothing_next: false });

            let ctx = TickContext {
                parameter,
                stage: self.stage,
                config: &self.config,
                now,
                previous_value: state.previous_value,
                skip_smoothing: state.skip_smoothing_next,
                active_override,
            };
            let outcome = aggregate_parameter(&inputs, &ctx);

            state.previous_value = Some(outcome.result.value);
            state.skip_smoothing_next = outcome.skip_smoothing_next;
            drop(parameter_state);

            self.bus.publish(BusEvent::ConsensusUpdate(outcome.result.clone()));
            snapshot.insert(outcome.result);
        }

        self.bus.publish_snapshot(snapshot.clone());
        snapshot
    }

    /// The tick loop. Exits as soon as shutdown is signaled; otherwise
    /// wakes every `tickPeriodMs` and ticks iff the scheduler is running. A
    /// tick overrun (the previous tick's work outlasted the period) is
    /// counted, never queued-and-caught-up (§4.8, avoids runaway feedback).
    pub async fn run(self: Arc<Self>, shutdown: triggered::Listener) {
        let period = Duration::from_millis(self.config.tick_period_ms.max(1));
        loop {
            let woke_at = std::time::Instant::now();
            match aggregator_core::tick(period, &shutdown).await {
                TickReason::Shutdown => {
                    *self.state.write() = SchedulerState::Stopped;
                    return;
                }
                TickReason::Wakeup => {
                    let mut state = self.state.write();
                    match *state {
                        SchedulerState::Running => {
                            drop(state);
                            let now = aggregator_core::unix_now();
                            self.tick(now);
                            if woke_at.elapsed() > period {
                                self.counters.tick_overruns.fetch_add(1, Ordering::Relaxed);
                            }
                            self.counters.ticks_completed.fetch_add(1, Ordering::Relaxed);
                        }
                        SchedulerState::Stopping => *state = SchedulerState::Stopped,
                        SchedulerState::Idle | SchedulerState::Stopped => {}
                    }
                }
            }
        }
    }
}

impl AsyncService for Scheduler {
    fn ident(self: Arc<Self>) -> String {
        "scheduler".to_string()
    }

    fn start(self: Arc<Self>) -> AsyncServiceFuture {
        let shutdown = self.shutdown.clone();
        Box::pin(async move {
            self.run(shutdown).await;
            Ok(())
        })
    }

    fn signal_exit(self: Arc<Self>) {
        self.request_stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aggregator_types::{AudienceInput, ConsensusMode};
    use uuid::Uuid;

    fn scheduler() -> Scheduler {
        let config = EngineConfig::default();
        let counters = Arc::new(Counters::default());
        let buffer = Arc::new(InputBuffer::new(config.temporal_window_ms, config.buffer_hard_cap, counters.clone()));
        let bus = Arc::new(ParameterBus::new(config.subscriber_queue_size, counters.clone()));
        let (_trigger, listener) = triggered::trigger();
        Scheduler::new(config, buffer, bus, counters, listener)
    }

    #[test]
    fn idempotent_start_and_stop_transitions() {
        let s = scheduler();
        assert_eq!(s.state(), SchedulerState::Idle);
        s.request_start();
        s.request_start();
        assert_eq!(s.state(), SchedulerState::Running);
        s.request_stop();
        s.request_stop();
        assert_eq!(s.state(), SchedulerState::Stopping);
    }

    #[test]
    fn tick_produces_one_result_per_parameter() {
        let s = scheduler();
        s.register_parameter(Parameter::new("mood", ConsensusMode::WeightedAverage, 0.3, 0.5));
        s.register_parameter(Parameter::new("tempo", ConsensusMode::WeightedAverage, 0.3, 0.5));
        s.buffer.append("mood", AudienceInput::new(Uuid::new_v4(), Uuid::new_v4(), 0.8, 0, None));
        let snapshot = s.tick(0);
        assert_eq!(snapshot.results.len(), 2);
        assert!(snapshot.is_consistent());
    }

    #[test]
    fn registering_same_parameter_twice_is_a_no_op() {
        let s = scheduler();
        s.register_parameter(Parameter::new("mood", ConsensusMode::WeightedAverage, 0.3, 0.5));
        s.register_parameter(Parameter::new("mood", ConsensusMode::Median, 0.9, 0.1));
        assert_eq!(s.parameter("mood").unwrap().mode, ConsensusMode::WeightedAverage);
    }

    #[test]
    fn lock_override_persists_across_ticks_regardless_of_input() {
        let s = scheduler();
        s.register_parameter(Parameter::new("mood", ConsensusMode::WeightedAverage, 0.3, 0.5));
        s.set_override("mood", PerformerOverride::new(aggregator_types::OverrideMode::Lock, 0.77, None, None));
        let snap1 = s.tick(0);
        s.buffer.append("mood", AudienceInput::new(Uuid::new_v4(), Uuid::new_v4(), 0.1, 50, None));
        let snap2 = s.tick(50);
        assert_eq!(snap1.get("mood").unwrap().value, 0.77);
        assert_eq!(snap2.get("mood").unwrap().value, 0.77);
    }
}
