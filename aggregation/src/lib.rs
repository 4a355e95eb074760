//! The Aggregator (C3) and Override Mixer (C4), spec §4.3–§4.4: per
//! parameter, per tick, turns a buffer snapshot into one [`ConsensusResult`].
//!
//! Each step lives in its own pure-function module so it can be tested (and
//! benchmarked) in isolation; [`aggregate_parameter`] wires them in the
//! documented order: pull (by the caller) → weight → outlier filter →
//! combine → smooth → mix override → confidence/participation.

pub mod combine;
pub mod cluster;
pub mod mixer;
pub mod outlier;
pub mod smoothing;

use aggregator_types::{AudienceInput, ConsensusMode, ConsensusResult, EngineConfig, Location, Parameter, PerformerOverride, WeightedInput};
use aggregator_weighting::AgreementIndex;

/// Everything [`aggregate_parameter`] needs besides the pulled inputs
/// themselves.
pub struct TickContext<'a> {
    pub parameter: &'a Parameter,
    pub stage: Location,
    pub config: &'a EngineConfig,
    pub now: u64,
    pub previous_value: Option<f64>,
    /// Set when the prior tick's override was an active `lock` (§4.4).
    pub skip_smoothing: bool,
    pub active_override: Option<&'a PerformerOverride>,
}

/// Result of aggregating one parameter for one tick, plus whether the next
/// tick should skip smoothing.
pub struct AggregationOutcome {
    pub result: ConsensusResult,
    pub skip_smoothing_next: bool,
}

/// Aggregates `inputs` (already pulled from the Input Buffer within the
/// temporal window) for a single parameter and tick.
pub fn aggregate_parameter(inputs: &[AudienceInput], ctx: &TickContext) -> AggregationOutcome {
    let original_count = inputs.len();

    if inputs.is_empty() {
        return empty_or_degenerate_outcome(ctx, original_count);
    }

    let values: Vec<f64> = inputs.iter().map(|i| i.value).collect();
    let agreement_index = AgreementIndex::build(&values);

    let weighted: Vec<WeightedInput> = inputs
        .iter()
        .map(|input| {
            let age = ctx.now.saturating_sub(input.timestamp);
            let spatial = aggregator_weighting::spatial_weight(input.location, ctx.stage, ctx.config.spatial_decay_rate);
            let temporal = aggregator_weighting::temporal_weight(age, ctx.config.temporal_window_ms, ctx.config.temporal_decay_rate);
            let agreement = agreement_index.agreement(input.value, ctx.config.cluster_threshold);
            let raw_weight = aggregator_weighting::combined_weight(
                spatial,
                temporal,
                agreement,
                ctx.config.spatial_alpha,
                ctx.config.temporal_beta,
                ctx.config.consensus_gamma,
            );
            WeightedInput::new(*input, spatial, temporal, agreement, raw_weight)
        })
        .collect();

    let (survivors, _dropped) = outlier::filter_outliers(&weighted, ctx.config.outlier_threshold);

    if survivors.is_empty() {
        return empty_or_degenerate_outcome(ctx, original_count);
    }

    let trimmed = outlier::weighted_stats(&survivors);
    let raw_mean = survivors.iter().map(|w| w.value()).sum::<f64>() / survivors.len() as f64;

    let (combined_value, bimodality, entropy) = match ctx.parameter.mode {
        ConsensusMode::WeightedAverage => (trimmed.mean, false, None),
        ConsensusMode::Median => {
            let values: Vec<f64> = survivors.iter().map(|w| w.value()).collect();
            (combine::weighted_median(&values), false, None)
        }
        ConsensusMode::MajorityVote => {
            let clusters = cluster::build_clusters(&survivors, ctx.config.cluster_threshold);
            match cluster::dominant_cluster(&clusters) {
                Some(dominant) => (dominant.centroid, cluster::is_bimodal(&clusters), Some(cluster::entropy(&clusters))),
                // "fall back to weighted average if clusters are absent" (§4.3 step 4)
                None => (trimmed.mean, false, None),
            }
        }
    };

    let smoothed = smoothing::smooth(ctx.previous_value, combined_value, ctx.parameter.smoothing_factor, ctx.skip_smoothing);
    let pre_override = ctx.parameter.clamp(smoothed);

    let (effective_value, skip_smoothing_next) = mixer::apply_override(pre_override, ctx.active_override, ctx.now);
    let effective_value = ctx.parameter.clamp(effective_value);

    let confidence = (1.0 - 2.0 * trimmed.std_dev).max(0.0);
    let participation_rate = (survivors.len() as f64 / original_count as f64).min(1.0);

    let result = ConsensusResult {
        parameter: ctx.parameter.name.clone(),
        value: effective_value,
        confidence,
        input_count: original_count,
        timestamp: ctx.now,
        mode: ctx.parameter.mode,
        raw_mean,
        weighted_mean: trimmed.mean,
        std_dev: trimmed.std_dev,
        participation_rate,
        bimodality,
        entropy,
    };

    AggregationOutcome { result, skip_smoothing_next }
}

/// Shared path for "no surviving inputs this tick" — either nothing arrived
/// (§4.3 "Empty input") or every pulled input was filtered as an outlier.
/// Both return the previous value (or the parameter default), confidence 0,
/// participation 0; an active override still applies atop it.
fn empty_or_degenerate_outcome(ctx: &TickContext, original_count: usize) -> AggregationOutcome {
    let base = ctx.previous_value.unwrap_or(ctx.parameter.default);
    let (effective_value, skip_smoothing_next) = mixer::apply_override(base, ctx.active_override, ctx.now);
    let effective_value = ctx.parameter.clamp(effective_value);

    let result = ConsensusResult {
        parameter: ctx.parameter.name.clone(),
        value: effective_value,
        confidence: 0.0,
        input_count: original_count,
        timestamp: ctx.now,
        mode: ctx.parameter.mode,
        raw_mean: base,
        weighted_mean: base,
        std_dev: 0.0,
        participation_rate: 0.0,
        bimodality: false,
        entropy: None,
    };
    AggregationOutcome { result, skip_smoothing_next }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aggregator_types::AudienceInput;
    use uuid::Uuid;

    fn config() -> EngineConfig {
        EngineConfig::default()
    }

    fn parameter(mode: ConsensusMode) -> Parameter {
        Parameter::new("mood", mode, 0.3, 0.5)
    }

    fn input(value: f64, timestamp: u64) -> AudienceInput {
        AudienceInput::new(Uuid::new_v4(), Uuid::new_v4(), value, timestamp, None)
    }

    #[test]
    fn scenario_single_input() {
        let param = parameter(ConsensusMode::WeightedAverage);
        let cfg = config();
        let ctx = TickContext {
            parameter: &param,
            stage: Location { x: 50.0, y: 50.0 },
            config: &cfg,
            now: 0,
            previous_value: None,
            skip_smoothing: false,
            active_override: None,
        };
        let outcome = aggregate_parameter(&[input(0.8, 0)], &ctx);
        assert!((outcome.result.value - 0.59).abs() < 1e-9);
        assert_eq!(outcome.result.input_count, 1);
        assert_eq!(outcome.result.participation_rate, 1.0);
    }

    #[test]
    fn scenario_consensus_converges() {
        let param = parameter(ConsensusMode::WeightedAverage);
        let cfg = config();
        let mut previous = None;
        let mut skip = false;
        for tick in 0..20u64 {
            let inputs: Vec<_> = (0..10).map(|_| input(0.7, tick * 50)).collect();
            let ctx = TickContext {
                parameter: &param,
                stage: Location { x: 50.0, y: 50.0 },
                config: &cfg,
                now: tick * 50,
                previous_value: previous,
                skip_smoothing: skip,
                active_override: None,
            };
            let outcome = aggregate_parameter(&inputs, &ctx);
            previous = Some(outcome.result.value);
            skip = outcome.skip_smoothing_next;
        }
        assert!((previous.unwrap() - 0.7).abs() < 1e-3);
    }

    #[test]
    fn scenario_outlier_rejection() {
        let param = parameter(ConsensusMode::WeightedAverage);
        let cfg = config();
        let mut inputs: Vec<_> = (0..9).map(|_| input(0.5, 0)).collect();
        inputs.push(input(0.99, 0));
        let ctx = TickContext {
            parameter: &param,
            stage: Location { x: 50.0, y: 50.0 },
            config: &cfg,
            now: 0,
            previous_value: None,
            skip_smoothing: false,
            active_override: None,
        };
        let outcome = aggregate_parameter(&inputs, &ctx);
        assert!((outcome.result.raw_mean - 0.5).abs() < 1e-9);
        assert_eq!(outcome.result.participation_rate, 0.9);
    }

    #[test]
    fn scenario_bimodal_majority_vote() {
        let param = parameter(ConsensusMode::MajorityVote);
        let cfg = config();
        let mut inputs: Vec<_> = (0..10).map(|_| input(0.2, 0)).collect();
        inputs.extend((0..10).map(|_| input(0.8, 0)));
        let ctx = TickContext {
            parameter: &param,
            stage: Location { x: 50.0, y: 50.0 },
            config: &cfg,
            now: 0,
            previous_value: None,
            skip_smoothing: false,
            active_override: None,
        };
        let outcome = aggregate_parameter(&inputs, &ctx);
        assert!(outcome.result.bimodality);
        assert!((outcome.result.entropy.unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn scenario_override_blend() {
        let param = parameter(ConsensusMode::WeightedAverage);
        let cfg = config();
        let ov = PerformerOverride::new(aggregator_types::OverrideMode::Blend, 0.9, Some(0.5), None);
        let ctx = TickContext {
            parameter: &param,
            stage: Location { x: 50.0, y: 50.0 },
            config: &cfg,
            now: 0,
            previous_value: Some(0.4),
            skip_smoothing: false,
            active_override: Some(&ov),
        };
        let outcome = aggregate_parameter(&[], &ctx);
        assert!((outcome.result.value - 0.65).abs() < 1e-9);
    }

    #[test]
    fn empty_input_returns_previous_value_with_zero_confidence() {
        let param = parameter(ConsensusMode::WeightedAverage);
        let cfg = config();
        let ctx = TickContext {
            parameter: &param,
            stage: Location { x: 50.0, y: 50.0 },
            config: &cfg,
            now: 0,
            previous_value: Some(0.42),
            skip_smoothing: false,
            active_override: None,
        };
        let outcome = aggregate_parameter(&[], &ctx);
        assert_eq!(outcome.result.value, 0.42);
        assert_eq!(outcome.result.confidence, 0.0);
        assert_eq!(outcome.result.participation_rate, 0.0);
    }

    #[test]
    fn empty_input_without_previous_falls_back_to_default() {
        let param = parameter(ConsensusMode::WeightedAverage);
        let cfg = config();
        let ctx = TickContext {
            parameter: &param,
            stage: Location { x: 50.0, y: 50.0 },
            config: &cfg,
            now: 0,
            previous_value: None,
            skip_smoothing: false,
            active_override: None,
        };
        let outcome = aggregate_parameter(&[], &ctx);
        assert_eq!(outcome.result.value, param.default);
    }
}
