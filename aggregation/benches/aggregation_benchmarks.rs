use aggregator_aggregation::{aggregate_parameter, TickContext};
use aggregator_types::{AudienceInput, ConsensusMode, EngineConfig, Location, Parameter};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::Rng;
use uuid::Uuid;

fn gen_inputs(n: usize) -> Vec<AudienceInput> {
    let mut rng = rand::thread_rng();
    (0..n).map(|i| AudienceInput::new(Uuid::new_v4(), Uuid::new_v4(), rng.gen_range(0.0..1.0), i as u64, None)).collect()
}

fn aggregate_parameter_benchmark(c: &mut Criterion) {
    let config = EngineConfig::default();
    let stage = Location { x: config.stage_position_x, y: config.stage_position_y };

    for &n in &[10usize, 100, 1000] {
        let inputs = gen_inputs(n);

        let param = Parameter::new("mood", ConsensusMode::WeightedAverage, 0.3, 0.5);
        c.bench_function(&format!("aggregate_parameter/weighted_average/{n}"), |b| {
            b.iter(|| {
                let ctx = TickContext {
                    parameter: &param,
                    stage,
                    config: &config,
                    now: n as u64,
                    previous_value: Some(0.5),
                    skip_smoothing: false,
                    active_override: None,
                };
                aggregate_parameter(black_box(&inputs), &ctx)
            })
        });

        let param = Parameter::new("mood", ConsensusMode::MajorityVote, 0.3, 0.5);
        c.bench_function(&format!("aggregate_parameter/majority_vote/{n}"), |b| {
            b.iter(|| {
                let ctx = TickContext {
                    parameter: &param,
                    stage,
                    config: &config,
                    now: n as u64,
                    previous_value: Some(0.5),
                    skip_smoothing: false,
                    active_override: None,
                };
                aggregate_parameter(black_box(&inputs), &ctx)
            })
        });
    }
}

criterion_group!(benches, aggregate_parameter_benchmark);
criterion_main!(benches);
