use aggregator_types::WeightedInput;

/// Weighted mean and weighted standard deviation over a set of inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedStats {
    pub mean: f64,
    pub std_dev: f64,
}

pub fn weighted_stats(weighted: &[WeightedInput]) -> WeightedStats {
    let total_weight: f64 = weighted.iter().map(|w| w.weight).sum();
    if total_weight <= 0.0 {
        return WeightedStats { mean: 0.0, std_dev: 0.0 };
    }
    let mean = weighted.iter().map(|w| w.weight * w.value()).sum::<f64>() / total_weight;
    let variance = weighted.iter().map(|w| w.weight * (w.value() - mean).powi(2)).sum::<f64>() / total_weight;
    WeightedStats { mean, std_dev: variance.sqrt() }
}

/// Drops any input whose weighted z-score exceeds `threshold` (§4.3 step 3).
/// Skipped entirely when `N < 4` or `σ < 1e-3`, in which case every input
/// survives unchanged. Returns the survivors and how many were dropped.
pub fn filter_outliers(weighted: &[WeightedInput], threshold: f64) -> (Vec<WeightedInput>, usize) {
    if weighted.len() < 4 {
        return (weighted.to_vec(), 0);
    }
    let stats = weighted_stats(weighted);
    if stats.std_dev < 1e-3 {
        return (weighted.to_vec(), 0);
    }
    let mut survivors = Vec::with_capacity(weighted.len());
    let mut dropped = 0;
    for w in weighted {
        let z = (w.value() - stats.mean).abs() / stats.std_dev;
        if z > threshold {
            dropped += 1;
        } else {
            survivors.push(*w);
        }
    }
    (survivors, dropped)
}
