//! Aggregation of seed-replicated fitness samples into a single scalar.

use serde::{Deserialize, Serialize};

/// How per-seed fitness samples for one individual combine into a single fitness value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitnessAggregation {
    /// Arithmetic mean across every seed.
    Mean,
    /// Mean of the worst (lowest) half of the sorted samples — worst-case-weighted selection
    /// pressure.
    CVaR50,
}

/// Combine `samples` per `aggregation`. Returns `0.0` for an empty slice.
pub fn aggregate(samples: &[f64], aggregation: FitnessAggregation) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    match aggregation {
        FitnessAggregation::Mean => mean(samples),
        FitnessAggregation::CVaR50 => cvar_50(samples),
    }
}

fn mean(samples: &[f64]) -> f64 {
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Mean of the lower half (by value) of `samples`, rounding the half-count up so a single sample
/// degenerates to its own value.
fn cvar_50(samples: &[f64]) -> f64 {
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("fitness samples must not be NaN"));
    let half = sorted.len().div_ceil(2);
    mean(&sorted[..half])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_uniform_samples_is_the_shared_value() {
        let samples = [3.0, 3.0, 3.0];
        assert_eq!(aggregate(&samples, FitnessAggregation::Mean), 3.0);
    }

    #[test]
    fn cvar50_is_pulled_toward_the_worst_half() {
        let samples = [1.0, 2.0, 3.0, 4.0];
        let value = aggregate(&samples, FitnessAggregation::CVaR50);
        assert_eq!(value, 1.5);
    }

    #[test]
    fn cvar50_on_a_single_sample_equals_that_sample() {
        let samples = [7.0];
        assert_eq!(aggregate(&samples, FitnessAggregation::CVaR50), 7.0);
    }

    #[test]
    fn empty_samples_aggregate_to_zero() {
        assert_eq!(aggregate(&[], FitnessAggregation::Mean), 0.0);
    }
}
