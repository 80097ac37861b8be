//! Statistical reductions for speed test samples
//!
//! Latency is reported as a median so that a single congested probe does not
//! drag the result; throughput is total bits over wall-clock time.

use crate::{
    error::{AppError, Result},
    models::metrics::LatencySummary,
};
use std::time::Duration;

/// Smallest elapsed time used as a divisor when computing a rate
pub const MIN_RATE_ELAPSED: Duration = Duration::from_millis(1);

/// Median of the samples: middle value for odd counts, mean of the two
/// middle values for even counts. `None` for an empty slice.
pub fn median(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }

    let sorted = sorted_copy(samples);
    let mid = sorted.len() / 2;

    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

/// Throughput in megabits per second for `bytes` moved in `elapsed`.
///
/// Elapsed time is floored at [`MIN_RATE_ELAPSED`].
pub fn throughput_mbps(bytes: u64, elapsed: Duration) -> f64 {
    let elapsed = elapsed.max(MIN_RATE_ELAPSED);
    let megabits = (bytes as f64 * 8.0) / 1e6;
    megabits / elapsed.as_secs_f64()
}

/// Running throughput reported while a phase is still in progress
pub fn live_mbps(bytes_so_far: u64, elapsed_so_far: Duration) -> f64 {
    throughput_mbps(bytes_so_far, elapsed_so_far).max(0.0)
}

/// Percentile with linear interpolation between closest ranks.
/// `sorted_values` must be sorted ascending.
pub fn percentile(sorted_values: &[f64], percentile: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }

    let percentile = percentile.clamp(0.0, 100.0);
    let index = (percentile / 100.0) * (sorted_values.len() as f64 - 1.0);
    let lower_index = index.floor() as usize;
    let upper_index = index.ceil() as usize;

    if lower_index == upper_index {
        sorted_values[lower_index]
    } else {
        let lower_value = sorted_values[lower_index];
        let upper_value = sorted_values[upper_index];
        let weight = index - lower_index as f64;
        lower_value + weight * (upper_value - lower_value)
    }
}

/// Mean absolute difference between consecutive samples, in measurement order
pub fn jitter(samples: &[f64]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }

    let total: f64 = samples
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).abs())
        .sum();
    total / (samples.len() - 1) as f64
}

/// Reduce round-trip samples into the latency summary
pub fn summarize_latency(samples: &[f64]) -> Result<LatencySummary> {
    let median_ms = median(samples)
        .ok_or_else(|| AppError::statistics("No latency samples were collected"))?;

    if samples.iter().any(|s| !s.is_finite() || *s < 0.0) {
        return Err(AppError::statistics("Latency samples must be finite and non-negative"));
    }

    let sorted = sorted_copy(samples);
    let mean_ms = samples.iter().sum::<f64>() / samples.len() as f64;

    Ok(LatencySummary {
        min_ms: sorted[0],
        max_ms: sorted[sorted.len() - 1],
        mean_ms,
        median_ms,
        p90_ms: percentile(&sorted, 90.0),
        jitter_ms: jitter(samples),
    })
}

fn sorted_copy(samples: &[f64]) -> Vec<f64> {
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}
