//! Latency statistics for inference requests.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Latency summary over a set of request durations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencyStats {
    /// Mean latency in milliseconds
    pub mean_ms: f64,
    /// Standard deviation in milliseconds
    pub std_ms: f64,
    /// Minimum latency
    pub min_ms: f64,
    /// Maximum latency
    pub max_ms: f64,
    /// Median (50th percentile)
    pub p50_ms: f64,
    /// 95th percentile
    pub p95_ms: f64,
    /// 99th percentile
    pub p99_ms: f64,
}

impl LatencyStats {
    /// Calculates statistics from a list of durations.
    ///
    /// An empty input yields all zeros rather than an error, so a run that
    /// scored no samples still produces a valid report.
    pub fn from_durations(durations: &[Duration]) -> Self {
        if durations.is_empty() {
            return Self::default();
        }

        let mut times_ms: Vec<f64> = durations.iter().map(|d| d.as_secs_f64() * 1000.0).collect();
        times_ms.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let n = times_ms.len();
        let sum: f64 = times_ms.iter().sum();
        let mean = sum / n as f64;

        let variance: f64 = times_ms.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / n as f64;
        let std = variance.sqrt();

        Self {
            mean_ms: mean,
            std_ms: std,
            min_ms: times_ms[0],
            max_ms: times_ms[n - 1],
            p50_ms: percentile(&times_ms, 50.0),
            p95_ms: percentile(&times_ms, 95.0),
            p99_ms: percentile(&times_ms, 99.0),
        }
    }
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self {
            mean_ms: 0.0,
            std_ms: 0.0,
            min_ms: 0.0,
            max_ms: 0.0,
            p50_ms: 0.0,
            p95_ms: 0.0,
            p99_ms: 0.0,
        }
    }
}

/// Percentile of sorted data with linear interpolation between the two
/// nearest ranks.
fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    match sorted_data.len() {
        0 => 0.0,
        1 => sorted_data[0],
        n => {
            let rank = p / 100.0 * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            sorted_data[lo] + (sorted_data[hi] - sorted_data[lo]) * frac
        }
    }
}
