//! Pure metric computation over accumulated outcomes.

use std::collections::BTreeMap;
use std::time::Duration;

use bench_core::stats::LatencyStats;

use crate::accumulator::EvaluationAccumulator;
use crate::report::{Report, ScoringMode};

/// Builds the final report from accumulated outcomes.
///
/// Accuracy denominators use the scored count only; excluded and
/// unscoreable samples are reported separately and never counted as
/// incorrect. Every ratio is zero when its denominator is zero.
pub fn summarize(acc: EvaluationAccumulator, elapsed: Duration, mode: ScoringMode) -> Report {
    let scored = acc.scored;
    let top1_accuracy = ratio(acc.top1_correct, scored);
    let top5_accuracy = ratio(acc.top5_correct, scored);

    let per_class_accuracy: BTreeMap<String, f64> = acc
        .per_class
        .iter()
        .map(|(label, counts)| (label.clone(), ratio(counts.correct, counts.total)))
        .collect();

    let latency = LatencyStats::from_durations(&acc.latencies);

    let total_count = acc.attempted();
    let elapsed_seconds = elapsed.as_secs_f64();
    let images_per_second = if elapsed_seconds > 0.0 {
        total_count as f64 / elapsed_seconds
    } else {
        0.0
    };

    Report {
        top1_accuracy,
        top5_accuracy,
        top1_correct_count: acc.top1_correct,
        top5_correct_count: acc.top5_correct,
        total_count,
        scored_count: scored,
        excluded_count: acc.excluded,
        unscoreable_count: acc.unscoreable,
        per_class_accuracy,
        latency,
        elapsed_seconds,
        images_per_second,
        scoring_mode: mode,
        timestamp: chrono::Utc::now().to_rfc3339(),
        detailed_results: acc.into_details(),
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
