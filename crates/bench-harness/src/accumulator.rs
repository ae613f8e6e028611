//! Single-writer accumulation of per-sample outcomes.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Per-sample detail kept in the report, bounded by `detail_limit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleRecord {
    /// Image file name
    pub image: String,
    /// Ground-truth label id
    pub true_label_id: String,
    /// Ground-truth index in the local label space
    pub true_index: usize,
    /// Ground-truth index in the model's output space, when mapping applies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_index: Option<usize>,
    /// Model's best prediction
    pub top1_index: usize,
    /// Model's ranked predictions, best first
    pub top5_indices: Vec<usize>,
    pub top1_correct: bool,
    pub top5_correct: bool,
    pub latency_ms: f64,
}

/// Correct/total counters for one class
#[derive(Debug, Clone, Default)]
pub struct ClassCounts {
    pub correct: usize,
    pub total: usize,
}

/// Running evaluation state.
///
/// Owned by exactly one task; outcomes from concurrent workers are funneled
/// through a channel into it, so no counter is ever updated from two places.
#[derive(Debug)]
pub struct EvaluationAccumulator {
    pub scored: usize,
    pub top1_correct: usize,
    pub top5_correct: usize,
    pub excluded: usize,
    pub unscoreable: usize,
    pub per_class: HashMap<String, ClassCounts>,
    pub latencies: Vec<Duration>,
    details: Vec<SampleRecord>,
    detail_limit: usize,
}

impl EvaluationAccumulator {
    pub fn new(detail_limit: usize) -> Self {
        Self {
            scored: 0,
            top1_correct: 0,
            top5_correct: 0,
            excluded: 0,
            unscoreable: 0,
            per_class: HashMap::new(),
            latencies: Vec::new(),
            details: Vec::new(),
            detail_limit,
        }
    }

    /// Records a sample that completed inference and was scored.
    pub fn record_scored(&mut self, record: SampleRecord, latency: Duration) {
        self.scored += 1;
        if record.top1_correct {
            self.top1_correct += 1;
        }
        if record.top5_correct {
            self.top5_correct += 1;
        }

        let counts = self
            .per_class
            .entry(record.true_label_id.clone())
            .or_default();
        counts.total += 1;
        if record.top1_correct {
            counts.correct += 1;
        }

        self.latencies.push(latency);
        if self.details.len() < self.detail_limit {
            self.details.push(record);
        }
    }

    /// Records a sample whose preprocessing or inference failed. Excluded
    /// samples never enter the accuracy denominator.
    pub fn record_excluded(&mut self, image: &str, stage: &str, reason: &str) {
        self.excluded += 1;
        debug!(image, stage, reason, "sample excluded from scoring");
    }

    /// Records a sample whose ground truth has no index in the scoring
    /// space. No request is issued for such samples.
    pub fn record_unscoreable(&mut self, image: &str, reason: &str) {
        self.unscoreable += 1;
        debug!(image, reason, "sample unscoreable");
    }

    /// Total samples attempted, scored or not
    pub fn attempted(&self) -> usize {
        self.scored + self.excluded + self.unscoreable
    }

    pub fn details(&self) -> &[SampleRecord] {
        &self.details
    }

    pub fn into_details(self) -> Vec<SampleRecord> {
        self.details
    }
}
