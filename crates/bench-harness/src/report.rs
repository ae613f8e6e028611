//! Evaluation report structure and JSON persistence.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use bench_core::{stats::LatencyStats, Error, Result};

use crate::accumulator::SampleRecord;

/// Which label space predictions were scored against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    /// Model outputs indexed directly by the dataset's label space
    Native,
    /// Ground truth translated into the model's output space via a mapping
    Mapped,
}

/// Final evaluation report written as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub top1_accuracy: f64,
    pub top5_accuracy: f64,
    pub top1_correct_count: usize,
    pub top5_correct_count: usize,
    /// All samples attempted: scored + excluded + unscoreable
    pub total_count: usize,
    /// Samples that completed inference and entered the accuracy denominator
    pub scored_count: usize,
    /// Samples dropped due to preprocessing or inference failure
    pub excluded_count: usize,
    /// Samples whose ground truth has no index in the scoring space
    pub unscoreable_count: usize,
    /// Top-1 accuracy per ground-truth label id
    pub per_class_accuracy: BTreeMap<String, f64>,
    pub latency: LatencyStats,
    pub elapsed_seconds: f64,
    pub images_per_second: f64,
    pub scoring_mode: ScoringMode,
    pub timestamp: String,
    pub detailed_results: Vec<SampleRecord>,
}

impl Report {
    /// Writes the report as pretty-printed JSON, creating parent
    /// directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(self, path)?;
        info!(path = %path.display(), "report written");
        Ok(())
    }
}

/// Serializes a value as pretty JSON at `path`.
pub fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::ReportWrite {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).map_err(|e| Error::ReportWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn empty_report() -> Report {
        Report {
            top1_accuracy: 0.0,
            top5_accuracy: 0.0,
            top1_correct_count: 0,
            top5_correct_count: 0,
            total_count: 0,
            scored_count: 0,
            excluded_count: 0,
            unscoreable_count: 0,
            per_class_accuracy: BTreeMap::new(),
            latency: LatencyStats::default(),
            elapsed_seconds: 0.0,
            images_per_second: 0.0,
            scoring_mode: ScoringMode::Native,
            timestamp: chrono::Utc::now().to_rfc3339(),
            detailed_results: Vec::new(),
        }
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/nested/report.json");
        empty_report().save(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let parsed: Report = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.scored_count, 0);
    }

    #[test]
    fn test_save_failure_carries_report_path() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"plain file").unwrap();

        // Parent of the target is a file, so directory creation must fail.
        let target = blocker.join("report.json");
        match empty_report().save(&target) {
            Err(Error::ReportWrite { path, .. }) => assert_eq!(path, target),
            other => panic!("expected ReportWrite error, got {other:?}"),
        }
    }

    #[test]
    fn test_scoring_mode_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ScoringMode::Mapped).unwrap(),
            "\"mapped\""
        );
        assert_eq!(
            serde_json::to_string(&ScoringMode::Native).unwrap(),
            "\"native\""
        );
    }
}
