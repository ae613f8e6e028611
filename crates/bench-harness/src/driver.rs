//! Concurrent evaluation driver.
//!
//! Dispatches samples to worker tasks gated by a semaphore and funnels
//! their outcomes through a channel into a single aggregation loop, so
//! all counters have exactly one writer.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Semaphore};
use tracing::{info, warn};

use bench_client::InferenceClient;
use bench_core::{config::EvaluationConfig, labels::ClassMapping, Result, Sample};
use bench_dataset::{ImagePreprocessor, PreprocessConfig};

use crate::accumulator::{EvaluationAccumulator, SampleRecord};
use crate::metrics::summarize;
use crate::report::{Report, ScoringMode};

/// Inference failures tolerated back to back before a warning is logged
const CONSECUTIVE_FAILURE_WARN: usize = 10;

type ProgressFn = Box<dyn Fn(usize, usize) + Send + Sync>;

/// One worker outcome sent over the aggregation channel
enum SampleOutcome {
    Scored(Box<SampleRecord>, Duration),
    Excluded {
        image: String,
        stage: &'static str,
        reason: String,
    },
}

/// Runs an evaluation over a sample list against an inference client.
pub struct EvaluationDriver {
    config: EvaluationConfig,
    preprocessor: Arc<ImagePreprocessor>,
    mapping: Option<Arc<ClassMapping>>,
    client: Arc<dyn InferenceClient>,
    progress: Option<ProgressFn>,
}

impl EvaluationDriver {
    pub fn new(
        config: EvaluationConfig,
        mapping: Option<ClassMapping>,
        client: Arc<dyn InferenceClient>,
    ) -> Self {
        let preprocessor = ImagePreprocessor::new(PreprocessConfig::for_size(
            config.dataset.image_size,
        ));
        Self {
            config,
            preprocessor: Arc::new(preprocessor),
            mapping: mapping.map(Arc::new),
            client,
            progress: None,
        }
    }

    /// Installs a callback invoked as `(completed, total)` after each sample.
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    fn scoring_mode(&self) -> ScoringMode {
        if self.mapping.is_some() {
            ScoringMode::Mapped
        } else {
            ScoringMode::Native
        }
    }

    /// Index the model's outputs are scored against, or `None` when the
    /// local truth index has no counterpart in the scoring space.
    fn target_of(&self, local_index: usize) -> Option<usize> {
        match &self.mapping {
            Some(mapping) => mapping.map(local_index),
            None => Some(local_index),
        }
    }

    /// Evaluates the given samples and returns the final report.
    pub async fn run(&self, mut samples: Vec<Sample>) -> Result<Report> {
        self.config.validate()?;
        if let Some(limit) = self.config.num_samples {
            samples.truncate(limit);
        }
        let total = samples.len();
        info!(
            total,
            concurrency = self.config.concurrency,
            mode = ?self.scoring_mode(),
            "starting evaluation"
        );

        let start = Instant::now();
        let mut acc = EvaluationAccumulator::new(self.config.detail_limit);

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let (tx, mut rx) = mpsc::channel::<SampleOutcome>(self.config.concurrency.max(1) * 2);

        for sample in samples {
            // Samples without a scoreable truth index never issue a request.
            let Some(local_index) = sample.label_index else {
                acc.record_unscoreable(&sample.file_name(), "label id not in label space");
                continue;
            };
            let Some(expected) = self.target_of(local_index) else {
                acc.record_unscoreable(&sample.file_name(), "truth has no index in scoring space");
                continue;
            };
            let target_index = self.mapping.as_ref().map(|_| expected);

            let semaphore = Arc::clone(&semaphore);
            let preprocessor = Arc::clone(&self.preprocessor);
            let client = Arc::clone(&self.client);
            let tx = tx.clone();
            tokio::spawn(async move {
                let permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                let outcome = evaluate_sample(
                    &*preprocessor,
                    &*client,
                    &sample,
                    local_index,
                    target_index,
                    expected,
                )
                .await;
                drop(permit);
                // Receiver dropping means the run was abandoned.
                let _ = tx.send(outcome).await;
            });
        }
        drop(tx);

        let mut completed = acc.attempted();
        let mut consecutive_failures = 0usize;
        while let Some(outcome) = rx.recv().await {
            match outcome {
                SampleOutcome::Scored(record, latency) => {
                    consecutive_failures = 0;
                    acc.record_scored(*record, latency);
                }
                SampleOutcome::Excluded {
                    image,
                    stage,
                    reason,
                } => {
                    acc.record_excluded(&image, stage, &reason);
                    if stage == "inference" {
                        consecutive_failures += 1;
                        if consecutive_failures == CONSECUTIVE_FAILURE_WARN {
                            warn!(
                                consecutive_failures,
                                "inference is failing repeatedly, check the endpoint"
                            );
                        }
                    }
                }
            }
            completed += 1;
            if let Some(progress) = &self.progress {
                progress(completed, total);
            }
        }

        debug_assert_eq!(acc.attempted(), total);
        let elapsed = start.elapsed();
        info!(
            scored = acc.scored,
            excluded = acc.excluded,
            unscoreable = acc.unscoreable,
            elapsed_s = elapsed.as_secs_f64(),
            "evaluation finished"
        );
        Ok(summarize(acc, elapsed, self.scoring_mode()))
    }
}

/// Preprocesses and scores one sample. Never touches shared state; the
/// outcome is interpreted by the aggregation loop.
async fn evaluate_sample(
    preprocessor: &ImagePreprocessor,
    client: &dyn InferenceClient,
    sample: &Sample,
    local_index: usize,
    target_index: Option<usize>,
    expected: usize,
) -> SampleOutcome {
    let image = sample.file_name();

    let path: PathBuf = sample.path.clone();
    let preprocessor = preprocessor.clone();
    let tensor = match tokio::task::spawn_blocking(move || preprocessor.preprocess_path(&path))
        .await
    {
        Ok(Ok(tensor)) => tensor,
        Ok(Err(err)) => {
            return SampleOutcome::Excluded {
                image,
                stage: "preprocess",
                reason: err.to_string(),
            }
        }
        Err(err) => {
            return SampleOutcome::Excluded {
                image,
                stage: "preprocess",
                reason: format!("preprocessing task failed: {err}"),
            }
        }
    };

    let result = match client.infer(&tensor).await {
        Ok(result) => result,
        Err(err) => {
            return SampleOutcome::Excluded {
                image,
                stage: "inference",
                reason: err.to_string(),
            }
        }
    };

    let Some(&top1_index) = result.ranked.first() else {
        return SampleOutcome::Excluded {
            image,
            stage: "inference",
            reason: "empty prediction ranking".to_string(),
        };
    };

    // The ranking is top_k long and top_k may exceed 5; top-5 correctness
    // only ever looks at the first five entries.
    let top5_indices: Vec<usize> = result.ranked.iter().take(5).copied().collect();
    let top1_correct = top1_index == expected;
    let top5_correct = top5_indices.contains(&expected);

    SampleOutcome::Scored(
        Box::new(SampleRecord {
            image,
            true_label_id: sample.label_id.clone(),
            true_index: local_index,
            target_index,
            top1_index,
            top5_indices,
            top1_correct,
            top5_correct,
            latency_ms: result.latency.as_secs_f64() * 1000.0,
        }),
        result.latency,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::Path;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use bench_client::{InferenceError, InferenceResult};
    use bench_core::InputTensor;

    /// Always predicts a fixed index with a full top-5 ranking.
    struct FixedClient {
        top: usize,
    }

    #[async_trait]
    impl InferenceClient for FixedClient {
        async fn infer(
            &self,
            _tensor: &InputTensor,
        ) -> std::result::Result<InferenceResult, InferenceError> {
            let mut ranked = vec![self.top];
            ranked.extend((0..10).filter(|i| *i != self.top).take(4));
            Ok(InferenceResult {
                ranked,
                values: vec![0.0; 10],
                latency: Duration::from_millis(5),
            })
        }
    }

    struct FailingClient;

    #[async_trait]
    impl InferenceClient for FailingClient {
        async fn infer(
            &self,
            _tensor: &InputTensor,
        ) -> std::result::Result<InferenceResult, InferenceError> {
            Err(InferenceError::NonSuccessStatus {
                status: 500,
                body: "internal error".to_string(),
            })
        }
    }

    fn write_image(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([120, 60, 200]));
        img.save(&path).unwrap();
        path
    }

    fn samples(dir: &Path, count: usize, label_index: Option<usize>) -> Vec<Sample> {
        (0..count)
            .map(|i| {
                let path = write_image(dir, &format!("img_{i}.jpg"));
                Sample {
                    path,
                    label_id: "n01443537".to_string(),
                    label_index,
                }
            })
            .collect()
    }

    fn config(concurrency: usize) -> EvaluationConfig {
        let mut config = EvaluationConfig::default();
        config.concurrency = concurrency;
        config.dataset.image_size = bench_core::ImageDimensions {
            width: 8,
            height: 8,
            channels: 3,
        };
        config
    }

    #[tokio::test]
    async fn test_all_correct_when_client_matches_truth() {
        let dir = TempDir::new().unwrap();
        let samples = samples(dir.path(), 4, Some(0));

        let driver = EvaluationDriver::new(config(2), None, Arc::new(FixedClient { top: 0 }));
        let report = driver.run(samples).await.unwrap();

        assert_eq!(report.scored_count, 4);
        assert_eq!(report.top1_accuracy, 1.0);
        assert_eq!(report.top5_accuracy, 1.0);
        assert_eq!(report.excluded_count, 0);
        assert_eq!(report.per_class_accuracy["n01443537"], 1.0);
    }

    #[tokio::test]
    async fn test_wrong_top1_right_top5() {
        let dir = TempDir::new().unwrap();
        let samples = samples(dir.path(), 3, Some(1));

        // Predicts 0 first, but 1 appears later in the top 5.
        let driver = EvaluationDriver::new(config(1), None, Arc::new(FixedClient { top: 0 }));
        let report = driver.run(samples).await.unwrap();

        assert_eq!(report.top1_accuracy, 0.0);
        assert_eq!(report.top5_accuracy, 1.0);
    }

    /// Returns ten ranked classes with the truth (index 0) at rank 8.
    struct WideRankingClient;

    #[async_trait]
    impl InferenceClient for WideRankingClient {
        async fn infer(
            &self,
            _tensor: &InputTensor,
        ) -> std::result::Result<InferenceResult, InferenceError> {
            Ok(InferenceResult {
                ranked: vec![3, 4, 5, 6, 7, 8, 9, 0, 1, 2],
                values: vec![0.0; 10],
                latency: Duration::from_millis(5),
            })
        }
    }

    #[tokio::test]
    async fn test_top5_ignores_ranks_beyond_five() {
        let dir = TempDir::new().unwrap();
        let samples = samples(dir.path(), 3, Some(0));

        // top_k of 10 yields a wide ranking; a hit at rank 8 must not count
        // toward top-5 accuracy.
        let mut cfg = config(1);
        cfg.endpoint.top_k = 10;
        let driver = EvaluationDriver::new(cfg, None, Arc::new(WideRankingClient));
        let report = driver.run(samples).await.unwrap();

        assert_eq!(report.top1_accuracy, 0.0);
        assert_eq!(report.top5_accuracy, 0.0);
        assert_eq!(report.detailed_results[0].top5_indices, vec![3, 4, 5, 6, 7]);
    }

    #[tokio::test]
    async fn test_failing_endpoint_excludes_all() {
        let dir = TempDir::new().unwrap();
        let samples = samples(dir.path(), 3, Some(0));

        let driver = EvaluationDriver::new(config(2), None, Arc::new(FailingClient));
        let report = driver.run(samples).await.unwrap();

        assert_eq!(report.scored_count, 0);
        assert_eq!(report.excluded_count, 3);
        assert_eq!(report.total_count, 3);
        assert_eq!(report.top1_accuracy, 0.0);
        assert_eq!(report.latency.mean_ms, 0.0);
    }

    #[tokio::test]
    async fn test_unmapped_truth_is_unscoreable() {
        let dir = TempDir::new().unwrap();
        let mut all = samples(dir.path(), 2, Some(0));
        all.extend(samples(dir.path(), 1, Some(1)));

        // Mapping covers index 0 only; index 1 has no target.
        let mapping = ClassMapping::from_pairs(vec![(0, 42)]);
        let driver =
            EvaluationDriver::new(config(1), Some(mapping), Arc::new(FixedClient { top: 42 }));
        let report = driver.run(all).await.unwrap();

        assert_eq!(report.scoring_mode, ScoringMode::Mapped);
        assert_eq!(report.scored_count, 2);
        assert_eq!(report.unscoreable_count, 1);
        assert_eq!(report.top1_accuracy, 1.0);
    }

    #[tokio::test]
    async fn test_missing_label_index_is_unscoreable() {
        let dir = TempDir::new().unwrap();
        let samples = samples(dir.path(), 2, None);

        let driver = EvaluationDriver::new(config(1), None, Arc::new(FixedClient { top: 0 }));
        let report = driver.run(samples).await.unwrap();

        assert_eq!(report.scored_count, 0);
        assert_eq!(report.unscoreable_count, 2);
    }

    #[tokio::test]
    async fn test_concurrency_does_not_change_counts() {
        let dir = TempDir::new().unwrap();
        let make = || {
            let mut all = samples(dir.path(), 5, Some(0));
            all.extend(samples(dir.path(), 3, Some(1)));
            all
        };

        let serial = EvaluationDriver::new(config(1), None, Arc::new(FixedClient { top: 0 }))
            .run(make())
            .await
            .unwrap();
        let parallel = EvaluationDriver::new(config(4), None, Arc::new(FixedClient { top: 0 }))
            .run(make())
            .await
            .unwrap();

        assert_eq!(serial.scored_count, parallel.scored_count);
        assert_eq!(serial.top1_correct_count, parallel.top1_correct_count);
        assert_eq!(serial.top5_correct_count, parallel.top5_correct_count);
    }

    #[tokio::test]
    async fn test_num_samples_limit() {
        let dir = TempDir::new().unwrap();
        let samples = samples(dir.path(), 6, Some(0));

        let mut cfg = config(1);
        cfg.num_samples = Some(2);
        let driver =
            EvaluationDriver::new(cfg, None, Arc::new(FixedClient { top: 0 }));
        let report = driver.run(samples).await.unwrap();

        assert_eq!(report.total_count, 2);
    }

    #[tokio::test]
    async fn test_detail_list_bounded_by_config() {
        let dir = TempDir::new().unwrap();
        let samples = samples(dir.path(), 5, Some(0));

        let mut cfg = config(1);
        cfg.detail_limit = 3;
        let driver =
            EvaluationDriver::new(cfg, None, Arc::new(FixedClient { top: 0 }));
        let report = driver.run(samples).await.unwrap();

        assert_eq!(report.detailed_results.len(), 3);
        assert_eq!(report.scored_count, 5);
    }
}
