//! Endpoint responsiveness check with synthetic inputs.
//!
//! Sends standardized random tensors instead of dataset images, so the
//! endpoint can be smoke-tested without any data on disk. Predictions are
//! meaningless; only success rate, latency, and output-class spread matter.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Semaphore};
use tracing::info;

use bench_client::InferenceClient;
use bench_core::{stats::LatencyStats, ImageDimensions, InputTensor, Result};

/// Success rate above which the endpoint is considered responsive
const RESPONSIVE_THRESHOLD: f64 = 0.9;

/// ImageNet channel statistics applied to the random pixels
const CHANNEL_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const CHANNEL_STD: [f32; 3] = [0.229, 0.224, 0.225];

#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub num_samples: usize,
    pub image_size: ImageDimensions,
    pub concurrency: usize,
    pub detail_limit: usize,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            num_samples: 100,
            image_size: ImageDimensions::imagenet(),
            concurrency: 1,
            detail_limit: 100,
        }
    }
}

/// One synthetic request outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticRecord {
    pub sample: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top1_index: Option<usize>,
    pub latency_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// How often each class came out on top
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassFrequency {
    pub index: usize,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticReport {
    pub success_rate: f64,
    pub successful_count: usize,
    pub total_count: usize,
    /// Success rate exceeded the responsiveness threshold
    pub is_responsive: bool,
    pub latency: LatencyStats,
    pub elapsed_seconds: f64,
    pub samples_per_second: f64,
    /// Ten most frequent top-1 classes, most frequent first
    pub top_classes: Vec<ClassFrequency>,
    pub timestamp: String,
    pub detailed_results: Vec<SyntheticRecord>,
}

/// A `[1, 3, H, W]` tensor of uniform random pixels run through the same
/// standardization as real images.
fn random_tensor(size: ImageDimensions) -> InputTensor {
    let mut rng = rand::thread_rng();
    let h = size.height as usize;
    let w = size.width as usize;
    let mut data = Vec::with_capacity(3 * h * w);
    for c in 0..3 {
        for _ in 0..h * w {
            let pixel: f32 = rng.gen_range(0.0..1.0);
            data.push((pixel - CHANNEL_MEAN[c]) / CHANNEL_STD[c]);
        }
    }
    InputTensor::new(vec![1, 3, h, w], data)
}

/// Fires `num_samples` synthetic requests and summarizes how the endpoint
/// held up.
pub async fn run_synthetic(
    client: Arc<dyn InferenceClient>,
    config: SyntheticConfig,
) -> Result<SyntheticReport> {
    let total = config.num_samples;
    info!(total, concurrency = config.concurrency, "starting synthetic benchmark");

    let start = Instant::now();
    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let (tx, mut rx) = mpsc::channel::<SyntheticRecord>(config.concurrency.max(1) * 2);

    for sample in 0..total {
        let semaphore = Arc::clone(&semaphore);
        let client = Arc::clone(&client);
        let tx = tx.clone();
        let size = config.image_size;
        tokio::spawn(async move {
            let permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };
            let tensor = match tokio::task::spawn_blocking(move || random_tensor(size)).await {
                Ok(tensor) => tensor,
                Err(_) => return,
            };
            let record = match client.infer(&tensor).await {
                Ok(result) => SyntheticRecord {
                    sample,
                    success: true,
                    top1_index: result.ranked.first().copied(),
                    latency_ms: result.latency.as_secs_f64() * 1000.0,
                    error: None,
                },
                Err(err) => SyntheticRecord {
                    sample,
                    success: false,
                    top1_index: None,
                    latency_ms: 0.0,
                    error: Some(err.to_string()),
                },
            };
            drop(permit);
            let _ = tx.send(record).await;
        });
    }
    drop(tx);

    let mut successful = 0usize;
    let mut latencies = Vec::new();
    let mut class_counts: HashMap<usize, usize> = HashMap::new();
    let mut details = Vec::new();
    while let Some(record) = rx.recv().await {
        if record.success {
            successful += 1;
            latencies.push(std::time::Duration::from_secs_f64(
                record.latency_ms / 1000.0,
            ));
            if let Some(index) = record.top1_index {
                *class_counts.entry(index).or_insert(0) += 1;
            }
        }
        if details.len() < config.detail_limit {
            details.push(record);
        }
    }

    let elapsed = start.elapsed();
    let elapsed_seconds = elapsed.as_secs_f64();
    let success_rate = if total == 0 {
        0.0
    } else {
        successful as f64 / total as f64
    };

    let mut top_classes: Vec<ClassFrequency> = class_counts
        .into_iter()
        .map(|(index, count)| ClassFrequency { index, count })
        .collect();
    top_classes.sort_by(|a, b| b.count.cmp(&a.count).then(a.index.cmp(&b.index)));
    top_classes.truncate(10);

    let report = SyntheticReport {
        success_rate,
        successful_count: successful,
        total_count: total,
        is_responsive: success_rate > RESPONSIVE_THRESHOLD,
        latency: LatencyStats::from_durations(&latencies),
        elapsed_seconds,
        samples_per_second: if elapsed_seconds > 0.0 {
            total as f64 / elapsed_seconds
        } else {
            0.0
        },
        top_classes,
        timestamp: chrono::Utc::now().to_rfc3339(),
        detailed_results: details,
    };
    info!(
        success_rate = report.success_rate,
        responsive = report.is_responsive,
        "synthetic benchmark finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use bench_client::{InferenceError, InferenceResult};

    struct AlwaysOk;

    #[async_trait]
    impl InferenceClient for AlwaysOk {
        async fn infer(&self, _tensor: &InputTensor) -> std::result::Result<InferenceResult, InferenceError> {
            Ok(InferenceResult {
                ranked: vec![7, 1, 2],
                values: vec![0.0; 10],
                latency: Duration::from_millis(3),
            })
        }
    }

    struct EveryOtherFails {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl InferenceClient for EveryOtherFails {
        async fn infer(&self, _tensor: &InputTensor) -> std::result::Result<InferenceResult, InferenceError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
                Err(InferenceError::NonSuccessStatus {
                    status: 503,
                    body: String::new(),
                })
            } else {
                Ok(InferenceResult {
                    ranked: vec![0],
                    values: vec![1.0],
                    latency: Duration::from_millis(1),
                })
            }
        }
    }

    fn small_config(num_samples: usize) -> SyntheticConfig {
        SyntheticConfig {
            num_samples,
            image_size: ImageDimensions::new(4, 4, 3),
            concurrency: 2,
            detail_limit: 100,
        }
    }

    #[test]
    fn test_random_tensor_shape_and_range() {
        let tensor = random_tensor(ImageDimensions::new(4, 4, 3));
        assert_eq!(tensor.shape, vec![1, 3, 4, 4]);
        assert!(tensor.is_consistent());
        // Standardized values stay within the range implied by pixels in [0, 1].
        for (i, v) in tensor.data.iter().enumerate() {
            let c = i / 16;
            let lo = (0.0 - CHANNEL_MEAN[c]) / CHANNEL_STD[c];
            let hi = (1.0 - CHANNEL_MEAN[c]) / CHANNEL_STD[c];
            assert!(*v >= lo && *v <= hi);
        }
    }

    #[tokio::test]
    async fn test_all_successes_is_responsive() {
        let report = run_synthetic(Arc::new(AlwaysOk), small_config(10)).await.unwrap();
        assert_eq!(report.successful_count, 10);
        assert_eq!(report.success_rate, 1.0);
        assert!(report.is_responsive);
        assert_eq!(report.top_classes.len(), 1);
        assert_eq!(report.top_classes[0].index, 7);
        assert_eq!(report.top_classes[0].count, 10);
    }

    #[tokio::test]
    async fn test_half_failures_not_responsive() {
        let client = EveryOtherFails {
            calls: AtomicUsize::new(0),
        };
        let mut config = small_config(10);
        config.concurrency = 1;
        let report = run_synthetic(Arc::new(client), config).await.unwrap();
        assert_eq!(report.successful_count, 5);
        assert!(!report.is_responsive);
        assert_eq!(report.detailed_results.len(), 10);
    }

    #[tokio::test]
    async fn test_zero_samples() {
        let report = run_synthetic(Arc::new(AlwaysOk), small_config(0)).await.unwrap();
        assert_eq!(report.success_rate, 0.0);
        assert!(!report.is_responsive);
        assert_eq!(report.latency.mean_ms, 0.0);
    }
}
