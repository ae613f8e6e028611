//! Configuration structures for the evaluation harness.

use crate::types::ImageDimensions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Inference endpoint configuration.
///
/// Passed into the client at construction; never read from ambient state,
/// so multiple endpoints can coexist in one process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Base URL of the inference server (no trailing slash required)
    pub base_url: String,
    /// Model name as registered on the server
    pub model_name: String,
    /// Name of the input tensor in the wire payload
    pub input_name: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of ranked predictions to keep per request
    pub top_k: usize,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            model_name: "mobilenetv4".to_string(),
            input_name: "pixel_values".to_string(),
            timeout_secs: 30,
            top_k: 5,
        }
    }
}

/// Dataset layout configuration.
///
/// Defaults follow the Tiny ImageNet validation layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Dataset root directory
    pub root: PathBuf,
    /// Ordered label-list file, relative to root (one label per line,
    /// line position = index)
    pub label_list_file: PathBuf,
    /// Annotation file, relative to root (whitespace-delimited
    /// `<image file> <label id>` pairs, one per line)
    pub annotation_file: PathBuf,
    /// Directory containing the annotated images, relative to root
    pub image_dir: PathBuf,
    /// Directory with class-bearing subdirectories, relative to root
    pub class_dir: PathBuf,
    /// Model input resolution
    pub image_size: ImageDimensions,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data/tiny-imagenet-200"),
            label_list_file: PathBuf::from("wnids.txt"),
            annotation_file: PathBuf::from("val/val_annotations.txt"),
            image_dir: PathBuf::from("val/images"),
            class_dir: PathBuf::from("train"),
            image_size: ImageDimensions::imagenet(),
        }
    }
}

/// Top-level evaluation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Inference endpoint
    pub endpoint: EndpointConfig,
    /// Dataset layout
    pub dataset: DatasetConfig,
    /// Optional persisted local-index to target-index mapping file
    pub mapping_file: Option<PathBuf>,
    /// Evaluate at most this many samples (None for all)
    pub num_samples: Option<usize>,
    /// Number of inference requests in flight at once
    pub concurrency: usize,
    /// Maximum number of per-sample detail records embedded in the report
    pub detail_limit: usize,
    /// Path for the JSON report
    pub output_file: PathBuf,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            endpoint: EndpointConfig::default(),
            dataset: DatasetConfig::default(),
            mapping_file: None,
            num_samples: None,
            concurrency: 1,
            detail_limit: 100,
            output_file: PathBuf::from("accuracy_results.json"),
        }
    }
}

impl EvaluationConfig {
    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> crate::Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            crate::Error::Config(format!("failed to read config {}: {e}", path.display()))
        })?;
        toml::from_str(&content).map_err(|e| {
            crate::Error::Config(format!("failed to parse config {}: {e}", path.display()))
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.concurrency == 0 {
            return Err(crate::Error::Config(
                "concurrency must be greater than 0".to_string(),
            ));
        }
        if self.endpoint.base_url.is_empty() {
            return Err(crate::Error::Config("endpoint base_url is empty".to_string()));
        }
        if self.endpoint.top_k == 0 {
            return Err(crate::Error::Config(
                "endpoint top_k must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
