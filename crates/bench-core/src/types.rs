//! Core type definitions for the serving benchmark workspace.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Image dimensions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageDimensions {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Number of channels (e.g., 3 for RGB)
    pub channels: u32,
}

impl ImageDimensions {
    /// Creates new image dimensions
    pub fn new(width: u32, height: u32, channels: u32) -> Self {
        Self {
            width,
            height,
            channels,
        }
    }

    /// Standard ImageNet dimensions (224x224x3)
    pub fn imagenet() -> Self {
        Self::new(224, 224, 3)
    }

    /// Total number of scalar values per image
    pub fn element_count(&self) -> usize {
        self.width as usize * self.height as usize * self.channels as usize
    }
}

impl Default for ImageDimensions {
    fn default() -> Self {
        Self::imagenet()
    }
}

/// A labeled dataset sample, immutable once listed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    /// Path to the image file
    pub path: PathBuf,
    /// Ground-truth label identifier as it appears in the dataset
    /// (e.g., a WordNet id like "n01443537")
    pub label_id: String,
    /// Dense index of `label_id` in the resolved label space;
    /// `None` when the id did not resolve (unscoreable)
    pub label_index: Option<usize>,
}

impl Sample {
    /// Creates a new sample
    pub fn new(path: PathBuf, label_id: impl Into<String>, label_index: Option<usize>) -> Self {
        Self {
            path,
            label_id: label_id.into(),
            label_index,
        }
    }

    /// File name portion of the sample path, for report records
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// A preprocessed model input: flattened tensor data plus its shape.
///
/// Layout is channel-first with a leading batch dimension, `[1, C, H, W]`.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    /// Tensor shape, outermost dimension first
    pub shape: Vec<usize>,
    /// Flattened tensor values in row-major order
    pub data: Vec<f32>,
}

impl InputTensor {
    /// Creates a new tensor
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Self {
        Self { shape, data }
    }

    /// Number of elements implied by the shape
    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Whether the data length matches the declared shape
    pub fn is_consistent(&self) -> bool {
        self.element_count() == self.data.len()
    }
}
