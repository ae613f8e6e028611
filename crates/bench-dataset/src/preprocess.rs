//! Image preprocessing for model input.
//!
//! Deterministic transform: decoded image -> RGB -> resize -> scale to
//! [0,1] -> per-channel standardization -> channel-first tensor with a
//! leading batch dimension.

use std::path::Path;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use bench_core::{Error, ImageDimensions, InputTensor, Result};

/// Configuration for image preprocessing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Target image dimensions
    pub target_size: ImageDimensions,
    /// Per-channel normalization means [R, G, B]
    pub mean: [f32; 3],
    /// Per-channel normalization standard deviations [R, G, B]
    pub std: [f32; 3],
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            target_size: ImageDimensions::imagenet(),
            // ImageNet normalization values
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
        }
    }
}

impl PreprocessConfig {
    /// Preprocessing for a given input resolution with ImageNet statistics
    pub fn for_size(target_size: ImageDimensions) -> Self {
        Self {
            target_size,
            ..Self::default()
        }
    }
}

/// Image preprocessor producing normalized model input tensors
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    config: PreprocessConfig,
}

impl ImagePreprocessor {
    /// Creates a new preprocessor with the given configuration
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// Preprocesses a decoded image into a `[1, 3, H, W]` tensor
    pub fn preprocess(&self, image: &DynamicImage) -> InputTensor {
        let target_w = self.config.target_size.width;
        let target_h = self.config.target_size.height;

        // Any color mode becomes canonical 3-channel RGB before resizing.
        let rgb = image.to_rgb8();
        let resized = if rgb.dimensions() == (target_w, target_h) {
            rgb
        } else {
            image::imageops::resize(&rgb, target_w, target_h, image::imageops::FilterType::Lanczos3)
        };

        let (width, height) = (target_w as usize, target_h as usize);
        let mut data = Vec::with_capacity(3 * width * height);

        // CHW layout, one channel plane at a time
        for channel in 0..3 {
            for y in 0..height {
                for x in 0..width {
                    let pixel = resized.get_pixel(x as u32, y as u32);
                    let value = pixel[channel] as f32 / 255.0;
                    data.push((value - self.config.mean[channel]) / self.config.std[channel]);
                }
            }
        }

        InputTensor::new(vec![1, 3, height, width], data)
    }

    /// Preprocesses an image file.
    ///
    /// Unreadable or corrupt images yield [`Error::Preprocess`] carrying the
    /// source path; the caller excludes the sample and continues.
    pub fn preprocess_path(&self, path: &Path) -> Result<InputTensor> {
        let image = image::open(path).map_err(|e| Error::Preprocess {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(self.preprocess(&image))
    }

    /// Expected tensor shape after preprocessing
    pub fn output_shape(&self) -> [usize; 4] {
        [
            1,
            self.config.target_size.channels as usize,
            self.config.target_size.height as usize,
            self.config.target_size.width as usize,
        ]
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new(PreprocessConfig::default())
    }
}
