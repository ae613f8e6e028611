//! Dataset handling for the serving benchmark: sample listing, label-space
//! resolution, cross-space mapping files, and image preprocessing.

pub mod dataset;
pub mod labels;
pub mod preprocess;

pub use dataset::list_samples;
pub use labels::{load_class_mapping, resolve_label_space};
pub use preprocess::{ImagePreprocessor, PreprocessConfig};
