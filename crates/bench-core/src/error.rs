//! Error types for the serving benchmark workspace.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the benchmark workspace.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An image could not be read or decoded; the affected sample is
    /// excluded, the run continues.
    #[error("Preprocessing failed for {path}: {reason}")]
    Preprocess { path: PathBuf, reason: String },

    /// No label source could be found for the dataset. Fatal: without a
    /// label universe no accuracy is measurable.
    #[error("Label space unavailable: {0}")]
    LabelSpaceUnavailable(String),

    /// Cross-space mapping file error
    #[error("Class mapping error: {0}")]
    Mapping(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The final report could not be written. The evaluation results still
    /// exist in memory; the caller may retry with a different path.
    #[error("Failed to write report to {path}: {source}")]
    ReportWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Specialized Result type for benchmark operations.
pub type Result<T> = std::result::Result<T, Error>;
