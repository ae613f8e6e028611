//! Core types and utilities for the serving benchmark workspace.
//!
//! This crate provides the foundational types, errors, configuration, and
//! latency statistics shared by the dataset, client, and harness crates.

pub mod cli;
pub mod config;
pub mod error;
pub mod labels;
pub mod stats;
pub mod types;

pub use config::*;
pub use error::{Error, Result};
pub use labels::{ClassMapping, LabelSpace};
pub use stats::LatencyStats;
pub use types::*;
