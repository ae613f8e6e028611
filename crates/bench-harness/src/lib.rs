//! Evaluation driver, metric aggregation, and report output.

pub mod accumulator;
pub mod driver;
pub mod metrics;
pub mod report;
pub mod synthetic;

pub use accumulator::{EvaluationAccumulator, SampleRecord};
pub use driver::EvaluationDriver;
pub use report::{Report, ScoringMode};
pub use synthetic::{run_synthetic, SyntheticConfig, SyntheticReport};
