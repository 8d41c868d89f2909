//! Pipeline module.
//!
//! This module provides the cleaning pipeline and its record-level stages.

mod builder;
pub mod dedup;
mod executor;
pub mod outliers;
pub mod progress;

pub use builder::{Pipeline, PipelineBuilder};
pub use dedup::{DedupOutcome, Deduplicator};
pub use executor::RecordExecutor;
pub use outliers::OutlierNullifier;
pub use progress::{ClosureProgressReporter, CleaningStage, ProgressReporter, ProgressUpdate};
