//! Progress reporting for the cleaning pipeline.
//!
//! A run has no suspension points and no cancellation; it either completes or
//! aborts. Progress updates let a caller (the CLI, a scheduler log) follow the
//! stages as they run.
//!
//! # Example
//!
//! ```rust,ignore
//! use shipment_cleaning::Pipeline;
//!
//! let result = Pipeline::builder()
//!     .on_progress(|update| {
//!         println!("[{:?}] {}", update.stage, update.message);
//!     })
//!     .build()?
//!     .process(df);
//! ```

use serde::{Deserialize, Serialize};

/// Stages of the cleaning pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningStage {
    /// Validating the input batch
    Initializing,
    /// Canonicalizing column names
    ColumnNormalization,
    /// Trimming text and nulling missing-value tokens
    ValueSanitization,
    /// Parsing dates and measures
    TypeCoercion,
    /// Nulling negative measures
    OutlierNullification,
    /// Estimating missing delivery dates
    DateImputation,
    /// Learning carrier rates and estimating missing costs
    CostImputation,
    /// Removing duplicate rows and shipment ids
    Deduplication,
    /// Pipeline completed successfully
    Complete,
    /// Pipeline failed with an error
    Failed,
}

impl CleaningStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::ColumnNormalization => "Normalizing Columns",
            Self::ValueSanitization => "Sanitizing Values",
            Self::TypeCoercion => "Coercing Types",
            Self::OutlierNullification => "Nullifying Outliers",
            Self::DateImputation => "Imputing Delivery Dates",
            Self::CostImputation => "Imputing Costs",
            Self::Deduplication => "Deduplicating",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Returns the typical weight of this stage in the overall pipeline (0.0 - 1.0).
    pub fn weight(&self) -> f32 {
        match self {
            Self::Initializing => 0.02,
            Self::ColumnNormalization => 0.08,
            Self::ValueSanitization => 0.15,
            Self::TypeCoercion => 0.15,
            Self::OutlierNullification => 0.10,
            Self::DateImputation => 0.10,
            Self::CostImputation => 0.25,
            Self::Deduplication => 0.15,
            Self::Complete | Self::Failed => 0.0,
        }
    }

    /// Returns the cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Initializing => 0.0,
            Self::ColumnNormalization => 0.02,
            Self::ValueSanitization => 0.10,
            Self::TypeCoercion => 0.25,
            Self::OutlierNullification => 0.40,
            Self::DateImputation => 0.50,
            Self::CostImputation => 0.60,
            Self::Deduplication => 0.85,
            Self::Complete => 1.0,
            Self::Failed => 0.0,
        }
    }
}

/// Progress update emitted at stage boundaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Current pipeline stage
    pub stage: CleaningStage,

    /// Optional sub-stage description (e.g., "Learning carrier rates")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_stage: Option<String>,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    /// Human-readable message describing current activity
    pub message: String,
}

impl ProgressUpdate {
    /// Creates a new progress update for a stage without sub-stage info.
    pub fn new(stage: CleaningStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            sub_stage: None,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
        }
    }

    /// Creates a new progress update with sub-stage information.
    pub fn with_sub_stage(
        stage: CleaningStage,
        sub_stage: impl Into<String>,
        stage_progress: f32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            sub_stage: Some(sub_stage.into()),
            ..Self::new(stage, stage_progress, message)
        }
    }

    /// Creates a completion progress update.
    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(CleaningStage::Complete, 1.0, message)
    }

    /// Creates a failed progress update.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(CleaningStage::Failed, 0.0, message)
    }
}

/// Trait for receiving progress updates during cleaning.
///
/// Implementations must be `Send + Sync` so a pipeline can be moved onto a
/// worker thread by the scheduler.
pub trait ProgressReporter: Send + Sync {
    /// Called at each stage boundary. Should be cheap and non-blocking.
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    /// Creates a new closure-based progress reporter.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const RUN_STAGES: [CleaningStage; 8] = [
        CleaningStage::Initializing,
        CleaningStage::ColumnNormalization,
        CleaningStage::ValueSanitization,
        CleaningStage::TypeCoercion,
        CleaningStage::OutlierNullification,
        CleaningStage::DateImputation,
        CleaningStage::CostImputation,
        CleaningStage::Deduplication,
    ];

    #[test]
    fn test_progress_update_new() {
        let update = ProgressUpdate::new(CleaningStage::CostImputation, 0.5, "Imputing...");
        assert_eq!(update.stage, CleaningStage::CostImputation);
        assert!(update.sub_stage.is_none());
        assert_eq!(update.stage_progress, 0.5);
        assert!((update.progress - 0.725).abs() < 1e-6);
    }

    #[test]
    fn test_progress_update_with_sub_stage() {
        let update = ProgressUpdate::with_sub_stage(
            CleaningStage::Deduplication,
            "Shipment ids",
            0.5,
            "Collapsing repeated ids",
        );
        assert_eq!(update.sub_stage.as_deref(), Some("Shipment ids"));
        assert_eq!(update.message, "Collapsing repeated ids");
    }

    #[test]
    fn test_progress_update_complete() {
        let update = ProgressUpdate::complete("Done!");
        assert_eq!(update.stage, CleaningStage::Complete);
        assert_eq!(update.progress, 1.0);
    }

    #[test]
    fn test_stage_weights_sum() {
        let total_weight: f32 = RUN_STAGES.iter().map(|s| s.weight()).sum();
        assert!((total_weight - 1.0).abs() < 0.01, "Weights should sum to ~1.0");
    }

    #[test]
    fn test_stage_bases_are_cumulative() {
        let mut expected = 0.0;
        for stage in RUN_STAGES {
            assert!((stage.base_progress() - expected).abs() < 1e-6, "{:?}", stage);
            expected += stage.weight();
        }
    }

    #[test]
    fn test_closure_progress_reporter() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();

        let reporter = ClosureProgressReporter::new(move |_update| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        reporter.report(ProgressUpdate::new(CleaningStage::TypeCoercion, 0.5, "Test"));
        reporter.report(ProgressUpdate::complete("Done"));

        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_stage_json_values() {
        let json = serde_json::to_string(&CleaningStage::OutlierNullification).unwrap();
        assert_eq!(json, "\"outlier_nullification\"");

        let update = ProgressUpdate::new(CleaningStage::DateImputation, 1.0, "Done");
        let json = serde_json::to_string(&update).unwrap();
        assert!(json.contains("\"stage\":\"date_imputation\""));
        assert!(!json.contains("sub_stage"));
    }
}
