//! Main cleaning pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! orchestrating the cleaning stages over one batch.

use crate::batch::ShipmentBatch;
use crate::cleaner::DataCleaner;
use crate::config::CleaningConfig;
use crate::error::{CleaningError, Result};
use crate::pipeline::outliers::OutlierNullifier;
use crate::pipeline::progress::{
    ClosureProgressReporter, CleaningStage, ProgressReporter, ProgressUpdate,
};
use crate::pipeline::RecordExecutor;
use crate::types::{CleaningResult, CleaningSummary};
use polars::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// The shipment cleaning pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use shipment_cleaning::{CleaningConfig, Pipeline};
///
/// let result = Pipeline::builder()
///     .config(CleaningConfig::builder().date_format("%d/%m/%Y").build()?)
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .process(dataframe)?;
///
/// println!("{} rows cleaned", result.batch.len());
/// ```
pub struct Pipeline {
    config: CleaningConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    executor: RecordExecutor,
}

// Pipeline can be handed to a worker thread by the scheduler
static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Run every stage, in order, over one batch.
    ///
    /// All-or-nothing: a structural failure at any stage returns `Err` and no
    /// partial batch. Row-local problems never fail a run; they are repaired
    /// or left null and counted in the summary.
    pub fn process(&self, df: DataFrame) -> Result<CleaningResult> {
        match self.process_internal(df) {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete("Pipeline completed successfully"));
                Ok(result)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error [{}]: {}", e.error_code(), e);
                Err(e)
            }
        }
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn start_stage(&self, stage: CleaningStage, message: &str) {
        self.report_progress(ProgressUpdate::new(stage, 0.0, message));
    }

    fn finish_stage(&self, stage: CleaningStage, message: impl Into<String>) {
        self.report_progress(ProgressUpdate::new(stage, 1.0, message));
    }

    fn process_internal(&self, df: DataFrame) -> Result<CleaningResult> {
        let start_time = Instant::now();

        info!("Starting cleaning pipeline...");
        self.start_stage(CleaningStage::Initializing, "Starting cleaning pipeline...");

        if df.height() == 0 {
            return Err(CleaningError::EmptyBatch);
        }

        let mut summary = CleaningSummary::new();
        summary.rows_before = df.height();
        summary.columns = df.width();

        let cleaner = DataCleaner::new(&self.config);

        // Step 1: Column names
        self.start_stage(CleaningStage::ColumnNormalization, "Normalizing column names...");
        info!("Step 1: Normalizing column names...");
        let df = cleaner
            .normalize_columns(df, &mut summary)
            .map_err(|e| CleaningError::stage("column_normalizer", e))?;
        self.finish_stage(
            CleaningStage::ColumnNormalization,
            format!("{} columns renamed", summary.columns_renamed),
        );

        // Step 2: Missing-value tokens
        self.start_stage(CleaningStage::ValueSanitization, "Sanitizing values...");
        info!("Step 2: Sanitizing values...");
        let df = cleaner
            .sanitize_values(df, &mut summary)
            .map_err(|e| CleaningError::stage("value_sanitizer", e))?;
        self.finish_stage(
            CleaningStage::ValueSanitization,
            format!("{} values nulled", summary.tokens_nullified),
        );

        // Step 3: Dates and measures
        self.start_stage(CleaningStage::TypeCoercion, "Coercing types...");
        info!("Step 3: Coercing types...");
        let mut df = cleaner
            .coerce_types(df, &mut summary)
            .map_err(|e| CleaningError::stage("type_coercer", e))?;
        self.finish_stage(CleaningStage::TypeCoercion, "Type coercion complete");

        // Step 4: Negative measures
        self.start_stage(CleaningStage::OutlierNullification, "Nullifying negative measures...");
        info!("Step 4: Nullifying negative measures...");
        OutlierNullifier::nullify_negatives(&mut df, &mut summary)
            .map_err(|e| CleaningError::stage("outlier_nullifier", e))?;
        self.finish_stage(
            CleaningStage::OutlierNullification,
            format!("{} negative values nulled", summary.negatives_nullified),
        );

        // Every column-wise stage is done before any row-level stage reads
        // weight, distance and cost together.
        let mut batch = ShipmentBatch::from_dataframe(&df)?;
        drop(df);

        // Step 5: Delivery dates
        self.start_stage(CleaningStage::DateImputation, "Imputing delivery dates...");
        info!("Step 5: Imputing delivery dates...");
        self.executor.impute_delivery_dates(&mut batch, &mut summary);
        self.finish_stage(
            CleaningStage::DateImputation,
            format!("{} delivery dates imputed", summary.delivery_dates_imputed),
        );

        // Step 6: Costs
        self.start_stage(CleaningStage::CostImputation, "Learning carrier rates...");
        info!("Step 6: Imputing costs...");
        let rates = self.executor.impute_costs(&mut batch, &mut summary)?;
        self.report_progress(ProgressUpdate::with_sub_stage(
            CleaningStage::CostImputation,
            "carrier_rates",
            0.5,
            format!("{} carrier rates learned", rates.len()),
        ));
        self.finish_stage(
            CleaningStage::CostImputation,
            format!("{} costs imputed", summary.costs_imputed),
        );

        // Step 7: Duplicates
        self.start_stage(CleaningStage::Deduplication, "Removing duplicates...");
        info!("Step 7: Removing duplicates...");
        let batch = self.executor.deduplicate(batch, &mut summary)?;
        self.finish_stage(
            CleaningStage::Deduplication,
            format!(
                "{} rows removed",
                summary.exact_duplicates_removed + summary.id_collisions_collapsed
            ),
        );

        summary.rows_after = batch.len();
        summary.duration_ms = start_time.elapsed().as_millis() as u64;

        if summary.rows_removed_percentage() > 30.0 {
            summary.add_warning(format!(
                "High duplicate rate: {:.1}% of rows were removed",
                summary.rows_removed_percentage()
            ));
        }

        info!(
            "Pipeline finished: {} -> {} rows in {} ms",
            summary.rows_before, summary.rows_after, summary.duration_ms
        );

        Ok(CleaningResult { batch, summary })
    }
}

/// Builder for creating a [`Pipeline`] instance.
///
/// Use [`Pipeline::builder()`] to get started.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<CleaningConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: CleaningConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// This is a convenience method for simple progress handling.
    /// For more complex scenarios, use [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns [`CleaningError::InvalidConfig`] if the configuration is invalid.
    pub fn build(self) -> Result<Pipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let executor = RecordExecutor::new(config.null_inverted_delivery_dates);

        Ok(Pipeline {
            config,
            progress_reporter: self.progress_reporter,
            executor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn raw_frame() -> DataFrame {
        df![
            "Shipment ID" => [Some("S1"), Some("S2"), Some("S3"), Some("S3")],
            "Carrier" => [Some("X"), Some("X"), Some("X"), Some("n/a")],
            "Shipment Date" => [
                Some("2024-01-01"),
                Some("2024-01-02"),
                Some("2024-01-03"),
                Some("2024-01-03"),
            ],
            "Delivery Date" => [None, Some("2024-01-05"), Some("NULL"), Some("2024-01-06")],
            "Weight KG" => [Some(10.0), Some(10.0), Some(10.0), Some(-5.0)],
            "Distance Miles" => [Some(5.0), Some(6.0), Some(5.0), Some(5.0)],
            "Transit Days" => [Some(3.0), Some(3.0), None, Some(3.0)],
            "Cost" => [Some("100"), Some("120"), None, Some("N/A")],
        ]
        .unwrap()
    }

    #[test]
    fn test_pipeline_builder_default() {
        let pipeline = Pipeline::builder().build().unwrap();
        assert_eq!(pipeline.config().date_format, "%Y-%m-%d");
        assert!(pipeline.progress_reporter.is_none());
    }

    #[test]
    fn test_pipeline_builder_rejects_invalid_config() {
        let config = CleaningConfig {
            missing_value_tokens: vec![],
            ..Default::default()
        };
        let err = Pipeline::builder().config(config).build().err().unwrap();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_process_runs_all_stages() {
        let result = Pipeline::builder().build().unwrap().process(raw_frame()).unwrap();
        let summary = &result.summary;

        assert_eq!(summary.rows_before, 4);
        assert_eq!(summary.rows_after, 3);
        assert_eq!(summary.columns_renamed, 8);
        assert_eq!(summary.tokens_nullified, 3);
        assert_eq!(summary.negatives_nullified, 1);
        assert_eq!(summary.delivery_dates_imputed, 1);
        assert_eq!(summary.costs_imputed, 1);
        assert_eq!(summary.id_collisions_collapsed, 1);

        let records = result.batch.records();
        assert_eq!(records[0].delivery_date, chrono::NaiveDate::from_ymd_opt(2024, 1, 4));
        // S3 keeps the row with a delivery date; its weight was negative
        assert_eq!(records[2].delivery_date, chrono::NaiveDate::from_ymd_opt(2024, 1, 6));
        assert_eq!(records[2].weight_kg, None);
        assert_eq!(records[2].carrier, None);
        assert_eq!(records[2].cost, None);
    }

    #[test]
    fn test_process_empty_batch_is_fatal() {
        let df = raw_frame().head(Some(0));
        let err = Pipeline::builder().build().unwrap().process(df).unwrap_err();
        assert!(matches!(err, CleaningError::EmptyBatch));
    }

    #[test]
    fn test_process_reports_stages_in_order() {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let stages_clone = stages.clone();

        let pipeline = Pipeline::builder()
            .on_progress(move |update| {
                if update.stage_progress == 0.0 {
                    stages_clone.lock().unwrap().push(update.stage);
                }
            })
            .build()
            .unwrap();
        pipeline.process(raw_frame()).unwrap();

        let stages = stages.lock().unwrap();
        assert_eq!(
            *stages,
            vec![
                CleaningStage::Initializing,
                CleaningStage::ColumnNormalization,
                CleaningStage::ValueSanitization,
                CleaningStage::TypeCoercion,
                CleaningStage::OutlierNullification,
                CleaningStage::DateImputation,
                CleaningStage::CostImputation,
                CleaningStage::Deduplication,
            ]
        );
    }

    #[test]
    fn test_process_reports_failure() {
        let failures = Arc::new(AtomicUsize::new(0));
        let failures_clone = failures.clone();

        let pipeline = Pipeline::builder()
            .on_progress(move |update| {
                if update.stage == CleaningStage::Failed {
                    failures_clone.fetch_add(1, Ordering::SeqCst);
                }
            })
            .build()
            .unwrap();

        let df = raw_frame().drop("Cost").unwrap();
        let err = pipeline.process(df).unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
        assert_eq!(failures.load(Ordering::SeqCst), 1);
    }
}
