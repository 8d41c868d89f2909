//! Shipment Cleaning Library
//!
//! The cleaning and imputation stage of a weekly logistics ETL: a raw,
//! inconsistently formatted shipments extract goes in, a canonical,
//! de-duplicated, gap-filled batch safe to index comes out.
//!
//! # Overview
//!
//! One run executes seven stages in strict order over one batch:
//!
//! 1. **Column Normalizer**: lowercase, underscore-separated column names
//! 2. **Value Sanitizer**: trims text, maps missing-value tokens to null
//! 3. **Type Coercer**: parses dates with an explicit format, measures as floats
//! 4. **Outlier Nullifier**: negative measures become null
//! 5. **Date Imputer**: `delivery_date = shipment_date + transit_days`
//! 6. **Cost Imputer**: per-carrier median rate × weight × distance
//! 7. **Deduplicator**: exact duplicates, then one row per `shipment_id`
//!
//! Stages 1 to 4 run column-wise on a polars `DataFrame`. Stages 5 to 7 run on
//! typed [`ShipmentRecord`]s, where `None` is the only missing marker.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use shipment_cleaning::{CsvSource, JsonLinesSink, Loader, Pipeline, ShipmentSource};
//!
//! let df = CsvSource::new("shipments.csv").extract()?;
//!
//! let result = Pipeline::builder().build()?.process(df)?;
//! println!("{} rows, {} costs imputed", result.batch.len(), result.summary.costs_imputed);
//!
//! let mut sink = JsonLinesSink::new(std::io::stdout());
//! Loader::new("logistics_project").load(&result.batch, &mut sink)?;
//! ```
//!
//! # Errors
//!
//! A run is all-or-nothing. Structural problems (a missing column, an empty
//! extract, a column of an unusable type) return [`CleaningError`]. Row-local
//! problems are repaired or left null and counted in [`CleaningSummary`].

pub mod batch;
pub mod cleaner;
pub mod config;
pub mod connectors;
pub mod error;
pub mod imputers;
pub mod pipeline;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use batch::{ShipmentBatch, ShipmentRecord};
pub use cleaner::{DataCleaner, TypeCoercer, normalize_column_name};
pub use config::{CleaningConfig, CleaningConfigBuilder, ConfigValidationError};
pub use connectors::{
    CsvSource, DocumentSink, JsonLinesSink, LoadReport, Loader, ShipmentSource, document_key,
    read_csv_str, write_csv,
};
pub use error::{CleaningError, ResultExt};
pub use imputers::{CarrierRateTable, CostImputer, DateImputer, estimate_delivery_date};
pub use pipeline::{
    CleaningStage, ClosureProgressReporter, Deduplicator, OutlierNullifier, Pipeline,
    PipelineBuilder, ProgressReporter, ProgressUpdate, RecordExecutor,
};
pub use types::{ActionType, CleaningAction, CleaningResult, CleaningSummary};
