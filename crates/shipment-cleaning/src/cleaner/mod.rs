//! Column-wise cleaning of the raw extract.
//!
//! This module provides functionality for:
//! - Canonicalizing column names
//! - Trimming text and mapping missing-value tokens to null
//! - Coercing dates and measures to their proper types

mod columns;
mod converters;
mod sanitizers;
mod type_coercer;

pub use columns::normalize_column_name;
pub use type_coercer::{CoercionOutcome, TypeCoercer};

use crate::config::CleaningConfig;
use crate::error::CleaningError;
use crate::types::{ActionType, CleaningAction, CleaningSummary};
use crate::utils::{MissingTokens, REQUIRED_COLUMNS, first_missing_column};
use anyhow::Result;
use polars::prelude::*;
use tracing::{debug, info};

/// Runs the column-wise stages over a DataFrame and records what changed.
pub struct DataCleaner<'a> {
    config: &'a CleaningConfig,
    tokens: MissingTokens,
}

impl<'a> DataCleaner<'a> {
    pub fn new(config: &'a CleaningConfig) -> Self {
        Self {
            config,
            tokens: MissingTokens::new(&config.missing_value_tokens),
        }
    }

    /// Canonicalize column names, then check every required column is present.
    pub fn normalize_columns(
        &self,
        df: DataFrame,
        summary: &mut CleaningSummary,
    ) -> Result<DataFrame> {
        let (df, renamed) = columns::normalize_columns(df)?;

        summary.columns_renamed = renamed.len();
        if !renamed.is_empty() {
            let details = renamed
                .iter()
                .map(|(raw, canon)| format!("'{}' -> '{}'", raw, canon))
                .collect::<Vec<_>>()
                .join(", ");
            summary.add_action(
                CleaningAction::new(
                    ActionType::ColumnRenamed,
                    "batch",
                    format!("Renamed {} columns to canonical form", renamed.len()),
                )
                .with_details(details),
            );
        }

        let names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        if let Some(missing) = first_missing_column(&names, &REQUIRED_COLUMNS) {
            return Err(CleaningError::ColumnNotFound(missing.to_string()).into());
        }

        info!("Columns normalized ({} renamed)", renamed.len());
        Ok(df)
    }

    /// Trim text columns and null every missing-value token.
    pub fn sanitize_values(
        &self,
        df: DataFrame,
        summary: &mut CleaningSummary,
    ) -> Result<DataFrame> {
        let (df, nulled) = sanitizers::sanitize_text_columns(df, &self.tokens)?;

        for (column, count) in &nulled {
            summary.tokens_nullified += count;
            summary.add_action(CleaningAction::new(
                ActionType::ValueCleaned,
                column.as_str(),
                format!("Replaced {} missing-value tokens with null", count),
            ));
        }

        info!("Values sanitized ({} nulled)", summary.tokens_nullified);
        Ok(df)
    }

    /// Coerce dates to `Date` and measures to `Float64`.
    pub fn coerce_types(&self, df: DataFrame, summary: &mut CleaningSummary) -> Result<DataFrame> {
        let (df, outcome) = TypeCoercer::new(&self.config.date_format).coerce(df)?;

        summary.dates_unparsed = outcome.total_dates_unparsed();
        summary.numbers_unparsed = outcome.total_numbers_unparsed();

        for (column, from) in &outcome.converted {
            debug!("Column '{}' converted from {}", column, from);
            summary.add_action(CleaningAction::new(
                ActionType::TypeCorrected,
                column.as_str(),
                format!("Converted from {}", from),
            ));
        }
        for (column, count) in outcome.dates_unparsed.iter().chain(&outcome.numbers_unparsed) {
            summary.add_warning(format!(
                "Column '{}': {} values could not be parsed and were set to null",
                column, count
            ));
        }

        info!(
            "Types coerced ({} unparseable dates, {} unparseable numbers)",
            summary.dates_unparsed, summary.numbers_unparsed
        );
        Ok(df)
    }
}
