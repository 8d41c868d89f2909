//! Outlier handling module.
//!
//! A negative weight, distance, transit time or cost is a data-entry error.
//! It is replaced by null so the imputers downstream can treat it like any
//! other missing value.

use crate::error::CleaningError;
use crate::types::{ActionType, CleaningAction, CleaningSummary};
use crate::utils::MEASURE_COLUMNS;
use anyhow::Result;
use polars::prelude::*;
use tracing::debug;

/// Nullifies physically invalid measures.
pub struct OutlierNullifier;

impl OutlierNullifier {
    /// Replace every negative value in the measure columns with null.
    ///
    /// Expects the measures to be `Float64` already. Nulls pass through.
    pub fn nullify_negatives(df: &mut DataFrame, summary: &mut CleaningSummary) -> Result<()> {
        for name in MEASURE_COLUMNS {
            let series = df
                .column(name)
                .map_err(|_| CleaningError::ColumnNotFound(name.to_string()))?
                .as_materialized_series();
            let values = series.f64()?;

            let negatives = values
                .into_iter()
                .filter(|v| v.map(|val| val < 0.0).unwrap_or(false))
                .count();
            if negatives == 0 {
                continue;
            }

            let nulled = values.apply(|v| v.filter(|val| *val >= 0.0));
            df.replace(name, nulled.into_series())?;

            summary.negatives_nullified += negatives;
            summary.add_action(CleaningAction::new(
                ActionType::OutlierHandled,
                name,
                format!("Replaced {} negative values with null", negatives),
            ));
            debug!("Column '{}': {} negative values nulled", name, negatives);
        }

        Ok(())
    }
}
