//! Type coercion for the date and measure columns.

use super::converters::{numeric_to_float, string_to_date, string_to_float};
use crate::error::CleaningError;
use crate::utils::{DATE_COLUMNS, MEASURE_COLUMNS, is_numeric_dtype};
use anyhow::Result;
use polars::prelude::*;
use tracing::debug;

/// Counts produced by one coercion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoercionOutcome {
    /// Non-null date values that failed to parse, per column.
    pub dates_unparsed: Vec<(String, usize)>,
    /// Non-null measure values that failed to parse, per column.
    pub numbers_unparsed: Vec<(String, usize)>,
    /// Columns whose dtype changed.
    pub converted: Vec<(String, DataType)>,
}

impl CoercionOutcome {
    pub fn total_dates_unparsed(&self) -> usize {
        self.dates_unparsed.iter().map(|(_, n)| n).sum()
    }

    pub fn total_numbers_unparsed(&self) -> usize {
        self.numbers_unparsed.iter().map(|(_, n)| n).sum()
    }
}

/// Coerces `shipment_date`/`delivery_date` to `Date` and the four measures to
/// `Float64`.
///
/// A value that fails to parse becomes null. A column whose dtype has no
/// sensible conversion (boolean dates, list measures) is a structural error.
pub struct TypeCoercer<'a> {
    date_format: &'a str,
}

impl<'a> TypeCoercer<'a> {
    pub fn new(date_format: &'a str) -> Self {
        Self { date_format }
    }

    pub fn coerce(&self, df: DataFrame) -> Result<(DataFrame, CoercionOutcome)> {
        let mut df = df;
        let mut outcome = CoercionOutcome::default();

        for name in DATE_COLUMNS {
            let series = df
                .column(name)
                .map_err(|_| CleaningError::ColumnNotFound(name.to_string()))?
                .as_materialized_series();
            let before = series.dtype().clone();
            let (coerced, unparsed) = self.coerce_date(series)?;

            if unparsed > 0 {
                debug!(
                    "Column '{}': {} values did not match '{}'",
                    name, unparsed, self.date_format
                );
                outcome.dates_unparsed.push((name.to_string(), unparsed));
            }
            if before != DataType::Date {
                outcome.converted.push((name.to_string(), before));
            }
            df.replace(name, coerced)?;
        }

        for name in MEASURE_COLUMNS {
            let series = df
                .column(name)
                .map_err(|_| CleaningError::ColumnNotFound(name.to_string()))?
                .as_materialized_series();
            let before = series.dtype().clone();
            let (coerced, unparsed) = coerce_measure(series)?;

            if unparsed > 0 {
                debug!("Column '{}': {} values are not numbers", name, unparsed);
                outcome.numbers_unparsed.push((name.to_string(), unparsed));
            }
            if before != DataType::Float64 {
                outcome.converted.push((name.to_string(), before));
            }
            df.replace(name, coerced)?;
        }

        Ok((df, outcome))
    }

    fn coerce_date(&self, series: &Series) -> Result<(Series, usize)> {
        match series.dtype() {
            DataType::String => string_to_date(series, self.date_format),
            DataType::Date => Ok((series.clone(), 0)),
            DataType::Datetime(_, _) | DataType::Null => Ok((series.cast(&DataType::Date)?, 0)),
            other => Err(unconvertible(series.name(), "Date", other).into()),
        }
    }
}

fn coerce_measure(series: &Series) -> Result<(Series, usize)> {
    match series.dtype() {
        DataType::String => string_to_float(series),
        DataType::Null => Ok((series.cast(&DataType::Float64)?, 0)),
        dtype if is_numeric_dtype(dtype) => Ok((numeric_to_float(series)?, 0)),
        other => Err(unconvertible(series.name(), "Float64", other).into()),
    }
}

fn unconvertible(column: &str, target: &str, found: &DataType) -> CleaningError {
    CleaningError::TypeConversionFailed {
        column: column.to_string(),
        target_type: target.to_string(),
        reason: format!("no conversion from {}", found),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::REQUIRED_COLUMNS;

    fn raw_frame() -> DataFrame {
        df![
            "shipment_id" => ["S1", "S2", "S3"],
            "carrier" => ["UPS", "UPS", "DHL"],
            "shipment_date" => [Some("2024-01-01"), Some("garbage"), None],
            "delivery_date" => [Some("2024-01-04"), None, Some("2024-13-01")],
            "weight_kg" => [Some("10"), Some("ten"), None],
            "distance_miles" => [5i64, 6, 7],
            "transit_days" => [Some(3.0), None, Some(f64::NAN)],
            "cost" => [Some("$100.00"), None, Some("-5")],
        ]
        .unwrap()
    }

    #[test]
    fn test_coerce_sets_target_types() {
        let (df, outcome) = TypeCoercer::new("%Y-%m-%d").coerce(raw_frame()).unwrap();

        for name in DATE_COLUMNS {
            assert_eq!(df.column(name).unwrap().dtype(), &DataType::Date);
        }
        for name in MEASURE_COLUMNS {
            assert_eq!(df.column(name).unwrap().dtype(), &DataType::Float64);
        }
        assert_eq!(df.width(), REQUIRED_COLUMNS.len());
        // transit_days was already Float64
        assert_eq!(outcome.converted.len(), 5);
    }

    #[test]
    fn test_coerce_counts_row_local_failures() {
        let (df, outcome) = TypeCoercer::new("%Y-%m-%d").coerce(raw_frame()).unwrap();

        assert_eq!(outcome.total_dates_unparsed(), 2);
        assert_eq!(outcome.total_numbers_unparsed(), 1);
        assert_eq!(df.column("shipment_date").unwrap().null_count(), 2);
        assert_eq!(df.column("transit_days").unwrap().null_count(), 2);
        assert_eq!(df.column("weight_kg").unwrap().null_count(), 2);
    }

    #[test]
    fn test_coerce_keeps_negative_measures() {
        let (df, _) = TypeCoercer::new("%Y-%m-%d").coerce(raw_frame()).unwrap();
        let cost = df.column("cost").unwrap().as_materialized_series();
        assert_eq!(cost.get(2).unwrap().try_extract::<f64>().unwrap(), -5.0);
    }

    #[test]
    fn test_coerce_rejects_boolean_measure() {
        let mut df = raw_frame();
        df.replace("cost", Series::new("cost".into(), &[true, false, true]))
            .unwrap();

        let err = TypeCoercer::new("%Y-%m-%d").coerce(df).unwrap_err();
        let err = err.downcast::<CleaningError>().unwrap();
        assert!(matches!(
            err,
            CleaningError::TypeConversionFailed { ref column, .. } if column == "cost"
        ));
    }

    #[test]
    fn test_coerce_is_stable_on_coerced_frame() {
        let coercer = TypeCoercer::new("%Y-%m-%d");
        let (once, _) = coercer.coerce(raw_frame()).unwrap();
        let (twice, outcome) = coercer.coerce(once.clone()).unwrap();

        assert!(once.equals_missing(&twice));
        assert!(outcome.converted.is_empty());
        assert_eq!(outcome.total_dates_unparsed(), 0);
    }
}
