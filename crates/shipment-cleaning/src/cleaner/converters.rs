//! Type conversion functions for data cleaning.

use crate::utils::{date_to_epoch_days, parse_numeric_string};
use anyhow::Result;
use chrono::NaiveDate;
use polars::prelude::*;

/// Convert a string series to Float64.
///
/// Values that do not parse become null. Returns the converted series and the
/// number of non-null inputs that failed to parse.
pub(crate) fn string_to_float(series: &Series) -> Result<(Series, usize)> {
    let str_series = series.str()?;
    let mut result_vec: Vec<Option<f64>> = Vec::with_capacity(str_series.len());
    let mut unparsed = 0;

    for opt_val in str_series.into_iter() {
        match opt_val {
            Some(val) => {
                let parsed = parse_numeric_string(val);
                if parsed.is_none() {
                    unparsed += 1;
                }
                result_vec.push(parsed);
            }
            None => result_vec.push(None),
        }
    }

    Ok((Series::new(series.name().clone(), result_vec), unparsed))
}

/// Cast a numeric series to Float64, treating NaN as missing.
pub(crate) fn numeric_to_float(series: &Series) -> Result<Series> {
    let float_series = series.cast(&DataType::Float64)?;
    let cleaned = float_series
        .f64()?
        .apply(|v| v.filter(|val| !val.is_nan()));
    Ok(cleaned.into_series())
}

/// Parse a single date value with an explicit format.
pub(crate) fn parse_date(value: &str, format: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), format).ok()
}

/// Convert a string series to Date using `format`.
///
/// Values that do not parse become null. Returns the converted series and the
/// number of non-null inputs that failed to parse.
pub(crate) fn string_to_date(series: &Series, format: &str) -> Result<(Series, usize)> {
    let str_series = series.str()?;
    let mut days: Vec<Option<i32>> = Vec::with_capacity(str_series.len());
    let mut unparsed = 0;

    for opt_val in str_series.into_iter() {
        match opt_val {
            Some(val) => match parse_date(val, format) {
                Some(date) => days.push(Some(date_to_epoch_days(date))),
                None => {
                    unparsed += 1;
                    days.push(None);
                }
            },
            None => days.push(None),
        }
    }

    let day_series = Series::new(series.name().clone(), days);
    Ok((day_series.cast(&DataType::Date)?, unparsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::epoch_days_to_date;

    // Helper function to check if a value at index is null
    fn is_null_at(series: &Series, idx: usize) -> bool {
        matches!(series.get(idx).unwrap(), AnyValue::Null)
    }

    fn dates(series: &Series) -> Vec<Option<NaiveDate>> {
        series
            .cast(&DataType::Int32)
            .unwrap()
            .i32()
            .unwrap()
            .into_iter()
            .map(|v| v.and_then(epoch_days_to_date))
            .collect()
    }

    // ========================================================================
    // string_to_float() tests
    // ========================================================================

    #[test]
    fn test_string_to_float_basic() {
        let series = Series::new("weight_kg".into(), &["1.5", " 2.5 ", "$1,234.56"]);
        let (result, unparsed) = string_to_float(&series).unwrap();

        assert_eq!(result.dtype(), &DataType::Float64);
        assert_eq!(unparsed, 0);
        assert_eq!(result.get(0).unwrap().try_extract::<f64>().unwrap(), 1.5);
        assert_eq!(result.get(1).unwrap().try_extract::<f64>().unwrap(), 2.5);
        assert_eq!(result.get(2).unwrap().try_extract::<f64>().unwrap(), 1234.56);
    }

    #[test]
    fn test_string_to_float_counts_garbage() {
        let series = Series::new("cost".into(), &[Some("heavy"), None, Some("-5"), Some("NaN")]);
        let (result, unparsed) = string_to_float(&series).unwrap();

        assert_eq!(unparsed, 2);
        assert!(is_null_at(&result, 0));
        assert!(is_null_at(&result, 1));
        assert_eq!(result.get(2).unwrap().try_extract::<f64>().unwrap(), -5.0);
        assert!(is_null_at(&result, 3));
    }

    #[test]
    fn test_numeric_to_float_nulls_nan() {
        let series = Series::new("cost".into(), &[Some(1.0), Some(f64::NAN), None]);
        let result = numeric_to_float(&series).unwrap();

        assert_eq!(result.null_count(), 2);
        assert_eq!(result.get(0).unwrap().try_extract::<f64>().unwrap(), 1.0);
    }

    #[test]
    fn test_numeric_to_float_casts_integers() {
        let series = Series::new("transit_days".into(), &[3i64, 5]);
        let result = numeric_to_float(&series).unwrap();

        assert_eq!(result.dtype(), &DataType::Float64);
        assert_eq!(result.get(1).unwrap().try_extract::<f64>().unwrap(), 5.0);
    }

    // ========================================================================
    // string_to_date() tests
    // ========================================================================

    #[test]
    fn test_string_to_date_with_format() {
        let series = Series::new(
            "shipment_date".into(),
            &[Some("2024-01-01"), Some("01/02/2024"), None, Some("2024-02-30")],
        );
        let (result, unparsed) = string_to_date(&series, "%Y-%m-%d").unwrap();

        assert_eq!(result.dtype(), &DataType::Date);
        assert_eq!(unparsed, 2);
        assert_eq!(
            dates(&result),
            vec![NaiveDate::from_ymd_opt(2024, 1, 1), None, None, None]
        );
    }

    #[test]
    fn test_string_to_date_custom_format() {
        let series = Series::new("delivery_date".into(), &["04/01/2024"]);
        let (result, unparsed) = string_to_date(&series, "%d/%m/%Y").unwrap();

        assert_eq!(unparsed, 0);
        assert_eq!(dates(&result), vec![NaiveDate::from_ymd_opt(2024, 1, 4)]);
    }
}
