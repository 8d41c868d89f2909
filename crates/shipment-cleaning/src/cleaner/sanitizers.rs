//! Value sanitization for text columns.

use crate::utils::{MissingTokens, is_text_dtype};
use anyhow::Result;
use polars::prelude::*;
use tracing::debug;

/// Trim every text column and replace missing-value tokens with null.
///
/// Only `String` columns are touched; numeric and date columns read by the
/// CSV reader keep their types. Returns the number of values nulled per column,
/// for columns where at least one was.
pub(crate) fn sanitize_text_columns(
    df: DataFrame,
    tokens: &MissingTokens,
) -> Result<(DataFrame, Vec<(String, usize)>)> {
    let mut df = df;
    let column_names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();

    let mut nulled = Vec::new();

    for col_name in &column_names {
        let series = df.column(col_name)?.as_materialized_series();
        if !is_text_dtype(series.dtype()) {
            continue;
        }

        let (cleaned, count) = replace_tokens_with_null(series, tokens)?;
        df.replace(col_name, cleaned)?;

        if count > 0 {
            debug!("Column '{}': {} missing tokens replaced with null", col_name, count);
            nulled.push((col_name.clone(), count));
        }
    }

    Ok((df, nulled))
}

/// Trim each value; blanks and tokens become null.
pub(crate) fn replace_tokens_with_null(
    series: &Series,
    tokens: &MissingTokens,
) -> Result<(Series, usize)> {
    let str_series = series.str()?;
    let mut cleaned_values = Vec::with_capacity(str_series.len());
    let mut replacement_count = 0;

    for opt_val in str_series.into_iter() {
        match opt_val {
            Some(val) => {
                let trimmed = val.trim();
                if trimmed.is_empty() || tokens.matches(trimmed) {
                    cleaned_values.push(None);
                    replacement_count += 1;
                } else {
                    // Keep original case
                    cleaned_values.push(Some(trimmed.to_string()));
                }
            }
            None => cleaned_values.push(None),
        }
    }

    Ok((
        Series::new(series.name().clone(), cleaned_values),
        replacement_count,
    ))
}
