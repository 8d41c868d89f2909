//! Column name canonicalization.

use crate::error::CleaningError;
use anyhow::Result;
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::debug;

// Compiled once at startup
static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Invalid regex: whitespace run"));
static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{Alphabetic}\p{Nd}_]").expect("Invalid regex: non-word"));

/// Canonical form of a raw column name.
///
/// Trim, lowercase, collapse whitespace runs to `_`, then drop anything that
/// is not alphanumeric or underscore. `" Weight KG "` becomes `weight_kg`.
pub fn normalize_column_name(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let underscored = WHITESPACE_RUN.replace_all(&lowered, "_");
    NON_WORD.replace_all(&underscored, "").into_owned()
}

/// Rename every column of `df` to its canonical name.
///
/// Returns the renamed frame and the `(raw, canonical)` pairs that changed.
/// Two raw names collapsing onto the same canonical name is a structural error.
pub(crate) fn normalize_columns(df: DataFrame) -> Result<(DataFrame, Vec<(String, String)>)> {
    let mut df = df;
    let raw_names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();
    let canonical: Vec<String> = raw_names.iter().map(|n| normalize_column_name(n)).collect();

    let mut groups: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for (raw, canon) in raw_names.iter().zip(canonical.iter()) {
        groups.entry(canon.as_str()).or_default().push(raw.clone());
    }
    if let Some((canon, raw)) = groups.into_iter().find(|(_, raw)| raw.len() > 1) {
        return Err(CleaningError::DuplicateColumn {
            canonical: canon.to_string(),
            raw,
        }
        .into());
    }

    let renamed: Vec<(String, String)> = raw_names
        .iter()
        .zip(canonical.iter())
        .filter(|(raw, canon)| raw != canon)
        .map(|(raw, canon)| (raw.clone(), canon.clone()))
        .collect();

    if !renamed.is_empty() {
        df.set_column_names(canonical.iter().map(|s| s.as_str()))?;
        for (raw, canon) in &renamed {
            debug!("Renamed column '{}' -> '{}'", raw, canon);
        }
    }

    Ok((df, renamed))
}
