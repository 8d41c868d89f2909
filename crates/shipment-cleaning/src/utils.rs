//! Shared utilities for the cleaning pipeline.
//!
//! This module contains common helper functions used across multiple stages
//! to reduce code duplication and ensure consistency.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use std::collections::HashSet;

// =============================================================================
// Canonical Column Names
// =============================================================================

pub const SHIPMENT_ID: &str = "shipment_id";
pub const CARRIER: &str = "carrier";
pub const SHIPMENT_DATE: &str = "shipment_date";
pub const DELIVERY_DATE: &str = "delivery_date";
pub const WEIGHT_KG: &str = "weight_kg";
pub const DISTANCE_MILES: &str = "distance_miles";
pub const TRANSIT_DAYS: &str = "transit_days";
pub const COST: &str = "cost";

/// Columns every extract must carry after name normalization.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    SHIPMENT_ID,
    CARRIER,
    SHIPMENT_DATE,
    DELIVERY_DATE,
    WEIGHT_KG,
    DISTANCE_MILES,
    TRANSIT_DAYS,
    COST,
];

/// Calendar-date columns.
pub const DATE_COLUMNS: [&str; 2] = [SHIPMENT_DATE, DELIVERY_DATE];

/// Non-negative numeric measures.
pub const MEASURE_COLUMNS: [&str; 4] = [WEIGHT_KG, DISTANCE_MILES, TRANSIT_DAYS, COST];

/// Return the first required column absent from `columns`, if any.
pub fn first_missing_column<'a>(columns: &[String], required: &[&'a str]) -> Option<&'a str> {
    required
        .iter()
        .copied()
        .find(|name| !columns.iter().any(|c| c == name))
}

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType holds text.
#[inline]
pub fn is_text_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::String)
}

// =============================================================================
// Missing Values
// =============================================================================

/// Case-insensitive set of raw missing-value tokens.
#[derive(Debug, Clone)]
pub struct MissingTokens {
    tokens: HashSet<String>,
}

impl MissingTokens {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tokens: tokens
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .collect(),
        }
    }

    /// Whole-value match, ignoring case and surrounding whitespace.
    pub fn matches(&self, value: &str) -> bool {
        self.tokens.contains(&value.trim().to_lowercase())
    }
}

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Currency symbols and spaces stripped before numeric parsing.
pub const NUMERIC_FORMAT_CHARS: [char; 4] = ['$', '€', '£', ' '];

// Commas only count as thousands separators between groups of three digits.
static THOUSANDS_GROUPED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?\d{1,3}(,\d{3})+(\.\d*)?$").expect("Invalid regex: thousands grouping")
});

/// Clean a string for numeric parsing by removing formatting characters.
///
/// `"$1,234.50"` becomes `"1234.50"`. A comma anywhere else is kept, so
/// `"1,5"` stays unparseable rather than reading as `15`.
pub fn clean_numeric_string(s: &str) -> String {
    let result: String = s
        .trim()
        .chars()
        .filter(|c| !NUMERIC_FORMAT_CHARS.contains(c))
        .collect();
    if THOUSANDS_GROUPED.is_match(&result) {
        result.replace(',', "")
    } else {
        result
    }
}

/// Try to parse a string as a finite numeric value.
///
/// Handles currency symbols and thousands separators. `NaN` and infinities
/// are treated as unparseable.
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    let cleaned = clean_numeric_string(s);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

// =============================================================================
// Dates
// =============================================================================

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Convert a date to the polars `Date` physical value (days since epoch).
pub fn date_to_epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Convert a polars `Date` physical value back to a calendar date.
pub fn epoch_days_to_date(days: i32) -> Option<NaiveDate> {
    days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
}

// =============================================================================
// Tests
// =============================================================================
