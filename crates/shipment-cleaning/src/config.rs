//! Configuration for the shipment cleaning pipeline.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic pipeline setup.

use chrono::NaiveDate;
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Raw tokens that stand for "missing" in the source extract.
///
/// Matching is exact after trimming and is case-insensitive.
pub const DEFAULT_MISSING_TOKENS: [&str; 8] =
    ["na", "n/a", "null", "none", "nan", "unknown", "-", "\u{2013}"];

/// Date format used by the relational source.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Index the cleaned documents are loaded into.
pub const DEFAULT_INDEX_NAME: &str = "logistics_project";

/// Configuration for the cleaning pipeline.
///
/// Use [`CleaningConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use shipment_cleaning::config::CleaningConfig;
///
/// let config = CleaningConfig::builder()
///     .date_format("%d/%m/%Y")
///     .null_inverted_delivery_dates(true)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Expected format of `shipment_date` and `delivery_date`.
    /// Default: `%Y-%m-%d`
    pub date_format: String,

    /// Case-insensitive raw tokens mapped to null in text columns.
    /// Default: [`DEFAULT_MISSING_TOKENS`]
    pub missing_value_tokens: Vec<String>,

    /// Null a `delivery_date` that precedes its `shipment_date` before date
    /// imputation, so it can be re-estimated from transit days.
    /// Default: false
    pub null_inverted_delivery_dates: bool,

    /// Target index for the load step.
    /// Default: `logistics_project`
    pub index_name: String,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            missing_value_tokens: DEFAULT_MISSING_TOKENS.iter().map(|t| t.to_string()).collect(),
            null_inverted_delivery_dates: false,
            index_name: DEFAULT_INDEX_NAME.to_string(),
        }
    }
}

impl CleaningConfig {
    /// Create a new configuration builder.
    pub fn builder() -> CleaningConfigBuilder {
        CleaningConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        validate_date_format(&self.date_format)?;

        if self.missing_value_tokens.is_empty() {
            return Err(ConfigValidationError::EmptyMissingTokens);
        }
        if let Some(token) = self.missing_value_tokens.iter().find(|t| t.trim().is_empty()) {
            return Err(ConfigValidationError::BlankMissingToken(token.clone()));
        }

        if self.index_name.is_empty() || self.index_name != self.index_name.to_lowercase() {
            return Err(ConfigValidationError::InvalidIndexName(
                self.index_name.clone(),
            ));
        }

        Ok(())
    }
}

/// A date format is usable only if it contains no unknown specifiers and
/// a formatted date parses back to itself.
fn validate_date_format(format: &str) -> Result<(), ConfigValidationError> {
    let invalid = || ConfigValidationError::InvalidDateFormat(format.to_string());

    let has_error = StrftimeItems::new(format).any(|item| matches!(item, Item::Error));
    if format.trim().is_empty() || has_error {
        return Err(invalid());
    }

    let probe = NaiveDate::from_ymd_opt(2024, 11, 30).ok_or_else(invalid)?;
    let mut rendered = String::new();
    write!(rendered, "{}", probe.format(format)).map_err(|_| invalid())?;

    match NaiveDate::parse_from_str(&rendered, format) {
        Ok(parsed) if parsed == probe => Ok(()),
        _ => Err(invalid()),
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid date format '{0}' (must round-trip a calendar date)")]
    InvalidDateFormat(String),

    #[error("Missing-value token list must not be empty")]
    EmptyMissingTokens,

    #[error("Missing-value token '{0}' is blank")]
    BlankMissingToken(String),

    #[error("Invalid index name '{0}' (must be non-empty and lowercase)")]
    InvalidIndexName(String),
}

/// Builder for [`CleaningConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct CleaningConfigBuilder {
    date_format: Option<String>,
    missing_value_tokens: Option<Vec<String>>,
    null_inverted_delivery_dates: Option<bool>,
    index_name: Option<String>,
}

impl CleaningConfigBuilder {
    /// Set the expected date format (chrono strftime syntax).
    pub fn date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = Some(format.into());
        self
    }

    /// Replace the set of raw missing-value tokens.
    pub fn missing_value_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.missing_value_tokens = Some(tokens.into_iter().map(Into::into).collect());
        self
    }

    /// Enable or disable nulling of delivery dates earlier than the shipment date.
    pub fn null_inverted_delivery_dates(mut self, enable: bool) -> Self {
        self.null_inverted_delivery_dates = Some(enable);
        self
    }

    /// Set the target index name for the load step.
    pub fn index_name(mut self, name: impl Into<String>) -> Self {
        self.index_name = Some(name.into());
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `CleaningConfig` or an error if validation fails.
    pub fn build(self) -> Result<CleaningConfig, ConfigValidationError> {
        let defaults = CleaningConfig::default();
        let config = CleaningConfig {
            date_format: self.date_format.unwrap_or(defaults.date_format),
            missing_value_tokens: self
                .missing_value_tokens
                .unwrap_or(defaults.missing_value_tokens),
            null_inverted_delivery_dates: self
                .null_inverted_delivery_dates
                .unwrap_or(defaults.null_inverted_delivery_dates),
            index_name: self.index_name.unwrap_or(defaults.index_name),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CleaningConfig::default();
        assert_eq!(config.date_format, "%Y-%m-%d");
        assert_eq!(config.missing_value_tokens.len(), 8);
        assert!(config.missing_value_tokens.contains(&"\u{2013}".to_string()));
        assert!(!config.null_inverted_delivery_dates);
        assert_eq!(config.index_name, "logistics_project");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = CleaningConfig::builder()
            .date_format("%d/%m/%Y")
            .missing_value_tokens(["n/a", "missing"])
            .null_inverted_delivery_dates(true)
            .index_name("shipments_weekly")
            .build()
            .unwrap();

        assert_eq!(config.date_format, "%d/%m/%Y");
        assert_eq!(config.missing_value_tokens, vec!["n/a", "missing"]);
        assert!(config.null_inverted_delivery_dates);
        assert_eq!(config.index_name, "shipments_weekly");
    }

    #[test]
    fn test_validation_rejects_unknown_specifier() {
        let result = CleaningConfig::builder().date_format("%Y-%!").build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidDateFormat(_)
        ));
    }

    #[test]
    fn test_validation_rejects_format_without_day() {
        // A year-month format cannot identify a calendar date.
        let result = CleaningConfig::builder().date_format("%Y-%m").build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidDateFormat(_)
        ));
    }

    #[test]
    fn test_validation_rejects_empty_tokens() {
        let result = CleaningConfig::builder()
            .missing_value_tokens(Vec::<String>::new())
            .build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::EmptyMissingTokens
        ));
    }

    #[test]
    fn test_validation_rejects_uppercase_index() {
        let result = CleaningConfig::builder().index_name("Logistics").build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidIndexName(_)
        ));
    }

    #[test]
    fn test_config_from_partial_json() {
        let json = r#"{ "date_format": "%m/%d/%Y", "null_inverted_delivery_dates": true }"#;
        let config: CleaningConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.date_format, "%m/%d/%Y");
        assert!(config.null_inverted_delivery_dates);
        assert_eq!(config.index_name, "logistics_project");
        assert!(config.validate().is_ok());
    }
}
