//! Error types for the shipment cleaning pipeline.
//!
//! Errors split into two groups. Structural failures (a missing column, an
//! empty batch, a column whose type cannot be coerced at all) abort a run and
//! surface as a single run-level failure. Everything row-local is repaired or
//! left null inside the batch and never becomes an error.
//!
//! Errors are serializable so a scheduler can record `{code, message}` for a
//! failed run.

use crate::config::ConfigValidationError;
use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the cleaning pipeline.
#[derive(Error, Debug)]
pub enum CleaningError {
    /// The extract contained no rows.
    #[error("Input batch is empty")]
    EmptyBatch,

    /// A canonical column expected by a stage is absent.
    #[error("Column '{0}' not found in batch")]
    ColumnNotFound(String),

    /// Two raw column names normalize to the same canonical name.
    #[error("Columns {raw:?} all normalize to '{canonical}'")]
    DuplicateColumn { canonical: String, raw: Vec<String> },

    /// A required column has a type that cannot be coerced at all.
    #[error("Failed to convert column '{column}' to {target_type}: {reason}")]
    TypeConversionFailed {
        column: String,
        target_type: String,
        reason: String,
    },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A cleaning stage failed for a structural reason.
    #[error("Stage '{stage}' failed: {reason}")]
    StageFailed { stage: String, reason: String },

    /// The document sink rejected a document.
    #[error("Sink error: {0}")]
    Sink(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<CleaningError>,
    },
}

impl CleaningError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        CleaningError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Wrap a stage helper failure, keeping structural errors intact.
    pub(crate) fn stage(stage: &str, err: anyhow::Error) -> Self {
        match err.downcast::<CleaningError>() {
            Ok(inner) => inner,
            Err(err) => match err.downcast::<polars::error::PolarsError>() {
                Ok(polars_err) => CleaningError::Polars(polars_err).with_context(stage),
                Err(other) => CleaningError::StageFailed {
                    stage: stage.to_string(),
                    reason: other.to_string(),
                },
            },
        }
    }

    /// Get a stable error code for the scheduler's run log.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyBatch => "EMPTY_BATCH",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::DuplicateColumn { .. } => "DUPLICATE_COLUMN",
            Self::TypeConversionFailed { .. } => "TYPE_CONVERSION_FAILED",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::StageFailed { .. } => "STAGE_FAILED",
            Self::Sink(_) => "SINK_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error is a structural failure of the input batch.
    ///
    /// Structural failures mean the extract itself is unusable; anything else
    /// is an environment problem (IO, sink, configuration).
    pub fn is_structural(&self) -> bool {
        match self {
            Self::EmptyBatch
            | Self::ColumnNotFound(_)
            | Self::DuplicateColumn { .. }
            | Self::TypeConversionFailed { .. }
            | Self::StageFailed { .. } => true,
            Self::WithContext { source, .. } => source.is_structural(),
            _ => false,
        }
    }
}

impl Serialize for CleaningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("CleaningError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

impl From<ConfigValidationError> for CleaningError {
    fn from(err: ConfigValidationError) -> Self {
        CleaningError::InvalidConfig(err.to_string())
    }
}

/// Result type alias for cleaning operations.
pub type Result<T> = std::result::Result<T, CleaningError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| CleaningError::Polars(e).with_context(context))
    }
}
