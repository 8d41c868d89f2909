use crate::batch::ShipmentBatch;
use serde::{Deserialize, Serialize};

/// Output of one successful pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct CleaningResult {
    /// The cleaned, de-duplicated batch.
    pub batch: ShipmentBatch,
    /// What the run did to get there.
    pub summary: CleaningSummary,
}

// ============================================================================
// Cleaning Summary
// ============================================================================

/// Per-run account of what each stage changed.
///
/// Row-local repairs never fail a run; this summary is where they become
/// visible.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleaningSummary {
    /// Total execution time in milliseconds.
    pub duration_ms: u64,

    /// Number of rows in the raw extract.
    pub rows_before: usize,
    /// Number of rows in the cleaned batch.
    pub rows_after: usize,
    /// Number of columns in the raw extract.
    pub columns: usize,

    /// Columns whose name changed during normalization.
    pub columns_renamed: usize,
    /// Text values replaced by null (missing tokens and blanks).
    pub tokens_nullified: usize,
    /// Non-null date values that failed to parse.
    pub dates_unparsed: usize,
    /// Non-null measure values that failed to parse as numbers.
    pub numbers_unparsed: usize,
    /// Negative measures replaced by null.
    pub negatives_nullified: usize,
    /// Delivery dates earlier than their shipment date that were nulled.
    pub inverted_dates_nullified: usize,
    /// Delivery dates estimated from shipment date and transit days.
    pub delivery_dates_imputed: usize,
    /// Carriers with a learned median rate.
    pub carriers_with_rate: usize,
    /// Costs estimated from the carrier rate table.
    pub costs_imputed: usize,
    /// Costs still missing after imputation.
    pub costs_unresolved: usize,
    /// Rows dropped as exact duplicates.
    pub exact_duplicates_removed: usize,
    /// Rows dropped while collapsing repeated shipment ids.
    pub id_collisions_collapsed: usize,

    /// Audit trail of actions taken.
    pub actions: Vec<CleaningAction>,
    /// Warnings and notes generated during cleaning.
    pub warnings: Vec<String>,
}

impl CleaningSummary {
    /// Create a new empty summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an action to the summary.
    pub fn add_action(&mut self, action: CleaningAction) {
        self.actions.push(action);
    }

    /// Add a warning to the summary.
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Rows removed by deduplication.
    pub fn rows_removed(&self) -> usize {
        self.rows_before.saturating_sub(self.rows_after)
    }

    /// Calculate the percentage of rows removed.
    pub fn rows_removed_percentage(&self) -> f32 {
        if self.rows_before == 0 {
            0.0
        } else {
            (self.rows_removed() as f32 / self.rows_before as f32) * 100.0
        }
    }
}

/// A single action taken during cleaning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningAction {
    /// Type of action performed.
    pub action_type: ActionType,
    /// Target of the action (column name or "batch").
    pub target: String,
    /// Human-readable description of the action.
    pub description: String,
    /// Additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl CleaningAction {
    /// Create a new cleaning action.
    pub fn new(
        action_type: ActionType,
        target: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            action_type,
            target: target.into(),
            description: description.into(),
            details: None,
        }
    }

    /// Add details to the action.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Types of actions that can be taken during cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// A column was renamed to its canonical form.
    ColumnRenamed,
    /// Raw missing tokens were replaced by null.
    ValueCleaned,
    /// A column's data type was coerced.
    TypeCorrected,
    /// Invalid measures were nulled.
    OutlierHandled,
    /// Missing values were imputed.
    ValueImputed,
    /// Duplicate rows were removed.
    DuplicatesRemoved,
}

impl ActionType {
    /// Get a human-readable display name for the action type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ColumnRenamed => "Column Renamed",
            Self::ValueCleaned => "Value Cleaned",
            Self::TypeCorrected => "Type Corrected",
            Self::OutlierHandled => "Outlier Handled",
            Self::ValueImputed => "Value Imputed",
            Self::DuplicatesRemoved => "Duplicates Removed",
        }
    }
}
