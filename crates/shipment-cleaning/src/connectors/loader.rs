//! Load step: cleaned records into a document index.

use super::sink::DocumentSink;
use crate::batch::{ShipmentBatch, ShipmentRecord};
use crate::error::{CleaningError, Result};
use serde::Serialize;
use tracing::{info, warn};

/// Stable document key: `{shipment_id}_{shipment_date as YYYYMMDD}`.
///
/// `None` when either part is missing; such records cannot be indexed.
pub fn document_key(record: &ShipmentRecord) -> Option<String> {
    let id = record.shipment_id.as_deref()?;
    let shipped = record.shipment_date?;
    Some(format!("{}_{}", id, shipped.format("%Y%m%d")))
}

/// Outcome of one load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub indexed: usize,
    pub skipped: usize,
}

/// Sends every keyed record of a batch to a [`DocumentSink`].
#[derive(Debug, Clone)]
pub struct Loader {
    index_name: String,
}

impl Loader {
    pub fn new(index_name: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
        }
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Index one document per record. Records without a key are skipped.
    ///
    /// A sink failure aborts the load.
    pub fn load(&self, batch: &ShipmentBatch, sink: &mut dyn DocumentSink) -> Result<LoadReport> {
        let mut report = LoadReport::default();

        for record in batch.records() {
            let Some(key) = document_key(record) else {
                warn!(
                    "Skipping shipment {:?}: no shipment id or shipment date",
                    record.shipment_id
                );
                report.skipped += 1;
                continue;
            };

            let document = record.to_document()?;
            sink.index(&self.index_name, &key, &document)
                .map_err(|e| CleaningError::Sink(format!("document '{}': {}", key, e)))?;
            report.indexed += 1;
        }

        sink.flush()
            .map_err(|e| CleaningError::Sink(format!("flush: {}", e)))?;

        info!(
            "Loaded {} documents into '{}' ({} skipped)",
            report.indexed, self.index_name, report.skipped
        );
        Ok(report)
    }
}
