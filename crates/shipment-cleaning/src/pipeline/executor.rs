//! Record-level execution module.
//!
//! Runs the stages that read several fields of one row together: delivery
//! date imputation, cost imputation and deduplication. They work on a typed
//! [`ShipmentBatch`], after every column-wise stage has finished.

use crate::batch::ShipmentBatch;
use crate::error::Result;
use crate::imputers::{CarrierRateTable, CostImputer, DateImputer};
use crate::pipeline::dedup::Deduplicator;
use crate::types::{ActionType, CleaningAction, CleaningSummary};
use tracing::{debug, info, warn};

/// Executes the record-level stages on a batch.
pub struct RecordExecutor {
    date_imputer: DateImputer,
}

impl RecordExecutor {
    pub fn new(null_inverted_delivery_dates: bool) -> Self {
        Self {
            date_imputer: DateImputer::new().null_inverted_dates(null_inverted_delivery_dates),
        }
    }

    /// Fill missing delivery dates from shipment date and transit days.
    pub fn impute_delivery_dates(&self, batch: &mut ShipmentBatch, summary: &mut CleaningSummary) {
        let outcome = self.date_imputer.impute(batch.records_mut());

        summary.inverted_dates_nullified = outcome.inverted_nulled;
        summary.delivery_dates_imputed = outcome.imputed;

        if outcome.inverted_nulled > 0 {
            summary.add_action(CleaningAction::new(
                ActionType::OutlierHandled,
                "delivery_date",
                format!(
                    "Nulled {} delivery dates earlier than their shipment date",
                    outcome.inverted_nulled
                ),
            ));
        }
        if outcome.imputed > 0 {
            summary.add_action(
                CleaningAction::new(
                    ActionType::ValueImputed,
                    "delivery_date",
                    format!("Estimated {} delivery dates", outcome.imputed),
                )
                .with_details("shipment_date + transit_days"),
            );
        }

        info!("Delivery dates imputed: {}", outcome.imputed);
    }

    /// Learn the carrier rate table, then fill missing costs from it.
    ///
    /// The table is returned for reporting; it is not reused across runs.
    pub fn impute_costs(
        &self,
        batch: &mut ShipmentBatch,
        summary: &mut CleaningSummary,
    ) -> Result<CarrierRateTable> {
        let table = CarrierRateTable::learn(batch.records())?;
        for (carrier, rate) in table.iter() {
            debug!("Carrier '{}': median rate {:.6}", carrier, rate);
        }

        let outcome = CostImputer::new(&table).impute(batch.records_mut());

        summary.carriers_with_rate = table.len();
        summary.costs_imputed = outcome.imputed;
        summary.costs_unresolved = outcome.unresolved;

        if outcome.imputed > 0 {
            summary.add_action(
                CleaningAction::new(
                    ActionType::ValueImputed,
                    "cost",
                    format!("Estimated {} costs", outcome.imputed),
                )
                .with_details(format!("median rate of {} carriers", table.len())),
            );
        }
        if outcome.unresolved > 0 {
            warn!("{} costs left unresolved", outcome.unresolved);
            summary.add_warning(format!("{} costs could not be imputed", outcome.unresolved));
        }
        if !outcome.carriers_without_rate.is_empty() {
            let carriers: Vec<&str> = outcome
                .carriers_without_rate
                .iter()
                .map(String::as_str)
                .collect();
            warn!("No rate learned for carriers: {}", carriers.join(", "));
            summary.add_warning(format!(
                "No rate learned for carriers: {}",
                carriers.join(", ")
            ));
        }

        info!(
            "Costs imputed: {} ({} unresolved, {} carrier rates)",
            outcome.imputed,
            outcome.unresolved,
            table.len()
        );
        Ok(table)
    }

    /// Remove exact duplicates, then collapse repeated shipment ids.
    pub fn deduplicate(
        &self,
        batch: ShipmentBatch,
        summary: &mut CleaningSummary,
    ) -> Result<ShipmentBatch> {
        let (batch, outcome) = Deduplicator::deduplicate(batch)?;

        summary.exact_duplicates_removed = outcome.exact_duplicates;
        summary.id_collisions_collapsed = outcome.id_collisions;

        if outcome.exact_duplicates > 0 {
            summary.add_action(CleaningAction::new(
                ActionType::DuplicatesRemoved,
                "batch",
                format!("Removed {} exact duplicate rows", outcome.exact_duplicates),
            ));
        }
        if outcome.id_collisions > 0 {
            summary.add_action(
                CleaningAction::new(
                    ActionType::DuplicatesRemoved,
                    "shipment_id",
                    format!("Collapsed {} rows with a repeated shipment id", outcome.id_collisions),
                )
                .with_details("kept known/latest delivery date, then latest shipment date"),
            );
        }

        info!(
            "Deduplicated: {} exact, {} by shipment id",
            outcome.exact_duplicates, outcome.id_collisions
        );
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::ShipmentRecord;
    use chrono::NaiveDate;

    fn shipment(id: &str, carrier: &str, cost: Option<f64>) -> ShipmentRecord {
        ShipmentRecord {
            shipment_id: Some(id.to_string()),
            carrier: Some(carrier.to_string()),
            shipment_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            weight_kg: Some(10.0),
            distance_miles: Some(5.0),
            transit_days: Some(3.0),
            cost,
            ..Default::default()
        }
    }

    #[test]
    fn test_record_stages_update_summary() {
        let executor = RecordExecutor::new(false);
        let mut summary = CleaningSummary::new();
        let mut batch = ShipmentBatch::from_records(vec![
            shipment("S1", "X", Some(100.0)),
            shipment("S2", "X", None),
            shipment("S3", "Q", None),
            shipment("S3", "Q", None),
        ]);

        executor.impute_delivery_dates(&mut batch, &mut summary);
        let table = executor.impute_costs(&mut batch, &mut summary).unwrap();
        let batch = executor.deduplicate(batch, &mut summary).unwrap();

        assert_eq!(summary.delivery_dates_imputed, 4);
        assert_eq!(table.rate("X"), Some(2.0));
        assert_eq!(summary.costs_imputed, 1);
        assert_eq!(summary.costs_unresolved, 2);
        assert_eq!(summary.exact_duplicates_removed, 1);
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.records()[1].cost, Some(100.0));
        assert!(summary.warnings.iter().any(|w| w.contains("Q")));
    }
}
