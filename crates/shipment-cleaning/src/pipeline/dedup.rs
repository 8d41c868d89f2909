//! Two-step deduplication.
//!
//! Exact duplicates go first. Remaining rows that share a `shipment_id` are
//! ranked so the most complete, most recent record comes first, and only that
//! one survives. Rows without a `shipment_id` are never collapsed.

use crate::batch::{ShipmentBatch, ShipmentRecord};
use crate::error::Result;
use polars::prelude::*;
use std::cmp::Ordering;
use tracing::debug;

const ROW_INDEX: &str = "__row_index";

/// Rows removed by each deduplication step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupOutcome {
    pub exact_duplicates: usize,
    pub id_collisions: usize,
}

pub struct Deduplicator;

impl Deduplicator {
    /// Run both steps. Survivors keep their original relative order.
    pub fn deduplicate(batch: ShipmentBatch) -> Result<(ShipmentBatch, DedupOutcome)> {
        let before = batch.len();
        let batch = Self::remove_exact_duplicates(batch)?;
        let exact_duplicates = before - batch.len();

        let (columns, records) = (batch.columns().to_vec(), batch.into_records());
        let before = records.len();
        let records = Self::collapse_shipment_ids(records);
        let id_collisions = before - records.len();

        Ok((
            ShipmentBatch::new(columns, records),
            DedupOutcome {
                exact_duplicates,
                id_collisions,
            },
        ))
    }

    /// Drop rows equal to an earlier row in every column. First occurrence wins.
    pub fn remove_exact_duplicates(batch: ShipmentBatch) -> Result<ShipmentBatch> {
        if batch.is_empty() {
            return Ok(batch);
        }

        let subset = batch.columns().to_vec();
        let firsts = batch
            .to_dataframe()?
            .with_row_index(ROW_INDEX.into(), None)?
            .unique_stable(Some(subset.as_slice()), UniqueKeepStrategy::First, None)?;

        let mut keep = vec![false; batch.len()];
        for i in firsts
            .column(ROW_INDEX)?
            .as_materialized_series()
            .idx()?
            .into_no_null_iter()
        {
            keep[i as usize] = true;
        }

        let columns = subset;
        let records = batch
            .into_records()
            .into_iter()
            .zip(keep)
            .filter_map(|(record, keep)| {
                if !keep {
                    debug!("Dropped exact duplicate of shipment {:?}", record.shipment_id);
                }
                keep.then_some(record)
            })
            .collect();

        Ok(ShipmentBatch::new(columns, records))
    }

    /// Keep one row per non-null `shipment_id`: the first by [`authority_order`],
    /// original order breaking full ties.
    pub fn collapse_shipment_ids(records: Vec<ShipmentRecord>) -> Vec<ShipmentRecord> {
        let mut keyed: Vec<usize> = (0..records.len())
            .filter(|&i| records[i].shipment_id.is_some())
            .collect();
        // Stable, so equal candidates stay in batch order.
        keyed.sort_by(|&a, &b| {
            records[a]
                .shipment_id
                .cmp(&records[b].shipment_id)
                .then_with(|| authority_order(&records[a], &records[b]))
        });

        let mut keep: Vec<bool> = records.iter().map(|r| r.shipment_id.is_none()).collect();
        let mut current: Option<&str> = None;
        for i in keyed {
            let id = records[i].shipment_id.as_deref();
            if id != current {
                keep[i] = true;
                current = id;
            } else {
                debug!("Collapsed repeated shipment id {:?}", id);
            }
        }

        records
            .into_iter()
            .zip(keep)
            .filter_map(|(record, keep)| keep.then_some(record))
            .collect()
    }
}

/// Preferred record first: known delivery date, then latest delivery date,
/// then latest shipment date. Missing dates sort last.
pub fn authority_order(a: &ShipmentRecord, b: &ShipmentRecord) -> Ordering {
    // `None < Some(_)`, so comparing b to a gives "present and latest first".
    b.delivery_date
        .cmp(&a.delivery_date)
        .then_with(|| b.shipment_date.cmp(&a.shipment_date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::Value;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    fn record(
        id: Option<&str>,
        shipped: Option<NaiveDate>,
        delivered: Option<NaiveDate>,
    ) -> ShipmentRecord {
        ShipmentRecord {
            shipment_id: id.map(str::to_string),
            carrier: Some("UPS".to_string()),
            shipment_date: shipped,
            delivery_date: delivered,
            ..Default::default()
        }
    }

    #[test]
    fn test_exact_duplicates_keep_first() {
        let a = record(Some("S1"), date(2024, 1, 1), None);
        let mut b = a.clone();
        b.extra.insert("note".to_string(), Value::from("second"));

        let batch = ShipmentBatch::from_records(vec![a.clone(), b.clone(), a.clone()]);
        let kept = Deduplicator::remove_exact_duplicates(batch).unwrap();
        assert_eq!(kept.records(), &[a, b]);
        assert_eq!(kept.columns().last().map(String::as_str), Some("note"));
    }

    #[test]
    fn test_signed_zero_is_one_value() {
        let mut a = record(Some("S1"), date(2024, 1, 1), None);
        a.cost = Some(0.0);
        let mut b = a.clone();
        b.cost = Some(-0.0);

        let batch = ShipmentBatch::from_records(vec![a, b]);
        let kept = Deduplicator::remove_exact_duplicates(batch).unwrap();
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_nulls_compare_equal_for_exact_duplicates() {
        let a = record(None, None, None);
        let batch = ShipmentBatch::from_records(vec![a.clone(), a.clone(), a]);

        let (kept, outcome) = Deduplicator::deduplicate(batch).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(outcome, DedupOutcome { exact_duplicates: 2, id_collisions: 0 });
    }

    #[test]
    fn test_prefers_known_delivery_date() {
        let records = vec![
            record(Some("S1"), date(2024, 1, 1), None),
            record(Some("S1"), date(2024, 1, 1), date(2024, 2, 1)),
        ];
        let (kept, outcome) =
            Deduplicator::deduplicate(ShipmentBatch::from_records(records)).unwrap();

        assert_eq!(kept.len(), 1);
        assert_eq!(kept.records()[0].delivery_date, date(2024, 2, 1));
        assert_eq!(outcome, DedupOutcome { exact_duplicates: 0, id_collisions: 1 });
    }

    #[test]
    fn test_prefers_latest_dates() {
        let records = vec![
            record(Some("S1"), date(2024, 1, 1), date(2024, 1, 5)),
            record(Some("S1"), date(2024, 1, 1), date(2024, 1, 9)),
            record(Some("S2"), date(2024, 1, 1), date(2024, 1, 9)),
            record(Some("S2"), None, date(2024, 1, 9)),
            record(Some("S2"), date(2024, 1, 3), date(2024, 1, 9)),
        ];
        let kept = Deduplicator::collapse_shipment_ids(records);

        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].delivery_date, date(2024, 1, 9));
        assert_eq!(kept[0].shipment_id.as_deref(), Some("S1"));
        assert_eq!(kept[1].shipment_date, date(2024, 1, 3));
    }

    #[test]
    fn test_full_tie_keeps_first_in_batch_order() {
        let mut first = record(Some("S1"), date(2024, 1, 1), None);
        first.cost = Some(1.0);
        let mut second = first.clone();
        second.cost = Some(2.0);

        let kept = Deduplicator::collapse_shipment_ids(vec![first, second]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].cost, Some(1.0));
    }

    #[test]
    fn test_null_ids_are_never_collapsed() {
        let mut a = record(None, date(2024, 1, 1), None);
        a.cost = Some(1.0);
        let mut b = record(None, date(2024, 1, 1), None);
        b.cost = Some(2.0);

        let (kept, outcome) =
            Deduplicator::deduplicate(ShipmentBatch::from_records(vec![a, b])).unwrap();
        assert_eq!(kept.len(), 2);
        assert_eq!(outcome.id_collisions, 0);
    }

    #[test]
    fn test_survivors_keep_original_order() {
        let records = vec![
            record(Some("B"), date(2024, 1, 1), None),
            record(None, date(2024, 1, 1), None),
            record(Some("A"), date(2024, 1, 1), None),
            record(Some("B"), date(2024, 1, 2), None),
        ];
        let kept = Deduplicator::collapse_shipment_ids(records);
        let ids: Vec<Option<&str>> = kept.iter().map(|r| r.shipment_id.as_deref()).collect();

        assert_eq!(ids, vec![None, Some("A"), Some("B")]);
        assert_eq!(kept[2].shipment_date, date(2024, 1, 2));
    }
}
