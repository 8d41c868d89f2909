//! Carrier-conditioned cost imputation.
//!
//! Missing costs are estimated from the carrier's own median rate (cost per
//! weight·distance unit). There is no global fallback rate.
//! [`CarrierRateTable::learn`] builds the table, then [`CostImputer`] borrows
//! it to fill gaps.

use crate::batch::ShipmentRecord;
use crate::error::Result;
use crate::utils::{CARRIER, COST};
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

const LOAD: &str = "load";
const RATE: &str = "rate";

/// Median rate per carrier, learned from one batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CarrierRateTable {
    rates: BTreeMap<String, f64>,
}

impl CarrierRateTable {
    /// Learn rates from every row with a known carrier, a known cost and a
    /// positive `weight_kg * distance_miles`.
    ///
    /// Carriers without such rows get no entry.
    pub fn learn(records: &[ShipmentRecord]) -> Result<Self> {
        let carriers: Vec<Option<&str>> = records.iter().map(|r| r.carrier.as_deref()).collect();
        let costs: Vec<Option<f64>> = records.iter().map(|r| r.cost).collect();
        let loads: Vec<Option<f64>> = records.iter().map(ShipmentRecord::weight_distance).collect();

        let medians = df![
            CARRIER => carriers,
            COST => costs,
            LOAD => loads,
        ]?
        .lazy()
        .filter(
            col(CARRIER)
                .is_not_null()
                .and(col(COST).is_not_null())
                .and(col(LOAD).gt(lit(0.0))),
        )
        .group_by([col(CARRIER)])
        .agg([(col(COST) / col(LOAD)).median().alias(RATE)])
        .collect()?;

        let carriers = medians.column(CARRIER)?.as_materialized_series().str()?;
        let rates = medians.column(RATE)?.as_materialized_series().f64()?;

        let rates = carriers
            .into_iter()
            .zip(rates.into_iter())
            .filter_map(|(carrier, rate)| {
                let rate = rate.filter(|r| r.is_finite())?;
                Some((carrier?.to_string(), rate))
            })
            .collect();

        Ok(Self { rates })
    }

    pub fn rate(&self, carrier: &str) -> Option<f64> {
        self.rates.get(carrier).copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.rates.iter().map(|(c, r)| (c.as_str(), *r))
    }
}

/// Counts produced by one cost imputation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CostImputation {
    /// Costs filled from the rate table.
    pub imputed: usize,
    /// Costs still missing afterwards.
    pub unresolved: usize,
    /// Carriers of unresolved rows that have no learned rate.
    pub carriers_without_rate: BTreeSet<String>,
}

/// Fills missing costs from a borrowed [`CarrierRateTable`].
pub struct CostImputer<'a> {
    table: &'a CarrierRateTable,
}

impl<'a> CostImputer<'a> {
    pub fn new(table: &'a CarrierRateTable) -> Self {
        Self { table }
    }

    /// Set `cost = weight_kg * distance_miles * rate[carrier]` where cost is
    /// missing, the product is positive and the carrier has a rate.
    pub fn impute(&self, records: &mut [ShipmentRecord]) -> CostImputation {
        let mut outcome = CostImputation::default();

        for record in records.iter_mut() {
            if record.cost.is_some() {
                continue;
            }

            let rate = record.carrier.as_deref().and_then(|c| self.table.rate(c));
            match (rate, record.weight_distance()) {
                (Some(rate), Some(load)) if load > 0.0 => {
                    record.cost = Some(load * rate);
                    outcome.imputed += 1;
                }
                (rate, _) => {
                    outcome.unresolved += 1;
                    if rate.is_none()
                        && let Some(carrier) = &record.carrier
                    {
                        outcome.carriers_without_rate.insert(carrier.clone());
                    }
                    debug!("Shipment {:?}: cost left unresolved", record.shipment_id);
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        carrier: Option<&str>,
        cost: Option<f64>,
        weight: Option<f64>,
        distance: Option<f64>,
    ) -> ShipmentRecord {
        ShipmentRecord {
            carrier: carrier.map(str::to_string),
            cost,
            weight_kg: weight,
            distance_miles: distance,
            ..Default::default()
        }
    }

    #[test]
    fn test_learn_median_rate_per_carrier() {
        let records = vec![
            record(Some("X"), Some(100.0), Some(10.0), Some(5.0)),
            record(Some("X"), Some(120.0), Some(10.0), Some(6.0)),
            record(Some("Y"), Some(10.0), Some(1.0), Some(1.0)),
            record(Some("Y"), Some(30.0), Some(1.0), Some(1.0)),
        ];
        let table = CarrierRateTable::learn(&records).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.rate("X"), Some(2.0));
        assert_eq!(table.rate("Y"), Some(20.0));
        assert_eq!(table.rate("Z"), None);
    }

    #[test]
    fn test_learn_even_count_averages_middle_rates() {
        let records = vec![
            record(Some("X"), Some(10.0), Some(1.0), Some(1.0)),
            record(Some("X"), Some(20.0), Some(1.0), Some(1.0)),
            record(Some("X"), Some(40.0), Some(1.0), Some(1.0)),
            record(Some("X"), Some(90.0), Some(1.0), Some(1.0)),
        ];
        let table = CarrierRateTable::learn(&records).unwrap();
        assert_eq!(table.rate("X"), Some(30.0));
    }

    #[test]
    fn test_learn_from_empty_batch() {
        let table = CarrierRateTable::learn(&[]).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_learn_skips_unqualified_rows() {
        let records = vec![
            record(Some("X"), Some(100.0), Some(0.0), Some(5.0)),
            record(Some("X"), None, Some(10.0), Some(5.0)),
            record(Some("X"), Some(100.0), None, Some(5.0)),
            record(None, Some(100.0), Some(10.0), Some(5.0)),
        ];
        let table = CarrierRateTable::learn(&records).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_impute_carrier_example() {
        let mut records = vec![
            record(Some("X"), Some(100.0), Some(10.0), Some(5.0)),
            record(Some("X"), Some(120.0), Some(10.0), Some(6.0)),
            record(Some("X"), None, Some(10.0), Some(5.0)),
        ];
        let table = CarrierRateTable::learn(&records).unwrap();
        let outcome = CostImputer::new(&table).impute(&mut records);

        assert_eq!(records[2].cost, Some(100.0));
        assert_eq!(outcome.imputed, 1);
        assert_eq!(outcome.unresolved, 0);
    }

    #[test]
    fn test_no_global_fallback() {
        let mut records = vec![
            record(Some("X"), Some(100.0), Some(10.0), Some(5.0)),
            record(Some("Z"), None, Some(10.0), Some(5.0)),
            record(None, None, Some(10.0), Some(5.0)),
            record(Some("X"), None, Some(0.0), Some(5.0)),
        ];
        let table = CarrierRateTable::learn(&records).unwrap();
        let outcome = CostImputer::new(&table).impute(&mut records);

        assert_eq!(records[1].cost, None);
        assert_eq!(records[2].cost, None);
        assert_eq!(records[3].cost, None);
        assert_eq!(outcome.imputed, 0);
        assert_eq!(outcome.unresolved, 3);
        assert_eq!(
            outcome.carriers_without_rate.into_iter().collect::<Vec<_>>(),
            vec!["Z".to_string()]
        );
    }

    #[test]
    fn test_known_costs_untouched() {
        let mut records = vec![record(Some("X"), Some(7.0), Some(10.0), Some(5.0))];
        let table = CarrierRateTable::learn(&records).unwrap();
        CostImputer::new(&table).impute(&mut records);
        assert_eq!(records[0].cost, Some(7.0));
    }
}
