//! Delivery date imputation.
//!
//! A missing delivery date is estimated as `shipment_date + transit_days`.
//! Rows missing either input stay null.

use crate::batch::ShipmentRecord;
use chrono::{Days, NaiveDate};
use tracing::debug;

/// Counts produced by one imputation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateImputation {
    /// Delivery dates filled from shipment date and transit days.
    pub imputed: usize,
    /// Delivery dates earlier than their shipment date that were nulled.
    pub inverted_nulled: usize,
}

/// Fills missing delivery dates.
#[derive(Debug, Clone, Default)]
pub struct DateImputer {
    null_inverted: bool,
}

impl DateImputer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also null delivery dates that precede the shipment date before filling,
    /// so they are re-estimated from transit days.
    pub fn null_inverted_dates(mut self, enable: bool) -> Self {
        self.null_inverted = enable;
        self
    }

    pub fn impute(&self, records: &mut [ShipmentRecord]) -> DateImputation {
        let mut outcome = DateImputation::default();

        for record in records.iter_mut() {
            if self.null_inverted
                && let (Some(shipped), Some(delivered)) =
                    (record.shipment_date, record.delivery_date)
                && delivered < shipped
            {
                debug!(
                    "Shipment {:?}: delivery {} precedes shipment {}, nulled",
                    record.shipment_id, delivered, shipped
                );
                record.delivery_date = None;
                outcome.inverted_nulled += 1;
            }

            if record.delivery_date.is_some() {
                continue;
            }
            let (Some(shipped), Some(transit)) = (record.shipment_date, record.transit_days) else {
                continue;
            };
            if let Some(estimate) = estimate_delivery_date(shipped, transit) {
                record.delivery_date = Some(estimate);
                outcome.imputed += 1;
            }
        }

        outcome
    }
}

/// `shipped + floor(transit_days)` days.
///
/// Returns `None` for negative or non-finite transit times and on calendar
/// overflow.
pub fn estimate_delivery_date(shipped: NaiveDate, transit_days: f64) -> Option<NaiveDate> {
    if !transit_days.is_finite() || transit_days < 0.0 {
        return None;
    }
    shipped.checked_add_days(Days::new(transit_days.floor() as u64))
}
