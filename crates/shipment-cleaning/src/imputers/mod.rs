//! Imputation module for handling missing values.
//!
//! This module provides the two domain-grounded imputers:
//! - Delivery dates estimated from shipment date plus transit days
//! - Costs estimated from a per-carrier median rate

mod carrier_rate;
mod delivery_date;

pub use carrier_rate::{CarrierRateTable, CostImputation, CostImputer};
pub use delivery_date::{DateImputation, DateImputer, estimate_delivery_date};
