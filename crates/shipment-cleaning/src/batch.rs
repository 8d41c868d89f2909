//! Typed shipment records and the conversion between them and a DataFrame.
//!
//! The column-wise stages (names, tokens, types, negative measures) run on a
//! polars `DataFrame`. Everything that reads several fields of one row at a
//! time (date imputation, cost imputation, deduplication) runs on
//! [`ShipmentBatch`]. Converting between the two is the barrier between those
//! halves of the pipeline.

use crate::error::{CleaningError, Result};
use crate::utils::{
    CARRIER, COST, DATE_COLUMNS, DELIVERY_DATE, DISTANCE_MILES, MEASURE_COLUMNS, REQUIRED_COLUMNS,
    SHIPMENT_DATE, SHIPMENT_ID, TRANSIT_DAYS, WEIGHT_KG, date_to_epoch_days, epoch_days_to_date,
    first_missing_column,
};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One row of the batch. `None` is the only representation of a missing value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShipmentRecord {
    pub shipment_id: Option<String>,
    pub carrier: Option<String>,
    pub shipment_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
    pub weight_kg: Option<f64>,
    pub distance_miles: Option<f64>,
    pub transit_days: Option<f64>,
    pub cost: Option<f64>,
    /// Passthrough fields, retained verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ShipmentRecord {
    /// `weight_kg * distance_miles` when both are known.
    pub fn weight_distance(&self) -> Option<f64> {
        Some(self.weight_kg? * self.distance_miles?)
    }

    /// The record as an index document body.
    pub fn to_document(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// An ordered batch of shipment records plus the column order of the extract.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShipmentBatch {
    columns: Vec<String>,
    records: Vec<ShipmentRecord>,
}

impl ShipmentBatch {
    pub fn new(columns: Vec<String>, records: Vec<ShipmentRecord>) -> Self {
        Self { columns, records }
    }

    /// Build a batch from records, using the canonical columns plus every
    /// passthrough key in first-seen order.
    pub fn from_records(records: Vec<ShipmentRecord>) -> Self {
        let mut columns: Vec<String> = REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect();
        for record in &records {
            for key in record.extra.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
        Self { columns, records }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[ShipmentRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut Vec<ShipmentRecord> {
        &mut self.records
    }

    pub fn into_records(self) -> Vec<ShipmentRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Read a cleaned DataFrame into typed records.
    ///
    /// Dates must already be polars `Date` and measures must be numeric;
    /// the type coercion stage guarantees both.
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let columns: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();

        if let Some(missing) = first_missing_column(&columns, &REQUIRED_COLUMNS) {
            return Err(CleaningError::ColumnNotFound(missing.to_string()));
        }

        let height = df.height();
        let ids = text_column(df, SHIPMENT_ID)?;
        let carriers = text_column(df, CARRIER)?;
        let shipment_dates = date_column(df, SHIPMENT_DATE)?;
        let delivery_dates = date_column(df, DELIVERY_DATE)?;
        let weights = measure_column(df, WEIGHT_KG)?;
        let distances = measure_column(df, DISTANCE_MILES)?;
        let transits = measure_column(df, TRANSIT_DAYS)?;
        let costs = measure_column(df, COST)?;

        let extra_names: Vec<&String> = columns
            .iter()
            .filter(|c| !REQUIRED_COLUMNS.contains(&c.as_str()))
            .collect();
        let mut extra_values = Vec::with_capacity(extra_names.len());
        for name in &extra_names {
            extra_values.push(json_column(df, name)?);
        }

        let mut records = Vec::with_capacity(height);
        for i in 0..height {
            let extra = extra_names
                .iter()
                .zip(extra_values.iter())
                .map(|(name, values)| ((*name).clone(), values[i].clone()))
                .collect();

            records.push(ShipmentRecord {
                shipment_id: ids[i].clone(),
                carrier: carriers[i].clone(),
                shipment_date: shipment_dates[i],
                delivery_date: delivery_dates[i],
                weight_kg: weights[i],
                distance_miles: distances[i],
                transit_days: transits[i],
                cost: costs[i],
                extra,
            });
        }

        Ok(Self { columns, records })
    }

    /// Write the batch back into a DataFrame, preserving column order.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut series = Vec::with_capacity(self.columns.len());

        for name in &self.columns {
            let s = match name.as_str() {
                SHIPMENT_ID => {
                    text_series(name, self.records.iter().map(|r| r.shipment_id.clone()))
                }
                CARRIER => text_series(name, self.records.iter().map(|r| r.carrier.clone())),
                SHIPMENT_DATE => date_series(name, self.records.iter().map(|r| r.shipment_date))?,
                DELIVERY_DATE => date_series(name, self.records.iter().map(|r| r.delivery_date))?,
                WEIGHT_KG => measure_series(name, self.records.iter().map(|r| r.weight_kg)),
                DISTANCE_MILES => {
                    measure_series(name, self.records.iter().map(|r| r.distance_miles))
                }
                TRANSIT_DAYS => measure_series(name, self.records.iter().map(|r| r.transit_days)),
                COST => measure_series(name, self.records.iter().map(|r| r.cost)),
                _ => passthrough_series(
                    name,
                    self.records
                        .iter()
                        .map(|r| r.extra.get(name).cloned().unwrap_or(Value::Null))
                        .collect(),
                ),
            };
            series.push(Column::from(s));
        }

        Ok(DataFrame::new(series)?)
    }
}

// ============================================================================
// DataFrame -> records
// ============================================================================

fn series<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map(|c| c.as_materialized_series())
        .map_err(|_| CleaningError::ColumnNotFound(name.to_string()))
}

fn text_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let s = series(df, name)?;
    if s.dtype() == &DataType::String {
        return Ok(s
            .str()?
            .into_iter()
            .map(|v| v.map(|v| v.to_string()))
            .collect());
    }

    let mut values = Vec::with_capacity(s.len());
    for i in 0..s.len() {
        values.push(match s.get(i)? {
            AnyValue::Null => None,
            other => Some(any_value_to_string(&other)),
        });
    }
    Ok(values)
}

fn date_column(df: &DataFrame, name: &str) -> Result<Vec<Option<NaiveDate>>> {
    let s = series(df, name)?;
    if s.dtype() != &DataType::Date {
        return Err(CleaningError::TypeConversionFailed {
            column: name.to_string(),
            target_type: "Date".to_string(),
            reason: format!("expected a coerced date column, found {}", s.dtype()),
        });
    }

    let days = s.cast(&DataType::Int32)?;
    Ok(days
        .i32()?
        .into_iter()
        .map(|v| v.and_then(epoch_days_to_date))
        .collect())
}

fn measure_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let s = series(df, name)?;
    if !crate::utils::is_numeric_dtype(s.dtype()) && s.dtype() != &DataType::Null {
        return Err(CleaningError::TypeConversionFailed {
            column: name.to_string(),
            target_type: "Float64".to_string(),
            reason: format!("expected a coerced numeric column, found {}", s.dtype()),
        });
    }

    let floats = s.cast(&DataType::Float64)?;
    Ok(floats
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

fn json_column(df: &DataFrame, name: &str) -> Result<Vec<Value>> {
    let s = series(df, name)?;
    let mut values = Vec::with_capacity(s.len());
    for i in 0..s.len() {
        values.push(any_value_to_json(s.get(i)?));
    }
    Ok(values)
}

fn any_value_to_string(value: &AnyValue) -> String {
    match value {
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        other => other.to_string(),
    }
}

fn float_to_json(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn any_value_to_json(value: AnyValue) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(b),
        AnyValue::String(s) => Value::String(s.to_string()),
        AnyValue::StringOwned(s) => Value::String(s.to_string()),
        AnyValue::Int8(v) => Value::from(v),
        AnyValue::Int16(v) => Value::from(v),
        AnyValue::Int32(v) => Value::from(v),
        AnyValue::Int64(v) => Value::from(v),
        AnyValue::UInt8(v) => Value::from(v),
        AnyValue::UInt16(v) => Value::from(v),
        AnyValue::UInt32(v) => Value::from(v),
        AnyValue::UInt64(v) => Value::from(v),
        AnyValue::Float32(v) => float_to_json(v as f64),
        AnyValue::Float64(v) => float_to_json(v),
        other => Value::String(other.to_string()),
    }
}

// ============================================================================
// records -> DataFrame
// ============================================================================

fn text_series(name: &str, values: impl Iterator<Item = Option<String>>) -> Series {
    Series::new(name.into(), values.collect::<Vec<_>>())
}

fn measure_series(name: &str, values: impl Iterator<Item = Option<f64>>) -> Series {
    Series::new(name.into(), values.collect::<Vec<_>>())
}

fn date_series(name: &str, values: impl Iterator<Item = Option<NaiveDate>>) -> Result<Series> {
    let days: Vec<Option<i32>> = values.map(|d| d.map(date_to_epoch_days)).collect();
    Ok(Series::new(name.into(), days).cast(&DataType::Date)?)
}

/// Rebuild a passthrough column with the narrowest type that holds every value.
fn passthrough_series(name: &str, values: Vec<Value>) -> Series {
    let present: Vec<&Value> = values.iter().filter(|v| !v.is_null()).collect();

    if !present.is_empty() && present.iter().all(|v| v.is_boolean()) {
        let bools: Vec<Option<bool>> = values.iter().map(Value::as_bool).collect();
        return Series::new(name.into(), bools);
    }
    if !present.is_empty() && present.iter().all(|v| v.is_i64()) {
        let ints: Vec<Option<i64>> = values.iter().map(Value::as_i64).collect();
        return Series::new(name.into(), ints);
    }
    if !present.is_empty() && present.iter().all(|v| v.is_number()) {
        let floats: Vec<Option<f64>> = values.iter().map(Value::as_f64).collect();
        return Series::new(name.into(), floats);
    }

    let text: Vec<Option<String>> = values
        .iter()
        .map(|v| match v {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
        .collect();
    Series::new(name.into(), text)
}
