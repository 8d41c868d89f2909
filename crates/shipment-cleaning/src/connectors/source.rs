//! Reading the raw extract and writing the cleaned batch as CSV.

use crate::batch::ShipmentBatch;
use crate::error::{Result, ResultExt};
use polars::prelude::*;
use std::io::{Cursor, Write};
use std::path::PathBuf;
use tracing::debug;

/// Rows from the source system, as one DataFrame per full-table read.
pub trait ShipmentSource {
    fn extract(&self) -> Result<DataFrame>;
}

/// Reader options shared by every CSV read.
///
/// Every column is read as text. Dates and measures are parsed later by the
/// type coercion stage, so a missing-value token or a stray fraction deep in
/// the file cannot fail the read.
fn read_options() -> CsvReadOptions {
    CsvReadOptions::default()
        .with_infer_schema_length(Some(0))
        .with_has_header(true)
}

/// A CSV export of the shipments table.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ShipmentSource for CsvSource {
    fn extract(&self) -> Result<DataFrame> {
        let context = format!("reading {}", self.path.display());

        // Strategy 1: Standard loading with quote handling
        let quoted = read_options()
            .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
            .try_into_reader_with_file_path(Some(self.path.clone()))
            .context(context.clone())?
            .finish();

        match quoted {
            Ok(df) => Ok(df),
            Err(e) => {
                debug!("Standard loading failed: {}", e);
                // Strategy 2: Without quote handling
                read_options()
                    .with_parse_options(CsvParseOptions::default().with_quote_char(None))
                    .try_into_reader_with_file_path(Some(self.path.clone()))
                    .context(context.clone())?
                    .finish()
                    .context(context)
            }
        }
    }
}

/// Parse CSV text already in memory.
pub fn read_csv_str(content: &str) -> Result<DataFrame> {
    let cursor = Cursor::new(content.as_bytes().to_vec());
    read_options()
        .into_reader_with_file_handle(cursor)
        .finish()
        .context("reading CSV content")
}

/// Write the batch as CSV with a header row; dates as `YYYY-MM-DD`.
pub fn write_csv<W: Write>(batch: &ShipmentBatch, writer: W) -> Result<()> {
    let mut df = batch.to_dataframe()?;
    CsvWriter::new(writer)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(&mut df)
        .context("writing cleaned CSV")
}
