//! Collaborators on either side of the pipeline.
//!
//! - [`ShipmentSource`] produces the raw extract (a CSV export here)
//! - [`DocumentSink`] accepts one cleaned document per call
//! - [`Loader`] derives document keys and feeds a sink

mod loader;
mod sink;
mod source;

pub use loader::{LoadReport, Loader, document_key};
pub use sink::{DocumentSink, JsonLinesSink};
pub use source::{CsvSource, ShipmentSource, read_csv_str, write_csv};
