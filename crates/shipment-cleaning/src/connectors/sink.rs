//! Document sinks.

use crate::error::Result;
use serde_json::{Value, json};
use std::io::Write;

/// A document index that accepts one document per call.
pub trait DocumentSink {
    /// Store `document` under `id` in `index`, replacing any previous version.
    fn index(&mut self, index: &str, id: &str, document: &Value) -> Result<()>;

    /// Push buffered documents through. Called once after the last document.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Writes one `{"_index", "_id", "_source"}` object per line, the shape bulk
/// indexing tools accept.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DocumentSink for JsonLinesSink<W> {
    fn index(&mut self, index: &str, id: &str, document: &Value) -> Result<()> {
        let line = json!({
            "_index": index,
            "_id": id,
            "_source": document,
        });
        serde_json::to_writer(&mut self.writer, &line)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
