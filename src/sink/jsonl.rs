#![forbid(unsafe_code)]

use std::io::Write;

use serde_json::json;
use tracing::debug;

use super::{BulkSink, Destination, OperationOutcome};
use crate::error::SinkError;
use crate::operation::WriteOperation;

const STATUS_ACCEPTED: u16 = 200;

/// Writes each operation as one JSON line.
///
/// Line layout: `{"op", "partitionKey", "destination", "document"}` where `document` is
/// the store's graph-document encoding. Every written line counts as a success; any I/O
/// failure fails the whole batch.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    lines: u64,
}

impl<W: Write> JsonLinesSink<W> {
    /// Wraps a writer.
    pub fn new(writer: W) -> Self {
        Self { writer, lines: 0 }
    }

    /// Lines written so far.
    pub fn lines_written(&self) -> u64 {
        self.lines
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> BulkSink for JsonLinesSink<W> {
    fn flush(
        &mut self,
        destination: &Destination,
        batch: &[WriteOperation],
    ) -> Result<Vec<OperationOutcome>, SinkError> {
        for op in batch {
            let line = json!({
                "op": op.mode.as_str(),
                "partitionKey": op.partition_key,
                "destination": destination,
                "document": op.document.to_json(),
            });
            serde_json::to_writer(&mut self.writer, &line)?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()?;
        self.lines += batch.len() as u64;
        debug!(batch = batch.len(), lines = self.lines, "sink.jsonl.flush");
        Ok(vec![
            OperationOutcome::Success {
                status: STATUS_ACCEPTED
            };
            batch.len()
        ])
    }
}
