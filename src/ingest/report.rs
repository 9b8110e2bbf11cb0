#![forbid(unsafe_code)]

use serde::Serialize;

/// One operation the sink reported as failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedOperation {
    /// Document id.
    pub id: String,
    /// Routing value of the operation.
    pub partition_key: Option<String>,
    /// `"vertex"` or `"edge"`.
    pub kind: &'static str,
    /// Status code reported by the sink.
    pub status: u16,
    /// Reason reported by the sink.
    pub message: String,
}

/// Counters and failures gathered over one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    /// Data rows read during discovery (the header row excluded).
    pub rows_scanned: u64,
    /// Vertex operations the sink accepted.
    pub vertices_written: u64,
    /// Edge operations the sink accepted.
    pub edges_written: u64,
    /// Batches handed to the sink.
    pub flushes: u64,
    /// Rows whose first cell is not a decodable entity id.
    pub skipped_rows: u64,
    /// Header columns that are not decodable entity ids.
    pub skipped_columns: u64,
    /// Empty, undecodable or non-numeric cells, and cells outside the header's columns.
    pub skipped_cells: u64,
    /// Operations the sink rejected, in flush order.
    pub failures: Vec<FailedOperation>,
}

impl IngestReport {
    /// Rows, columns and cells skipped as malformed.
    pub fn skipped_total(&self) -> u64 {
        self.skipped_rows + self.skipped_columns + self.skipped_cells
    }

    /// Number of rejected operations.
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
}
