#![forbid(unsafe_code)]

use std::collections::HashMap;

use tracing::debug;

use super::{BulkSink, Destination, OperationOutcome};
use crate::document::GraphDocument;
use crate::error::SinkError;
use crate::operation::{WriteMode, WriteOperation};

const STATUS_OK: u16 = 200;
const STATUS_CREATED: u16 = 201;
const STATUS_CONFLICT: u16 = 409;

type DocumentKey = (Option<String>, String);

/// In-memory store keyed by `(partition value, id)`.
///
/// CREATE of an existing key fails with 409, UPSERT of an existing key replaces it
/// with 200, and any write of a new key succeeds with 201.
#[derive(Debug, Default)]
pub struct MemorySink {
    documents: HashMap<DocumentKey, GraphDocument>,
    batch_sizes: Vec<usize>,
    destinations: Vec<Destination>,
}

impl MemorySink {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// True when nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Looks a document up by partition value and id.
    pub fn get(&self, partition_key: Option<&str>, id: &str) -> Option<&GraphDocument> {
        self.documents
            .get(&(partition_key.map(str::to_string), id.to_string()))
    }

    /// Iterates over every stored document in no particular order.
    pub fn documents(&self) -> impl Iterator<Item = &GraphDocument> {
        self.documents.values()
    }

    /// Size of every batch flushed so far, in order.
    pub fn batch_sizes(&self) -> &[usize] {
        &self.batch_sizes
    }

    /// Destination of every batch flushed so far, in order.
    pub fn destinations(&self) -> &[Destination] {
        &self.destinations
    }

    fn apply(&mut self, op: &WriteOperation) -> OperationOutcome {
        let key = (op.partition_key.clone(), op.document.id().to_string());
        let exists = self.documents.contains_key(&key);
        match (op.mode, exists) {
            (WriteMode::Create, true) => OperationOutcome::Failed {
                status: STATUS_CONFLICT,
                message: format!("document '{}' already exists", key.1),
            },
            (_, exists) => {
                self.documents.insert(key, op.document.clone());
                OperationOutcome::Success {
                    status: if exists { STATUS_OK } else { STATUS_CREATED },
                }
            }
        }
    }
}

impl BulkSink for MemorySink {
    fn flush(
        &mut self,
        destination: &Destination,
        batch: &[WriteOperation],
    ) -> Result<Vec<OperationOutcome>, SinkError> {
        self.batch_sizes.push(batch.len());
        self.destinations.push(destination.clone());
        let outcomes: Vec<_> = batch.iter().map(|op| self.apply(op)).collect();
        debug!(
            batch = batch.len(),
            failed = outcomes.iter().filter(|o| !o.is_success()).count(),
            stored = self.documents.len(),
            "sink.memory.flush"
        );
        Ok(outcomes)
    }
}
