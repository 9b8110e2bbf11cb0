#![forbid(unsafe_code)]

//! Bulk-write transport boundary.
//!
//! A [`BulkSink`] accepts one batch of write operations at a time and reports one
//! [`OperationOutcome`] per operation, in batch order. Returning `Err` means the whole
//! batch could not be handed over and the caller must stop.

use serde::{Deserialize, Serialize};

use crate::error::SinkError;
use crate::operation::WriteOperation;

mod jsonl;
mod memory;

pub use jsonl::JsonLinesSink;
pub use memory::MemorySink;

/// Store coordinates a batch is written to. Opaque to the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Database name.
    pub database: String,
    /// Container (collection) name.
    pub container: String,
}

impl Destination {
    /// Creates destination coordinates.
    pub fn new(database: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            container: container.into(),
        }
    }
}

/// Result of writing one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum OperationOutcome {
    /// The store accepted the write.
    Success {
        /// HTTP-style status code.
        status: u16,
    },
    /// The store rejected the write.
    Failed {
        /// HTTP-style status code.
        status: u16,
        /// Store-provided reason.
        message: String,
    },
}

impl OperationOutcome {
    /// True for accepted writes.
    pub fn is_success(&self) -> bool {
        matches!(self, OperationOutcome::Success { .. })
    }

    /// Status code of the outcome.
    pub fn status(&self) -> u16 {
        match self {
            OperationOutcome::Success { status } | OperationOutcome::Failed { status, .. } => {
                *status
            }
        }
    }
}

/// Transport accepting batches of write operations.
pub trait BulkSink {
    /// Writes one batch, blocking until every operation has an outcome.
    fn flush(
        &mut self,
        destination: &Destination,
        batch: &[WriteOperation],
    ) -> Result<Vec<OperationOutcome>, SinkError>;
}

impl<S: BulkSink + ?Sized> BulkSink for &mut S {
    fn flush(
        &mut self,
        destination: &Destination,
        batch: &[WriteOperation],
    ) -> Result<Vec<OperationOutcome>, SinkError> {
        (**self).flush(destination, batch)
    }
}

impl<S: BulkSink + ?Sized> BulkSink for Box<S> {
    fn flush(
        &mut self,
        destination: &Destination,
        batch: &[WriteOperation],
    ) -> Result<Vec<OperationOutcome>, SinkError> {
        (**self).flush(destination, batch)
    }
}
