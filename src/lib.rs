//! Graph bulk loading: declarative graph shapes, vertex/edge document conversion,
//! lazy write-operation sequences and bounded-memory streaming ingestion of
//! input-output matrices.

#![warn(missing_docs)]

pub mod convert;
pub mod document;
pub mod error;
pub mod ingest;
pub mod model;
pub mod operation;
pub mod sample;
pub mod shape;
pub mod sink;

pub use convert::{EdgeConverter, IdGenerator, RandomIdGenerator, VertexConverter};
pub use document::{
    EdgeDocument, EndpointInfo, EndpointSnapshot, GraphDocument, PartitionKey, PropertyValue,
    VertexDocument,
};
pub use error::{
    ConvertError, GenerationCapabilityError, IngestError, MetadataValidationError, SinkError,
    ValidationRule,
};
pub use ingest::{FailedOperation, IngestConfig, IngestReport, StreamingIngestion};
pub use model::{CountrySectorVertex, SupplyEdge};
pub use operation::{OperationFactory, Operations, WriteMode, WriteOperation};
pub use sample::SampleGenerator;
pub use shape::{
    Capabilities, Direction, GraphShape, ShapeDeclaration, ShapeDescriptor, ShapeKind,
    ShapeRegistry,
};
pub use sink::{BulkSink, Destination, JsonLinesSink, MemorySink, OperationOutcome};
