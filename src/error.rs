#![forbid(unsafe_code)]

//! Error types shared by the shape, conversion, sink and ingestion layers.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::shape::Direction;

/// A structural rule a graph shape (or a value read through it) violated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationRule {
    /// The shape never declared whether it is a vertex or an edge.
    MissingShapeKind,
    /// The shape did not declare exactly one identifier member.
    IdentifierCount(usize),
    /// Several partition-key members were declared and no override picks one.
    AmbiguousPartitionKey(Vec<&'static str>),
    /// The partition-key override names a member that is not tagged as a partition key.
    UnknownPartitionKeyOverride(&'static str),
    /// A vertex declared a partition-key field override without a member supplying the value.
    VertexPartitionKeyWithoutMember(&'static str),
    /// No label literal, label field or label accessor was declared.
    MissingLabelSource,
    /// More than one label source of the same kind was declared.
    DuplicateLabelSource {
        /// `"field"` or `"accessor"`.
        kind: &'static str,
        /// How many were declared.
        count: usize,
    },
    /// Two properties map to the same external name.
    DuplicatePropertyName(String),
    /// A property external name collides with the id, label or partition-key member.
    ReservedPropertyName(String),
    /// An edge did not declare exactly one endpoint for the direction.
    EndpointCount {
        /// Direction that was miscounted.
        direction: Direction,
        /// Number of members tagged with it.
        found: usize,
    },
    /// Endpoint members were declared on a vertex shape.
    EndpointOnVertex(&'static str),
    /// The identifier member holds no value (or a blank one).
    MissingIdentifier(&'static str),
    /// The resolved label is absent or blank.
    MissingLabel,
    /// The partition-key member holds no value.
    MissingPartitionKey(&'static str),
    /// An endpoint member holds no value or a malformed snapshot.
    MalformedEndpoint {
        /// Member name of the endpoint.
        member: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// A vertex shape was handed to the edge converter or vice versa.
    WrongShapeKind {
        /// Kind the caller asked for.
        expected: &'static str,
    },
}

impl fmt::Display for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationRule::MissingShapeKind => {
                write!(f, "shape is declared as neither vertex nor edge")
            }
            ValidationRule::IdentifierCount(found) => {
                write!(f, "expected exactly one identifier member, found {found}")
            }
            ValidationRule::AmbiguousPartitionKey(members) => write!(
                f,
                "partition key is ambiguous between members {} and no override selects one",
                members.join(", ")
            ),
            ValidationRule::UnknownPartitionKeyOverride(name) => write!(
                f,
                "partition key override '{name}' does not match any partition-key member"
            ),
            ValidationRule::VertexPartitionKeyWithoutMember(name) => write!(
                f,
                "vertex declares partition key field '{name}' but no member supplies its value"
            ),
            ValidationRule::MissingLabelSource => {
                write!(f, "no label literal, label field or label accessor declared")
            }
            ValidationRule::DuplicateLabelSource { kind, count } => {
                write!(f, "expected at most one label {kind}, found {count}")
            }
            ValidationRule::DuplicatePropertyName(name) => {
                write!(f, "property name '{name}' is declared more than once")
            }
            ValidationRule::ReservedPropertyName(name) => write!(
                f,
                "property name '{name}' collides with the id, label or partition-key member"
            ),
            ValidationRule::EndpointCount { direction, found } => write!(
                f,
                "expected exactly one {direction} endpoint member, found {found}"
            ),
            ValidationRule::EndpointOnVertex(name) => {
                write!(f, "endpoint member '{name}' is only valid on edge shapes")
            }
            ValidationRule::MissingIdentifier(name) => {
                write!(f, "identifier member '{name}' is unset or blank")
            }
            ValidationRule::MissingLabel => write!(f, "label resolved to an empty value"),
            ValidationRule::MissingPartitionKey(name) => {
                write!(f, "partition key member '{name}' is unset")
            }
            ValidationRule::MalformedEndpoint { member, reason } => {
                write!(f, "endpoint member '{member}' {reason}")
            }
            ValidationRule::WrongShapeKind { expected } => {
                write!(f, "shape is not declared as {expected}")
            }
        }
    }
}

/// Raised when a type's graph declarations, or the values read through them, break an invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid graph shape for {type_name}: {rule}")]
pub struct MetadataValidationError {
    /// Fully-qualified name of the offending type.
    pub type_name: &'static str,
    /// The rule that was violated.
    pub rule: ValidationRule,
}

impl MetadataValidationError {
    pub(crate) fn new(type_name: &'static str, rule: ValidationRule) -> Self {
        Self { type_name, rule }
    }
}

/// Raised when the operating system's randomness source cannot be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("secure randomness unavailable: {0}")]
pub struct GenerationCapabilityError(pub String);

/// Error produced by a single conversion or operation-sequence element.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    /// Shape or value validation failed.
    #[error(transparent)]
    Metadata(#[from] MetadataValidationError),
    /// Id generation could not obtain randomness.
    #[error(transparent)]
    Generation(#[from] GenerationCapabilityError),
}

/// Irrecoverable failure of a bulk sink while flushing a batch.
#[derive(Debug, Error)]
pub enum SinkError {
    /// I/O failure writing the batch.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Document encoding failed.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// Any other transport failure.
    #[error("{0}")]
    Message(String),
}

/// Fatal failure of a streaming ingestion run.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Generic error message.
    #[error("{0}")]
    Message(String),
    /// IO error from file operations.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// CSV parsing error.
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// Document conversion error.
    #[error(transparent)]
    Convert(#[from] ConvertError),
    /// The sink rejected a whole batch.
    #[error("flush failed: {0}")]
    Sink(#[from] SinkError),
}

impl From<MetadataValidationError> for IngestError {
    fn from(value: MetadataValidationError) -> Self {
        IngestError::Convert(value.into())
    }
}

impl From<GenerationCapabilityError> for IngestError {
    fn from(value: GenerationCapabilityError) -> Self {
        IngestError::Convert(value.into())
    }
}

impl From<&str> for IngestError {
    fn from(value: &str) -> Self {
        IngestError::Message(value.to_string())
    }
}

impl From<String> for IngestError {
    fn from(value: String) -> Self {
        IngestError::Message(value)
    }
}
