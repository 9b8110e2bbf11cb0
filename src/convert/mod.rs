#![forbid(unsafe_code)]

//! Object-to-document conversion driven by validated shape descriptors.
//!
//! Both converters resolve the descriptor through a shared
//! [`ShapeRegistry`](crate::shape::ShapeRegistry), so a type's declaration is validated
//! once no matter how many objects are converted.
//! A conversion either yields a complete document or a [`ConvertError`]; nothing
//! partial is ever returned.

use std::collections::BTreeMap;

use crate::document::{PartitionKey, PropertyValue};
use crate::error::{ConvertError, MetadataValidationError, ValidationRule};
use crate::shape::{LabelSource, PartitionKeySource, ShapeDescriptor, ShapeKind};

mod edge;
mod ids;
mod vertex;

pub use edge::EdgeConverter;
pub use ids::{IdGenerator, RandomIdGenerator};
pub use vertex::VertexConverter;

fn violation<T>(descriptor: &ShapeDescriptor<T>, rule: ValidationRule) -> ConvertError {
    MetadataValidationError::new(descriptor.type_name, rule).into()
}

fn expect_kind<T>(descriptor: &ShapeDescriptor<T>, kind: ShapeKind) -> Result<(), ConvertError> {
    if descriptor.kind == kind {
        Ok(())
    } else {
        Err(violation(
            descriptor,
            ValidationRule::WrongShapeKind {
                expected: kind.as_str(),
            },
        ))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn read_id<T>(descriptor: &ShapeDescriptor<T>, object: &T) -> Option<String> {
    non_blank((descriptor.read_id)(object))
}

fn resolve_label<T>(descriptor: &ShapeDescriptor<T>, object: &T) -> Result<String, ConvertError> {
    let label = match &descriptor.label {
        LabelSource::Literal(literal) => Some((*literal).to_string()),
        LabelSource::Field { read, .. } => read(object),
        LabelSource::Accessor { read, .. } => Some(read(object)),
    };
    non_blank(label).ok_or_else(|| violation(descriptor, ValidationRule::MissingLabel))
}

/// Reads a member-backed partition key. Source-endpoint keys are the edge converter's job.
fn member_partition_key<T>(
    descriptor: &ShapeDescriptor<T>,
    object: &T,
) -> Result<Option<PartitionKey>, ConvertError> {
    match &descriptor.partition_key {
        Some(PartitionKeySource::Member {
            field_name,
            member,
            read,
        }) => {
            let value = read(object).ok_or_else(|| {
                violation(descriptor, ValidationRule::MissingPartitionKey(*member))
            })?;
            Ok(Some(PartitionKey {
                field_name: (*field_name).to_string(),
                value,
            }))
        }
        Some(PartitionKeySource::SourceEndpoint { .. }) | None => Ok(None),
    }
}

fn collect_properties<T>(
    descriptor: &ShapeDescriptor<T>,
    object: &T,
) -> BTreeMap<String, PropertyValue> {
    descriptor
        .properties
        .iter()
        .filter_map(|binding| {
            (binding.read)(object).map(|value| (binding.name.to_string(), value))
        })
        .collect()
}
