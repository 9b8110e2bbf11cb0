#![forbid(unsafe_code)]

use std::sync::Arc;

use super::{
    collect_properties, expect_kind, member_partition_key, non_blank, read_id, resolve_label,
    violation, IdGenerator, RandomIdGenerator,
};
use crate::document::{EdgeDocument, EndpointInfo, EndpointSnapshot, PartitionKey};
use crate::error::{ConvertError, ValidationRule};
use crate::shape::{GraphShape, PartitionKeySource, ShapeDescriptor, ShapeKind, ShapeRegistry};

/// Converts edge-shaped objects into [`EdgeDocument`]s.
///
/// Endpoints are copied by value at conversion time, so later changes to the vertex
/// objects they were taken from never reach documents already produced. An edge whose
/// id member is unset gets a fresh id from the converter's [`IdGenerator`] on every call.
#[derive(Clone)]
pub struct EdgeConverter {
    registry: Arc<ShapeRegistry>,
    ids: Arc<dyn IdGenerator>,
}

impl Default for EdgeConverter {
    fn default() -> Self {
        Self::new(Arc::new(ShapeRegistry::new()))
    }
}

impl EdgeConverter {
    /// Creates a converter generating random ids.
    pub fn new(registry: Arc<ShapeRegistry>) -> Self {
        Self::with_id_generator(registry, Arc::new(RandomIdGenerator))
    }

    /// Creates a converter with a custom id generator.
    pub fn with_id_generator(registry: Arc<ShapeRegistry>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { registry, ids }
    }

    /// The registry descriptors are cached in.
    pub fn registry(&self) -> &Arc<ShapeRegistry> {
        &self.registry
    }

    /// Converts one object.
    pub fn to_edge<T: GraphShape>(&self, object: &T) -> Result<EdgeDocument, ConvertError> {
        let descriptor = self.registry.descriptor::<T>()?;
        convert(&descriptor, self.ids.as_ref(), object)
    }
}

pub(crate) fn convert<T>(
    descriptor: &ShapeDescriptor<T>,
    ids: &dyn IdGenerator,
    object: &T,
) -> Result<EdgeDocument, ConvertError> {
    expect_kind(descriptor, ShapeKind::Edge)?;
    let (Some(source), Some(destination)) = (&descriptor.source, &descriptor.destination) else {
        return Err(violation(
            descriptor,
            ValidationRule::WrongShapeKind {
                expected: ShapeKind::Edge.as_str(),
            },
        ));
    };
    let source_snapshot = snapshot(descriptor, source.member, (source.read)(object))?;
    let destination_snapshot =
        snapshot(descriptor, destination.member, (destination.read)(object))?;

    let label = resolve_label(descriptor, object)?;
    let partition_key = match &descriptor.partition_key {
        Some(PartitionKeySource::SourceEndpoint { field_name }) => {
            let value = source_snapshot.partition_key.clone().ok_or_else(|| {
                violation(
                    descriptor,
                    ValidationRule::MalformedEndpoint {
                        member: source.member,
                        reason: "has no partition key to route the edge by",
                    },
                )
            })?;
            Some(PartitionKey {
                field_name: (*field_name).to_string(),
                value,
            })
        }
        _ => member_partition_key(descriptor, object)?,
    };
    let properties = collect_properties(descriptor, object);

    let id = match read_id(descriptor, object) {
        Some(id) => id,
        None => ids.generate()?,
    };

    Ok(EdgeDocument {
        id,
        label,
        partition_key,
        source: source_snapshot,
        destination: destination_snapshot,
        properties,
    })
}

fn snapshot<T>(
    descriptor: &ShapeDescriptor<T>,
    member: &'static str,
    info: Option<EndpointInfo>,
) -> Result<EndpointSnapshot, ConvertError> {
    let malformed =
        |reason| violation(descriptor, ValidationRule::MalformedEndpoint { member, reason });
    let info = info.ok_or_else(|| malformed("is unset"))?;
    let id = non_blank(info.id).ok_or_else(|| malformed("has no id"))?;
    let label = non_blank(info.label).ok_or_else(|| malformed("has no label"))?;
    Ok(EndpointSnapshot {
        id,
        label,
        partition_key: info.partition_key,
    })
}
