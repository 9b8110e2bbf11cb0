#![forbid(unsafe_code)]

use std::sync::Arc;

use super::{
    collect_properties, expect_kind, member_partition_key, read_id, resolve_label, violation,
};
use crate::document::VertexDocument;
use crate::error::{ConvertError, ValidationRule};
use crate::shape::{GraphShape, ShapeDescriptor, ShapeKind, ShapeRegistry};

/// Converts vertex-shaped objects into [`VertexDocument`]s.
#[derive(Clone, Default)]
pub struct VertexConverter {
    registry: Arc<ShapeRegistry>,
}

impl VertexConverter {
    /// Creates a converter resolving descriptors through `registry`.
    pub fn new(registry: Arc<ShapeRegistry>) -> Self {
        Self { registry }
    }

    /// The registry descriptors are cached in.
    pub fn registry(&self) -> &Arc<ShapeRegistry> {
        &self.registry
    }

    /// Converts one object.
    ///
    /// Fails when `T`'s declaration is invalid, when `T` is not a vertex shape, or when
    /// the object's id, label or partition-key member holds no usable value.
    pub fn to_vertex<T: GraphShape>(&self, object: &T) -> Result<VertexDocument, ConvertError> {
        let descriptor = self.registry.descriptor::<T>()?;
        convert(&descriptor, object)
    }
}

pub(crate) fn convert<T>(
    descriptor: &ShapeDescriptor<T>,
    object: &T,
) -> Result<VertexDocument, ConvertError> {
    expect_kind(descriptor, ShapeKind::Vertex)?;
    let id = read_id(descriptor, object).ok_or_else(|| {
        violation(
            descriptor,
            ValidationRule::MissingIdentifier(descriptor.id_member),
        )
    })?;
    let label = resolve_label(descriptor, object)?;
    let partition_key = member_partition_key(descriptor, object)?;
    Ok(VertexDocument {
        id,
        label,
        partition_key,
        properties: collect_properties(descriptor, object),
    })
}
