#![forbid(unsafe_code)]

//! Vertex and edge documents produced by the converters.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Map, Value};

/// Scalar property value carried by a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Boolean value.
    Bool(bool),
    /// Signed integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// UTF-8 string value.
    String(String),
}

impl PropertyValue {
    /// Returns the float payload, widening integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(v) => Some(*v),
            PropertyValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Returns the string payload.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(v) => Some(v),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

/// Field name and value the store uses to route and co-locate a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionKey {
    /// Document field holding the key.
    pub field_name: String,
    /// Key value.
    pub value: String,
}

/// Endpoint data as held by an edge object before conversion.
///
/// Every field is optional so domain objects can be built incrementally; the edge
/// converter rejects endpoints without an id or label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointInfo {
    /// Vertex id.
    pub id: Option<String>,
    /// Vertex label.
    pub label: Option<String>,
    /// Vertex partition-key value.
    pub partition_key: Option<String>,
}

impl EndpointInfo {
    /// Creates endpoint info with all three values set.
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        partition_key: Option<String>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            label: Some(label.into()),
            partition_key,
        }
    }
}

impl From<&VertexDocument> for EndpointInfo {
    fn from(vertex: &VertexDocument) -> Self {
        Self {
            id: Some(vertex.id.clone()),
            label: Some(vertex.label.clone()),
            partition_key: vertex.partition_key.as_ref().map(|pk| pk.value.clone()),
        }
    }
}

/// Immutable copy of a vertex's identity embedded in an edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointSnapshot {
    /// Vertex id.
    pub id: String,
    /// Vertex label.
    pub label: String,
    /// Vertex partition-key value, if the vertex is partitioned.
    pub partition_key: Option<String>,
}

/// A converted vertex.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VertexDocument {
    /// Document id, unique within its container.
    pub id: String,
    /// Vertex label.
    pub label: String,
    /// Optional routing key.
    pub partition_key: Option<PartitionKey>,
    /// Properties keyed by external name.
    pub properties: BTreeMap<String, PropertyValue>,
}

impl VertexDocument {
    /// Takes an endpoint snapshot of this vertex.
    pub fn snapshot(&self) -> EndpointSnapshot {
        EndpointSnapshot {
            id: self.id.clone(),
            label: self.label.clone(),
            partition_key: self.partition_key.as_ref().map(|pk| pk.value.clone()),
        }
    }

    /// Encodes the vertex in the store's graph-document layout.
    ///
    /// Properties become single-element arrays of `{"id", "_value"}` entries; the
    /// property entry id is derived from the vertex id and the property name.
    pub fn to_json(&self) -> Value {
        let mut doc = Map::new();
        doc.insert("id".into(), Value::String(self.id.clone()));
        doc.insert("label".into(), Value::String(self.label.clone()));
        if let Some(pk) = &self.partition_key {
            doc.insert(pk.field_name.clone(), Value::String(pk.value.clone()));
        }
        for (name, value) in &self.properties {
            doc.insert(
                name.clone(),
                json!([{ "id": format!("{}|{}", self.id, name), "_value": value }]),
            );
        }
        Value::Object(doc)
    }
}

/// A converted edge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeDocument {
    /// Document id; generated when the source object left it unset.
    pub id: String,
    /// Edge label.
    pub label: String,
    /// Optional routing key.
    pub partition_key: Option<PartitionKey>,
    /// Snapshot of the source vertex.
    pub source: EndpointSnapshot,
    /// Snapshot of the destination vertex.
    pub destination: EndpointSnapshot,
    /// Properties keyed by external name.
    pub properties: BTreeMap<String, PropertyValue>,
}

impl EdgeDocument {
    /// Encodes the edge in the store's graph-document layout.
    pub fn to_json(&self) -> Value {
        let mut doc = Map::new();
        doc.insert("id".into(), Value::String(self.id.clone()));
        doc.insert("label".into(), Value::String(self.label.clone()));
        doc.insert("_isEdge".into(), Value::Bool(true));
        doc.insert("_vertexId".into(), Value::String(self.source.id.clone()));
        doc.insert(
            "_vertexLabel".into(),
            Value::String(self.source.label.clone()),
        );
        doc.insert("_sink".into(), Value::String(self.destination.id.clone()));
        doc.insert(
            "_sinkLabel".into(),
            Value::String(self.destination.label.clone()),
        );
        if let Some(partition) = &self.destination.partition_key {
            doc.insert("_sinkPartition".into(), Value::String(partition.clone()));
        }
        if let Some(pk) = &self.partition_key {
            doc.insert(pk.field_name.clone(), Value::String(pk.value.clone()));
        }
        for (name, value) in &self.properties {
            doc.insert(name.clone(), json!(value));
        }
        Value::Object(doc)
    }
}

/// Either kind of converted document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GraphDocument {
    /// A vertex document.
    Vertex(VertexDocument),
    /// An edge document.
    Edge(EdgeDocument),
}

impl GraphDocument {
    /// Document id.
    pub fn id(&self) -> &str {
        match self {
            GraphDocument::Vertex(v) => &v.id,
            GraphDocument::Edge(e) => &e.id,
        }
    }

    /// Routing key, if any.
    pub fn partition_key(&self) -> Option<&PartitionKey> {
        match self {
            GraphDocument::Vertex(v) => v.partition_key.as_ref(),
            GraphDocument::Edge(e) => e.partition_key.as_ref(),
        }
    }

    /// Returns true for edge documents.
    pub fn is_edge(&self) -> bool {
        matches!(self, GraphDocument::Edge(_))
    }

    /// Encodes the document in the store's graph-document layout.
    pub fn to_json(&self) -> Value {
        match self {
            GraphDocument::Vertex(v) => v.to_json(),
            GraphDocument::Edge(e) => e.to_json(),
        }
    }
}
