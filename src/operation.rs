#![forbid(unsafe_code)]

//! Lazy write-operation sequences.
//!
//! [`OperationFactory`] turns any iterator of graph-shaped objects into an iterator of
//! [`WriteOperation`]s, converting exactly one object per pull. A conversion failure is
//! yielded at the position of the offending object and ends the sequence: every later
//! pull returns `None` without touching the remaining input.

use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;

use crate::convert::{EdgeConverter, IdGenerator, VertexConverter};
use crate::document::GraphDocument;
use crate::error::ConvertError;
use crate::shape::{GraphShape, ShapeKind, ShapeRegistry};

/// How the store should treat a document whose key already exists.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WriteMode {
    /// Insert only; an existing document is a per-operation failure.
    Create,
    /// Insert or replace.
    #[default]
    Upsert,
}

impl WriteMode {
    /// Uppercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            WriteMode::Create => "CREATE",
            WriteMode::Upsert => "UPSERT",
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WriteMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(WriteMode::Create),
            "upsert" => Ok(WriteMode::Upsert),
            other => Err(format!("unknown write mode '{other}' (expected create or upsert)")),
        }
    }
}

/// A converted document plus what the transport needs to write it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteOperation {
    /// Create or upsert.
    pub mode: WriteMode,
    /// Routing value, copied from the document's partition key.
    pub partition_key: Option<String>,
    /// The document itself.
    pub document: GraphDocument,
}

impl WriteOperation {
    /// Wraps a document, lifting its partition-key value for routing.
    pub fn new(mode: WriteMode, document: GraphDocument) -> Self {
        let partition_key = document.partition_key().map(|pk| pk.value.clone());
        Self {
            mode,
            partition_key,
            document,
        }
    }
}

/// Builds documents and write operations for any [`GraphShape`].
#[derive(Clone, Default)]
pub struct OperationFactory {
    vertices: VertexConverter,
    edges: EdgeConverter,
}

impl OperationFactory {
    /// Creates a factory whose converters share `registry`.
    pub fn new(registry: Arc<ShapeRegistry>) -> Self {
        Self {
            vertices: VertexConverter::new(Arc::clone(&registry)),
            edges: EdgeConverter::new(registry),
        }
    }

    /// Creates a factory generating edge ids with `ids`.
    pub fn with_id_generator(registry: Arc<ShapeRegistry>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            vertices: VertexConverter::new(Arc::clone(&registry)),
            edges: EdgeConverter::with_id_generator(registry, ids),
        }
    }

    /// The shared descriptor registry.
    pub fn registry(&self) -> &Arc<ShapeRegistry> {
        self.vertices.registry()
    }

    /// Vertex converter sharing this factory's registry.
    pub fn vertex_converter(&self) -> &VertexConverter {
        &self.vertices
    }

    /// Edge converter sharing this factory's registry.
    pub fn edge_converter(&self) -> &EdgeConverter {
        &self.edges
    }

    /// Converts one object with the converter its declared kind calls for.
    pub fn document<T: GraphShape>(&self, object: &T) -> Result<GraphDocument, ConvertError> {
        let descriptor = self.registry().descriptor::<T>()?;
        match descriptor.kind() {
            ShapeKind::Vertex => self.vertices.to_vertex(object).map(GraphDocument::Vertex),
            ShapeKind::Edge => self.edges.to_edge(object).map(GraphDocument::Edge),
        }
    }

    /// Converts one object into a single write operation.
    pub fn operation<T: GraphShape>(
        &self,
        mode: WriteMode,
        object: &T,
    ) -> Result<WriteOperation, ConvertError> {
        self.document(object)
            .map(|document| WriteOperation::new(mode, document))
    }

    /// Lazily maps `objects` to CREATE operations.
    pub fn create_operations<I, T>(&self, objects: I) -> Operations<'_, I::IntoIter, T>
    where
        I: IntoIterator<Item = T>,
        T: GraphShape,
    {
        self.operations(WriteMode::Create, objects)
    }

    /// Lazily maps `objects` to UPSERT operations.
    pub fn upsert_operations<I, T>(&self, objects: I) -> Operations<'_, I::IntoIter, T>
    where
        I: IntoIterator<Item = T>,
        T: GraphShape,
    {
        self.operations(WriteMode::Upsert, objects)
    }

    /// Lazily maps `objects` to operations of the given mode.
    pub fn operations<I, T>(&self, mode: WriteMode, objects: I) -> Operations<'_, I::IntoIter, T>
    where
        I: IntoIterator<Item = T>,
        T: GraphShape,
    {
        Operations {
            factory: self,
            objects: objects.into_iter(),
            mode,
            halted: false,
            _shape: PhantomData,
        }
    }
}

/// Single-pass iterator of write operations; see the module docs for the failure policy.
pub struct Operations<'a, I, T> {
    factory: &'a OperationFactory,
    objects: I,
    mode: WriteMode,
    halted: bool,
    _shape: PhantomData<fn() -> T>,
}

impl<'a, I, T> Operations<'a, I, T> {
    /// Write mode applied to every operation.
    pub fn mode(&self) -> WriteMode {
        self.mode
    }
}

impl<'a, I, T> Iterator for Operations<'a, I, T>
where
    I: Iterator<Item = T>,
    T: GraphShape,
{
    type Item = Result<WriteOperation, ConvertError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.halted {
            return None;
        }
        let object = self.objects.next()?;
        let result = self.factory.operation(self.mode, &object);
        if result.is_err() {
            self.halted = true;
        }
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.halted {
            (0, Some(0))
        } else {
            (0, self.objects.size_hint().1)
        }
    }
}

impl<'a, I, T> FusedIterator for Operations<'a, I, T>
where
    I: Iterator<Item = T>,
    T: GraphShape,
{
}
