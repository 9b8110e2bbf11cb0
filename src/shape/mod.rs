#![forbid(unsafe_code)]

//! Static graph-shape declarations.
//!
//! A domain type describes its role in the graph by implementing [`GraphShape`]: it
//! declares whether it is a vertex or an edge and tags each member (identifier, label,
//! partition key, property, endpoint) with a plain accessor function. The declaration
//! is validated once per type by [`ShapeDescriptor::build`] and cached in a
//! [`ShapeRegistry`].

use std::fmt;

use crate::document::{EndpointInfo, PropertyValue};

mod descriptor;
mod registry;

pub use descriptor::{Capabilities, LabelSource, PartitionKeySource, ShapeDescriptor};
pub use registry::{RegistryMetricsSnapshot, ShapeRegistry};

/// Reads a string-valued member; `None` means unset.
pub type TextAccessor<T> = fn(&T) -> Option<String>;
/// Reads a property member; `None` means absent and the property is skipped.
pub type PropertyAccessor<T> = fn(&T) -> Option<PropertyValue>;
/// Reads an endpoint member of an edge.
pub type EndpointAccessor<T> = fn(&T) -> Option<EndpointInfo>;

/// A type that can be converted into a vertex or edge document.
pub trait GraphShape: Sized + 'static {
    /// Records the type-level and member-level graph tags.
    fn declare(decl: &mut ShapeDeclaration<Self>);
}

/// Whether a shape describes a vertex or an edge.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ShapeKind {
    /// Graph node.
    Vertex,
    /// Graph relationship.
    Edge,
}

impl ShapeKind {
    /// Lowercase name used in messages.
    pub fn as_str(self) -> &'static str {
        match self {
            ShapeKind::Vertex => "vertex",
            ShapeKind::Edge => "edge",
        }
    }
}

/// Which end of an edge an endpoint member describes.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Direction {
    /// The vertex the edge leaves.
    Source,
    /// The vertex the edge enters.
    Destination,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Source => write!(f, "SOURCE"),
            Direction::Destination => write!(f, "DESTINATION"),
        }
    }
}

/// The graph role of one declared member.
pub enum MemberTag<T> {
    /// Document identifier.
    Id(TextAccessor<T>),
    /// Label stored in a field.
    LabelField(TextAccessor<T>),
    /// Label computed by a zero-argument accessor.
    LabelAccessor(fn(&T) -> String),
    /// Partition-key value.
    PartitionKey(TextAccessor<T>),
    /// Property published under `name`.
    Property {
        /// External property name.
        name: &'static str,
        /// Value accessor.
        read: PropertyAccessor<T>,
    },
    /// Edge endpoint.
    Endpoint {
        /// Which end of the edge.
        direction: Direction,
        /// Endpoint accessor.
        read: EndpointAccessor<T>,
    },
}

impl<T> Clone for MemberTag<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for MemberTag<T> {}

/// One tagged member.
pub struct MemberDecl<T> {
    /// Member name on the domain type.
    pub member: &'static str,
    /// Its graph role.
    pub tag: MemberTag<T>,
}

/// Everything a type declared about itself, before validation.
pub struct ShapeDeclaration<T> {
    pub(crate) kind: Option<ShapeKind>,
    pub(crate) label: Option<&'static str>,
    pub(crate) partition_key_field: Option<&'static str>,
    pub(crate) members: Vec<MemberDecl<T>>,
}

impl<T> Default for ShapeDeclaration<T> {
    fn default() -> Self {
        Self {
            kind: None,
            label: None,
            partition_key_field: None,
            members: Vec::new(),
        }
    }
}

impl<T: GraphShape> ShapeDeclaration<T> {
    /// Runs `T::declare` against an empty declaration.
    pub fn collect() -> Self {
        let mut decl = Self::default();
        T::declare(&mut decl);
        decl
    }
}

impl<T> ShapeDeclaration<T> {
    /// Marks the type as a vertex.
    pub fn vertex(&mut self) -> &mut Self {
        self.kind = Some(ShapeKind::Vertex);
        self
    }

    /// Marks the type as an edge.
    pub fn edge(&mut self) -> &mut Self {
        self.kind = Some(ShapeKind::Edge);
        self
    }

    /// Type-level label literal.
    pub fn label(&mut self, label: &'static str) -> &mut Self {
        self.label = Some(label);
        self
    }

    /// Type-level partition-key field name override.
    pub fn partition_key_field(&mut self, name: &'static str) -> &mut Self {
        self.partition_key_field = Some(name);
        self
    }

    /// Tags the identifier member.
    pub fn id(&mut self, member: &'static str, read: TextAccessor<T>) -> &mut Self {
        self.push(member, MemberTag::Id(read))
    }

    /// Tags a member holding the label.
    pub fn label_field(&mut self, member: &'static str, read: TextAccessor<T>) -> &mut Self {
        self.push(member, MemberTag::LabelField(read))
    }

    /// Tags an accessor computing the label.
    pub fn label_accessor(&mut self, member: &'static str, read: fn(&T) -> String) -> &mut Self {
        self.push(member, MemberTag::LabelAccessor(read))
    }

    /// Tags the partition-key member.
    pub fn partition_key(&mut self, member: &'static str, read: TextAccessor<T>) -> &mut Self {
        self.push(member, MemberTag::PartitionKey(read))
    }

    /// Tags a property published under its member name.
    pub fn property(&mut self, member: &'static str, read: PropertyAccessor<T>) -> &mut Self {
        self.property_as(member, member, read)
    }

    /// Tags a property published under an explicit external name.
    pub fn property_as(
        &mut self,
        member: &'static str,
        name: &'static str,
        read: PropertyAccessor<T>,
    ) -> &mut Self {
        self.push(member, MemberTag::Property { name, read })
    }

    /// Tags an edge endpoint.
    pub fn endpoint(
        &mut self,
        member: &'static str,
        direction: Direction,
        read: EndpointAccessor<T>,
    ) -> &mut Self {
        self.push(member, MemberTag::Endpoint { direction, read })
    }

    fn push(&mut self, member: &'static str, tag: MemberTag<T>) -> &mut Self {
        self.members.push(MemberDecl { member, tag });
        self
    }
}
