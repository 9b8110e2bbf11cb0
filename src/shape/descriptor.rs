#![forbid(unsafe_code)]

use std::any;
use std::collections::HashSet;
use std::ops::BitOr;

use tracing::trace;

use super::{
    Direction, EndpointAccessor, GraphShape, MemberTag, PropertyAccessor, ShapeDeclaration,
    ShapeKind, TextAccessor,
};
use crate::error::{MetadataValidationError, ValidationRule};

/// Set of graph capabilities a validated shape provides.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Capabilities(u8);

impl Capabilities {
    /// Has an identifier member.
    pub const IDENTIFIED: Self = Self(1);
    /// Has a resolvable label.
    pub const LABELED: Self = Self(1 << 1);
    /// Has a partition-key source.
    pub const PARTITION_KEYED: Self = Self(1 << 2);
    /// Publishes at least one property.
    pub const PROPERTY_BEARING: Self = Self(1 << 3);

    /// No capabilities.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// True when every capability in `other` is present.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Adds the capabilities in `other`.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl BitOr for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Where a shape's label comes from, after precedence was applied.
pub enum LabelSource<T> {
    /// Type-level literal.
    Literal(&'static str),
    /// Member holding the label.
    Field {
        /// Member name.
        member: &'static str,
        /// Accessor.
        read: TextAccessor<T>,
    },
    /// Accessor computing the label.
    Accessor {
        /// Member name.
        member: &'static str,
        /// Accessor.
        read: fn(&T) -> String,
    },
}

impl<T> LabelSource<T> {
    /// Member name backing the label, if it is not a literal.
    pub fn member(&self) -> Option<&'static str> {
        match self {
            LabelSource::Literal(_) => None,
            LabelSource::Field { member, .. } | LabelSource::Accessor { member, .. } => {
                Some(*member)
            }
        }
    }
}

/// Where a shape's partition key comes from.
pub enum PartitionKeySource<T> {
    /// A tagged member supplies the value.
    Member {
        /// Document field holding the key.
        field_name: &'static str,
        /// Member name.
        member: &'static str,
        /// Accessor.
        read: TextAccessor<T>,
    },
    /// Edges only: the value is the source endpoint's partition key.
    SourceEndpoint {
        /// Document field holding the key.
        field_name: &'static str,
    },
}

impl<T> PartitionKeySource<T> {
    /// Document field holding the key.
    pub fn field_name(&self) -> &'static str {
        match self {
            PartitionKeySource::Member { field_name, .. }
            | PartitionKeySource::SourceEndpoint { field_name } => *field_name,
        }
    }
}

pub(crate) struct PropertyBinding<T> {
    pub(crate) member: &'static str,
    pub(crate) name: &'static str,
    pub(crate) read: PropertyAccessor<T>,
}

pub(crate) struct EndpointBinding<T> {
    pub(crate) member: &'static str,
    pub(crate) read: EndpointAccessor<T>,
}

/// Validated, immutable description of how a type maps onto a graph document.
pub struct ShapeDescriptor<T> {
    pub(crate) type_name: &'static str,
    pub(crate) kind: ShapeKind,
    pub(crate) id_member: &'static str,
    pub(crate) read_id: TextAccessor<T>,
    pub(crate) label: LabelSource<T>,
    pub(crate) partition_key: Option<PartitionKeySource<T>>,
    pub(crate) properties: Vec<PropertyBinding<T>>,
    pub(crate) source: Option<EndpointBinding<T>>,
    pub(crate) destination: Option<EndpointBinding<T>>,
    pub(crate) capabilities: Capabilities,
}

impl<T: GraphShape> ShapeDescriptor<T> {
    /// Collects `T`'s declaration and validates it.
    pub fn build() -> Result<Self, MetadataValidationError> {
        Self::from_declaration(ShapeDeclaration::<T>::collect())
    }
}

impl<T> ShapeDescriptor<T> {
    /// Validates an already collected declaration.
    pub fn from_declaration(decl: ShapeDeclaration<T>) -> Result<Self, MetadataValidationError> {
        let type_name = any::type_name::<T>();
        let fail = |rule| MetadataValidationError::new(type_name, rule);

        let kind = decl
            .kind
            .ok_or_else(|| fail(ValidationRule::MissingShapeKind))?;

        let mut ids = Vec::new();
        let mut label_fields = Vec::new();
        let mut label_accessors = Vec::new();
        let mut pk_members = Vec::new();
        let mut properties = Vec::new();
        let mut sources = Vec::new();
        let mut destinations = Vec::new();

        for decl_member in &decl.members {
            let member = decl_member.member;
            match decl_member.tag {
                MemberTag::Id(read) => ids.push((member, read)),
                MemberTag::LabelField(read) => label_fields.push((member, read)),
                MemberTag::LabelAccessor(read) => label_accessors.push((member, read)),
                MemberTag::PartitionKey(read) => pk_members.push((member, read)),
                MemberTag::Property { name, read } => {
                    properties.push(PropertyBinding { member, name, read })
                }
                MemberTag::Endpoint { direction, read } => {
                    let binding = EndpointBinding { member, read };
                    match direction {
                        Direction::Source => sources.push(binding),
                        Direction::Destination => destinations.push(binding),
                    }
                }
            }
        }

        let (id_member, read_id) = match ids.as_slice() {
            [single] => *single,
            other => return Err(fail(ValidationRule::IdentifierCount(other.len()))),
        };

        let (source, destination) = match kind {
            ShapeKind::Vertex => {
                if let Some(endpoint) = sources.iter().chain(destinations.iter()).next() {
                    return Err(fail(ValidationRule::EndpointOnVertex(endpoint.member)));
                }
                (None, None)
            }
            ShapeKind::Edge => {
                let source = single_endpoint(sources, Direction::Source).map_err(fail)?;
                let destination =
                    single_endpoint(destinations, Direction::Destination).map_err(fail)?;
                (Some(source), Some(destination))
            }
        };

        let label = if label_accessors.len() > 1 {
            return Err(fail(ValidationRule::DuplicateLabelSource {
                kind: "accessor",
                count: label_accessors.len(),
            }));
        } else if label_fields.len() > 1 {
            return Err(fail(ValidationRule::DuplicateLabelSource {
                kind: "field",
                count: label_fields.len(),
            }));
        } else if let Some(&(member, read)) = label_accessors.first() {
            LabelSource::Accessor { member, read }
        } else if let Some(&(member, read)) = label_fields.first() {
            LabelSource::Field { member, read }
        } else if let Some(literal) = decl.label {
            LabelSource::Literal(literal)
        } else {
            return Err(fail(ValidationRule::MissingLabelSource));
        };

        let partition_key = match (pk_members.as_slice(), decl.partition_key_field) {
            ([], None) => None,
            ([], Some(field_name)) => match kind {
                ShapeKind::Vertex => {
                    return Err(fail(ValidationRule::VertexPartitionKeyWithoutMember(
                        field_name,
                    )))
                }
                ShapeKind::Edge => Some(PartitionKeySource::SourceEndpoint { field_name }),
            },
            (&[(member, read)], field_name) => Some(PartitionKeySource::Member {
                field_name: field_name.unwrap_or(member),
                member,
                read,
            }),
            (many, Some(field_name)) => match many.iter().find(|(member, _)| *member == field_name)
            {
                Some(&(member, read)) => Some(PartitionKeySource::Member {
                    field_name,
                    member,
                    read,
                }),
                None => {
                    return Err(fail(ValidationRule::UnknownPartitionKeyOverride(
                        field_name,
                    )))
                }
            },
            (many, None) => {
                let names = many.iter().map(|(member, _)| *member).collect();
                return Err(fail(ValidationRule::AmbiguousPartitionKey(names)));
            }
        };

        let mut reserved: HashSet<&str> = HashSet::from(["id", "label", id_member]);
        if let Some(member) = label.member() {
            reserved.insert(member);
        }
        if let Some(pk) = &partition_key {
            reserved.insert(pk.field_name());
            if let PartitionKeySource::Member { member, .. } = pk {
                reserved.insert(*member);
            }
        }
        let mut names = HashSet::new();
        for property in &properties {
            if reserved.contains(property.name) {
                return Err(fail(ValidationRule::ReservedPropertyName(
                    property.name.to_string(),
                )));
            }
            if !names.insert(property.name) {
                return Err(fail(ValidationRule::DuplicatePropertyName(
                    property.name.to_string(),
                )));
            }
        }

        let mut capabilities = Capabilities::IDENTIFIED | Capabilities::LABELED;
        if partition_key.is_some() {
            capabilities.insert(Capabilities::PARTITION_KEYED);
        }
        if !properties.is_empty() {
            capabilities.insert(Capabilities::PROPERTY_BEARING);
        }

        trace!(
            type_name,
            kind = kind.as_str(),
            properties = properties.len(),
            "shape.descriptor.built"
        );

        Ok(Self {
            type_name,
            kind,
            id_member,
            read_id,
            label,
            partition_key,
            properties,
            source,
            destination,
            capabilities,
        })
    }

    /// Name of the described type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Vertex or edge.
    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    /// Capabilities the shape provides.
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Identifier member name.
    pub fn id_member(&self) -> &'static str {
        self.id_member
    }

    /// The label source chosen by precedence.
    pub fn label_source(&self) -> &LabelSource<T> {
        &self.label
    }

    /// The partition-key source, if any.
    pub fn partition_key_source(&self) -> Option<&PartitionKeySource<T>> {
        self.partition_key.as_ref()
    }

    /// `(member, external name)` pairs in declaration order.
    pub fn property_names(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.properties.iter().map(|p| (p.member, p.name))
    }
}

fn single_endpoint<T>(
    mut found: Vec<EndpointBinding<T>>,
    direction: Direction,
) -> Result<EndpointBinding<T>, ValidationRule> {
    if found.len() != 1 {
        return Err(ValidationRule::EndpointCount {
            direction,
            found: found.len(),
        });
    }
    found.pop().ok_or(ValidationRule::EndpointCount {
        direction,
        found: 0,
    })
}
