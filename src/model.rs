#![forbid(unsafe_code)]

//! Input-output table graph model: country-sector vertices joined by supply edges.

use crate::document::{EndpointInfo, PropertyValue};
use crate::shape::{Direction, GraphShape, ShapeDeclaration};

/// Label of every country-sector vertex.
pub const COUNTRY_SECTOR_LABEL: &str = "Country_sector";
/// Unit label of supply edges built from input-output tables.
pub const SUPPLY_LABEL: &str = "million_USD";
/// Separator between the country and sector parts of an entity id.
pub const ENTITY_SEPARATOR: char = '_';

/// True when `candidate` has the `GROUP_CATEGORY` form.
pub fn is_entity_id(candidate: &str) -> bool {
    candidate.contains(ENTITY_SEPARATOR)
}

/// One industry sector within one country, e.g. `USA_MANUFACTURING`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountrySectorVertex {
    /// Entity id.
    pub id: String,
    /// Partition key, equal to the id.
    pub pk: String,
    /// Country code (text before the first separator).
    pub country: String,
    /// Sector name (text after the first separator).
    pub sector: String,
    /// Copy of the id published as a plain property.
    pub id_str: String,
}

impl CountrySectorVertex {
    /// Parses a `COUNTRY_SECTOR` id, splitting on the first separator only.
    ///
    /// Returns `None` when the id has no separator.
    pub fn from_country_sector_id(id: &str) -> Option<Self> {
        let (country, sector) = id.split_once(ENTITY_SEPARATOR)?;
        Some(Self {
            id: id.to_string(),
            pk: id.to_string(),
            country: country.to_string(),
            sector: sector.to_string(),
            id_str: id.to_string(),
        })
    }

    /// Endpoint info referencing this vertex.
    pub fn endpoint(&self) -> EndpointInfo {
        EndpointInfo::new(
            self.id.clone(),
            COUNTRY_SECTOR_LABEL,
            Some(self.pk.clone()),
        )
    }
}

impl GraphShape for CountrySectorVertex {
    fn declare(decl: &mut ShapeDeclaration<Self>) {
        decl.vertex()
            .label(COUNTRY_SECTOR_LABEL)
            .id("id", |v| Some(v.id.clone()))
            .partition_key("pk", |v| Some(v.pk.clone()))
            .property("country", |v| Some(PropertyValue::from(v.country.as_str())))
            .property("sector", |v| Some(PropertyValue::from(v.sector.as_str())))
            .property("id_str", |v| Some(PropertyValue::from(v.id_str.as_str())));
    }
}

/// Monetary flow from a supplier sector to a consumer sector.
///
/// Edges are stored in the partition of their source vertex under the `pk` field.
#[derive(Debug, Clone, PartialEq)]
pub struct SupplyEdge {
    /// Edge id; a fresh one is generated at conversion when unset.
    pub id: Option<String>,
    /// Supplier vertex.
    pub source: EndpointInfo,
    /// Consumer vertex.
    pub destination: EndpointInfo,
    /// Edge label.
    pub label: String,
    /// Flow value.
    pub value: f64,
}

impl SupplyEdge {
    /// Edge between two vertices with a generated id.
    pub fn between(
        source: &CountrySectorVertex,
        destination: &CountrySectorVertex,
        label: impl Into<String>,
        value: f64,
    ) -> Self {
        Self {
            id: None,
            source: source.endpoint(),
            destination: destination.endpoint(),
            label: label.into(),
            value,
        }
    }
}

impl GraphShape for SupplyEdge {
    fn declare(decl: &mut ShapeDeclaration<Self>) {
        decl.edge()
            .partition_key_field("pk")
            .id("id", |e| e.id.clone())
            .endpoint("destination", Direction::Destination, |e| {
                Some(e.destination.clone())
            })
            .endpoint("source", Direction::Source, |e| Some(e.source.clone()))
            .label_field("label", |e| Some(e.label.clone()))
            .property("value", |e| Some(PropertyValue::from(e.value)));
    }
}
