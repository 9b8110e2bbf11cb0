#![forbid(unsafe_code)]

//! Synthetic country-sector graphs for smoke-testing a sink.

use rand::rngs::{OsRng, StdRng};
use rand::{Rng, SeedableRng};

use crate::error::GenerationCapabilityError;
use crate::model::{CountrySectorVertex, SupplyEdge, ENTITY_SEPARATOR};

/// Country codes sampled for vertex ids.
pub const COUNTRIES: [&str; 14] = [
    "AFG", "USA", "ALB", "BHS", "BRA", "CHN", "CZE", "EGY", "GUM", "GIN", "HND", "HUN", "MDG",
    "MLI",
];

/// Sector names sampled for vertex ids.
pub const SECTORS: [&str; 24] = [
    "MANUFACTURING",
    "AGRICULTURE",
    "MINING",
    "CONSTRUCTION",
    "TRANSPORTATION",
    "FINANCE",
    "HEALTHCARE",
    "EDUCATION",
    "RETAIL",
    "TECHNOLOGY",
    "ENERGY",
    "TOURISM",
    "REAL_ESTATE",
    "ENTERTAINMENT",
    "FOOD_SERVICES",
    "TELECOMMUNICATIONS",
    "AUTOMOTIVE",
    "AEROSPACE",
    "CHEMICALS",
    "TEXTILES",
    "PHARMACEUTICALS",
    "UTILITIES",
    "GOVERNMENT",
    "DEFENSE",
];

/// Label of generated supply edges.
pub const SAMPLE_SUPPLY_LABEL: &str = "supplies";

const MAX_SUPPLY_VALUE: f64 = 1_000_000.0;

/// Random country-sector vertices and supply edges.
pub struct SampleGenerator {
    rng: StdRng,
}

impl SampleGenerator {
    /// Seeds a generator from the operating system's secure randomness source.
    pub fn new() -> Result<Self, GenerationCapabilityError> {
        let rng =
            StdRng::from_rng(OsRng).map_err(|err| GenerationCapabilityError(err.to_string()))?;
        Ok(Self { rng })
    }

    /// Deterministic generator for reproducible runs.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// `count` vertices with random country and sector; ids may repeat.
    pub fn vertices(&mut self, count: usize) -> Vec<CountrySectorVertex> {
        (0..count).map(|_| self.vertex()).collect()
    }

    /// Between 1 and `factor` edges leaving each vertex, each towards a random vertex
    /// with a different id. Vertices with no such partner get no edges.
    pub fn edges(&mut self, vertices: &[CountrySectorVertex], factor: usize) -> Vec<SupplyEdge> {
        let mut edges = Vec::new();
        if factor == 0 {
            return edges;
        }
        for source in vertices {
            let partners: Vec<&CountrySectorVertex> =
                vertices.iter().filter(|v| v.id != source.id).collect();
            if partners.is_empty() {
                continue;
            }
            let volume = self.rng.gen_range(1..=factor);
            for _ in 0..volume {
                let destination = partners[self.rng.gen_range(0..partners.len())];
                let value = self.rng.gen_range(0.0..MAX_SUPPLY_VALUE);
                edges.push(SupplyEdge::between(
                    source,
                    destination,
                    SAMPLE_SUPPLY_LABEL,
                    value,
                ));
            }
        }
        edges
    }

    fn vertex(&mut self) -> CountrySectorVertex {
        let country = COUNTRIES[self.rng.gen_range(0..COUNTRIES.len())];
        let sector = SECTORS[self.rng.gen_range(0..SECTORS.len())];
        let id = format!("{country}{ENTITY_SEPARATOR}{sector}");
        CountrySectorVertex {
            pk: id.clone(),
            country: country.to_string(),
            sector: sector.to_string(),
            id_str: id.clone(),
            id,
        }
    }
}
