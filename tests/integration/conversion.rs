#![allow(missing_docs)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use graphbulk::model::{COUNTRY_SECTOR_LABEL, SUPPLY_LABEL};
use graphbulk::{
    ConvertError, CountrySectorVertex, EdgeConverter, GenerationCapabilityError, IdGenerator,
    PropertyValue, ShapeRegistry, SupplyEdge, ValidationRule, VertexConverter,
};
use serde_json::json;

fn vertex(id: &str) -> CountrySectorVertex {
    CountrySectorVertex::from_country_sector_id(id).expect("entity id")
}

#[test]
fn country_sector_vertex_converts_with_pk_and_properties() {
    let doc = VertexConverter::default()
        .to_vertex(&vertex("A_B"))
        .expect("convert");

    assert_eq!(doc.id, "A_B");
    assert_eq!(doc.label, COUNTRY_SECTOR_LABEL);
    let pk = doc.partition_key.as_ref().expect("partitioned");
    assert_eq!(pk.field_name, "pk");
    assert_eq!(pk.value, "A_B");
    assert_eq!(doc.properties.len(), 3);
    assert_eq!(doc.properties["country"], PropertyValue::from("A"));
    assert_eq!(doc.properties["sector"], PropertyValue::from("B"));
    assert_eq!(doc.properties["id_str"], PropertyValue::from("A_B"));

    let encoded = doc.to_json();
    assert_eq!(encoded["id"], json!("A_B"));
    assert_eq!(encoded["pk"], json!("A_B"));
    assert_eq!(encoded["country"][0]["_value"], json!("A"));
}

#[test]
fn edge_snapshots_do_not_follow_later_vertex_changes() {
    let mut usa = vertex("USA_MANUFACTURING");
    let chn = vertex("CHN_SERVICES");
    let edge = SupplyEdge::between(&usa, &chn, SUPPLY_LABEL, 5_000_000.0);

    let doc = EdgeConverter::default().to_edge(&edge).expect("convert");
    usa.id = "USA_CHANGED".into();
    usa.pk = "USA_CHANGED".into();

    assert_eq!(doc.source.id, "USA_MANUFACTURING");
    assert_eq!(doc.source.label, COUNTRY_SECTOR_LABEL);
    assert_eq!(doc.source.partition_key.as_deref(), Some("USA_MANUFACTURING"));
    assert_eq!(doc.destination.id, "CHN_SERVICES");
    assert_eq!(doc.label, SUPPLY_LABEL);
    assert_eq!(doc.properties["value"], PropertyValue::from(5_000_000.0));

    // Edges live in their source vertex's partition.
    let pk = doc.partition_key.expect("partitioned");
    assert_eq!(pk.field_name, "pk");
    assert_eq!(pk.value, "USA_MANUFACTURING");

    let encoded = EdgeConverter::default()
        .to_edge(&edge)
        .expect("convert")
        .to_json();
    assert_eq!(encoded["_isEdge"], json!(true));
    assert_eq!(encoded["_vertexId"], json!("USA_MANUFACTURING"));
    assert_eq!(encoded["_sink"], json!("CHN_SERVICES"));
    assert_eq!(encoded["_sinkPartition"], json!("CHN_SERVICES"));
}

#[test]
fn unset_edge_ids_are_fresh_per_conversion_and_set_ids_are_kept() {
    let converter = EdgeConverter::default();
    let edge = SupplyEdge::between(&vertex("A_X"), &vertex("B_Y"), SUPPLY_LABEL, 2.0);

    let ids: HashSet<String> = (0..16)
        .map(|_| converter.to_edge(&edge).expect("convert").id)
        .collect();
    assert_eq!(ids.len(), 16);
    assert!(ids.iter().all(|id| !id.trim().is_empty()));

    let mut named = edge.clone();
    named.id = Some("edge-1".into());
    assert_eq!(converter.to_edge(&named).expect("convert").id, "edge-1");
}

struct Counting(AtomicUsize);

impl IdGenerator for Counting {
    fn generate(&self) -> Result<String, GenerationCapabilityError> {
        let n = self.0.fetch_add(1, Ordering::SeqCst);
        Ok(format!("generated-{n}"))
    }
}

#[test]
fn the_id_generator_is_only_consulted_for_unset_ids() {
    let generator = Arc::new(Counting(AtomicUsize::new(0)));
    let converter =
        EdgeConverter::with_id_generator(Arc::new(ShapeRegistry::new()), generator.clone());
    let mut edge = SupplyEdge::between(&vertex("A_X"), &vertex("B_Y"), SUPPLY_LABEL, 2.0);

    assert_eq!(converter.to_edge(&edge).expect("convert").id, "generated-0");
    edge.id = Some("kept".into());
    assert_eq!(converter.to_edge(&edge).expect("convert").id, "kept");
    assert_eq!(generator.0.load(Ordering::SeqCst), 1);
}

#[test]
fn edges_without_a_routable_source_are_rejected() {
    let converter = EdgeConverter::default();

    let mut unpartitioned = SupplyEdge::between(&vertex("A_X"), &vertex("B_Y"), SUPPLY_LABEL, 2.0);
    unpartitioned.source.partition_key = None;
    let err = converter.to_edge(&unpartitioned).unwrap_err();
    let ConvertError::Metadata(err) = err else {
        panic!("expected a metadata error");
    };
    assert!(matches!(
        err.rule,
        ValidationRule::MalformedEndpoint {
            member: "source",
            ..
        }
    ));

    let mut anonymous = SupplyEdge::between(&vertex("A_X"), &vertex("B_Y"), SUPPLY_LABEL, 2.0);
    anonymous.destination.id = None;
    let err = converter.to_edge(&anonymous).unwrap_err();
    assert!(err.to_string().contains("'destination' has no id"), "{err}");
}

#[test]
fn converters_sharing_a_registry_validate_each_type_once() {
    let registry = Arc::new(ShapeRegistry::new());
    let vertices = VertexConverter::new(Arc::clone(&registry));
    let edges = EdgeConverter::new(Arc::clone(&registry));
    let a = vertex("A_X");
    let b = vertex("B_Y");

    for _ in 0..5 {
        vertices.to_vertex(&a).expect("vertex");
        edges
            .to_edge(&SupplyEdge::between(&a, &b, SUPPLY_LABEL, 3.0))
            .expect("edge");
    }

    assert_eq!(registry.len(), 2);
    let metrics = registry.metrics_snapshot();
    assert_eq!(metrics.lookups, 10);
    assert_eq!(metrics.builds, 2);
    assert_eq!(metrics.rejections, 0);
}
