#![warn(clippy::pedantic)]

use std::collections::HashSet;

use approx::assert_relative_eq;
use chrono::NaiveDate;
use loadpath::{
    find_load_contributors, grounded_node, persistence, vec3, ContributorLoads, Edge,
    GraphDocument, GraphStore, Node, NodeData, NodeProperties, PersistenceError, RawDocument,
    StoreError, TraceError, DEFAULT_COLOR,
};
use rstest::rstest;
use uom::si::{force::newton, mass::kilogram};

fn document(names: &[&str], edges: &[(&str, &str, &str)]) -> GraphDocument {
    GraphDocument {
        nodes: names
            .iter()
            .map(|name| Node {
                data: NodeData::new(*name, DEFAULT_COLOR),
                position: loadpath::position(0.0, 0.0),
            })
            .collect(),
        edges: edges
            .iter()
            .map(|(id, source, target)| Edge::new(*id, *source, *target))
            .collect(),
    }
}

fn store_with_nodes(count: usize) -> GraphStore {
    let mut store = GraphStore::new().with_seed(11);
    for _ in 0..count {
        store.add_node();
    }
    store
}

#[test]
fn chain_contributors_stop_at_the_selected_edge() {
    let doc = document(
        &["A", "B", "C", "D"],
        &[("e0", "A", "B"), ("e1", "B", "C"), ("e2", "C", "D")],
    );

    let report = find_load_contributors(&doc, "e1").expect("edge exists");

    assert_eq!(report.grounded_node.as_deref(), Some("D"));
    assert_eq!(report.contributors, ["A", "B"]);
    assert!(!report.is_grounding_ambiguous());
}

#[test]
fn lone_node_is_grounded_but_has_nothing_to_trace() {
    let doc = document(&["A"], &[]);

    assert_eq!(grounded_node(&doc).as_deref(), Some("A"));
    assert_eq!(
        find_load_contributors(&doc, "e0"),
        Err(TraceError::EdgeNotFound("e0".to_string()))
    );
}

#[test]
fn cycles_have_no_grounded_node_and_terminate() {
    let doc = document(&["A", "B"], &[("e0", "A", "B"), ("e1", "B", "A")]);

    let report = find_load_contributors(&doc, "e0").expect("edge exists");

    assert_eq!(report.grounded_node, None);
    assert!(report.grounded_candidates.is_empty());
    assert_eq!(report.contributors, ["A", "B"]);
}

#[test]
fn connecting_unknown_nodes_changes_nothing() {
    let mut store = store_with_nodes(1);
    let before = store.to_document();

    assert_eq!(
        store.connect("X", "Y"),
        Err(StoreError::UnknownNode("X".to_string()))
    );
    assert_eq!(
        store.connect("Node0", "Y"),
        Err(StoreError::UnknownNode("Y".to_string()))
    );
    assert_eq!(store.to_document(), before);
}

#[test]
fn importing_drops_edges_to_missing_nodes() {
    let text = r#"{
        "nodes": [
            {"data": {"id": "A", "name": "A"}, "position": {"x": 1.0, "y": 2.0}},
            {"data": {"id": "B", "name": "B"}, "position": {"x": 3.0, "y": 4.0}}
        ],
        "edges": [
            {"data": {"id": "e0", "source": "A", "target": "B"}},
            {"data": {"id": "e1", "source": "B", "target": "Ghost"}}
        ]
    }"#;
    let raw = persistence::parse_raw_document(text).expect("valid JSON");

    let (store, warnings) = GraphStore::from_document(raw).expect("nodes are named");

    assert_eq!(store.node_count(), 2);
    assert_eq!(store.connections().collect::<Vec<_>>(), [("A", "B")]);
    assert_eq!(warnings.len(), 1);
}

#[test]
fn added_nodes_never_share_an_id() {
    let mut store = store_with_nodes(5);
    store.delete_node("Node2").expect("node exists");
    store.delete_node("Node0").expect("node exists");
    for _ in 0..6 {
        store.add_node();
    }

    let ids: HashSet<&str> = store.document().nodes.iter().map(Node::id).collect();
    assert_eq!(ids.len(), store.node_count());
    assert_eq!(store.node_count(), 9);
}

#[rstest]
#[case("Node0")]
#[case("Node1")]
#[case("Node3")]
fn deleting_a_node_removes_its_edges(#[case] victim: &str) {
    let mut store = store_with_nodes(4);
    for (source, target) in [
        ("Node0", "Node1"),
        ("Node1", "Node2"),
        ("Node3", "Node1"),
        ("Node2", "Node3"),
    ] {
        store.connect(source, target).expect("nodes exist");
    }

    store.delete_node(victim).expect("node exists");

    assert!(store.document().node(victim).is_none());
    assert!(store.document().edges.iter().all(|edge| !edge.touches(victim)));
}

#[rstest]
#[case("Node0")]
#[case("Node1")]
#[case("Missing")]
fn self_loops_are_rejected_without_mutation(#[case] node: &str) {
    let mut store = store_with_nodes(2);
    store.connect("Node0", "Node1").expect("nodes exist");
    let before = store.to_document();

    assert!(store.connect(node, node).is_err());
    assert_eq!(store.to_document(), before);
}

#[rstest]
#[case("Node0", "Node1")]
#[case("Node1", "Node0")]
fn reconnecting_a_pair_keeps_one_edge(#[case] source: &str, #[case] target: &str) {
    let mut store = store_with_nodes(2);
    let first = store.connect("Node0", "Node1").expect("nodes exist");

    let second = store.connect(source, target).expect("nodes exist");

    assert_eq!(store.edge_count(), 1);
    assert_ne!(first.id(), second.id());
    assert_eq!(store.connections().collect::<Vec<_>>(), [(source, target)]);
}

#[test]
fn contributors_are_listed_once_when_paths_merge() {
    // Diamond feeding into a shared trunk: Node0 reaches Node3 two ways.
    let mut store = store_with_nodes(5);
    for (source, target) in [
        ("Node0", "Node1"),
        ("Node0", "Node2"),
        ("Node1", "Node3"),
        ("Node2", "Node3"),
        ("Node3", "Node4"),
    ] {
        store.connect(source, target).expect("nodes exist");
    }
    let trunk = store
        .document()
        .edges
        .iter()
        .find(|edge| edge.joins("Node3", "Node4"))
        .map(|edge| edge.id().to_string())
        .expect("trunk edge exists");

    let report = find_load_contributors(store.document(), &trunk).expect("edge exists");

    assert_eq!(report.contributors, ["Node0", "Node1", "Node2", "Node3"]);
    let unique: HashSet<&String> = report.contributors.iter().collect();
    assert_eq!(unique.len(), report.contributors.len());
}

#[test]
fn round_trip_keeps_nodes_and_drops_only_dangling_edges() {
    let doc = document(
        &["A", "B", "C"],
        &[("e0", "A", "B"), ("e1", "B", "Gone"), ("e2", "B", "C")],
    );

    let (store, _) = GraphStore::from_document(RawDocument::from(doc.clone())).expect("named");

    assert_eq!(store.document().nodes, doc.nodes);
    let kept: Vec<&str> = store.document().edges.iter().map(Edge::id).collect();
    assert_eq!(kept, ["e0", "e2"]);
}

#[test]
fn exported_snapshot_imports_back_unchanged() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut store = store_with_nodes(3);
    store.connect("Node0", "Node1").expect("nodes exist");
    store.connect("Node1", "Node2").expect("nodes exist");
    store.rename_node("Node2", "Ground").expect("name is free");
    let mut form = NodeProperties::from(&store.document().nodes[0].data);
    form.mass = Some(12.5);
    form.external_force = vec3(0.0, 0.0, -122.6).to_array().map(Some);
    store
        .update_node_properties("Node0", form)
        .expect("node exists");

    let taken = NaiveDate::from_ymd_opt(2025, 3, 21)
        .and_then(|day| day.and_hms_opt(14, 5, 9))
        .expect("valid timestamp");
    let path = store
        .export_to_dir(dir.path(), taken)
        .expect("directory is writable");
    assert_eq!(
        path.file_name().and_then(|name| name.to_str()),
        Some("load_path_data_20250321_140509.json")
    );

    let mut reloaded = GraphStore::new();
    let warnings = reloaded.import_file(&path).expect("snapshot is valid");
    assert!(warnings.is_empty());
    assert_eq!(reloaded.document(), store.document());
}

#[test]
fn failed_import_keeps_the_current_document() {
    let dir = tempfile::tempdir().expect("temp dir");
    let broken = dir.path().join("broken.json");
    std::fs::write(&broken, "{\"nodes\": [").expect("write file");
    let text = dir.path().join("notes.txt");
    std::fs::write(&text, "{}").expect("write file");

    let mut store = store_with_nodes(2);
    store.connect("Node0", "Node1").expect("nodes exist");
    let before = store.to_document();

    assert!(matches!(
        store.import_file(&broken),
        Err(PersistenceError::Malformed(_))
    ));
    assert!(matches!(
        store.import_file(&text),
        Err(PersistenceError::NotJson(_))
    ));
    assert_eq!(store.to_document(), before);
}

#[test]
fn contributor_totals_follow_the_trace() {
    let mut store = store_with_nodes(3);
    store.connect("Node0", "Node1").expect("nodes exist");
    store.connect("Node1", "Node2").expect("nodes exist");
    for (id, mass) in [("Node0", 4.0), ("Node1", 6.5), ("Node2", 100.0)] {
        let form = NodeProperties {
            mass: Some(mass),
            external_force: [None, None, Some(-9.81 * mass)],
            ..NodeProperties::default()
        };
        store.update_node_properties(id, form).expect("node exists");
    }
    let edge = store
        .document()
        .edges
        .iter()
        .find(|edge| edge.joins("Node1", "Node2"))
        .map(|edge| edge.id().to_string())
        .expect("edge exists");

    let report = find_load_contributors(store.document(), &edge).expect("edge exists");
    let loads = ContributorLoads::from_report(store.document(), &report);

    assert_eq!(loads.count, 2);
    assert_relative_eq!(loads.total_mass.get::<kilogram>(), 10.5);
    assert_relative_eq!(loads.total_force[2].get::<newton>(), -9.81 * 10.5, epsilon = 1e-9);
}

#[test]
fn connecting_after_the_largest_edge_id_picks_a_free_id() {
    let doc = document(&["A", "B", "C"], &[("e18446744073709551615", "A", "B")]);
    let (mut store, _) = GraphStore::from_document(RawDocument::from(doc)).expect("named");

    let edge = store.connect("B", "C").expect("nodes exist");

    assert_eq!(edge.id(), "e0");
    let ids: HashSet<&str> = store.document().edges.iter().map(Edge::id).collect();
    assert_eq!(ids.len(), 2);
}

#[test]
fn rejected_non_finite_values_keep_the_document_loadable() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("load_path.json");
    let mut store = store_with_nodes(1);
    let form = NodeProperties {
        cog: [Some(f64::NAN), Some(0.0), Some(0.0)],
        ..NodeProperties::default()
    };

    assert!(matches!(
        store.update_node_properties("Node0", form),
        Err(StoreError::NonFinite { field: "cog", .. })
    ));
    persistence::write_document(store.document(), &path).expect("writable");

    let mut reloaded = GraphStore::new();
    reloaded.import_file(&path).expect("document stays valid");
    assert_eq!(reloaded.document(), store.document());
}
