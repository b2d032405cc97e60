//! Load-contributor tracing.
//!
//! Load flows along each connection from `source` to `target`. The node with no
//! outgoing connection is the grounded node (the fixed support at the end of the
//! path). The contributors of a connection are its source node plus every node
//! that can reach that source by following connections forward, which is found
//! by walking the connections backward.
//!
//! Dangling connections are ignored: the trace sees the same graph an editor
//! would render.

use std::collections::{HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use uom::si::f64::{Force, Mass, Torque};
use uom::si::{force::newton, mass::kilogram, torque::newton_meter};

use crate::document::GraphDocument;
use crate::errors::TraceError;
use crate::geometry::Vec3;

/// Result of tracing the contributors of one connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadContributors {
    /// Id of the analysed connection.
    pub selected_edge: String,
    /// The grounded node. `None` when every node has an outgoing connection. When
    /// several nodes qualify this is the lowest id in string order.
    pub grounded_node: Option<String>,
    /// Every node upstream of the connection, including its source, sorted by id.
    pub contributors: Vec<String>,
    /// Every node with no outgoing connection, sorted by id.
    pub grounded_candidates: Vec<String>,
}

impl LoadContributors {
    /// Whether more than one node could be the grounded node.
    #[must_use]
    pub fn is_grounding_ambiguous(&self) -> bool {
        self.grounded_candidates.len() > 1
    }
}

/// Directed view of the renderable part of a document.
struct LoadGraph<'a> {
    /// Connections as petgraph edges, weighted by edge id.
    graph: DiGraph<&'a str, &'a str>,
    /// Graph index of each node id.
    indices: HashMap<&'a str, NodeIndex>,
}

impl<'a> LoadGraph<'a> {
    /// Build the graph from every node and every valid edge of `document`.
    fn build(document: &'a GraphDocument) -> Self {
        let mut graph = DiGraph::with_capacity(document.nodes.len(), document.edges.len());
        let mut indices = HashMap::with_capacity(document.nodes.len());
        for node in &document.nodes {
            indices
                .entry(node.id())
                .or_insert_with(|| graph.add_node(node.id()));
        }
        for edge in document.valid_edges() {
            if let (Some(&source), Some(&target)) =
                (indices.get(edge.source()), indices.get(edge.target()))
            {
                graph.add_edge(source, target, edge.id());
            }
        }
        Self { graph, indices }
    }

    /// Ids of all nodes without an outgoing connection, sorted.
    fn sinks(&self) -> Vec<String> {
        let mut sinks: Vec<String> = self
            .graph
            .externals(Direction::Outgoing)
            .map(|index| self.graph[index].to_string())
            .collect();
        sinks.sort();
        sinks
    }

    /// Ids of `start` and every node that reaches it, sorted.
    fn upstream(&self, start: NodeIndex) -> Vec<String> {
        let mut visited = HashSet::from([start]);
        let mut pending = vec![start];
        while let Some(node) = pending.pop() {
            for edge in self.graph.edges_directed(node, Direction::Incoming) {
                if visited.insert(edge.source()) {
                    pending.push(edge.source());
                }
            }
        }
        let mut ids: Vec<String> = visited
            .into_iter()
            .map(|index| self.graph[index].to_string())
            .collect();
        ids.sort();
        ids
    }
}

/// Every node with no outgoing connection, sorted by id.
#[must_use]
pub fn grounded_candidates(document: &GraphDocument) -> Vec<String> {
    LoadGraph::build(document).sinks()
}

/// The grounded node: the lowest id among the nodes with no outgoing connection.
///
/// # Examples
/// ```
/// use loadpath::{grounded_node, GraphStore};
///
/// let mut store = GraphStore::new();
/// store.add_node();
/// store.add_node();
/// store.connect("Node0", "Node1").expect("both nodes exist");
/// assert_eq!(grounded_node(store.document()).as_deref(), Some("Node1"));
/// ```
#[must_use]
pub fn grounded_node(document: &GraphDocument) -> Option<String> {
    grounded_candidates(document).into_iter().next()
}

/// Find the grounded node and every node contributing load to a connection.
///
/// # Errors
///
/// Returns [`TraceError::EdgeNotFound`] when no valid connection has the id
/// `selected_edge`.
///
/// # Examples
/// ```
/// use loadpath::{find_load_contributors, GraphStore};
///
/// let mut store = GraphStore::new();
/// for _ in 0..4 {
///     store.add_node();
/// }
/// store.connect("Node0", "Node1")?;
/// let middle = store.connect("Node1", "Node2")?;
/// store.connect("Node2", "Node3")?;
///
/// let report = find_load_contributors(store.document(), middle.id())?;
/// assert_eq!(report.grounded_node.as_deref(), Some("Node3"));
/// assert_eq!(report.contributors, ["Node0", "Node1"]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn find_load_contributors(
    document: &GraphDocument,
    selected_edge: &str,
) -> Result<LoadContributors, TraceError> {
    let graph = LoadGraph::build(document);
    let grounded_candidates = graph.sinks();
    match grounded_candidates.len() {
        0 => tracing::debug!("no grounded node: every node has an outgoing connection"),
        1 => {}
        count => tracing::warn!(
            candidates = count,
            chosen = %grounded_candidates[0],
            "several nodes have no outgoing connection; grounded node is ambiguous"
        ),
    }

    let edge = document
        .valid_edges()
        .find(|edge| edge.id() == selected_edge)
        .ok_or_else(|| TraceError::EdgeNotFound(selected_edge.to_string()))?;
    let start = graph
        .indices
        .get(edge.source())
        .copied()
        .ok_or_else(|| TraceError::EdgeNotFound(selected_edge.to_string()))?;

    let contributors = graph.upstream(start);
    tracing::debug!(
        edge = selected_edge,
        contributors = contributors.len(),
        "traced load contributors"
    );
    Ok(LoadContributors {
        selected_edge: selected_edge.to_string(),
        grounded_node: grounded_candidates.first().cloned(),
        contributors,
        grounded_candidates,
    })
}

/// Sums of the properties of a set of contributors.
///
/// These are plain totals of the stored values, expressed in the frame each node
/// was annotated in; no equilibrium is computed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContributorLoads {
    /// Number of contributors found in the document.
    pub count: usize,
    /// Total mass.
    pub total_mass: Mass,
    /// Component-wise sum of the external forces.
    pub total_force: [Force; 3],
    /// Component-wise sum of the external moments.
    pub total_moment: [Torque; 3],
}

impl ContributorLoads {
    /// Total the properties of the contributors in `report`.
    ///
    /// Ids that are no longer in `document` are skipped.
    #[must_use]
    pub fn from_report(document: &GraphDocument, report: &LoadContributors) -> Self {
        let mut count = 0;
        let mut total_mass = Mass::new::<kilogram>(0.0);
        let mut force = Vec3::ZERO;
        let mut moment = Vec3::ZERO;
        for node in report.contributors.iter().filter_map(|id| document.node(id)) {
            count += 1;
            total_mass += node.data.mass_quantity();
            force = force + node.data.external_force;
            moment = moment + node.data.moment;
        }
        Self {
            count,
            total_mass,
            total_force: force.to_array().map(Force::new::<newton>),
            total_moment: moment.to_array().map(Torque::new::<newton_meter>),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::document::{Edge, Node, NodeData, DEFAULT_COLOR};
    use crate::geometry::{vec3, Position};

    fn document(nodes: &[&str], edges: &[(&str, &str, &str)]) -> GraphDocument {
        GraphDocument {
            nodes: nodes
                .iter()
                .map(|id| Node {
                    data: NodeData::new(*id, DEFAULT_COLOR),
                    position: Position::default(),
                })
                .collect(),
            edges: edges
                .iter()
                .map(|(id, source, target)| Edge::new(*id, *source, *target))
                .collect(),
        }
    }

    #[test]
    fn chain_traces_upstream_only() {
        let doc = document(
            &["A", "B", "C", "D"],
            &[("e0", "A", "B"), ("e1", "B", "C"), ("e2", "C", "D")],
        );
        let report = find_load_contributors(&doc, "e1").expect("edge exists");
        assert_eq!(report.selected_edge, "e1");
        assert_eq!(report.grounded_node.as_deref(), Some("D"));
        assert_eq!(report.contributors, vec!["A", "B"]);
        assert!(!report.is_grounding_ambiguous());
    }

    #[test]
    fn branches_merge_into_one_contributor_set() {
        let doc = document(
            &["Left", "Right", "Beam", "Column", "Ground", "Bystander"],
            &[
                ("e0", "Left", "Beam"),
                ("e1", "Right", "Beam"),
                ("e2", "Beam", "Column"),
                ("e3", "Column", "Ground"),
                ("e4", "Bystander", "Column"),
            ],
        );
        let report = find_load_contributors(&doc, "e2").expect("edge exists");
        assert_eq!(report.contributors, vec!["Beam", "Left", "Right"]);
        assert_eq!(report.grounded_node.as_deref(), Some("Ground"));
    }

    #[test]
    fn cycles_terminate_without_a_grounded_node() {
        let doc = document(&["A", "B"], &[("e0", "A", "B"), ("e1", "B", "A")]);
        let report = find_load_contributors(&doc, "e0").expect("edge exists");
        assert_eq!(report.grounded_node, None);
        assert!(report.grounded_candidates.is_empty());
        assert_eq!(report.contributors, vec!["A", "B"]);
    }

    #[test]
    fn several_sinks_pick_the_lowest_id() {
        let doc = document(&["Z", "M", "A"], &[("e0", "Z", "M")]);
        let report = find_load_contributors(&doc, "e0").expect("edge exists");
        assert_eq!(report.grounded_candidates, vec!["A", "M"]);
        assert_eq!(report.grounded_node.as_deref(), Some("A"));
        assert!(report.is_grounding_ambiguous());
        assert_eq!(report.contributors, vec!["Z"]);
    }

    #[test]
    fn unknown_and_dangling_edges_are_not_found() {
        let mut doc = document(&["A"], &[]);
        assert_eq!(grounded_node(&doc).as_deref(), Some("A"));
        assert_eq!(
            find_load_contributors(&doc, "e0"),
            Err(TraceError::EdgeNotFound("e0".into()))
        );
        doc.edges.push(Edge::new("e0", "Ghost", "A"));
        assert_eq!(
            find_load_contributors(&doc, "e0"),
            Err(TraceError::EdgeNotFound("e0".into()))
        );
        // A dangling edge does not give "A" an outgoing connection either.
        doc.edges.push(Edge::new("e1", "A", "Ghost"));
        assert_eq!(grounded_node(&doc).as_deref(), Some("A"));
    }

    #[test]
    fn empty_document_has_no_grounded_node() {
        assert_eq!(grounded_node(&GraphDocument::new()), None);
    }

    #[test]
    fn contributor_loads_sum_node_properties() {
        let mut doc = document(
            &["Motor", "Frame", "Ground"],
            &[("e0", "Motor", "Frame"), ("e1", "Frame", "Ground")],
        );
        doc.nodes[0].data.mass = 12.0;
        doc.nodes[0].data.external_force = vec3(0.0, 0.0, -100.0);
        doc.nodes[1].data.mass = 30.5;
        doc.nodes[1].data.external_force = vec3(10.0, 0.0, -50.0);
        doc.nodes[1].data.moment = vec3(0.0, 5.0, 0.0);
        doc.nodes[2].data.mass = 1_000.0;

        let report = find_load_contributors(&doc, "e1").expect("edge exists");
        let loads = ContributorLoads::from_report(&doc, &report);
        assert_eq!(loads.count, 2);
        assert_relative_eq!(loads.total_mass.get::<kilogram>(), 42.5);
        assert_relative_eq!(loads.total_force[0].get::<newton>(), 10.0);
        assert_relative_eq!(loads.total_force[2].get::<newton>(), -150.0);
        assert_relative_eq!(loads.total_moment[1].get::<newton_meter>(), 5.0);
    }
}
