//! Typed load-path document and the sanitizing conversion from raw input.
//!
//! [`GraphDocument`] is the only form in which other components observe the graph.
//! [`RawDocument`] mirrors the same JSON layout with every optional field left
//! optional, and [`RawDocument::sanitize`] turns it into a document that satisfies
//! the identity and referential-integrity invariants.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use uom::si::f64::{Angle, Force, Length, Mass, Torque};
use uom::si::{angle::degree, force::newton, length::meter, mass::kilogram, torque::newton_meter};

use crate::errors::PersistenceError;
use crate::geometry::{Position, RotationOrder, Vec3};

/// Colour given to imported nodes that do not carry one.
pub const DEFAULT_COLOR: &str = "#FF4136";

/// Physical and display properties of a component.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    /// Identity of the node. Always equal to `name`.
    pub id: String,
    /// Human readable label.
    pub name: String,
    /// Display colour.
    pub color: String,
    /// Mass in kilograms.
    pub mass: f64,
    /// Centre of gravity in the local frame, metres.
    pub cog: Vec3,
    /// Externally applied force in the local frame, newtons.
    pub external_force: Vec3,
    /// Externally applied moment in the local frame, newton-metres.
    pub moment: Vec3,
    /// Orientation as Euler angles in degrees.
    pub euler_angles: Vec3,
    /// Order in which `euler_angles` are applied.
    pub rotation_order: RotationOrder,
    /// Translation of the local frame, metres.
    pub translation: Vec3,
}

impl NodeData {
    /// Create node data with the given name and colour and default physical properties.
    #[must_use]
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
            color: color.into(),
            mass: 0.0,
            cog: Vec3::ZERO,
            external_force: Vec3::ZERO,
            moment: Vec3::ZERO,
            euler_angles: Vec3::ZERO,
            rotation_order: RotationOrder::Xyz,
            translation: Vec3::ZERO,
        }
    }

    /// Mass as a typed quantity.
    #[must_use]
    pub fn mass_quantity(&self) -> Mass {
        Mass::new::<kilogram>(self.mass)
    }

    /// Centre of gravity as typed lengths.
    #[must_use]
    pub fn cog_quantities(&self) -> [Length; 3] {
        self.cog.to_array().map(Length::new::<meter>)
    }

    /// External force as typed forces.
    #[must_use]
    pub fn force_quantities(&self) -> [Force; 3] {
        self.external_force.to_array().map(Force::new::<newton>)
    }

    /// External moment as typed torques.
    #[must_use]
    pub fn moment_quantities(&self) -> [Torque; 3] {
        self.moment.to_array().map(Torque::new::<newton_meter>)
    }

    /// Euler angles as typed angles.
    #[must_use]
    pub fn euler_angle_quantities(&self) -> [Angle; 3] {
        self.euler_angles.to_array().map(Angle::new::<degree>)
    }

    /// Translation as typed lengths.
    #[must_use]
    pub fn translation_quantities(&self) -> [Length; 3] {
        self.translation.to_array().map(Length::new::<meter>)
    }
}

/// A component in the load path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Identity and physical properties.
    pub data: NodeData,
    /// Canvas position.
    pub position: Position,
}

impl Node {
    /// Identity of the node.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.data.id
    }
}

/// Endpoints and identity of a connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeData {
    /// Identity of the connection, `e<N>`.
    pub id: String,
    /// Node transmitting the load.
    pub source: String,
    /// Node receiving the load.
    pub target: String,
}

/// A directed load-transmission connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Identity and endpoints.
    pub data: EdgeData,
}

impl Edge {
    /// Create a connection from `source` to `target`.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            data: EdgeData {
                id: id.into(),
                source: source.into(),
                target: target.into(),
            },
        }
    }

    /// Identity of the connection.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.data.id
    }

    /// Node transmitting the load.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.data.source
    }

    /// Node receiving the load.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.data.target
    }

    /// Whether the connection joins `a` and `b` in either direction.
    #[must_use]
    pub fn joins(&self, a: &str, b: &str) -> bool {
        (self.source() == a && self.target() == b) || (self.source() == b && self.target() == a)
    }

    /// Whether either endpoint is `node`.
    #[must_use]
    pub fn touches(&self, node: &str) -> bool {
        self.source() == node || self.target() == node
    }
}

/// Parse the numeric suffix of a canonical `e<N>` edge id.
///
/// Only plain decimal digits without leading zeros count, so `e05` and `e+5` are
/// ordinary string ids.
pub(crate) fn edge_suffix(id: &str) -> Option<u64> {
    let digits = id.strip_prefix('e')?;
    let canonical = !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && (digits == "0" || !digits.starts_with('0'));
    if canonical {
        digits.parse().ok()
    } else {
        None
    }
}

/// One past the largest used suffix, or `0` for none.
///
/// Once `u64::MAX` is in use the smallest unused suffix is returned instead.
pub(crate) fn next_suffix(used: &HashSet<u64>) -> u64 {
    let Some(&max) = used.iter().max() else {
        return 0;
    };
    max.checked_add(1).unwrap_or_else(|| {
        (0..=u64::MAX)
            .find(|n| !used.contains(n))
            .unwrap_or_default()
    })
}

/// Ordered collection of nodes and edges.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Components in insertion order.
    pub nodes: Vec<Node>,
    /// Connections in insertion order.
    pub edges: Vec<Edge>,
}

impl GraphDocument {
    /// Create an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a node by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id() == id)
    }

    /// Whether a node with this id exists.
    #[must_use]
    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Look up an edge by id.
    #[must_use]
    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|edge| edge.id() == id)
    }

    /// Set of all node ids.
    #[must_use]
    pub fn node_ids(&self) -> HashSet<&str> {
        self.nodes.iter().map(Node::id).collect()
    }

    /// Edges whose endpoints both exist, in document order.
    ///
    /// Dangling edges are never presented as real connections.
    pub fn valid_edges(&self) -> impl Iterator<Item = &Edge> {
        let ids = self.node_ids();
        self.edges
            .iter()
            .filter(move |edge| ids.contains(edge.source()) && ids.contains(edge.target()))
    }

    /// Id for the next connection: one past the largest `e<N>` suffix, or `e0`.
    #[must_use]
    pub fn next_edge_id(&self) -> String {
        let used: HashSet<u64> = self
            .edges
            .iter()
            .filter_map(|edge| edge_suffix(edge.id()))
            .collect();
        format!("e{}", next_suffix(&used))
    }
}

/// Node properties as they appear in an untrusted document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawNodeData {
    /// Identity, if present.
    pub id: Option<String>,
    /// Label, if present. Becomes the id on import.
    pub name: Option<String>,
    /// Display colour.
    pub color: Option<String>,
    /// Mass in kilograms.
    pub mass: Option<f64>,
    /// Centre of gravity.
    pub cog: Option<Vec3>,
    /// External force.
    pub external_force: Option<Vec3>,
    /// External moment.
    pub moment: Option<Vec3>,
    /// Euler angles in degrees.
    pub euler_angles: Option<Vec3>,
    /// Rotation order.
    pub rotation_order: Option<RotationOrder>,
    /// Translation.
    pub translation: Option<Vec3>,
}

/// A node as it appears in an untrusted document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    /// Properties.
    pub data: RawNodeData,
    /// Canvas position, if present.
    pub position: Option<Position>,
}

/// Edge endpoints as they appear in an untrusted document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEdgeData {
    /// Identity, if present.
    pub id: Option<String>,
    /// Node transmitting the load.
    pub source: String,
    /// Node receiving the load.
    pub target: String,
}

/// An edge as it appears in an untrusted document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEdge {
    /// Identity and endpoints.
    pub data: RawEdgeData,
}

/// A loosely validated document, as read from disk.
///
/// The `nodes` and `edges` keys are required; everything else may be missing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    /// Components.
    pub nodes: Vec<RawNode>,
    /// Connections.
    pub edges: Vec<RawEdge>,
}

/// Non-fatal problem found while sanitizing a document.
///
/// The affected node or edge is dropped (or, for synthesized ids, repaired) and the
/// rest of the document is imported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportWarning {
    /// A second node resolved to an id that was already taken.
    DuplicateNode {
        /// Id shared by both nodes.
        id: String,
    },
    /// An edge referenced a node that is not in the document.
    DanglingEdge {
        /// Edge id.
        edge: String,
        /// Source endpoint as written.
        source: String,
        /// Target endpoint as written.
        target: String,
    },
    /// An edge joined a node to itself.
    SelfLoop {
        /// Edge id.
        edge: String,
        /// The node on both ends.
        node: String,
    },
    /// An edge joined a pair of nodes that was already connected.
    DuplicateConnection {
        /// Edge id that was dropped.
        edge: String,
        /// Edge id that was kept.
        kept: String,
    },
    /// An edge reused an id already carried by an earlier edge.
    DuplicateEdgeId {
        /// The repeated id.
        edge: String,
    },
    /// An edge had no id and one was assigned.
    SynthesizedEdgeId {
        /// Zero-based position of the edge in the imported list.
        index: usize,
        /// Assigned id.
        id: String,
    },
}

impl fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateNode { id } => write!(f, "dropped duplicate node {id:?}"),
            Self::DanglingEdge {
                edge,
                source,
                target,
            } => write!(
                f,
                "dropped edge {edge:?} ({source} -> {target}): references a missing node"
            ),
            Self::SelfLoop { edge, node } => {
                write!(f, "dropped edge {edge:?}: connects {node:?} to itself")
            }
            Self::DuplicateConnection { edge, kept } => {
                write!(f, "dropped edge {edge:?}: same pair already joined by {kept:?}")
            }
            Self::DuplicateEdgeId { edge } => write!(f, "dropped edge with repeated id {edge:?}"),
            Self::SynthesizedEdgeId { index, id } => {
                write!(f, "edge at position {index} had no id; assigned {id:?}")
            }
        }
    }
}

/// Return a trimmed, non-empty string.
fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

impl RawDocument {
    /// Convert into a [`GraphDocument`] that satisfies the document invariants.
    ///
    /// Missing optional node fields take their defaults and every node's id is set
    /// to its name (falling back to the id when the name is missing). Edge endpoints
    /// are matched against these resulting ids only, so an edge written against a
    /// node's former id is dangling. Edges are dropped when an endpoint is unknown,
    /// when they form a self-loop, when their pair is already connected, or when
    /// their id repeats; edges without an id receive `e<index>`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::MissingNodeName`] when a node has neither a name
    /// nor an id.
    pub fn sanitize(self) -> Result<(GraphDocument, Vec<ImportWarning>), PersistenceError> {
        let mut warnings = Vec::new();
        let mut nodes = Vec::with_capacity(self.nodes.len());
        let mut ids = HashSet::new();

        for (index, raw) in self.nodes.into_iter().enumerate() {
            let data = raw.data;
            let name = non_empty(data.name.as_ref())
                .or_else(|| non_empty(data.id.as_ref()))
                .ok_or(PersistenceError::MissingNodeName { index })?
                .to_string();
            if !ids.insert(name.clone()) {
                tracing::warn!(node = %name, "dropping duplicate node");
                warnings.push(ImportWarning::DuplicateNode { id: name });
                continue;
            }
            nodes.push(Node {
                data: NodeData {
                    id: name.clone(),
                    name,
                    color: data.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
                    mass: data.mass.unwrap_or(0.0),
                    cog: data.cog.unwrap_or_default(),
                    external_force: data.external_force.unwrap_or_default(),
                    moment: data.moment.unwrap_or_default(),
                    euler_angles: data.euler_angles.unwrap_or_default(),
                    rotation_order: data.rotation_order.unwrap_or_default(),
                    translation: data.translation.unwrap_or_default(),
                },
                position: raw.position.unwrap_or_default(),
            });
        }

        let mut taken: HashSet<String> = self
            .edges
            .iter()
            .filter_map(|edge| non_empty(edge.data.id.as_ref()).map(str::to_string))
            .collect();
        let mut seen_ids = HashSet::new();
        let mut pairs: HashMap<(String, String), String> = HashMap::new();
        let mut edges = Vec::with_capacity(self.edges.len());

        for (index, raw) in self.edges.into_iter().enumerate() {
            let RawEdgeData { id, source, target } = raw.data;
            let id = match non_empty(id.as_ref()) {
                Some(id) => id.to_string(),
                None => {
                    let id = synthesize_edge_id(index, &taken);
                    taken.insert(id.clone());
                    warnings.push(ImportWarning::SynthesizedEdgeId {
                        index,
                        id: id.clone(),
                    });
                    id
                }
            };
            if !seen_ids.insert(id.clone()) {
                tracing::warn!(edge = %id, "dropping edge with repeated id");
                warnings.push(ImportWarning::DuplicateEdgeId { edge: id });
                continue;
            }
            if !(ids.contains(&source) && ids.contains(&target)) {
                tracing::warn!(edge = %id, %source, %target, "dropping dangling edge");
                warnings.push(ImportWarning::DanglingEdge {
                    edge: id,
                    source,
                    target,
                });
                continue;
            }
            if source == target {
                tracing::warn!(edge = %id, node = %source, "dropping self-loop");
                warnings.push(ImportWarning::SelfLoop {
                    edge: id,
                    node: source,
                });
                continue;
            }
            let pair = if source < target {
                (source.clone(), target.clone())
            } else {
                (target.clone(), source.clone())
            };
            if let Some(kept) = pairs.get(&pair) {
                tracing::warn!(edge = %id, kept = %kept, "dropping duplicate connection");
                warnings.push(ImportWarning::DuplicateConnection {
                    edge: id,
                    kept: kept.clone(),
                });
                continue;
            }
            pairs.insert(pair, id.clone());
            edges.push(Edge::new(id, source, target));
        }

        Ok((GraphDocument { nodes, edges }, warnings))
    }
}

/// Pick `e<index>`, or the next free `e<N>` when that id is already used.
fn synthesize_edge_id(index: usize, taken: &HashSet<String>) -> String {
    let preferred = format!("e{index}");
    if !taken.contains(&preferred) {
        return preferred;
    }
    let used: HashSet<u64> = taken.iter().filter_map(|id| edge_suffix(id)).collect();
    format!("e{}", next_suffix(&used))
}

impl From<GraphDocument> for RawDocument {
    fn from(document: GraphDocument) -> Self {
        Self {
            nodes: document
                .nodes
                .into_iter()
                .map(|node| RawNode {
                    data: RawNodeData {
                        id: Some(node.data.id),
                        name: Some(node.data.name),
                        color: Some(node.data.color),
                        mass: Some(node.data.mass),
                        cog: Some(node.data.cog),
                        external_force: Some(node.data.external_force),
                        moment: Some(node.data.moment),
                        euler_angles: Some(node.data.euler_angles),
                        rotation_order: Some(node.data.rotation_order),
                        translation: Some(node.data.translation),
                    },
                    position: Some(node.position),
                })
                .collect(),
            edges: document
                .edges
                .into_iter()
                .map(|edge| RawEdge {
                    data: RawEdgeData {
                        id: Some(edge.data.id),
                        source: edge.data.source,
                        target: edge.data.target,
                    },
                })
                .collect(),
        }
    }
}
