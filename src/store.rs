//! The graph store: the single owner of a load-path document.
//!
//! Every mutation either succeeds and leaves the document consistent, or is
//! rejected and leaves it untouched.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::config::LayoutConfig;
use crate::document::{
    Edge, GraphDocument, ImportWarning, Node, NodeData, RawDocument, DEFAULT_COLOR,
};
use crate::errors::{PersistenceError, StoreError};
use crate::geometry::{Position, RotationOrder, Vec3};
use crate::persistence;

/// Values submitted from a node property form.
///
/// Every absent numeric entry is stored as `0.0` and an absent rotation order as
/// [`RotationOrder::Xyz`]. Build one from existing data with
/// `NodeProperties::from(&node.data)` to edit only selected fields.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeProperties {
    /// New name (and id). Empty or absent keeps the current name.
    pub name: Option<String>,
    /// Mass in kilograms.
    pub mass: Option<f64>,
    /// Centre of gravity components.
    pub cog: [Option<f64>; 3],
    /// External force components.
    pub external_force: [Option<f64>; 3],
    /// External moment components.
    pub moment: [Option<f64>; 3],
    /// Euler angle components in degrees.
    pub euler_angles: [Option<f64>; 3],
    /// Rotation order.
    pub rotation_order: Option<RotationOrder>,
    /// Translation components.
    pub translation: [Option<f64>; 3],
}

impl From<&NodeData> for NodeProperties {
    fn from(data: &NodeData) -> Self {
        let some = |v: Vec3| v.to_array().map(Some);
        Self {
            name: Some(data.name.clone()),
            mass: Some(data.mass),
            cog: some(data.cog),
            external_force: some(data.external_force),
            moment: some(data.moment),
            euler_angles: some(data.euler_angles),
            rotation_order: Some(data.rotation_order),
            translation: some(data.translation),
        }
    }
}

impl NodeProperties {
    /// Name of the first numeric field holding NaN or an infinity.
    fn non_finite_field(&self) -> Option<&'static str> {
        let finite = |values: &[Option<f64>]| values.iter().flatten().all(|v| v.is_finite());
        [
            ("mass", finite(&[self.mass])),
            ("cog", finite(&self.cog)),
            ("external_force", finite(&self.external_force)),
            ("moment", finite(&self.moment)),
            ("euler_angles", finite(&self.euler_angles)),
            ("translation", finite(&self.translation)),
        ]
        .into_iter()
        .find_map(|(field, ok)| (!ok).then_some(field))
    }
}

/// Collapse form entries into a vector, treating absent entries as zero.
fn coerce(components: [Option<f64>; 3]) -> Vec3 {
    Vec3::from(components.map(|value| value.unwrap_or(0.0)))
}

/// Draw a value from `[min, max]`, or `min` when the range is empty.
fn sample(rng: &mut StdRng, [min, max]: [f64; 2]) -> f64 {
    if min < max {
        rng.gen_range(min..=max)
    } else {
        min
    }
}

/// Container for an editable load-path graph.
#[derive(Clone, Debug)]
pub struct GraphStore {
    /// The authoritative document.
    document: GraphDocument,
    /// Placement rules for new nodes.
    layout: LayoutConfig,
    /// Source of node positions and colours.
    rng: StdRng,
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphStore {
    /// Create an empty store with the default layout.
    ///
    /// # Examples
    /// ```
    /// use loadpath::GraphStore;
    ///
    /// let store = GraphStore::new();
    /// assert_eq!(store.node_count(), 0);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::with_layout(LayoutConfig::default())
    }

    /// Create an empty store that places new nodes according to `layout`.
    #[must_use]
    pub fn with_layout(layout: LayoutConfig) -> Self {
        Self {
            document: GraphDocument::new(),
            layout,
            rng: StdRng::from_entropy(),
        }
    }

    /// Make node placement reproducible.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Create a store holding the sanitized form of `raw`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::MissingNodeName`] when a node has no identity.
    pub fn from_document(raw: RawDocument) -> Result<(Self, Vec<ImportWarning>), PersistenceError> {
        let mut store = Self::new();
        let warnings = store.replace_document(raw)?;
        Ok((store, warnings))
    }

    /// Replace the whole document with the sanitized form of `raw`.
    ///
    /// The current document is kept when sanitization fails.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::MissingNodeName`] when a node has no identity.
    pub fn replace_document(
        &mut self,
        raw: RawDocument,
    ) -> Result<Vec<ImportWarning>, PersistenceError> {
        let (document, warnings) = raw.sanitize()?;
        tracing::debug!(
            nodes = document.nodes.len(),
            edges = document.edges.len(),
            "document replaced"
        );
        self.document = document;
        Ok(warnings)
    }

    /// Borrow the current document.
    #[must_use]
    pub fn document(&self) -> &GraphDocument {
        &self.document
    }

    /// Snapshot of the current document.
    #[must_use]
    pub fn to_document(&self) -> GraphDocument {
        self.document.clone()
    }

    /// Consume the store and return its document.
    #[must_use]
    pub fn into_document(self) -> GraphDocument {
        self.document
    }

    /// Return the number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.document.nodes.len()
    }

    /// Return the number of edges, including any dangling ones.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.document.edges.len()
    }

    /// Renderable connections as `(source, target)` pairs, in document order.
    pub fn connections(&self) -> impl Iterator<Item = (&str, &str)> {
        self.document
            .valid_edges()
            .map(|edge| (edge.source(), edge.target()))
    }

    /// Position of the node with `id` in the node list.
    fn node_index(&self, id: &str) -> Result<usize, StoreError> {
        self.document
            .nodes
            .iter()
            .position(|node| node.id() == id)
            .ok_or_else(|| StoreError::UnknownNode(id.to_string()))
    }

    /// Add a node named `Node<N>` with default properties at a random position.
    ///
    /// `N` is the smallest non-negative integer whose name is unused.
    ///
    /// # Examples
    /// ```
    /// use loadpath::GraphStore;
    ///
    /// let mut store = GraphStore::new();
    /// assert_eq!(store.add_node().id(), "Node0");
    /// assert_eq!(store.add_node().id(), "Node1");
    /// ```
    pub fn add_node(&mut self) -> Node {
        let mut counter = 0_usize;
        let name = loop {
            let candidate = format!("Node{counter}");
            if !self.document.contains_node(&candidate) {
                break candidate;
            }
            counter += 1;
        };
        let color = self
            .layout
            .palette
            .choose(&mut self.rng)
            .map_or(DEFAULT_COLOR, String::as_str)
            .to_string();
        let position = Position::new(
            sample(&mut self.rng, self.layout.x_range),
            sample(&mut self.rng, self.layout.y_range),
        );
        let node = Node {
            data: NodeData::new(name, color),
            position,
        };
        tracing::debug!(node = node.id(), "node added");
        self.document.nodes.push(node.clone());
        node
    }

    /// Remove a node and every edge attached to it.
    ///
    /// Returns the removed node, or `None` when no node has this id.
    pub fn delete_node(&mut self, id: &str) -> Option<Node> {
        let index = self.node_index(id).ok()?;
        let node = self.document.nodes.remove(index);
        let before = self.document.edges.len();
        self.document.edges.retain(|edge| !edge.touches(id));
        tracing::debug!(
            node = id,
            edges_removed = before - self.document.edges.len(),
            "node deleted"
        );
        Some(node)
    }

    /// Rename a node, changing its id and rewriting every edge that refers to it.
    ///
    /// An empty name, or the node's current name, leaves the document unchanged.
    /// Returns whether the node was renamed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownNode`] when `id` is not part of the document and
    /// [`StoreError::NameCollision`] when another node already uses `new_name`.
    ///
    /// # Examples
    /// ```
    /// use loadpath::GraphStore;
    ///
    /// let mut store = GraphStore::new();
    /// store.add_node();
    /// store.add_node();
    /// let edge = store.connect("Node0", "Node1").expect("both nodes exist");
    /// store.rename_node("Node0", "Pump").expect("name is free");
    /// assert_eq!(store.document().edge(edge.id()).unwrap().source(), "Pump");
    /// ```
    pub fn rename_node(&mut self, id: &str, new_name: &str) -> Result<bool, StoreError> {
        let index = self.node_index(id)?;
        let new_name = new_name.trim();
        if new_name.is_empty() || new_name == id {
            return Ok(false);
        }
        if self.document.contains_node(new_name) {
            return Err(StoreError::NameCollision {
                from: id.to_string(),
                to: new_name.to_string(),
            });
        }
        let data = &mut self.document.nodes[index].data;
        data.id = new_name.to_string();
        data.name = new_name.to_string();
        for edge in &mut self.document.edges {
            if edge.data.source == id {
                edge.data.source = new_name.to_string();
            }
            if edge.data.target == id {
                edge.data.target = new_name.to_string();
            }
        }
        tracing::debug!(from = id, to = new_name, "node renamed");
        Ok(true)
    }

    /// Connect `source` to `target` so that `source` transmits load to `target`.
    ///
    /// Any existing edge between the two nodes, in either direction, is replaced.
    /// The new edge gets a fresh id one past the largest existing `e<N>` suffix.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownNode`] when either node is missing and
    /// [`StoreError::SelfLoop`] when `source == target`. The document is unchanged
    /// in both cases.
    pub fn connect(&mut self, source: &str, target: &str) -> Result<Edge, StoreError> {
        for id in [source, target] {
            if !self.document.contains_node(id) {
                return Err(StoreError::UnknownNode(id.to_string()));
            }
        }
        if source == target {
            return Err(StoreError::SelfLoop(source.to_string()));
        }
        let id = self.document.next_edge_id();
        let before = self.document.edges.len();
        self.document.edges.retain(|edge| !edge.joins(source, target));
        if self.document.edges.len() != before {
            tracing::debug!(source, target, "replacing existing connection");
        }
        let edge = Edge::new(id, source, target);
        tracing::debug!(edge = edge.id(), source, target, "nodes connected");
        self.document.edges.push(edge.clone());
        Ok(edge)
    }

    /// Remove the edge with this id.
    ///
    /// Returns the removed edge, or `None` when no edge has this id.
    pub fn disconnect(&mut self, edge_id: &str) -> Option<Edge> {
        let index = self
            .document
            .edges
            .iter()
            .position(|edge| edge.id() == edge_id)?;
        tracing::debug!(edge = edge_id, "edge removed");
        Some(self.document.edges.remove(index))
    }

    /// Apply a property form to a node.
    ///
    /// A non-empty name that differs from the current one renames the node first,
    /// under the rules of [`GraphStore::rename_node`]. Colour and position are kept.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownNode`] when `id` is not part of the document,
    /// [`StoreError::NameCollision`] when the new name is taken and
    /// [`StoreError::NonFinite`] for NaN or infinite values. Nothing is changed on
    /// error.
    pub fn update_node_properties(
        &mut self,
        id: &str,
        properties: NodeProperties,
    ) -> Result<(), StoreError> {
        self.node_index(id)?;
        if let Some(field) = properties.non_finite_field() {
            return Err(StoreError::NonFinite {
                node: id.to_string(),
                field,
            });
        }
        let mut current = id.to_string();
        if let Some(name) = properties.name.as_deref() {
            if self.rename_node(id, name)? {
                current = name.trim().to_string();
            }
        }
        let index = self.node_index(&current)?;
        let data = &mut self.document.nodes[index].data;
        data.mass = properties.mass.unwrap_or(0.0);
        data.cog = coerce(properties.cog);
        data.external_force = coerce(properties.external_force);
        data.moment = coerce(properties.moment);
        data.euler_angles = coerce(properties.euler_angles);
        data.rotation_order = properties.rotation_order.unwrap_or_default();
        data.translation = coerce(properties.translation);
        tracing::debug!(node = %current, "node properties updated");
        Ok(())
    }

    /// Move a node on the canvas.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownNode`] when `id` is not part of the document and
    /// [`StoreError::NonFinite`] when a coordinate is NaN or infinite.
    pub fn move_node(&mut self, id: &str, position: Position) -> Result<(), StoreError> {
        let index = self.node_index(id)?;
        if !(position.x.is_finite() && position.y.is_finite()) {
            return Err(StoreError::NonFinite {
                node: id.to_string(),
                field: "position",
            });
        }
        self.document.nodes[index].position = position;
        Ok(())
    }

    /// Replace the document with the contents of a JSON file.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] when the file is not JSON, cannot be read or is
    /// malformed. The current document is kept in that case.
    pub fn import_file(&mut self, path: &Path) -> Result<Vec<ImportWarning>, PersistenceError> {
        let raw = persistence::read_raw_document(path)?;
        let warnings = self.replace_document(raw)?;
        tracing::info!(
            path = %path.display(),
            nodes = self.node_count(),
            edges = self.edge_count(),
            warnings = warnings.len(),
            "imported load path"
        );
        Ok(warnings)
    }

    /// Write a timestamped snapshot of the document into `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Io`] when the file cannot be written.
    pub fn export_to_dir(
        &self,
        dir: &Path,
        timestamp: NaiveDateTime,
    ) -> Result<PathBuf, PersistenceError> {
        let path = dir.join(persistence::export_file_name(timestamp));
        persistence::write_document(&self.document, &path)?;
        tracing::info!(path = %path.display(), "exported load path");
        Ok(path)
    }
}
