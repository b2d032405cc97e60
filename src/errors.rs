//! Error types produced while editing, tracing or persisting load-path graphs.

use std::path::PathBuf;

use thiserror::Error;

/// Error returned when a mutation of a [`GraphStore`](crate::GraphStore) is rejected.
///
/// A rejected mutation never changes the document, so callers can report the error
/// and carry on editing.
///
/// # Examples
///
/// ```
/// use loadpath::{GraphStore, StoreError};
///
/// let mut store = GraphStore::new();
/// let error = store.connect("X", "Y").expect_err("unknown node is rejected");
/// assert_eq!(error, StoreError::UnknownNode("X".to_string()));
/// assert!(store.document().edges.is_empty());
/// ```
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Returned when a node id is not part of the document.
    #[error("node {0:?} does not exist in this load path")]
    UnknownNode(String),
    /// Returned when a connection would join a node to itself.
    #[error("cannot connect node {0:?} to itself")]
    SelfLoop(String),
    /// Returned when a rename would give two nodes the same id.
    #[error("cannot rename {from:?} to {to:?}: a node with that name already exists")]
    NameCollision {
        /// Current id of the node being renamed.
        from: String,
        /// Requested name, already taken by another node.
        to: String,
    },
    /// Returned when a value is NaN or infinite; JSON cannot carry it.
    #[error("{field} of node {node:?} must be a finite number")]
    NonFinite {
        /// Node being edited.
        node: String,
        /// Offending property.
        field: &'static str,
    },
}

/// Error returned when a load-contributor trace cannot be produced.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TraceError {
    /// Returned when no connection carries the requested id.
    #[error("edge with id {0:?} not found in the load path")]
    EdgeNotFound(String),
}

/// Error returned when a document cannot be imported or exported.
///
/// Import failures leave the current document untouched.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Returned when the file name does not look like a JSON document.
    #[error("{0} is not a JSON file; please choose a .json document")]
    NotJson(PathBuf),
    /// Returned when reading or writing a file fails.
    #[error("failed to access {path}: {source}")]
    Io {
        /// File being read or written.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// Returned when the content is not valid JSON or lacks required keys.
    #[error("malformed load path document: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Returned when a node carries neither an id nor a name.
    #[error("node at position {index} has neither an id nor a name")]
    MissingNodeName {
        /// Zero-based position of the node in the imported list.
        index: usize,
    },
}

/// Error returned when the configuration cannot be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Returned when the configuration file cannot be read.
    #[error("failed to read configuration {path}: {source}")]
    Io {
        /// Configuration file path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// Returned when the configuration file is not valid TOML.
    #[error("invalid configuration {path}: {source}")]
    Parse {
        /// Configuration file path.
        path: PathBuf,
        /// Underlying parse failure.
        #[source]
        source: toml::de::Error,
    },
    /// Returned when a layout range is empty, reversed or not finite.
    #[error("layout range {axis} must satisfy min < max (received [{min}, {max}])")]
    InvalidRange {
        /// Name of the offending axis.
        axis: &'static str,
        /// Lower bound supplied.
        min: f64,
        /// Upper bound supplied.
        max: f64,
    },
    /// Returned when no colours are configured.
    #[error("layout palette must contain at least one colour")]
    EmptyPalette,
}

/// Error returned when a rotation order string is not one of the six axis sequences.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown rotation order {0:?}; expected one of xyz, xzy, yxz, yzx, zxy, zyx")]
pub struct ParseRotationOrderError(pub String);
