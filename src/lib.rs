#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]
#![doc = include_str!("../README.md")]

pub mod config;
pub mod document;
mod errors;
mod geometry;
pub mod persistence;
mod store;
mod tracer;

pub use config::{Config, LayoutConfig};
pub use document::{
    Edge, EdgeData, GraphDocument, ImportWarning, Node, NodeData, RawDocument, DEFAULT_COLOR,
};
pub use errors::{ConfigError, ParseRotationOrderError, PersistenceError, StoreError, TraceError};
pub use geometry::{position, vec3, Position, RotationOrder, Vec3};
pub use persistence::export_file_name;
pub use store::{GraphStore, NodeProperties};
pub use tracer::{
    find_load_contributors, grounded_candidates, grounded_node, ContributorLoads,
    LoadContributors,
};
