//! Convenient re-exports for downstream crates.

pub use crate::config::{ArchiveConfig, BackendKind};
pub use crate::error::{Error, Result};
pub use crate::hash::Hash256;
pub use crate::id::NodeId;
pub use crate::manifest::{ManifestId, RunManifest};
pub use crate::node::{
    Materializable, Materialization, Node, NodeKind, Relation, RelationKind, Resource, Runnable,
    Statement, DEFAULT_TABLE_THRESHOLD,
};
