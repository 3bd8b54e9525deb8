#![forbid(unsafe_code)]
//! hivearchive-core: the node model shared by the planner and the executor.
//!
//! A warehouse is described as a graph of named nodes. Relations (external
//! tables, tables, views, and views that may be promoted to tables) define
//! objects in a database; statements (selects, insert-overwrites) act on them.
//!
//! No I/O and no templating live here; the planner owns traversal and the
//! exec crate owns the remote job service.

pub mod config;
pub mod error;
pub mod hash;
pub mod id;
pub mod manifest;
pub mod node;
pub mod prelude;

/// Version string stamped into run manifests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
