#![forbid(unsafe_code)]
//! hivearchive-planner: from archive definitions → registry → optimized
//! materialization decisions → ordered statement scripts.
//!
//! Design:
//! - The `Registry` owns every node in an arena; nodes reference each other
//!   by name and are resolved to `NodeId`s at registration time.
//! - `optimize` walks the graph once per workflow to count references and
//!   settle every `ViewUntilTable` as a view or a table.
//! - The compiler linearizes a subgraph into blocks, each node's DDL emitted
//!   exactly once and after everything it depends on.
//!
//! NOTE: No execution here. The exec crate hands scripts to a backend.

pub mod compiler;
pub mod dsl;
pub mod graph;
pub mod optimizer;
pub mod registry;
pub mod script;
pub mod template;
pub mod verify;
pub mod workflow;

pub use compiler::{Compiler, Created};
pub use dsl::yaml::{parse_archive, read_archive, ArchiveDefinition, DefinitionConfig, ParsedArchive};
pub use optimizer::{ArchiveStats, OptimizeMode, Showcase};
pub use registry::Registry;
pub use script::{CompiledBlock, Script};
pub use template::{DirTemplates, MemoryTemplates, TemplateSource};
pub use workflow::Workflow;
