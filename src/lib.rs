#![forbid(unsafe_code)]
//! hivearchive: compile a warehouse of interdependent Hive relations and
//! statements into ordered HQL scripts, and run them against a cluster.
//!
//! This crate re-exports the workspace members:
//! - [`core`]: nodes, ids, errors, configuration, hashing, run manifests
//! - [`planner`]: registry, optimizer, compiler, workflows, YAML definitions
//! - [`exec`]: confirmation gating, backends, polling with retry, `run_workflow`

pub use hivearchive_core as core;
pub use hivearchive_exec as exec;
pub use hivearchive_planner as planner;
