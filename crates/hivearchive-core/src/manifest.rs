//! Run manifest for audit/replay.
//!
//! The executor emits a manifest after a workflow finishes; compiling the same
//! archive again yields the same `script_hash`, so two runs can be compared
//! without storing the statements themselves.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hash::Hash256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestId(pub Uuid);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub id: ManifestId,

    /// Workflow verb that produced the script (e.g. `build`).
    pub workflow: String,

    /// Target node, or `None` for whole-archive workflows.
    pub target: Option<String>,

    /// Stable hash of the compiled statements, in execution order.
    pub script_hash: Hash256,

    /// Hash of the whole script, block names and scope included; differs
    /// from `script_hash` when two workflows emit the same statements.
    pub plan_hash: Hash256,

    pub statements: usize,

    /// Cluster label the jobs ran on.
    pub label: String,

    /// Version string for provenance.
    pub version: String,

    /// Milliseconds since Unix epoch (UTC).
    pub started_ms: u64,
    pub finished_ms: u64,
}

impl RunManifest {
    pub fn new(
        workflow: impl Into<String>,
        target: Option<String>,
        script_hash: Hash256,
        plan_hash: Hash256,
        statements: usize,
        label: impl Into<String>,
        started_ms: u64,
    ) -> Self {
        Self {
            id: ManifestId(Uuid::new_v4()),
            workflow: workflow.into(),
            target,
            script_hash,
            plan_hash,
            statements,
            label: label.into(),
            version: crate::VERSION.to_string(),
            started_ms,
            finished_ms: started_ms,
        }
    }

    pub fn finish(mut self, finished_ms: u64) -> Self {
        self.finished_ms = finished_ms;
        self
    }
}
