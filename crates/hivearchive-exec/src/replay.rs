//! Provenance helpers.
//!
//! Compiling the same archive state twice yields the same script, so the
//! script hash identifies what a run executed.

use hivearchive_core::hash::{hash_serde, hash_statements, Hash256};
use hivearchive_planner::Script;

use crate::error::{ExecError, Result};

/// Hash of the statements in execution order.
pub fn hash_script(script: &Script) -> Hash256 {
    hash_statements(&script.statements())
}

/// Hash of the full script including workflow, target, and block names.
pub fn hash_script_serde(script: &Script) -> Result<Hash256> {
    hash_serde(script).map_err(|e| ExecError::Hash(e.to_string()))
}
