//! Debug-time verification helpers for compiled scripts.
//!
//! Meant for tests and debug builds; they panic on violation.

use std::collections::HashSet;

use hivearchive_core::id::NodeId;

use crate::registry::Registry;
use crate::script::Script;

/// Every node block comes after the blocks of the dependencies that were
/// compiled into the same script.
pub fn assert_dependency_order(registry: &Registry, script: &Script) {
    let present: HashSet<NodeId> = script.blocks.iter().filter_map(|b| b.node).collect();
    let mut seen = HashSet::<NodeId>::new();
    for block in &script.blocks {
        let Some(id) = block.node else {
            continue;
        };
        for dep in registry.dependencies(id) {
            assert!(
                !present.contains(&dep) || seen.contains(&dep),
                "dependency {} not emitted before block {}",
                registry.node(dep).name,
                block.name
            );
        }
        seen.insert(id);
    }
}

/// No node is emitted twice.
pub fn assert_unique_blocks(script: &Script) {
    let mut seen = HashSet::<NodeId>::new();
    for block in &script.blocks {
        if let Some(id) = block.node {
            assert!(seen.insert(id), "block {} emitted twice", block.name);
        }
    }
}
