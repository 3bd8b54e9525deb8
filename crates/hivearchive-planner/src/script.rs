//! Compiled output: an ordered list of statement blocks.

use serde::Serialize;

use hivearchive_core::id::NodeId;

use crate::workflow::Workflow;

/// One node's worth of SQL (or one archive-level statement, e.g. a
/// `DROP DATABASE`, which has no node).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledBlock {
    #[serde(skip)]
    pub node: Option<NodeId>,
    pub name: String,
    pub text: String,
}

/// Blocks in execution order: each one only reads objects created by
/// blocks before it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Script {
    pub workflow: Workflow,
    pub target: Option<String>,
    pub blocks: Vec<CompiledBlock>,
}

impl Script {
    pub fn new(workflow: Workflow, target: Option<&str>) -> Self {
        Self {
            workflow,
            target: target.map(str::to_string),
            blocks: Vec::new(),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, node: Option<NodeId>, text: String) {
        self.blocks.push(CompiledBlock {
            node,
            name: name.into(),
            text,
        });
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Block texts, the unit handed to a backend.
    pub fn statements(&self) -> Vec<String> {
        self.blocks.iter().map(|b| b.text.clone()).collect()
    }

    /// Whole script as one string, blocks separated by a blank line.
    pub fn text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
