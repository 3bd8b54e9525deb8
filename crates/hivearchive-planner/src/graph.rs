//! Indented text rendering of the dependency graph.

use std::collections::HashSet;

use hivearchive_core::id::NodeId;

use crate::registry::Registry;

impl Registry {
    /// Every root tree under an `Archive: <name>` header. A node already
    /// printed elsewhere shows up again as `(qualified)` without children.
    pub fn graph(&self) -> String {
        let mut traversed = HashSet::new();
        let mut lines = vec![format!("Archive: {}", self.name())];
        for root in self.roots() {
            self.graph_lines(root, 0, &mut traversed, &mut lines);
        }
        lines.join("\n")
    }

    /// Tree rooted at `id` alone.
    pub fn graph_node(&self, id: NodeId) -> String {
        let mut lines = Vec::new();
        self.graph_lines(id, 0, &mut HashSet::new(), &mut lines);
        lines.join("\n")
    }

    fn graph_lines(
        &self,
        id: NodeId,
        offset: usize,
        traversed: &mut HashSet<NodeId>,
        lines: &mut Vec<String>,
    ) {
        let node = self.node(id);
        let tabs = "\t".repeat(offset);
        if !traversed.insert(id) {
            lines.push(format!("{tabs}({})", node.qualified_name()));
            return;
        }
        lines.push(format!("{tabs}{}({})", node.label(), node.qualified_name()));
        for dep in self.dependencies(id) {
            self.graph_lines(dep, offset + 1, traversed, lines);
        }
    }
}
