//! The registry: sole owner of every node in an archive.
//!
//! Nodes live in an arena indexed by `NodeId`; insertion order is preserved
//! and is the root order for whole-archive workflows. A node can only be
//! added once everything it names already exists, so the graph is acyclic
//! by construction.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use hivearchive_core::error::{Error, Result};
use hivearchive_core::id::NodeId;
use hivearchive_core::node::{Node, RelationKind};

use crate::optimizer::ArchiveStats;
use crate::template::{self, TemplateSource};

pub struct Registry {
    name: String,
    nodes: Vec<Node>,
    index: HashMap<String, NodeId>,
    templates: Box<dyn TemplateSource>,
    /// Snapshot of the last optimization pass, if any.
    pub(crate) stats: Option<ArchiveStats>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("name", &self.name)
            .field("nodes", &self.nodes.len())
            .field("optimized", &self.stats.is_some())
            .finish()
    }
}

impl Registry {
    pub fn new(name: impl Into<String>, templates: impl TemplateSource + 'static) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            index: HashMap::new(),
            templates: Box::new(templates),
            stats: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register `node`. Fails without touching the registry if the name is
    /// taken or any dependency (input or insert target) is not registered.
    pub fn add(&mut self, node: Node) -> Result<NodeId> {
        if self.index.contains_key(&node.name) {
            return Err(Error::DuplicateName(node.name));
        }
        self.validate(&node)?;

        let id = NodeId::from_index(self.nodes.len());
        self.index.insert(node.name.clone(), id);
        self.nodes.push(node);
        // Any earlier optimization no longer covers the whole graph.
        self.stats = None;
        Ok(id)
    }

    /// Registered nodes were validated when they were added, so only the
    /// direct dependencies of `node` need checking.
    fn validate(&self, node: &Node) -> Result<()> {
        if let Some(dep) = node.dependencies().find(|d| !self.index.contains_key(*d)) {
            return Err(Error::UnregisteredInput {
                node: node.name.clone(),
                input: dep.to_string(),
            });
        }

        if let Some(target) = node.runnable().and_then(|r| r.write_target()) {
            // Fixed views can never be overwritten; a ViewUntilTable is
            // checked again once the optimizer has resolved it.
            let writable = self
                .index
                .get(target)
                .and_then(|id| self.nodes[id.index()].as_relation())
                .map_or(false, |r| r.kind != RelationKind::View);
            if !writable {
                return Err(Error::InvalidTarget {
                    node: node.name.clone(),
                    target: target.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&Node> {
        self.id(name).map(|id| &self.nodes[id.index()])
    }

    pub fn id(&self, name: &str) -> Result<NodeId> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// The node in slot `id`.
    ///
    /// # Panics
    /// If `id` was not issued by this registry.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId::from_index(i), n))
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(|i| NodeId::from_index(i))
    }

    /// Resolved dependency edges of `id`, inputs first, then the insert target.
    pub fn dependencies(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id.index()]
            .dependencies()
            .filter_map(move |name| self.index.get(name).copied())
    }

    /// Nodes nothing else depends on, in registration order.
    pub fn roots(&self) -> Vec<NodeId> {
        let mut referenced = HashSet::new();
        for id in self.ids() {
            referenced.extend(self.dependencies(id));
        }
        self.ids().filter(|id| !referenced.contains(id)).collect()
    }

    /// Every node reachable from `roots`, dependencies before dependents,
    /// each listed once.
    pub fn linearize(&self, roots: &[NodeId]) -> Vec<NodeId> {
        fn visit(reg: &Registry, id: NodeId, seen: &mut HashSet<NodeId>, out: &mut Vec<NodeId>) {
            if !seen.insert(id) {
                return;
            }
            for dep in reg.dependencies(id) {
                visit(reg, dep, seen, out);
            }
            out.push(id);
        }

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for &root in roots {
            visit(self, root, &mut seen, &mut out);
        }
        out
    }

    /// Databases in the order nodes first mention them.
    pub fn databases(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.nodes
            .iter()
            .filter_map(|n| n.database())
            .filter(|db| seen.insert(*db))
            .map(str::to_string)
            .collect()
    }

    pub fn templates(&self) -> &dyn TemplateSource {
        self.templates.as_ref()
    }

    /// Render the SQL body of `id` from its template.
    pub fn hql(&self, id: NodeId) -> Result<String> {
        let node = &self.nodes[id.index()];
        let mut bindings = BTreeMap::new();
        for input in &node.inputs {
            let qualified = self.lookup(input)?.qualified_name();
            bindings.insert(format!("inputs.{input}"), qualified);
        }
        if let Some(target) = node.runnable().and_then(|r| r.write_target()) {
            bindings.insert("target".to_string(), self.lookup(target)?.qualified_name());
        }

        let text = self.templates.load(&node.template)?;
        template::render(&node.template, &text, &bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::MemoryTemplates;

    fn registry() -> Registry {
        Registry::new("tests", MemoryTemplates::new())
    }

    #[test]
    fn lookup_returns_registered_node() {
        let mut reg = registry();
        let id = reg
            .add(Node::external_table("atomic", "events").partitioned())
            .unwrap();
        let events = reg.lookup("events").unwrap();
        assert_eq!(events.name, "events");
        assert_eq!(reg.node(id), events);
    }

    #[test]
    fn missing_lookup_is_not_found() {
        let reg = registry();
        assert!(matches!(reg.lookup("doesnotexist"), Err(Error::NotFound(_))));
    }

    #[test]
    fn names_are_unique_across_kinds() {
        let mut reg = registry();
        reg.add(Node::external_table("atomic", "events")).unwrap();
        let err = reg.add(Node::select("events")).unwrap_err();
        assert!(matches!(err, Error::DuplicateName(name) if name == "events"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn unregistered_input_leaves_registry_untouched() {
        let mut reg = registry();
        reg.add(Node::external_table("atomic", "events")).unwrap();

        // `doesnotexist` is built but never added.
        let err = reg
            .add(Node::view_until_table("atomic", "missing_input").with_inputs(["doesnotexist"]))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::UnregisteredInput { ref node, ref input }
                if node == "missing_input" && input == "doesnotexist"
        ));
        assert_eq!(reg.len(), 1);
        assert!(!reg.contains("missing_input"));
    }

    #[test]
    fn insert_target_must_be_registered_relation() {
        let mut reg = registry();
        reg.add(Node::external_table("atomic", "events")).unwrap();
        reg.add(Node::select("report").with_inputs(["events"]))
            .unwrap();

        let err = reg
            .add(Node::insert_overwrite("fill", "missing").with_inputs(["events"]))
            .unwrap_err();
        assert!(matches!(err, Error::UnregisteredInput { .. }));

        let err = reg
            .add(Node::insert_overwrite("fill", "report").with_inputs(["events"]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTarget { .. }));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn insert_target_cannot_be_a_view() {
        let mut reg = registry();
        reg.add(Node::external_table("atomic", "events")).unwrap();
        reg.add(Node::view("events", "searches").with_inputs(["events"]))
            .unwrap();
        reg.add(Node::view_until_table("events", "sessions").with_inputs(["events"]))
            .unwrap();

        let err = reg
            .add(Node::insert_overwrite("fill", "searches").with_inputs(["events"]))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTarget { ref node, ref target } if node == "fill" && target == "searches"
        ));
        assert!(reg
            .add(Node::insert_overwrite("fill", "sessions").with_inputs(["events"]))
            .is_ok());
    }

    #[test]
    fn roots_and_linearize_follow_edges() {
        let mut reg = registry();
        let events = reg.add(Node::external_table("atomic", "events")).unwrap();
        let a = reg
            .add(Node::view("events", "a").with_inputs(["events"]))
            .unwrap();
        let b = reg
            .add(Node::view("events", "b").with_inputs(["events"]))
            .unwrap();
        let top = reg
            .add(Node::table("out", "top").with_inputs(["a", "b"]))
            .unwrap();

        assert_eq!(reg.roots(), vec![top]);
        assert_eq!(reg.linearize(&[top]), vec![events, a, b, top]);
        assert_eq!(reg.databases(), vec!["atomic", "events", "out"]);
    }

    #[test]
    fn hql_binds_inputs_to_qualified_names() {
        let templates = MemoryTemplates::new()
            .with("events.hql", "LOCATION 's3://bucket/events'")
            .with("searches.hql", "SELECT * FROM {{ inputs.events }}");
        let mut reg = Registry::new("tests", templates);
        reg.add(Node::external_table("atomic", "events")).unwrap();
        let searches = reg
            .add(Node::view("events", "searches").with_inputs(["events"]))
            .unwrap();

        assert_eq!(reg.hql(searches).unwrap(), "SELECT * FROM atomic.events");
    }

    #[test]
    fn hql_missing_template_is_fatal() {
        let mut reg = registry();
        let misnamed = reg.add(Node::external_table("atomic", "misnamed")).unwrap();
        assert!(matches!(reg.hql(misnamed), Err(Error::Template { .. })));
    }
}
