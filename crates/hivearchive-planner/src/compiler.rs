//! Graph linearization: subgraph → dependency-ordered statement blocks.
//!
//! A `Created` accumulator is threaded through one compile call so that each
//! node (and each `CREATE DATABASE` prelude) is emitted at most once, however
//! many paths reach it.

use std::collections::HashSet;

use hivearchive_core::error::{Error, Result};
use hivearchive_core::id::NodeId;
use hivearchive_core::node::{Materialization, NodeKind, Statement};

use crate::registry::Registry;
use crate::script::CompiledBlock;

/// What a compile call has already emitted.
#[derive(Debug, Default, Clone)]
pub struct Created {
    pub nodes: HashSet<NodeId>,
    pub databases: HashSet<String>,
}

impl Created {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct Compiler<'a> {
    registry: &'a Registry,
    /// When set, only these nodes emit blocks; everything else is still
    /// traversed for ordering.
    retain: Option<HashSet<NodeId>>,
}

impl<'a> Compiler<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            retain: None,
        }
    }

    /// Compiler that keeps TABLE nodes reachable from `roots` plus whatever
    /// they transitively read from.
    pub fn tables_only(registry: &'a Registry, roots: &[NodeId]) -> Result<Self> {
        let mut retain = HashSet::new();
        for id in registry.linearize(roots) {
            let node = registry.node(id);
            let Some(relation) = node.as_relation() else {
                continue;
            };
            let materialization = relation
                .materialization()
                .ok_or_else(|| Error::Unresolved(node.qualified_name()))?;
            if materialization == Materialization::Table {
                retain.extend(registry.linearize(&[id]));
            }
        }
        Ok(Self {
            registry,
            retain: Some(retain),
        })
    }

    fn retained(&self, id: NodeId) -> bool {
        self.retain.as_ref().map_or(true, |r| r.contains(&id))
    }

    /// Blocks for `root` and everything it depends on that `created` has not
    /// seen yet, dependencies first.
    pub fn compile_subgraph(&self, root: NodeId, created: &mut Created) -> Result<Vec<CompiledBlock>> {
        if created.nodes.contains(&root) {
            return Ok(Vec::new());
        }

        let mut blocks = self.compile_dependencies(root, created)?;
        if self.retained(root) {
            blocks.push(self.statement_block(root, created)?);
        }
        created.nodes.insert(root);
        Ok(blocks)
    }

    /// Blocks for the dependencies of `id` only (inputs, then insert target).
    pub fn compile_dependencies(&self, id: NodeId, created: &mut Created) -> Result<Vec<CompiledBlock>> {
        let mut blocks = Vec::new();
        for dep in self.registry.dependencies(id) {
            blocks.extend(self.compile_subgraph(dep, created)?);
        }
        Ok(blocks)
    }

    /// The node's own block. Claims its database prelude in `created` but
    /// does not mark the node itself.
    pub fn statement_block(&self, id: NodeId, created: &mut Created) -> Result<CompiledBlock> {
        let reg = self.registry;
        let node = reg.node(id);
        let qualified = node.qualified_name();

        let mut parts = vec![format!("-- hivearchive: {qualified}")];

        // Resolve before rendering so an unoptimized archive fails fast.
        let materialization = match &node.kind {
            NodeKind::Relation(r) => Some(
                r.materialization()
                    .ok_or_else(|| Error::Unresolved(qualified.clone()))?,
            ),
            NodeKind::Statement(_) => None,
        };

        let body = reg.hql(id)?;
        let body = body.trim().trim_end_matches(';').trim_end();

        if let Some(db) = node.database() {
            if created.databases.insert(db.to_string()) {
                parts.push(format!("CREATE DATABASE IF NOT EXISTS {db};"));
            }
        }
        for resource in &node.resources {
            parts.push(format!(
                "ADD {} {};",
                resource.kind.to_uppercase(),
                resource.path
            ));
        }
        for (key, value) in &node.settings {
            parts.push(format!("SET {key}={value};"));
        }

        match (&node.kind, materialization) {
            (NodeKind::Relation(_), Some(Materialization::ExternalTable)) => {
                parts.push(format!(
                    "CREATE EXTERNAL TABLE IF NOT EXISTS {qualified}\n{body}\n;"
                ));
                if node.materializable().map_or(false, |m| m.is_partitioned()) {
                    parts.push(recover_partitions(&qualified));
                }
            }
            (NodeKind::Relation(_), Some(m)) => {
                parts.push(format!(
                    "CREATE {} IF NOT EXISTS {qualified} AS\n{body}\n;",
                    m.create_keyword()
                ));
            }
            (NodeKind::Statement(Statement::Select), _) => {
                parts.push(format!("{body}\n;"));
            }
            (NodeKind::Statement(Statement::InsertOverwrite { target }), _) => {
                let target_node = reg.lookup(target)?;
                let target_kind = target_node
                    .as_relation()
                    .and_then(|r| r.materialization());
                if matches!(target_kind, None | Some(Materialization::View)) {
                    return Err(Error::InvalidTarget {
                        node: node.name.clone(),
                        target: target.clone(),
                    });
                }
                let target = target_node.qualified_name();
                parts.push(format!("INSERT OVERWRITE TABLE {target}\n{body}\n;"));
            }
            (NodeKind::Relation(_), None) => return Err(Error::Unresolved(qualified)),
        }

        Ok(CompiledBlock {
            node: Some(id),
            name: node.name.clone(),
            text: parts.join("\n"),
        })
    }
}

pub(crate) fn recover_partitions(qualified: &str) -> String {
    format!("ALTER TABLE {qualified} RECOVER PARTITIONS;")
}
