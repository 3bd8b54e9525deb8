//! Reference-counting pass that settles every `ViewUntilTable`.
//!
//! One depth-first walk per root, in registration order. Every visit counts
//! toward the node's references; only the first visit recurses into its
//! dependencies, so diamonds stay linear while shared nodes still accumulate
//! one reference per parent edge.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use hivearchive_core::error::{Error, Result};
use hivearchive_core::id::NodeId;
use hivearchive_core::node::{Materialization, NodeKind};

use crate::registry::Registry;

/// Whether ambiguous relations may be promoted to tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizeMode {
    #[default]
    Build,
    /// Every ambiguous relation stays a view.
    Develop,
}

/// Snapshot of one optimization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveStats {
    pub mode: OptimizeMode,
    pub depth: u32,
    pub database_references: BTreeMap<String, u32>,
    pub node_references: BTreeMap<String, u32>,
    pub unique_databases: BTreeSet<String>,
    pub unique_nodes: BTreeSet<String>,
}

impl ArchiveStats {
    /// References counted for `name`; zero for unreachable or unknown nodes.
    pub fn references(&self, name: &str) -> u32 {
        self.node_references.get(name).copied().unwrap_or(0)
    }

    pub fn databases(&self) -> usize {
        self.unique_databases.len()
    }

    pub fn nodes(&self) -> usize {
        self.unique_nodes.len()
    }
}

/// Transient walk state; discarded once decisions are committed.
#[derive(Default)]
struct Context {
    current_depth: u32,
    stats: ArchiveStats,
}

impl Context {
    fn walk(&mut self, reg: &Registry, id: NodeId) {
        let node = reg.node(id);

        self.current_depth += 1;
        self.stats.depth = self.stats.depth.max(self.current_depth);

        if let Some(db) = node.database() {
            *self
                .stats
                .database_references
                .entry(db.to_string())
                .or_insert(0) += 1;
            self.stats.unique_databases.insert(db.to_string());
        }

        let count = self
            .stats
            .node_references
            .entry(node.name.clone())
            .or_insert(0);
        *count += 1;
        let first_visit = *count == 1;
        self.stats.unique_nodes.insert(node.name.clone());

        if first_visit {
            for dep in reg.dependencies(id) {
                self.walk(reg, dep);
            }
        }

        self.current_depth -= 1;
    }
}

impl Registry {
    /// Count references from every root and resolve each ambiguous relation.
    ///
    /// Decisions are overwritten on every call, so running `Develop` then
    /// `Build` re-resolves correctly.
    pub fn optimize(&mut self, mode: OptimizeMode) -> ArchiveStats {
        let mut ctx = Context {
            stats: ArchiveStats {
                mode,
                ..ArchiveStats::default()
            },
            ..Context::default()
        };
        for root in self.roots() {
            ctx.walk(self, root);
        }
        let stats = ctx.stats;

        let ids: Vec<NodeId> = self.ids().collect();
        for id in ids {
            let references = stats.references(&self.node(id).name);
            let Some(relation) = self.node_mut(id).as_relation_mut() else {
                continue;
            };
            let Some(threshold) = relation.threshold() else {
                continue;
            };
            let decision = match mode {
                OptimizeMode::Develop => Materialization::View,
                OptimizeMode::Build if references >= threshold => Materialization::Table,
                OptimizeMode::Build => Materialization::View,
            };
            relation.resolve(decision);
        }

        tracing::debug!(
            archive = %self.name(),
            ?mode,
            depth = stats.depth,
            nodes = stats.nodes(),
            databases = stats.databases(),
            "optimized archive"
        );

        self.stats = Some(stats.clone());
        stats
    }

    /// Stats from the most recent `optimize`, if it has run since the last `add`.
    pub fn stats(&self) -> Option<&ArchiveStats> {
        self.stats.as_ref()
    }

    /// Qualified names grouped by resolved kind.
    pub fn show(&self) -> Result<Showcase> {
        if self.stats.is_none() {
            return Err(Error::NotOptimized);
        }

        let mut show = Showcase::default();
        for (_, node) in self.iter() {
            let name = node.qualified_name();
            match &node.kind {
                NodeKind::Statement(_) => show.statements.push(name),
                NodeKind::Relation(r) => match r.materialization() {
                    Some(Materialization::ExternalTable) => show.external_tables.push(name),
                    Some(Materialization::Table) => show.tables.push(name),
                    Some(Materialization::View) => show.views.push(name),
                    None => return Err(Error::Unresolved(name)),
                },
            }
        }
        Ok(show)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Showcase {
    pub external_tables: Vec<String>,
    pub tables: Vec<String>,
    pub views: Vec<String>,
    pub statements: Vec<String>,
}

impl fmt::Display for Showcase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sections = [
            ("External tables", &self.external_tables),
            ("Tables", &self.tables),
            ("Views", &self.views),
            ("Statements", &self.statements),
        ];
        for (i, (title, names)) in sections.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{title}:")?;
            for name in names.iter() {
                writeln!(f, "\t{name}")?;
            }
        }
        Ok(())
    }
}
