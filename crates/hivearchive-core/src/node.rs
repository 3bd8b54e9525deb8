//! Graph nodes: relations (things that exist in a database) and statements
//! (actions run against them).
//!
//! Nodes name their dependencies instead of holding them; the registry in
//! `hivearchive-planner` owns every node and resolves names to `NodeId`s.
//!
//! Two capability traits split what a node can do:
//! - [`Materializable`] for relations (create, drop, build).
//! - [`Runnable`] for statements (run).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Reference count at which a `ViewUntilTable` is promoted to a table.
pub const DEFAULT_TABLE_THRESHOLD: u32 = 3;

/// How a relation exists in its database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Materialization {
    ExternalTable,
    Table,
    View,
}

impl Materialization {
    /// Object keyword used by `CREATE ... IF NOT EXISTS`.
    pub fn create_keyword(self) -> &'static str {
        match self {
            Materialization::ExternalTable => "EXTERNAL TABLE",
            Materialization::Table => "TABLE",
            Materialization::View => "VIEW",
        }
    }

    /// Object keyword used by `DROP ... IF EXISTS`.
    pub fn drop_keyword(self) -> &'static str {
        match self {
            Materialization::ExternalTable | Materialization::Table => "TABLE",
            Materialization::View => "VIEW",
        }
    }
}

/// A session resource added before a node's statement, e.g. a serde JAR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationKind {
    /// Backed by data produced outside the archive.
    ExternalTable { partitioned: bool },
    Table,
    View,
    /// A view until enough nodes read from it; `resolved` is unset until the
    /// optimizer runs and is overwritten on every optimization pass.
    ViewUntilTable {
        threshold: u32,
        resolved: Option<Materialization>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub database: String,
    pub kind: RelationKind,
}

impl Relation {
    /// The resolved materialization, or `None` for an unoptimized `ViewUntilTable`.
    pub fn materialization(&self) -> Option<Materialization> {
        match &self.kind {
            RelationKind::ExternalTable { .. } => Some(Materialization::ExternalTable),
            RelationKind::Table => Some(Materialization::Table),
            RelationKind::View => Some(Materialization::View),
            RelationKind::ViewUntilTable { resolved, .. } => *resolved,
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self.kind, RelationKind::ViewUntilTable { .. })
    }

    /// Promotion threshold for ambiguous relations.
    pub fn threshold(&self) -> Option<u32> {
        match &self.kind {
            RelationKind::ViewUntilTable { threshold, .. } => Some(*threshold),
            _ => None,
        }
    }

    /// Record the optimizer's decision. Fixed kinds ignore it.
    pub fn resolve(&mut self, decision: Materialization) {
        if let RelationKind::ViewUntilTable { resolved, .. } = &mut self.kind {
            *resolved = Some(decision);
        }
    }

    pub fn label(&self) -> &'static str {
        match &self.kind {
            RelationKind::ExternalTable { .. } => "ExternalTable",
            RelationKind::Table => "Table",
            RelationKind::View => "View",
            RelationKind::ViewUntilTable { .. } => "ViewUntilTable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statement {
    Select,
    /// Overwrites `target`, which must be a registered relation.
    InsertOverwrite { target: String },
}

impl Statement {
    pub fn label(&self) -> &'static str {
        match self {
            Statement::Select => "Select",
            Statement::InsertOverwrite { .. } => "InsertOverwrite",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Relation(Relation),
    Statement(Statement),
}

/// Capability of nodes that define an object in a database.
pub trait Materializable {
    fn database(&self) -> &str;

    /// `None` until an ambiguous relation has been resolved.
    fn materialization(&self) -> Option<Materialization>;

    /// Whether partitions must be recovered after creation.
    fn is_partitioned(&self) -> bool;
}

/// Capability of nodes that execute DML.
pub trait Runnable {
    /// Relation written by the statement, if any.
    fn write_target(&self) -> Option<&str>;
}

impl Materializable for Relation {
    fn database(&self) -> &str {
        &self.database
    }

    fn materialization(&self) -> Option<Materialization> {
        Relation::materialization(self)
    }

    fn is_partitioned(&self) -> bool {
        matches!(self.kind, RelationKind::ExternalTable { partitioned: true })
    }
}

impl Runnable for Statement {
    fn write_target(&self) -> Option<&str> {
        match self {
            Statement::Select => None,
            Statement::InsertOverwrite { target } => Some(target),
        }
    }
}

/// A named, templated unit of SQL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    /// Template identifier handed to the template collaborator.
    pub template: String,
    /// Names of the nodes this one reads from, in declared order.
    pub inputs: Vec<String>,
    pub kind: NodeKind,
    pub settings: BTreeMap<String, String>,
    pub resources: Vec<Resource>,
}

impl Node {
    fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        let name = name.into();
        Self {
            template: format!("{name}.hql"),
            name,
            inputs: Vec::new(),
            kind,
            settings: BTreeMap::new(),
            resources: Vec::new(),
        }
    }

    fn relation(database: impl Into<String>, name: impl Into<String>, kind: RelationKind) -> Self {
        Self::new(
            name,
            NodeKind::Relation(Relation {
                database: database.into(),
                kind,
            }),
        )
    }

    pub fn external_table(database: impl Into<String>, name: impl Into<String>) -> Self {
        Self::relation(
            database,
            name,
            RelationKind::ExternalTable { partitioned: false },
        )
    }

    pub fn table(database: impl Into<String>, name: impl Into<String>) -> Self {
        Self::relation(database, name, RelationKind::Table)
    }

    pub fn view(database: impl Into<String>, name: impl Into<String>) -> Self {
        Self::relation(database, name, RelationKind::View)
    }

    pub fn view_until_table(database: impl Into<String>, name: impl Into<String>) -> Self {
        Self::relation(
            database,
            name,
            RelationKind::ViewUntilTable {
                threshold: DEFAULT_TABLE_THRESHOLD,
                resolved: None,
            },
        )
    }

    pub fn select(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Statement(Statement::Select))
    }

    pub fn insert_overwrite(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(
            name,
            NodeKind::Statement(Statement::InsertOverwrite {
                target: target.into(),
            }),
        )
    }

    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.extend(inputs.into_iter().map(Into::into));
        self
    }

    /// Marks an external table as partitioned; no effect on other kinds.
    pub fn partitioned(mut self) -> Self {
        if let NodeKind::Relation(Relation {
            kind: RelationKind::ExternalTable { partitioned },
            ..
        }) = &mut self.kind
        {
            *partitioned = true;
        }
        self
    }

    /// Overrides the promotion threshold of a `ViewUntilTable`.
    pub fn with_threshold(mut self, value: u32) -> Self {
        if let NodeKind::Relation(Relation {
            kind: RelationKind::ViewUntilTable { threshold, .. },
            ..
        }) = &mut self.kind
        {
            *threshold = value;
        }
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    pub fn with_resource(mut self, kind: impl Into<String>, path: impl Into<String>) -> Self {
        self.resources.push(Resource {
            kind: kind.into(),
            path: path.into(),
        });
        self
    }

    /// `database.name` for relations, the bare name for statements.
    pub fn qualified_name(&self) -> String {
        match &self.kind {
            NodeKind::Relation(r) => format!("{}.{}", r.database, self.name),
            NodeKind::Statement(_) => self.name.clone(),
        }
    }

    pub fn database(&self) -> Option<&str> {
        self.as_relation().map(|r| r.database.as_str())
    }

    pub fn as_relation(&self) -> Option<&Relation> {
        match &self.kind {
            NodeKind::Relation(r) => Some(r),
            NodeKind::Statement(_) => None,
        }
    }

    pub fn as_relation_mut(&mut self) -> Option<&mut Relation> {
        match &mut self.kind {
            NodeKind::Relation(r) => Some(r),
            NodeKind::Statement(_) => None,
        }
    }

    pub fn as_statement(&self) -> Option<&Statement> {
        match &self.kind {
            NodeKind::Statement(s) => Some(s),
            NodeKind::Relation(_) => None,
        }
    }

    pub fn materializable(&self) -> Option<&dyn Materializable> {
        self.as_relation().map(|r| r as &dyn Materializable)
    }

    pub fn runnable(&self) -> Option<&dyn Runnable> {
        self.as_statement().map(|s| s as &dyn Runnable)
    }

    /// Every edge out of this node: declared inputs first, then the write
    /// target of an insert-overwrite.
    pub fn dependencies(&self) -> impl Iterator<Item = &str> + '_ {
        let target = self.runnable().and_then(|r| r.write_target());
        self.inputs.iter().map(String::as_str).chain(target)
    }

    pub fn label(&self) -> &'static str {
        match &self.kind {
            NodeKind::Relation(r) => r.label(),
            NodeKind::Statement(s) => s.label(),
        }
    }
}
