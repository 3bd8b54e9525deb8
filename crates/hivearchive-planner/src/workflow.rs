//! Workflow verbs and the scripts they compile to.
//!
//! Each verb either targets one node or the whole archive; the pair decides
//! which subgraph is compiled and how. Optimization is the caller's job (see
//! [`Workflow::optimize_mode`]) so that a workflow always runs over the
//! materialization decisions of its own mode.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use hivearchive_core::error::{Error, Result};
use hivearchive_core::id::NodeId;
use hivearchive_core::node::{Materialization, NodeKind};

use crate::compiler::{recover_partitions, Compiler, Created};
use crate::optimizer::OptimizeMode;
use crate::registry::Registry;
use crate::script::Script;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Workflow {
    DropAll,
    DropTables,
    Drop,
    Create,
    CreateTables,
    RecoverPartitions,
    Develop,
    Build,
    Run,
}

impl Workflow {
    pub const ALL: [Workflow; 9] = [
        Workflow::DropAll,
        Workflow::DropTables,
        Workflow::Drop,
        Workflow::Create,
        Workflow::CreateTables,
        Workflow::RecoverPartitions,
        Workflow::Develop,
        Workflow::Build,
        Workflow::Run,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Workflow::DropAll => "drop_all",
            Workflow::DropTables => "drop_tables",
            Workflow::Drop => "drop",
            Workflow::Create => "create",
            Workflow::CreateTables => "create_tables",
            Workflow::RecoverPartitions => "recover_partitions",
            Workflow::Develop => "develop",
            Workflow::Build => "build",
            Workflow::Run => "run",
        }
    }

    /// Mode the archive must be optimized in before compiling this verb.
    pub fn optimize_mode(self) -> OptimizeMode {
        match self {
            Workflow::Develop => OptimizeMode::Develop,
            _ => OptimizeMode::Build,
        }
    }

    pub fn allows_archive(self) -> bool {
        !matches!(self, Workflow::Drop | Workflow::Create)
    }

    pub fn allows_target(self) -> bool {
        !matches!(self, Workflow::DropAll | Workflow::DropTables)
    }

    fn unsupported(self, scope: impl Into<String>) -> Error {
        Error::Unsupported {
            verb: self.name().to_string(),
            scope: scope.into(),
        }
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Workflow {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().replace('-', "_").to_ascii_lowercase();
        Workflow::ALL
            .into_iter()
            .find(|w| w.name() == wanted)
            .ok_or_else(|| Error::Unsupported {
                verb: s.to_string(),
                scope: "any workflow".to_string(),
            })
    }
}

impl Registry {
    /// Compile `workflow` for `target`, or for the whole archive when `None`.
    ///
    /// The archive must already be optimized; an unresolved `ViewUntilTable`
    /// anywhere in the compiled subgraph is an error.
    pub fn compile(&self, workflow: Workflow, target: Option<&str>) -> Result<Script> {
        let mut script = Script::new(workflow, target);

        let target = match target {
            Some(name) if !workflow.allows_target() => {
                return Err(workflow.unsupported(format!("target '{name}'")))
            }
            Some(name) => Some(self.id(name)?),
            None if !workflow.allows_archive() => {
                return Err(workflow.unsupported(format!("archive '{}'", self.name())))
            }
            None => None,
        };

        match (workflow, target) {
            (Workflow::Build | Workflow::Develop, Some(id)) => {
                let compiler = Compiler::new(self);
                let mut created = Created::new();
                let blocks = match &self.node(id).kind {
                    NodeKind::Relation(_) => compiler.compile_subgraph(id, &mut created)?,
                    NodeKind::Statement(_) => compiler.compile_dependencies(id, &mut created)?,
                };
                script.blocks = blocks;
            }
            (Workflow::Build | Workflow::Develop, None) => {
                let compiler = Compiler::new(self);
                let mut created = Created::new();
                for (id, node) in self.iter() {
                    if node.as_relation().is_some() {
                        script.blocks.extend(compiler.compile_subgraph(id, &mut created)?);
                    }
                }
            }
            (Workflow::Run, Some(id)) => {
                if self.node(id).runnable().is_none() {
                    return Err(workflow.unsupported(self.scope(id)));
                }
                script.blocks = Compiler::new(self).compile_subgraph(id, &mut Created::new())?;
            }
            (Workflow::Run, None) => {
                let compiler = Compiler::new(self);
                let mut created = Created::new();
                for (id, node) in self.iter() {
                    if node.runnable().is_some() {
                        script.blocks.extend(compiler.compile_subgraph(id, &mut created)?);
                    }
                }
            }
            (Workflow::Create, Some(id)) => {
                if self.node(id).materializable().is_none() {
                    return Err(workflow.unsupported(self.scope(id)));
                }
                let block = Compiler::new(self).statement_block(id, &mut Created::new())?;
                script.blocks.push(block);
            }
            (Workflow::CreateTables, target) => {
                let roots = match target {
                    Some(id) => vec![id],
                    None => self.roots(),
                };
                let compiler = Compiler::tables_only(self, &roots)?;
                let mut created = Created::new();
                for root in roots {
                    script.blocks.extend(compiler.compile_subgraph(root, &mut created)?);
                }
            }
            (Workflow::Drop, Some(id)) => {
                let node = self.node(id);
                let relation = node
                    .as_relation()
                    .ok_or_else(|| workflow.unsupported(self.scope(id)))?;
                let m = relation
                    .materialization()
                    .ok_or_else(|| Error::Unresolved(node.qualified_name()))?;
                let q = node.qualified_name();
                script.push(&node.name, Some(id), format!("DROP {} IF EXISTS {q};", m.drop_keyword()));
            }
            (Workflow::DropAll, None) => {
                for db in self.databases() {
                    let text = format!("DROP DATABASE IF EXISTS {db} CASCADE;");
                    script.push(db, None, text);
                }
            }
            (Workflow::DropTables, None) => {
                let ids: Vec<NodeId> = self.ids().collect();
                for id in ids.into_iter().rev() {
                    let node = self.node(id);
                    let Some(relation) = node.as_relation() else {
                        continue;
                    };
                    let m = relation
                        .materialization()
                        .ok_or_else(|| Error::Unresolved(node.qualified_name()))?;
                    if m == Materialization::Table {
                        let q = node.qualified_name();
                        script.push(&node.name, Some(id), format!("DROP TABLE IF EXISTS {q};"));
                    }
                }
            }
            (Workflow::RecoverPartitions, target) => {
                let ids = match target {
                    Some(id) => self.linearize(&[id]),
                    None => self.ids().collect(),
                };
                for id in ids {
                    let node = self.node(id);
                    if node.materializable().map_or(false, |m| m.is_partitioned()) {
                        let text = recover_partitions(&node.qualified_name());
                        script.push(&node.name, Some(id), text);
                    }
                }
            }
            // Scope is checked above.
            (Workflow::Drop | Workflow::Create, None)
            | (Workflow::DropAll | Workflow::DropTables, Some(_)) => {
                return Err(workflow.unsupported("this scope"))
            }
        }

        tracing::debug!(
            workflow = %workflow,
            target = ?script.target,
            blocks = script.len(),
            "compiled script"
        );
        Ok(script)
    }

    fn scope(&self, id: NodeId) -> String {
        let node = self.node(id);
        format!("{} '{}'", node.label(), node.name)
    }
}
