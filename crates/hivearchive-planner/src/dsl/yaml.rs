//! YAML → Registry loader for archive definitions.
//!
//! Example:
//! ```yaml
//! name: tests
//! templates: hql            # relative to this file
//! config: { label: etl, table_threshold: 3 }
//! nodes:
//!   - { kind: external_table, name: events, database: atomic, partitioned: true }
//!   - { kind: view_until_table, name: searches, database: events, inputs: [events] }
//!   - kind: insert_overwrite
//!     name: fill_searches
//!     target: searches_daily
//!     inputs: [searches]
//!     settings: { hive.exec.dynamic.partition.mode: nonstrict }
//!     resources: [ { type: jar, path: "s3://jars/serde.jar" } ]
//! ```
//!
//! Nodes are registered in file order, so every input must appear above the
//! node that reads it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use hivearchive_core::config::ArchiveConfig;
use hivearchive_core::error::{Error, Result};
use hivearchive_core::node::{Node, Resource};

use crate::registry::Registry;
use crate::template::{DirTemplates, TemplateSource};

fn default_templates() -> String {
    "templates".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveDefinition {
    pub name: String,
    /// Template directory, relative to the definition file.
    #[serde(default = "default_templates")]
    pub templates: String,
    #[serde(default)]
    pub config: Option<DefinitionConfig>,
    pub nodes: Vec<NodeDef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKindDef {
    ExternalTable,
    Table,
    View,
    ViewUntilTable,
    Select,
    InsertOverwrite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDef {
    pub kind: NodeKindDef,
    pub name: String,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub partitioned: bool,
    #[serde(default)]
    pub threshold: Option<u32>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

impl NodeDef {
    fn invalid(&self, reason: &str) -> Error {
        Error::Definition(format!("node '{}': {reason}", self.name))
    }

    /// Build the node, applying `default_threshold` to a `view_until_table`
    /// that does not set its own.
    pub fn into_node(self, default_threshold: u32) -> Result<Node> {
        let is_relation = !matches!(self.kind, NodeKindDef::Select | NodeKindDef::InsertOverwrite);

        if self.partitioned && self.kind != NodeKindDef::ExternalTable {
            return Err(self.invalid("only external tables can be partitioned"));
        }
        if self.threshold.is_some() && self.kind != NodeKindDef::ViewUntilTable {
            return Err(self.invalid("only view_until_table takes a threshold"));
        }
        if self.target.is_some() && self.kind != NodeKindDef::InsertOverwrite {
            return Err(self.invalid("only insert_overwrite takes a target"));
        }
        if !is_relation && self.database.is_some() {
            return Err(self.invalid("statements do not belong to a database"));
        }

        let database = match (is_relation, &self.database) {
            (true, Some(db)) => db.clone(),
            (true, None) => return Err(self.invalid("relations need a database")),
            (false, _) => String::new(),
        };

        let mut node = match self.kind {
            NodeKindDef::ExternalTable => Node::external_table(database, &self.name),
            NodeKindDef::Table => Node::table(database, &self.name),
            NodeKindDef::View => Node::view(database, &self.name),
            NodeKindDef::ViewUntilTable => Node::view_until_table(database, &self.name)
                .with_threshold(self.threshold.unwrap_or(default_threshold)),
            NodeKindDef::Select => Node::select(&self.name),
            NodeKindDef::InsertOverwrite => {
                let target = self
                    .target
                    .as_deref()
                    .ok_or_else(|| self.invalid("insert_overwrite needs a target"))?;
                Node::insert_overwrite(&self.name, target)
            }
        };

        if self.partitioned {
            node = node.partitioned();
        }
        if let Some(template) = self.template {
            node = node.with_template(template);
        }
        node.inputs = self.inputs;
        node.settings = self.settings;
        node.resources = self.resources;
        Ok(node)
    }
}

/// Per-archive overrides of [`ArchiveConfig`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DefinitionConfig {
    pub label: Option<String>,
    pub backend: Option<String>,
    pub api_url: Option<String>,
    pub table_threshold: Option<u32>,
    pub poll_interval_ms: Option<u64>,
    pub max_retries: Option<usize>,
    pub backoff_factor: Option<u32>,
}

impl DefinitionConfig {
    pub fn apply(&self, cfg: &mut ArchiveConfig) -> Result<()> {
        if let Some(label) = &self.label {
            cfg.label = label.clone();
        }
        if let Some(backend) = &self.backend {
            cfg.backend = backend.parse()?;
        }
        if let Some(url) = &self.api_url {
            cfg.api_url = url.clone();
        }
        if let Some(v) = self.table_threshold {
            cfg.table_threshold = v;
        }
        if let Some(v) = self.poll_interval_ms {
            cfg.poll_interval_ms = v;
        }
        if let Some(v) = self.max_retries {
            cfg.max_retries = v;
        }
        if let Some(v) = self.backoff_factor {
            cfg.backoff_factor = v;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ParsedArchive {
    pub name: String,
    /// Template directory, resolved against the definition file when read
    /// from disk.
    pub templates: PathBuf,
    pub config: DefinitionConfig,
    pub nodes: Vec<NodeDef>,
}

impl ParsedArchive {
    /// Register every node in file order with templates read from disk.
    pub fn registry(self, default_threshold: u32) -> Result<Registry> {
        let templates = DirTemplates::new(self.templates.clone());
        self.registry_with(templates, default_threshold)
    }

    pub fn registry_with(
        self,
        templates: impl TemplateSource + 'static,
        default_threshold: u32,
    ) -> Result<Registry> {
        let mut registry = Registry::new(self.name, templates);
        for def in self.nodes {
            registry.add(def.into_node(default_threshold)?)?;
        }
        Ok(registry)
    }
}

pub fn parse_archive(yaml_src: &str) -> Result<ParsedArchive> {
    let doc: ArchiveDefinition =
        serde_yaml::from_str(yaml_src).map_err(|e| Error::Definition(e.to_string()))?;
    if doc.nodes.is_empty() {
        return Err(Error::Definition(format!("archive '{}' has no nodes", doc.name)));
    }
    Ok(ParsedArchive {
        name: doc.name,
        templates: PathBuf::from(doc.templates),
        config: doc.config.unwrap_or_default(),
        nodes: doc.nodes,
    })
}

/// Read and parse a definition file; a relative template directory is
/// resolved against the file's parent.
pub fn read_archive(path: &Path) -> Result<ParsedArchive> {
    let src = fs::read_to_string(path)
        .map_err(|e| Error::Definition(format!("cannot read {}: {e}", path.display())))?;
    let mut parsed = parse_archive(&src)?;
    if parsed.templates.is_relative() {
        if let Some(parent) = path.parent() {
            parsed.templates = parent.join(&parsed.templates);
        }
    }
    Ok(parsed)
}
