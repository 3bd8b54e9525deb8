//! Template collaborator: turns a node's template plus its input names into
//! the SQL body that the compiler wraps in DDL/DML.
//!
//! Templates are plain HQL with `{{ inputs.<name> }}` placeholders (also
//! accepted: `{{ inputs['<name>'] }}`). An insert-overwrite may also use
//! `{{ target }}`. A missing template or an unknown placeholder is fatal.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use hivearchive_core::error::{Error, Result};

/// Source of raw template text, keyed by template identifier (`<name>.hql`).
pub trait TemplateSource: Send + Sync {
    fn load(&self, template: &str) -> Result<String>;
}

/// Reads templates from a directory on disk.
#[derive(Debug, Clone)]
pub struct DirTemplates {
    root: PathBuf,
}

impl DirTemplates {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl TemplateSource for DirTemplates {
    fn load(&self, template: &str) -> Result<String> {
        let path = self.root.join(template);
        fs::read_to_string(&path).map_err(|e| Error::Template {
            template: template.to_string(),
            reason: format!("cannot read {}: {e}", path.display()),
        })
    }
}

/// HashMap-backed templates, for tests and embedded archives.
#[derive(Debug, Clone, Default)]
pub struct MemoryTemplates {
    data: HashMap<String, String>,
}

impl MemoryTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, template: impl Into<String>, text: impl Into<String>) {
        self.data.insert(template.into(), text.into());
    }

    /// Builder form of [`MemoryTemplates::insert`].
    pub fn with(mut self, template: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(template, text);
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl TemplateSource for MemoryTemplates {
    fn load(&self, template: &str) -> Result<String> {
        self.data
            .get(template)
            .cloned()
            .ok_or_else(|| Error::Template {
                template: template.to_string(),
                reason: "template not found".to_string(),
            })
    }
}

/// Substitute `{{ key }}` placeholders from `bindings`.
///
/// Keys are `inputs.<name>` and `target`; the bracketed form
/// `inputs['<name>']` is normalized to the dotted one.
pub fn render(template: &str, text: &str, bindings: &BTreeMap<String, String>) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find("}}").ok_or_else(|| Error::Template {
            template: template.to_string(),
            reason: "unclosed '{{' placeholder".to_string(),
        })?;
        let key = normalize_key(after[..end].trim());
        let value = bindings.get(&key).ok_or_else(|| Error::Template {
            template: template.to_string(),
            reason: format!("unknown placeholder '{key}'"),
        })?;
        out.push_str(value);
        rest = &after[end + 2..];
    }
    out.push_str(rest);

    Ok(out)
}

fn normalize_key(raw: &str) -> String {
    if let Some(inner) = raw
        .strip_prefix("inputs[")
        .and_then(|s| s.strip_suffix(']'))
    {
        let name = inner.trim().trim_matches(|c| c == '\'' || c == '"');
        return format!("inputs.{name}");
    }
    raw.to_string()
}
