//! Template renderer – binds one attendee's fields into a Tera template.
//!
//! Templates use Jinja2 syntax. Every column of the attendee table is exposed
//! under its own name (`{{ FirstName }}`, `{{ EventDate }}`, ...). Referencing
//! a name the table does not provide is an error for that record, not an
//! empty substitution.
//!
//! `{% extends %}`, `{% include %}` and `{% import %}` resolve against the
//! directory holding the main template. Only the files actually referenced
//! are read, so unrelated broken files next to the template are ignored.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tera::{Context, Tera};

use crate::error::{render_tera_chain, ForgeError};
use crate::records::AttendeeRecord;

static REFERENCE_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{%-?\s*(?:extends|include|import)\s+([^%]*)-?%\}").expect("static pattern")
});

static QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""([^"]+)"|'([^']+)'"#).expect("static pattern"));

/// A parsed certificate template, loaded once per batch.
pub struct CertificateTemplate {
    tera: Tera,
    name: String,
    path: PathBuf,
}

impl CertificateTemplate {
    /// Read and parse the template at `path`, along with every template it
    /// extends, includes or imports.
    ///
    /// Values are HTML-escaped when the file name ends in `.html`, `.htm`
    /// or `.xml`.
    pub fn load(path: &Path) -> Result<Self, ForgeError> {
        let load_err = |reason: String| ForgeError::TemplateLoad {
            path: path.to_path_buf(),
            reason,
        };
        let source = fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("certificate.html")
            .to_string();
        let root = path.parent().unwrap_or_else(|| Path::new(""));

        let mut sources = BTreeMap::new();
        let mut pending = referenced_names(&source);
        sources.insert(name.clone(), source);
        while let Some(dep) = pending.pop() {
            if sources.contains_key(&dep) {
                continue;
            }
            // Missing files are left for Tera to report with its own context.
            let Ok(text) = fs::read_to_string(root.join(&dep)) else {
                log::debug!("template '{dep}' referenced by {name} not found");
                continue;
            };
            pending.extend(referenced_names(&text));
            sources.insert(dep, text);
        }
        if sources.len() > 1 {
            log::debug!(
                "{name} pulls in {:?}",
                sources.keys().filter(|k| **k != name).collect::<Vec<_>>()
            );
        }

        Self::build(name, sources, path)
    }

    /// Parse a template from an in-memory string registered under `name`.
    pub fn from_source(name: &str, source: &str) -> Result<Self, ForgeError> {
        let sources = BTreeMap::from([(name.to_string(), source.to_string())]);
        Self::build(name.to_string(), sources, Path::new(name))
    }

    fn build(
        name: String,
        sources: BTreeMap<String, String>,
        path: &Path,
    ) -> Result<Self, ForgeError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(&sources)
            .map_err(|e| ForgeError::TemplateLoad {
                path: path.to_path_buf(),
                reason: render_tera_chain(&e),
            })?;
        log::debug!("parsed template '{name}' ({} files)", sources.len());
        Ok(Self {
            tera,
            name,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Substitute `record` into the template.
    pub fn render(&self, record: &AttendeeRecord) -> Result<String, tera::Error> {
        let mut context = Context::new();
        for (key, value) in record.fields() {
            context.insert(key.as_str(), value);
        }
        self.tera.render(&self.name, &context)
    }
}

/// Template names named literally in `extends`/`include`/`import` tags.
fn referenced_names(source: &str) -> Vec<String> {
    REFERENCE_TAG
        .captures_iter(source)
        .flat_map(|tag| {
            let args = tag.get(1).map_or("", |m| m.as_str());
            QUOTED
                .captures_iter(args)
                .filter_map(|q| q.get(1).or_else(|| q.get(2)))
                .map(|m| m.as_str().to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}
