//! Document store abstraction and a file-system implementation.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use roxmltree::{Document, ParsingOptions};

use crate::error::{MapperError, Result};
use crate::xml::Selector;

/// One XML document held by a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Store-relative identifier, e.g. `briefe/0001.xml`.
    pub id: String,
    /// Original XML text.
    pub source: Arc<str>,
}

impl Resource {
    pub fn new(id: impl Into<String>, source: impl Into<Arc<str>>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
        }
    }

    /// Parse the resource. DTDs are allowed.
    pub fn document(&self) -> Result<Document<'_>> {
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        Document::parse_with_options(&self.source, options).map_err(|source| {
            MapperError::ResourceParse {
                resource: self.id.clone(),
                source,
            }
        })
    }
}

/// Backing collection of XML documents.
pub trait DocumentStore: Send + Sync {
    /// Documents containing at least one node matched by `path`.
    fn retrieve_resources(&self, path: &Selector) -> Result<Vec<Resource>>;

    /// Identifiers of every resource currently in the store.
    fn list_resources(&self) -> Result<Vec<String>>;

    /// Identifiers of resources changed after `since`.
    fn modified_since(&self, since: DateTime<Utc>) -> Result<Vec<String>>;
}

/// Store reading `*.xml` files below `<root>/<collection>`.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    base: PathBuf,
}

impl DirectoryStore {
    #[must_use]
    pub fn new(root: impl AsRef<Path>, collection: &str) -> Self {
        Self {
            base: root.as_ref().join(collection.trim_start_matches('/')),
        }
    }

    /// Directory holding the collection.
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// All XML files below the collection directory, sorted by path.
    fn xml_files(&self) -> Result<Vec<PathBuf>> {
        if !self.base.is_dir() {
            return Err(MapperError::Config(format!(
                "Collection directory not found: {}",
                self.base.display()
            )));
        }
        let mut files = Vec::new();
        collect_xml_files(&self.base, &mut files)?;
        files.sort();
        Ok(files)
    }

    fn resource_id(&self, path: &Path) -> String {
        path.strip_prefix(&self.base)
            .unwrap_or(path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn read(&self, path: &Path) -> Result<Resource> {
        let source = fs::read_to_string(path)?;
        Ok(Resource::new(self.resource_id(path), source))
    }
}

fn collect_xml_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_xml_files(&path, files)?;
        } else if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("xml")) {
            files.push(path);
        }
    }
    Ok(())
}

impl DocumentStore for DirectoryStore {
    fn retrieve_resources(&self, path: &Selector) -> Result<Vec<Resource>> {
        let mut resources = Vec::new();
        for file in self.xml_files()? {
            let resource = match self.read(&file) {
                Ok(resource) => resource,
                Err(err) => {
                    tracing::warn!(error = %err, path = %file.display(), "Failed to read document, skipping");
                    continue;
                }
            };
            let matched = match resource.document() {
                Ok(doc) => !path.select(doc.root()).is_empty(),
                Err(err) => {
                    tracing::warn!(error = %err, "Skipping unparseable document");
                    continue;
                }
            };
            if matched {
                resources.push(resource);
            }
        }
        tracing::debug!(path = %path, count = resources.len(), "retrieved resources");
        Ok(resources)
    }

    fn list_resources(&self) -> Result<Vec<String>> {
        Ok(self
            .xml_files()?
            .iter()
            .map(|file| self.resource_id(file))
            .collect())
    }

    fn modified_since(&self, since: DateTime<Utc>) -> Result<Vec<String>> {
        let mut modified = Vec::new();
        for file in self.xml_files()? {
            let mtime: DateTime<Utc> = fs::metadata(&file)?.modified()?.into();
            if mtime > since {
                modified.push(self.resource_id(&file));
            }
        }
        Ok(modified)
    }
}
