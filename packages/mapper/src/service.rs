//! Query service over an immutable snapshot of the document collection.
//!
//! Refreshing builds a complete new [`Snapshot`] and swaps it in; readers
//! keep the snapshot they started with until they are done.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};

use crate::config::JSON_ROOT_ELEMENT;
use crate::convert::to_json;
use crate::entity::{entity_nodes, materialize_document, read_id, Record};
use crate::error::{MapperError, Result};
use crate::interpreter::Interpreter;
use crate::manifest::{Entity, Manifest};
use crate::store::{DocumentStore, Resource};
use crate::xml::find_descendant;

/// Representation returned by [`Service::render_entity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// The materialized record as JSON.
    #[default]
    Record,
    /// The entity's original XML.
    Xml,
    /// xmltodict-style JSON of the entity's header.
    Json,
}

impl FromStr for OutputFormat {
    type Err = MapperError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "record" => Ok(Self::Record),
            "xml" => Ok(Self::Xml),
            "json" => Ok(Self::Json),
            _ => Err(MapperError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Record => "record",
            Self::Xml => "xml",
            Self::Json => "json",
        })
    }
}

/// Records and source documents of one entity type.
#[derive(Debug, Default)]
struct EntityData {
    resources: HashMap<String, Resource>,
    records: Vec<Record>,
}

/// Immutable view of the collection at one point in time.
#[derive(Debug, Default)]
pub struct Snapshot {
    entities: HashMap<String, EntityData>,
    resource_ids: Vec<String>,
    loaded_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Build a snapshot by materializing every entity of the manifest.
    pub fn load(manifest: &Manifest, store: &dyn DocumentStore) -> Result<Self> {
        let loaded_at = Utc::now();
        let interpreter = Interpreter::new(manifest.mode());
        let mut entities = HashMap::new();

        for entity in manifest.entities() {
            let mut data = EntityData::default();
            for resource in store.retrieve_resources(&entity.root)? {
                let document = match resource.document() {
                    Ok(document) => document,
                    Err(err) => {
                        tracing::warn!(error = %err, "Skipping unparseable document");
                        continue;
                    }
                };
                data.records.extend(
                    materialize_document(entity, &document, &interpreter)
                        .into_iter()
                        .map(|record| record.with_resource(resource.id.clone())),
                );
                data.resources.insert(resource.id.clone(), resource);
            }
            tracing::info!(
                entity = %entity.name,
                records = data.records.len(),
                resources = data.resources.len(),
                "loaded entity"
            );
            entities.insert(entity.name.clone(), data);
        }

        Ok(Self {
            entities,
            resource_ids: store.list_resources()?,
            loaded_at: Some(loaded_at),
        })
    }

    /// When the snapshot was taken.
    #[must_use]
    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    fn data(&self, entity: &str) -> &[Record] {
        self.entities
            .get(entity)
            .map(|data| data.records.as_slice())
            .unwrap_or_default()
    }

    fn find(&self, entity: &str, id: &str) -> Option<(&Record, &Resource)> {
        let data = self.entities.get(entity)?;
        let record = data.records.iter().find(|r| r.is_addressable() && r.id == id)?;
        let resource = data.resources.get(record.resource.as_deref()?)?;
        Some((record, resource))
    }
}

/// Entity queries backed by a document store.
pub struct Service {
    manifest: Arc<Manifest>,
    store: Arc<dyn DocumentStore>,
    snapshot: RwLock<Arc<Snapshot>>,
}

impl Service {
    /// Create the service and load the initial snapshot.
    pub fn new(manifest: Arc<Manifest>, store: Arc<dyn DocumentStore>) -> Result<Self> {
        let snapshot = Snapshot::load(&manifest, store.as_ref())?;
        Ok(Self {
            manifest,
            store,
            snapshot: RwLock::new(Arc::new(snapshot)),
        })
    }

    #[must_use]
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// All records of an entity type.
    pub fn get_entities(&self, entity: &str) -> Result<Vec<Record>> {
        self.manifest.entity(entity)?;
        Ok(self.snapshot().data(entity).to_vec())
    }

    /// One record by identifier.
    pub fn get_entity(&self, entity: &str, id: &str) -> Result<Option<Record>> {
        self.manifest.entity(entity)?;
        Ok(self
            .snapshot()
            .find(entity, id)
            .map(|(record, _)| record.clone()))
    }

    /// Render one entity in the requested representation.
    pub fn render_entity(&self, entity: &str, id: &str, format: OutputFormat) -> Result<Option<String>> {
        let descriptor = self.manifest.entity(entity)?;
        let snapshot = self.snapshot();
        let Some((record, resource)) = snapshot.find(entity, id) else {
            return Ok(None);
        };

        match format {
            OutputFormat::Record => Ok(Some(serde_json::to_string_pretty(record)?)),
            OutputFormat::Xml | OutputFormat::Json => render_source(descriptor, resource, id, format),
        }
    }

    /// Rebuild the snapshot from the store and swap it in.
    pub fn refresh(&self) -> Result<()> {
        let snapshot = Snapshot::load(&self.manifest, self.store.as_ref())?;
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(snapshot);
        tracing::info!("snapshot refreshed");
        Ok(())
    }

    /// Refresh only if the store changed since `since`. Returns whether it did.
    pub fn refresh_modified(&self, since: DateTime<Utc>) -> Result<bool> {
        let modified = self.store.modified_since(since)?;
        let listed = self.store.list_resources()?;
        if modified.is_empty() && listed == self.snapshot().resource_ids {
            return Ok(false);
        }
        tracing::debug!(modified = modified.len(), "store changed");
        self.refresh()?;
        Ok(true)
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("collection", &self.manifest.collection())
            .finish_non_exhaustive()
    }
}

fn render_source(entity: &Entity, resource: &Resource, id: &str, format: OutputFormat) -> Result<Option<String>> {
    let document = resource.document()?;
    let Some(node) = entity_nodes(entity, &document)
        .into_iter()
        .find(|node| read_id(entity, *node).as_deref() == Some(id))
    else {
        return Ok(None);
    };

    match format {
        OutputFormat::Xml => Ok(Some(resource.source[node.range()].to_string())),
        _ => {
            let root = find_descendant(node, JSON_ROOT_ELEMENT).unwrap_or(node);
            Ok(Some(serde_json::to_string_pretty(&to_json(root))?))
        }
    }
}
