//! Entity materialization: document nodes to records.

use roxmltree::{Document, Node};
use serde::Serialize;

use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::manifest::Entity;
use crate::value::{PropertyMap, Value};

/// A materialized entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    /// Identifier read from the entity node; empty when absent.
    pub id: String,
    /// Entity type name.
    pub entity: String,
    /// Store resource the record was read from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    pub properties: PropertyMap,
}

impl Record {
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Whether the record can be looked up by id.
    #[must_use]
    pub fn is_addressable(&self) -> bool {
        !self.id.is_empty()
    }

    /// Follow a dotted property path, e.g. `"sender.name"`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let value = self.properties.get(head)?;
        match rest {
            Some(rest) => value.get_path(rest),
            None => Some(value),
        }
    }
}

/// Read the identifier of an entity node.
pub fn read_id(entity: &Entity, node: Node<'_, '_>) -> Option<String> {
    entity
        .id_attribute
        .attribute(node)
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
}

/// Materialize one entity node into a record.
///
/// A missing identifier is not an error: the record gets an empty id and a
/// diagnostic is logged.
pub fn materialize(entity: &Entity, node: Node<'_, '_>, interpreter: &Interpreter) -> Result<Record> {
    let id = read_id(entity, node).unwrap_or_else(|| {
        tracing::warn!(
            entity = %entity.name,
            attribute = %entity.id_attribute,
            "Entity has no identifier and will not be individually addressable"
        );
        String::new()
    });

    let properties = interpreter.evaluate(&entity.properties, node)?;

    Ok(Record {
        id,
        entity: entity.name.clone(),
        resource: None,
        properties,
    })
}

/// Entity nodes of a document, selected with the entity's root path.
pub fn entity_nodes<'a, 'input>(entity: &Entity, document: &'a Document<'input>) -> Vec<Node<'a, 'input>> {
    entity.root.select(document.root())
}

/// Materialize every entity node of a document.
///
/// Records that fail to evaluate are logged and skipped.
pub fn materialize_document(
    entity: &Entity,
    document: &Document<'_>,
    interpreter: &Interpreter,
) -> Vec<Record> {
    entity_nodes(entity, document)
        .into_iter()
        .filter_map(|node| match materialize(entity, node, interpreter) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    entity = %entity.name,
                    "Failed to materialize entity, skipping"
                );
                None
            }
        })
        .collect()
}
