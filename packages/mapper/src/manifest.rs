//! Manifest model, loading and validation.
//!
//! The manifest is read from YAML into the raw descriptor types, then
//! validated into [`Manifest`]: paths are compiled to [`Selector`]s,
//! attribute names are resolved and filters are looked up in the registry.
//! Everything that can be wrong with a manifest is reported here, before
//! the first document is touched.
//!
//! ```yaml
//! collection: briefe
//! namespaces:
//!   tei: http://www.tei-c.org/ns/1.0
//! entities:
//!   letters:
//!     xpath: //TEI
//!     properties:
//!       title:
//!         xpath: [.//titleStmt/title]
//!       senders:
//!         xpath: [".//correspAction[@type='sent']/persName"]
//!         multiple: true
//!         properties:
//!           name: { xpath: ["."], filter: joined_child_text }
//!           gnd: { xpath: ["."], attrib: [ref] }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::de::value::{MapAccessDeserializer, SeqAccessDeserializer};
use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::config::{validate_entity_name, DEFAULT_ID_ATTRIBUTE, MAX_MANIFEST_DEPTH};
use crate::error::{MapperError, Result};
use crate::filters::Filter;
use crate::xml::{NamespaceMap, QualifiedName, Selector};

/// How the interpreter treats a singular grouped property whose path matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Yield null and keep going.
    #[default]
    Lenient,
    /// Fail the record (and reject unknown filters at load).
    Strict,
}

// =============================================================================
// Raw descriptors (as written in YAML)
// =============================================================================

/// Top-level manifest document.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestFile {
    /// Root collection of the document store.
    pub collection: String,
    /// Entity type name → descriptor.
    pub entities: IndexMap<String, EntityDescriptor>,
    /// Identifier attribute used when an entity sets none.
    #[serde(default)]
    pub default_id_attribute: Option<String>,
    /// Prefix → namespace URI for prefixed names.
    #[serde(default)]
    pub namespaces: HashMap<String, String>,
    #[serde(default)]
    pub mode: Mode,
}

/// One entity type.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityDescriptor {
    /// Path selecting entity nodes within each document.
    #[serde(alias = "path")]
    pub xpath: String,
    #[serde(default)]
    pub properties: IndexMap<String, PropertyDescriptor>,
    #[serde(default, alias = "id_attrib")]
    pub id_attribute: Option<String>,
}

/// How to derive one named field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertyDescriptor {
    #[serde(default, alias = "path", deserialize_with = "one_or_many")]
    pub xpath: Option<Vec<String>>,
    #[serde(default)]
    pub multiple: bool,
    #[serde(default, alias = "attribute_names", deserialize_with = "one_or_many")]
    pub attrib: Option<Vec<String>>,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default, alias = "sub_properties")]
    pub properties: Option<SubProperties>,
}

/// Nested descriptors: one map, or a list of maps ("templates").
#[derive(Debug, Clone)]
pub enum SubProperties {
    Map(IndexMap<String, PropertyDescriptor>),
    Templates(Vec<IndexMap<String, PropertyDescriptor>>),
}

// Dispatches on the YAML shape so errors inside nested descriptors
// (unknown keys, wrong types) surface instead of a generic mismatch.
impl<'de> Deserialize<'de> for SubProperties {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SubPropertiesVisitor;

        impl<'de> Visitor<'de> for SubPropertiesVisitor {
            type Value = SubProperties;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of property descriptors or a list of such maps")
            }

            fn visit_map<A>(self, map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                IndexMap::deserialize(MapAccessDeserializer::new(map)).map(SubProperties::Map)
            }

            fn visit_seq<A>(self, seq: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                Vec::deserialize(SeqAccessDeserializer::new(seq)).map(SubProperties::Templates)
            }
        }

        deserializer.deserialize_any(SubPropertiesVisitor)
    }
}

/// Accept a single string where a list is expected.
fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(Option::<OneOrMany>::deserialize(deserializer)?.map(|v| match v {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    }))
}

// =============================================================================
// Validated manifest
// =============================================================================

/// Properties in declaration order.
pub type PropertySet = IndexMap<String, Property>;

/// Reference from a property to a filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterRef {
    Known(Filter),
    /// Kept in lenient mode; the property evaluates to null.
    Unknown(String),
}

/// Nested structure of a grouped property.
#[derive(Debug, Clone)]
pub enum Nested {
    Group(PropertySet),
    Templates(Vec<PropertySet>),
}

/// A validated property descriptor.
#[derive(Debug, Clone)]
pub struct Property {
    pub name: String,
    pub paths: Vec<Selector>,
    pub multiple: bool,
    pub attributes: Vec<QualifiedName>,
    pub filter: Option<FilterRef>,
    pub nested: Option<Nested>,
}

impl Property {
    /// Whether the descriptor lists selection paths.
    #[must_use]
    pub fn has_path(&self) -> bool {
        !self.paths.is_empty()
    }
}

/// A validated entity type.
#[derive(Debug, Clone)]
pub struct Entity {
    pub name: String,
    pub root: Selector,
    pub id_attribute: QualifiedName,
    pub properties: PropertySet,
}

/// A validated manifest, immutable after loading.
#[derive(Debug, Clone)]
pub struct Manifest {
    collection: String,
    entities: IndexMap<String, Entity>,
    default_id_attribute: QualifiedName,
    namespaces: NamespaceMap,
    mode: Mode,
}

impl Manifest {
    /// Load and validate a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loading manifest");
        Self::from_yaml_str(&content)
    }

    /// Parse and validate a manifest from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let file: ManifestFile = serde_yaml_ng::from_str(yaml)?;
        Self::from_file(file)
    }

    /// Validate raw descriptors.
    pub fn from_file(file: ManifestFile) -> Result<Self> {
        if file.collection.trim().is_empty() {
            return Err(MapperError::invalid_manifest("collection", "must not be empty"));
        }
        if file.entities.is_empty() {
            return Err(MapperError::invalid_manifest("entities", "no entity types declared"));
        }

        let namespaces: NamespaceMap = file.namespaces;
        let validator = Validator {
            namespaces: &namespaces,
            mode: file.mode,
        };

        let default_id_attribute = QualifiedName::parse(
            file.default_id_attribute
                .as_deref()
                .unwrap_or(DEFAULT_ID_ATTRIBUTE),
            &namespaces,
        )?;

        let mut entities = IndexMap::new();
        for (name, descriptor) in file.entities {
            validate_entity_name(&name)?;
            let entity = validator.entity(&name, descriptor, &default_id_attribute)?;
            entities.insert(name, entity);
        }

        Ok(Self {
            collection: file.collection,
            entities,
            default_id_attribute,
            namespaces,
            mode: file.mode,
        })
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn namespaces(&self) -> &NamespaceMap {
        &self.namespaces
    }

    #[must_use]
    pub fn default_id_attribute(&self) -> &QualifiedName {
        &self.default_id_attribute
    }

    /// Look up an entity type.
    pub fn entity(&self, name: &str) -> Result<&Entity> {
        self.entities
            .get(name)
            .ok_or_else(|| MapperError::UnknownEntity(name.to_string()))
    }

    /// Entity types in declaration order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }
}

struct Validator<'a> {
    namespaces: &'a NamespaceMap,
    mode: Mode,
}

impl Validator<'_> {
    fn entity(
        &self,
        name: &str,
        descriptor: EntityDescriptor,
        default_id: &QualifiedName,
    ) -> Result<Entity> {
        let location = format!("entities.{name}");
        let root = Selector::parse(&descriptor.xpath, self.namespaces)?;
        let id_attribute = match descriptor.id_attribute.as_deref() {
            Some(attr) => QualifiedName::parse(attr, self.namespaces)?,
            None => default_id.clone(),
        };
        let properties = self.property_set(&location, descriptor.properties, 1)?;

        Ok(Entity {
            name: name.to_string(),
            root,
            id_attribute,
            properties,
        })
    }

    fn property_set(
        &self,
        location: &str,
        descriptors: IndexMap<String, PropertyDescriptor>,
        depth: usize,
    ) -> Result<PropertySet> {
        if depth > MAX_MANIFEST_DEPTH {
            return Err(MapperError::invalid_manifest(
                location,
                format!("properties nested deeper than {MAX_MANIFEST_DEPTH} levels"),
            ));
        }

        descriptors
            .into_iter()
            .map(|(name, descriptor)| {
                let location = format!("{location}.properties.{name}");
                if name.trim().is_empty() {
                    return Err(MapperError::invalid_manifest(location, "empty property name"));
                }
                let property = self.property(&location, &name, descriptor, depth)?;
                Ok((name, property))
            })
            .collect()
    }

    fn property(
        &self,
        location: &str,
        name: &str,
        descriptor: PropertyDescriptor,
        depth: usize,
    ) -> Result<Property> {
        let paths = match descriptor.xpath {
            Some(paths) if paths.is_empty() => {
                return Err(MapperError::invalid_manifest(location, "xpath must list at least one path"))
            }
            Some(paths) => paths
                .iter()
                .map(|p| Selector::parse(p, self.namespaces))
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        let attributes = descriptor
            .attrib
            .unwrap_or_default()
            .iter()
            .map(|a| QualifiedName::parse(a, self.namespaces))
            .collect::<Result<Vec<_>>>()?;

        let filter = descriptor
            .filter
            .map(|f| self.filter(location, f))
            .transpose()?;

        let nested = match descriptor.properties {
            None => None,
            Some(SubProperties::Map(map)) => Some(Nested::Group(self.property_set(location, map, depth + 1)?)),
            Some(SubProperties::Templates(templates)) => {
                if !descriptor.multiple || !paths.is_empty() {
                    return Err(MapperError::invalid_manifest(
                        location,
                        "a list of property templates requires multiple: true and no xpath",
                    ));
                }
                let sets = templates
                    .into_iter()
                    .enumerate()
                    .map(|(i, t)| self.property_set(&format!("{location}[{i}]"), t, depth + 1))
                    .collect::<Result<Vec<_>>>()?;
                Some(Nested::Templates(sets))
            }
        };

        match &nested {
            Some(_) if !attributes.is_empty() || filter.is_some() => {
                return Err(MapperError::invalid_manifest(
                    location,
                    "attrib and filter cannot be combined with nested properties",
                ));
            }
            None if paths.is_empty() => {
                return Err(MapperError::invalid_manifest(
                    location,
                    "a property needs an xpath or nested properties",
                ));
            }
            _ => {}
        }

        if let Some(FilterRef::Known(f)) = &filter {
            if !attributes.is_empty() && !f.accepts_text() {
                return Err(MapperError::invalid_manifest(
                    location,
                    format!("filter '{f}' needs a node and cannot be applied to attribute values"),
                ));
            }
        }

        Ok(Property {
            name: name.to_string(),
            paths,
            multiple: descriptor.multiple,
            attributes,
            filter,
            nested,
        })
    }

    fn filter(&self, location: &str, name: String) -> Result<FilterRef> {
        if let Some(filter) = Filter::from_name(&name) {
            return Ok(FilterRef::Known(filter));
        }
        match self.mode {
            Mode::Strict => Err(MapperError::UnknownFilter {
                name,
                location: location.to_string(),
            }),
            Mode::Lenient => {
                tracing::warn!(
                    filter = %name,
                    property = %location,
                    "Filter is undefined, property will be empty"
                );
                Ok(FilterRef::Unknown(name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LETTERS: &str = r#"
collection: briefe
namespaces:
  tei: http://www.tei-c.org/ns/1.0
entities:
  letters:
    xpath: //TEI
    properties:
      title:
        xpath: .//titleStmt/title
      date:
        path: [".//correspAction[@type='sent']/date"]
        attribute_names: [when, notBefore]
      senders:
        xpath: [".//correspAction[@type='sent']/persName"]
        multiple: true
        properties:
          name: { xpath: ["."], filter: joined_child_text }
          gnd: { xpath: ["."], attrib: [ref] }
  persons:
    xpath: //person
    id_attribute: n
    properties:
      names:
        multiple: true
        sub_properties:
          - label: { xpath: ["./persName"] }
          - label: { xpath: ["./addName"] }
"#;

    #[test]
    fn test_load_manifest() {
        let manifest = Manifest::from_yaml_str(LETTERS).unwrap();
        assert_eq!(manifest.collection(), "briefe");
        assert_eq!(manifest.mode(), Mode::Lenient);
        assert_eq!(manifest.entity_names().collect::<Vec<_>>(), vec!["letters", "persons"]);

        let letters = manifest.entity("letters").unwrap();
        assert_eq!(letters.root.as_str(), "//TEI");
        assert_eq!(letters.id_attribute.to_string(), DEFAULT_ID_ATTRIBUTE);
        assert_eq!(
            letters.properties.keys().collect::<Vec<_>>(),
            vec!["title", "date", "senders"]
        );

        let date = &letters.properties["date"];
        assert_eq!(date.attributes.len(), 2);
        assert!(!date.multiple);

        let senders = &letters.properties["senders"];
        assert!(senders.multiple);
        let Some(Nested::Group(sub)) = &senders.nested else {
            panic!("expected group");
        };
        assert_eq!(
            sub["name"].filter,
            Some(FilterRef::Known(Filter::JoinedChildText))
        );

        let persons = manifest.entity("persons").unwrap();
        assert_eq!(persons.id_attribute.local, "n");
        assert!(matches!(
            persons.properties["names"].nested,
            Some(Nested::Templates(ref t)) if t.len() == 2
        ));
    }

    #[test]
    fn test_unknown_entity() {
        let manifest = Manifest::from_yaml_str(LETTERS).unwrap();
        assert!(matches!(
            manifest.entity("places"),
            Err(MapperError::UnknownEntity(name)) if name == "places"
        ));
    }

    fn manifest_with(property: &str) -> Result<Manifest> {
        Manifest::from_yaml_str(&format!(
            "collection: c\nentities:\n  e:\n    xpath: //e\n    properties:\n      p: {property}\n"
        ))
    }

    #[test]
    fn test_property_without_path_or_properties_rejected() {
        let err = manifest_with("{ multiple: true }").unwrap_err();
        assert!(err.to_string().contains("entities.e.properties.p"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_invalid_path_rejected() {
        assert!(matches!(
            manifest_with("{ xpath: ['.//a['] }"),
            Err(MapperError::InvalidPath { .. })
        ));
        assert!(manifest_with("{ xpath: [] }").is_err());
    }

    #[test]
    fn test_unbound_prefix_rejected() {
        assert!(matches!(
            manifest_with("{ xpath: ['.//foo:a'] }"),
            Err(MapperError::UnboundPrefix(_))
        ));
    }

    #[test]
    fn test_unknown_filter_lenient_is_kept() {
        let manifest = manifest_with("{ xpath: ['.'], filter: shout }").unwrap();
        let property = &manifest.entity("e").unwrap().properties["p"];
        assert_eq!(property.filter, Some(FilterRef::Unknown("shout".to_string())));
    }

    #[test]
    fn test_unknown_filter_strict_is_rejected() {
        let yaml = "collection: c\nmode: strict\nentities:\n  e:\n    xpath: //e\n    properties:\n      p: { xpath: ['.'], filter: shout }\n";
        assert!(matches!(
            Manifest::from_yaml_str(yaml),
            Err(MapperError::UnknownFilter { name, .. }) if name == "shout"
        ));
    }

    #[test]
    fn test_structural_filter_on_attribute_rejected() {
        assert!(manifest_with("{ xpath: ['.'], attrib: [ref], filter: tag_name }").is_err());
        assert!(manifest_with("{ xpath: ['.'], attrib: [ref], filter: truncate_100 }").is_ok());
    }

    #[test]
    fn test_templates_require_multiple_without_path() {
        assert!(manifest_with("{ properties: [ { a: { xpath: ['.'] } } ] }").is_err());
        assert!(manifest_with("{ multiple: true, xpath: ['.'], properties: [ { a: { xpath: ['.'] } } ] }").is_err());
        assert!(manifest_with("{ multiple: true, properties: [ { a: { xpath: ['.'] } } ] }").is_ok());
    }

    #[test]
    fn test_nested_properties_reject_attrib() {
        assert!(manifest_with("{ xpath: ['.'], attrib: [id], properties: { a: { xpath: ['.'] } } }").is_err());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(matches!(
            manifest_with("{ xpth: ['.'] }"),
            Err(MapperError::ManifestParse(_))
        ));
    }

    #[test]
    fn test_unknown_keys_in_nested_properties_are_named() {
        for nested in [
            "{ properties: { a: { xpth: ['.'] } } }",
            "{ multiple: true, properties: [ { a: { xpth: ['.'] } } ] }",
        ] {
            let err = manifest_with(nested).unwrap_err();
            assert!(matches!(err, MapperError::ManifestParse(_)));
            assert!(err.to_string().contains("xpth"), "{err}");
        }
    }

    #[test]
    fn test_nested_properties_must_be_map_or_list() {
        let err = manifest_with("{ properties: oops }").unwrap_err();
        assert!(err.to_string().contains("a map of property descriptors"), "{err}");
    }

    #[test]
    fn test_invalid_entity_name_rejected() {
        let yaml = "collection: c\nentities:\n  'a/b':\n    xpath: //e\n";
        assert!(Manifest::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_nesting_depth_limit() {
        let mut property = "{ xpath: ['.'] }".to_string();
        for _ in 0..=MAX_MANIFEST_DEPTH {
            property = format!("{{ properties: {{ p: {property} }} }}");
        }
        let err = manifest_with(&property).unwrap_err();
        assert!(err.to_string().contains("nested deeper"));
    }

    #[test]
    fn test_empty_entities_rejected() {
        assert!(Manifest::from_yaml_str("collection: c\nentities: {}\n").is_err());
    }
}
