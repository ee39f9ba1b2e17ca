//! Configuration constants, runtime settings and validation helpers.

use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use crate::error::{MapperError, Result};

/// Namespace bound to the reserved `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Attribute holding the entity identifier when the manifest sets none (`xml:id`).
pub const DEFAULT_ID_ATTRIBUTE: &str = "{http://www.w3.org/XML/1998/namespace}id";

/// Element preferred as the root of the JSON rendering of an entity.
pub const JSON_ROOT_ELEMENT: &str = "teiHeader";

/// Number of characters kept by the `truncate_100` filter.
pub const TRUNCATE_LENGTH: usize = 100;

/// Maximum nesting depth of property descriptors in a manifest.
///
/// Deeper manifests are rejected at validation so evaluation cannot
/// overflow the stack.
pub const MAX_MANIFEST_DEPTH: usize = 32;

/// Polling interval of the update watcher when none is configured.
pub const DEFAULT_WATCH_INTERVAL_SECS: u64 = 2;

/// Seconds the update watcher looks back past its previous check.
///
/// File systems with coarse mtime resolution can stamp a write that lands
/// right after a check with a time at or before that check.
pub const MTIME_GRACE_SECS: i64 = 2;

/// Manifest file used when neither CLI nor environment name one.
pub const DEFAULT_MANIFEST_PATH: &str = "config.yml";

/// Entity names end up as route segments of the API, so keep them plain.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static ENTITY_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").expect("valid regex"));

/// Validate an entity type name.
///
/// # Examples
/// ```
/// use briefedition_mapper::config::validate_entity_name;
///
/// assert!(validate_entity_name("letters").is_ok());
/// assert!(validate_entity_name("person-index").is_ok());
/// assert!(validate_entity_name("bad/name").is_err());
/// ```
pub fn validate_entity_name(name: &str) -> Result<()> {
    if ENTITY_NAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(MapperError::invalid_manifest(
            format!("entities.{name}"),
            "entity names may only contain letters, digits, '-' and '_'",
        ))
    }
}

/// Runtime settings of the host process.
#[derive(Debug, Clone)]
pub struct MapperConfig {
    pub manifest_path: PathBuf,
    pub collection_root: PathBuf,
    pub watch_interval: Duration,
}

impl MapperConfig {
    /// Read settings from the environment.
    ///
    /// * `MANIFEST_PATH` (default `config.yml`)
    /// * `COLLECTION_ROOT` (default `.`)
    /// * `WATCH_INTERVAL_SECS` (default 2)
    pub fn from_env() -> Result<Self> {
        let manifest_path = std::env::var("MANIFEST_PATH")
            .unwrap_or_else(|_| DEFAULT_MANIFEST_PATH.into())
            .into();

        let collection_root = std::env::var("COLLECTION_ROOT")
            .unwrap_or_else(|_| ".".into())
            .into();

        let watch_interval_secs = match std::env::var("WATCH_INTERVAL_SECS") {
            Ok(v) => v.parse::<u64>().map_err(|_| {
                MapperError::Config(format!("WATCH_INTERVAL_SECS is not a number: '{v}'"))
            })?,
            Err(_) => DEFAULT_WATCH_INTERVAL_SECS,
        };

        Ok(Self {
            manifest_path,
            collection_root,
            watch_interval: Duration::from_secs(watch_interval_secs),
        })
    }

    pub fn new(manifest_path: impl Into<PathBuf>, collection_root: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            collection_root: collection_root.into(),
            watch_interval: Duration::from_secs(DEFAULT_WATCH_INTERVAL_SECS),
        }
    }

    pub fn with_manifest_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest_path = path.into();
        self
    }

    pub fn with_collection_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.collection_root = root.into();
        self
    }

    pub fn with_watch_interval(mut self, interval: Duration) -> Self {
        self.watch_interval = interval;
        self
    }
}
