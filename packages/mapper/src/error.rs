//! Error types for the mapper.
//!
//! Configuration problems (malformed manifest, bad paths, unknown filters in
//! strict mode) surface at load time. Missing data is never an error; it is
//! represented as null, an empty list or an empty identifier instead.

use thiserror::Error;

/// Main error type for the mapper library.
#[derive(Debug, Error)]
pub enum MapperError {
    /// Manifest is not valid YAML or does not match the manifest model.
    #[error("Failed to parse manifest: {0}")]
    ManifestParse(#[from] serde_yaml_ng::Error),

    /// Manifest parsed but violates a structural rule.
    #[error("Invalid manifest at {location}: {reason}")]
    InvalidManifest { location: String, reason: String },

    /// Selection path could not be compiled.
    #[error("Invalid selection path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Namespace prefix used in a path or attribute name is not declared.
    #[error("Namespace prefix '{0}' is not declared in the manifest")]
    UnboundPrefix(String),

    /// Filter name not present in the registry (strict mode only).
    #[error("Unknown filter '{name}' referenced by {location}")]
    UnknownFilter { name: String, location: String },

    /// Singular grouped property matched nothing (strict mode only).
    #[error("No node matched '{path}' for property '{property}'")]
    NoMatch { property: String, path: String },

    /// Entity type is not configured in the manifest.
    #[error("Unknown entity type: {0}")]
    UnknownEntity(String),

    /// No addressable entity with this identifier.
    #[error("No {entity} entity with id '{id}'")]
    NotFound { entity: String, id: String },

    /// Caller asked for a representation other than the supported ones.
    #[error("Invalid format: '{0}'. Only 'xml', 'json' and 'record' are supported")]
    UnsupportedFormat(String),

    /// XML parsing failed for a specific resource.
    #[error("Failed to parse resource {resource}: {source}")]
    ResourceParse {
        resource: String,
        #[source]
        source: roxmltree::Error,
    },

    /// JSON serialization error.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Runtime configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MapperError {
    /// Shorthand for an [`MapperError::InvalidManifest`] error.
    pub fn invalid_manifest(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidManifest {
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for an [`MapperError::InvalidPath`] error.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error stems from the manifest rather than from data or callers.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ManifestParse(_)
                | Self::InvalidManifest { .. }
                | Self::InvalidPath { .. }
                | Self::UnboundPrefix(_)
                | Self::UnknownFilter { .. }
        )
    }
}

/// Result type alias for mapper operations.
pub type Result<T> = std::result::Result<T, MapperError>;
