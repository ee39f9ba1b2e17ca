//! Briefedition Mapper - Manifest-driven extraction of records from TEI XML.
//!
//! A YAML manifest describes, per entity type, which nodes of a document
//! become entities and how each of their properties is derived: by
//! selection path, attribute, filter, nesting and multiplicity. The crate
//! validates the manifest once and then turns documents into ordered,
//! JSON-serializable records.
//!
//! # Example
//!
//! ```
//! use briefedition_mapper::{evaluate, Manifest, Value};
//!
//! let manifest = Manifest::from_yaml_str(r#"
//! collection: briefe
//! entities:
//!   letters:
//!     xpath: //letter
//!     properties:
//!       spam: { path: ['.//spam'], multiple: true }
//! "#).unwrap();
//!
//! let doc = roxmltree::Document::parse(
//!     "<letter><bar><spam>abc</spam></bar><spam>def</spam></letter>",
//! ).unwrap();
//! let letters = manifest.entity("letters").unwrap();
//! let result = evaluate(&letters.properties, doc.root_element()).unwrap();
//! assert_eq!(result["spam"], Value::List(vec!["abc".into(), "def".into()]));
//! ```
//!
//! # Architecture
//!
//! - [`xml`]: tree utilities and the selection path engine
//! - [`extract`]: scalar value extraction from one node
//! - [`filters`]: named node transforms
//! - [`manifest`]: manifest model and validation
//! - [`interpreter`]: recursive property evaluation
//! - [`entity`]: records from entity nodes
//! - [`store`]: document store trait and directory store
//! - [`convert`]: XML to JSON conversion
//! - [`service`]: snapshot-backed entity queries
//! - [`watcher`]: background refresh on store updates
//! - [`config`]: constants and runtime configuration
//! - [`error`]: error types and Result alias
//! - [`cli`]: command-line interface

pub mod cli;
pub mod config;
pub mod convert;
pub mod entity;
pub mod error;
pub mod extract;
pub mod filters;
pub mod interpreter;
pub mod manifest;
pub mod service;
pub mod store;
pub mod value;
pub mod watcher;
pub mod xml;

// Re-export commonly used items
pub use entity::{materialize, materialize_document, Record};
pub use error::{MapperError, Result};
pub use filters::Filter;
pub use interpreter::{evaluate, Interpreter};
pub use manifest::{Manifest, Mode};
pub use service::{OutputFormat, Service};
pub use store::{DirectoryStore, DocumentStore, Resource};
pub use value::{PropertyMap, Value};
pub use watcher::{UpdateWatcher, WatcherHandle};
pub use xml::{select, Selector};
