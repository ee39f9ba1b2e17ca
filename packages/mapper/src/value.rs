//! Output values produced by the property interpreter.

use indexmap::IndexMap;
use serde::Serialize;

/// Properties of one object, in manifest declaration order.
pub type PropertyMap = IndexMap<String, Value>;

/// A nested extraction result.
///
/// Serializes untagged: `null`, a string, an array or an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Missing data.
    Null,
    /// A scalar leaf value.
    Text(String),
    /// Result of a `multiple` property.
    List(Vec<Value>),
    /// Result of a property with sub-properties.
    Object(PropertyMap),
}

impl Value {
    /// Check if value is null
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get value as string reference
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get value as list
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Try to get value as object
    #[must_use]
    pub fn as_object(&self) -> Option<&PropertyMap> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Follow a dotted path of object keys, e.g. `"sender.name"`.
    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(self, |current, key| current.as_object()?.get(key))
    }
}

impl From<Option<String>> for Value {
    fn from(value: Option<String>) -> Self {
        value.map_or(Value::Null, Value::Text)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<PropertyMap> for Value {
    fn from(map: PropertyMap) -> Self {
        Value::Object(map)
    }
}
