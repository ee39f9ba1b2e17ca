//! Recursive property interpreter.
//!
//! Multiplicity and nesting are independent: a property may be a scalar or a
//! list, and its items may be plain values or nested objects. Nested objects
//! without a path are evaluated against the current context node; with a path
//! they are evaluated once per selected node.

use roxmltree::Node;

use crate::error::{MapperError, Result};
use crate::extract::extract;
use crate::manifest::{Mode, Nested, Property, PropertySet};
use crate::value::{PropertyMap, Value};

/// Evaluates property descriptors against document nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Interpreter {
    mode: Mode,
}

impl Interpreter {
    #[must_use]
    pub fn new(mode: Mode) -> Self {
        Self { mode }
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Evaluate every property of `properties` against `context`, in declaration order.
    pub fn evaluate(&self, properties: &PropertySet, context: Node<'_, '_>) -> Result<PropertyMap> {
        properties
            .iter()
            .map(|(name, property)| Ok((name.clone(), self.evaluate_one(property, context)?)))
            .collect()
    }

    /// Evaluate a single property against `context`.
    pub fn evaluate_one(&self, property: &Property, context: Node<'_, '_>) -> Result<Value> {
        match &property.nested {
            Some(Nested::Templates(templates)) => {
                let objects = templates
                    .iter()
                    .map(|template| self.evaluate(template, context).map(Value::Object))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::List(objects))
            }
            Some(Nested::Group(group)) if !property.has_path() => {
                let object = self.evaluate(group, context)?;
                if property.multiple {
                    Ok(Value::List(vec![Value::Object(object)]))
                } else {
                    Ok(Value::Object(object))
                }
            }
            Some(Nested::Group(group)) if property.multiple => {
                let objects = matches(property, context)
                    .map(|node| self.evaluate(group, node).map(Value::Object))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::List(objects))
            }
            Some(Nested::Group(group)) => match matches(property, context).next() {
                Some(node) => Ok(Value::Object(self.evaluate(group, node)?)),
                None => self.no_match(property),
            },
            None if property.multiple => Ok(Value::List(
                matches(property, context)
                    .map(|node| Value::from(extract(node, property)))
                    .collect(),
            )),
            None => Ok(matches(property, context)
                .next()
                .map_or(Value::Null, |node| Value::from(extract(node, property)))),
        }
    }

    fn no_match(&self, property: &Property) -> Result<Value> {
        let path = property
            .paths
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(" | ");
        match self.mode {
            Mode::Lenient => {
                tracing::debug!(property = %property.name, path = %path, "no match for grouped property");
                Ok(Value::Null)
            }
            Mode::Strict => Err(MapperError::NoMatch {
                property: property.name.clone(),
                path,
            }),
        }
    }
}

/// Nodes matched by every path of `property`: path order outer, document order inner.
fn matches<'a, 'input: 'a>(
    property: &'a Property,
    context: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    property
        .paths
        .iter()
        .flat_map(move |selector| selector.select(context))
}

/// Evaluate `properties` against `context` in lenient mode.
///
/// # Examples
/// ```
/// use briefedition_mapper::interpreter::evaluate;
/// use briefedition_mapper::manifest::Manifest;
/// use briefedition_mapper::value::Value;
///
/// let manifest = Manifest::from_yaml_str(
///     "collection: c\nentities:\n  foo:\n    xpath: .\n    properties:\n      spam: { path: ['.//spam'] }\n",
/// ).unwrap();
/// let doc = roxmltree::Document::parse("<foo><spam>def</spam></foo>").unwrap();
/// let entity = manifest.entity("foo").unwrap();
/// let result = evaluate(&entity.properties, doc.root_element()).unwrap();
/// assert_eq!(result["spam"], Value::from("def"));
/// ```
pub fn evaluate(properties: &PropertySet, context: Node<'_, '_>) -> Result<PropertyMap> {
    Interpreter::default().evaluate(properties, context)
}
