//! XML utility functions for navigating and extracting data from DOM trees.

use std::collections::HashMap;
use std::fmt;

use roxmltree::Node;

use crate::config::XML_NAMESPACE;
use crate::error::{MapperError, Result};

/// Prefix → namespace URI bindings declared in the manifest.
pub type NamespaceMap = HashMap<String, String>;

/// Get the tag name without namespace prefix.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use briefedition_mapper::xml::get_tag_name;
///
/// let xml = r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><text/></TEI>"#;
/// let doc = Document::parse(xml).unwrap();
/// assert_eq!(get_tag_name(doc.root_element()), "TEI");
/// ```
pub fn get_tag_name<'a>(node: Node<'a, '_>) -> &'a str {
    node.tag_name().name()
}

/// Concatenate every text node below `node`, in document order.
///
/// For a text node this is its own text.
pub fn full_text(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

/// Collapse runs of whitespace to single spaces and trim the ends.
///
/// # Examples
/// ```
/// use briefedition_mapper::xml::normalize_whitespace;
///
/// assert_eq!(normalize_whitespace("  Rom,\n   den 3.  Mai "), "Rom, den 3. Mai");
/// ```
pub fn normalize_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Full text of a node with whitespace normalized.
pub fn normalized_text(node: Node<'_, '_>) -> String {
    normalize_whitespace(&full_text(node))
}

/// Get all element children of a node.
pub fn element_children<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|child| child.is_element())
}

/// Find the first descendant element (excluding `node` itself) with the given local name.
pub fn find_descendant<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.descendants()
        .skip(1)
        .find(|n| n.is_element() && get_tag_name(*n) == tag)
}

/// A possibly namespaced XML name, resolved at manifest load.
///
/// Accepts plain names (`id`), prefixed names (`xml:id`) and Clark
/// notation (`{http://www.w3.org/XML/1998/namespace}id`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    pub namespace: Option<String>,
    pub local: String,
}

impl QualifiedName {
    /// Parse a name, resolving its prefix through `namespaces`.
    ///
    /// The `xml` prefix is always bound.
    pub fn parse(name: &str, namespaces: &NamespaceMap) -> Result<Self> {
        let name = name.trim();
        if let Some(rest) = name.strip_prefix('{') {
            let (namespace, local) = rest
                .split_once('}')
                .ok_or_else(|| MapperError::invalid_path(name, "unterminated '{' in name"))?;
            return Self::checked(Some(namespace.to_string()), local, name);
        }

        match name.split_once(':') {
            Some((prefix, local)) => {
                let namespace = resolve_prefix(prefix, namespaces)?;
                Self::checked(Some(namespace), local, name)
            }
            None => Self::checked(None, name, name),
        }
    }

    fn checked(namespace: Option<String>, local: &str, original: &str) -> Result<Self> {
        if local.is_empty() || local.contains(['{', '}', ':', '/', ' ']) {
            return Err(MapperError::invalid_path(original, "not a valid XML name"));
        }
        Ok(Self {
            namespace,
            local: local.to_string(),
        })
    }

    /// Look up this attribute on a node.
    ///
    /// A name without namespace only matches attributes without namespace.
    pub fn attribute<'a>(&self, node: Node<'a, '_>) -> Option<&'a str> {
        match &self.namespace {
            Some(ns) => node.attribute((ns.as_str(), self.local.as_str())),
            None => node
                .attributes()
                .find(|a| a.namespace().is_none() && a.name() == self.local)
                .map(|a| a.value()),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{ns}}}{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// Resolve a namespace prefix; `xml` is implicitly bound.
pub fn resolve_prefix(prefix: &str, namespaces: &NamespaceMap) -> Result<String> {
    if prefix == "xml" {
        return Ok(XML_NAMESPACE.to_string());
    }
    namespaces
        .get(prefix)
        .cloned()
        .ok_or_else(|| MapperError::UnboundPrefix(prefix.to_string()))
}
