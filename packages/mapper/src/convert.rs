//! XML to JSON conversion in the xmltodict style.
//!
//! - an element becomes an object keyed by its local name;
//! - attributes are stored as `@name`;
//! - text is stored as `#text` when the element also has attributes or
//!   children, otherwise the element is the plain string;
//! - repeated child names become arrays;
//! - an empty element is `null`.

use roxmltree::Node;
use serde_json::{Map, Value as JsonValue};

use crate::xml::{element_children, get_tag_name};

/// Convert an element to `{ "<tag>": <content> }`.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use briefedition_mapper::convert::to_json;
///
/// let doc = Document::parse(r#"<date when="1855">3. Mai</date>"#).unwrap();
/// let json = to_json(doc.root_element());
/// assert_eq!(json.to_string(), r##"{"date":{"@when":"1855","#text":"3. Mai"}}"##);
/// ```
pub fn to_json(node: Node<'_, '_>) -> JsonValue {
    let mut root = Map::new();
    root.insert(get_tag_name(node).to_string(), element_content(node));
    JsonValue::Object(root)
}

fn element_content(node: Node<'_, '_>) -> JsonValue {
    let mut object = Map::new();

    for attribute in node.attributes() {
        object.insert(
            format!("@{}", attribute.name()),
            JsonValue::String(attribute.value().to_string()),
        );
    }

    for child in element_children(node) {
        let name = get_tag_name(child).to_string();
        let content = element_content(child);
        match object.get_mut(&name) {
            Some(JsonValue::Array(items)) => items.push(content),
            Some(existing) => {
                let first = existing.take();
                *existing = JsonValue::Array(vec![first, content]);
            }
            None => {
                object.insert(name, content);
            }
        }
    }

    let text: String = node
        .children()
        .filter(|c| c.is_text())
        .filter_map(|c| c.text())
        .collect();
    let text = text.trim();

    match (object.is_empty(), text.is_empty()) {
        (true, true) => JsonValue::Null,
        (true, false) => JsonValue::String(text.to_string()),
        (false, true) => JsonValue::Object(object),
        (false, false) => {
            object.insert("#text".to_string(), JsonValue::String(text.to_string()));
            JsonValue::Object(object)
        }
    }
}
