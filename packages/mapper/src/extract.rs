//! Value extraction from a single selected node.

use roxmltree::Node;

use crate::manifest::{FilterRef, Property};
use crate::xml::{normalize_whitespace, normalized_text};

/// Extract the scalar value of `property` from `node`.
///
/// Priority:
/// 1. a filter without attribute names receives the node;
/// 2. attribute names are scanned in order and the first present value wins,
///    normalized, or passed raw through the filter when one is set;
/// 3. otherwise the normalized full text.
///
/// An unknown filter yields `None`.
pub fn extract(node: Node<'_, '_>, property: &Property) -> Option<String> {
    if property.attributes.is_empty() {
        return match &property.filter {
            Some(FilterRef::Known(filter)) => Some(filter.apply(node)),
            Some(FilterRef::Unknown(name)) => {
                unknown_filter(name, property);
                None
            }
            None => Some(normalized_text(node)),
        };
    }

    let raw = property
        .attributes
        .iter()
        .find_map(|name| name.attribute(node))?;
    match &property.filter {
        None => Some(normalize_whitespace(raw)),
        Some(FilterRef::Known(filter)) => filter.apply_to_text(raw),
        Some(FilterRef::Unknown(name)) => {
            unknown_filter(name, property);
            None
        }
    }
}

fn unknown_filter(name: &str, property: &Property) {
    tracing::warn!(
        filter = %name,
        property = %property.name,
        "Filter is undefined, returning null"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::Filter;
    use crate::xml::{NamespaceMap, QualifiedName};
    use roxmltree::Document;

    fn property(attributes: &[&str], filter: Option<FilterRef>) -> Property {
        let namespaces = NamespaceMap::new();
        Property {
            name: "p".to_string(),
            paths: Vec::new(),
            multiple: false,
            attributes: attributes
                .iter()
                .map(|a| QualifiedName::parse(a, &namespaces).unwrap())
                .collect(),
            filter,
            nested: None,
        }
    }

    const DATE: &str = r#"<date when="1855-05-03" cert="high">
        3. Mai
        1855
    </date>"#;

    #[test]
    fn test_default_is_normalized_text() {
        let doc = Document::parse(DATE).unwrap();
        let value = extract(doc.root_element(), &property(&[], None));
        assert_eq!(value.as_deref(), Some("3. Mai 1855"));
    }

    #[test]
    fn test_attribute_wins_over_text() {
        let doc = Document::parse(DATE).unwrap();
        let value = extract(doc.root_element(), &property(&["notBefore", "when"], None));
        assert_eq!(value.as_deref(), Some("1855-05-03"));
    }

    #[test]
    fn test_missing_attributes_yield_none() {
        let doc = Document::parse(DATE).unwrap();
        assert_eq!(extract(doc.root_element(), &property(&["from", "to"], None)), None);
    }

    #[test]
    fn test_filter_receives_node() {
        let doc = Document::parse(DATE).unwrap();
        let value = extract(
            doc.root_element(),
            &property(&[], Some(FilterRef::Known(Filter::TagName))),
        );
        assert_eq!(value.as_deref(), Some("date"));
    }

    #[test]
    fn test_filter_applies_to_attribute_value() {
        let long = "x".repeat(120);
        let xml = format!(r#"<ref target="{long}"/>"#);
        let doc = Document::parse(&xml).unwrap();
        let value = extract(
            doc.root_element(),
            &property(&["target"], Some(FilterRef::Known(Filter::Truncate100))),
        )
        .unwrap();
        assert_eq!(value.len(), 100);
    }

    #[test]
    fn test_filter_receives_raw_attribute_value() {
        let doc = Document::parse(r#"<r n="a    b"/>"#).unwrap();
        let truncate = Some(FilterRef::Known(Filter::Truncate100));
        assert_eq!(
            extract(doc.root_element(), &property(&["n"], truncate)).as_deref(),
            Some("a    b")
        );
        assert_eq!(
            extract(doc.root_element(), &property(&["n"], None)).as_deref(),
            Some("a b")
        );
    }

    #[test]
    fn test_plain_attribute_name_skips_namespaced_attribute() {
        let doc = Document::parse(r#"<r xml:id="XMLID" id="PLAIN"/>"#).unwrap();
        assert_eq!(
            extract(doc.root_element(), &property(&["id"], None)).as_deref(),
            Some("PLAIN")
        );
        assert_eq!(
            extract(doc.root_element(), &property(&["xml:id"], None)).as_deref(),
            Some("XMLID")
        );
    }

    #[test]
    fn test_unknown_filter_yields_none() {
        let doc = Document::parse(DATE).unwrap();
        let unknown = Some(FilterRef::Unknown("shout".to_string()));
        assert_eq!(extract(doc.root_element(), &property(&[], unknown.clone())), None);
        assert_eq!(extract(doc.root_element(), &property(&["when"], unknown)), None);
    }
}
