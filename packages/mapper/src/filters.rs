//! Named filters deriving property values from nodes.
//!
//! The set is closed: manifests refer to filters by name and the name is
//! resolved once, when the manifest is validated.

use std::fmt;

use roxmltree::Node;

use crate::config::TRUNCATE_LENGTH;
use crate::xml::{full_text, get_tag_name, normalized_text};

/// A built-in node → string transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    /// First 100 characters of the node's full text.
    Truncate100,
    /// Local tag name of the node.
    TagName,
    /// Comma-joined child texts of a `persName`, plain text otherwise.
    JoinedChildText,
}

impl Filter {
    /// Every registered filter.
    pub const ALL: [Filter; 3] = [Filter::Truncate100, Filter::TagName, Filter::JoinedChildText];

    /// Resolve a filter by its manifest name.
    ///
    /// The function names used by earlier manifests are accepted as aliases.
    ///
    /// # Examples
    /// ```
    /// use briefedition_mapper::filters::Filter;
    ///
    /// assert_eq!(Filter::from_name("truncate_100"), Some(Filter::Truncate100));
    /// assert_eq!(Filter::from_name("get_node_name"), Some(Filter::TagName));
    /// assert_eq!(Filter::from_name("shout"), None);
    /// ```
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "truncate_100" | "get_substring_100" => Some(Self::Truncate100),
            "tag_name" | "get_node_name" => Some(Self::TagName),
            "joined_child_text" | "get_pers_name" => Some(Self::JoinedChildText),
            _ => None,
        }
    }

    /// Canonical manifest name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Truncate100 => "truncate_100",
            Self::TagName => "tag_name",
            Self::JoinedChildText => "joined_child_text",
        }
    }

    /// Whether the filter can also transform a plain attribute value.
    ///
    /// Structural filters need the node and cannot.
    #[must_use]
    pub fn accepts_text(&self) -> bool {
        matches!(self, Self::Truncate100)
    }

    /// Apply the filter to a node.
    #[must_use]
    pub fn apply(&self, node: Node<'_, '_>) -> String {
        match self {
            Self::Truncate100 => truncate(&full_text(node), TRUNCATE_LENGTH),
            Self::TagName => get_tag_name(node).to_string(),
            Self::JoinedChildText => joined_child_text(node),
        }
    }

    /// Apply the filter to an attribute value.
    ///
    /// Returns `None` for filters that need a node.
    #[must_use]
    pub fn apply_to_text(&self, text: &str) -> Option<String> {
        match self {
            Self::Truncate100 => Some(truncate(text, TRUNCATE_LENGTH)),
            Self::TagName | Self::JoinedChildText => None,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Keep at most `max_chars` characters; shorter input is returned unchanged.
fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}

fn joined_child_text(node: Node<'_, '_>) -> String {
    if !(node.is_element() && get_tag_name(node) == "persName") {
        return normalized_text(node);
    }

    node.children()
        .filter_map(|child| {
            let text = if child.is_text() {
                child.text().unwrap_or_default().to_string()
            } else if child.is_element() {
                full_text(child)
            } else {
                return None;
            };
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    #[test]
    fn test_truncate_short_text_unchanged() {
        let doc = Document::parse("<p>Kurzer Brief</p>").unwrap();
        assert_eq!(Filter::Truncate100.apply(doc.root_element()), "Kurzer Brief");
    }

    #[test]
    fn test_truncate_exact_boundary() {
        let text = "a".repeat(100);
        let xml = format!("<p>{text}</p>");
        let doc = Document::parse(&xml).unwrap();
        assert_eq!(Filter::Truncate100.apply(doc.root_element()), text);
    }

    #[test]
    fn test_truncate_long_text() {
        let text = "ä".repeat(150);
        let xml = format!("<p>{text}</p>");
        let doc = Document::parse(&xml).unwrap();
        let result = Filter::Truncate100.apply(doc.root_element());
        assert_eq!(result.chars().count(), 100);
        assert!(text.starts_with(&result));
    }

    #[test]
    fn test_tag_name_strips_namespace() {
        let xml = r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><placeName>Rom</placeName></TEI>"#;
        let doc = Document::parse(xml).unwrap();
        let place = doc.root_element().first_element_child().unwrap();
        assert_eq!(Filter::TagName.apply(place), "placeName");
    }

    #[test]
    fn test_joined_child_text_pers_name() {
        let xml = "<persName>\n  <surname>Gregorovius</surname>\n  <forename>Ferdinand</forename>\n</persName>";
        let doc = Document::parse(xml).unwrap();
        assert_eq!(
            Filter::JoinedChildText.apply(doc.root_element()),
            "Gregorovius, Ferdinand"
        );
    }

    #[test]
    fn test_joined_child_text_other_elements_fall_back() {
        let xml = "<placeName>\n  <settlement>Rom</settlement>\n  <country>Italien</country>\n</placeName>";
        let doc = Document::parse(xml).unwrap();
        assert_eq!(Filter::JoinedChildText.apply(doc.root_element()), "Rom Italien");
    }

    #[test]
    fn test_apply_to_text() {
        assert_eq!(Filter::Truncate100.apply_to_text("abc"), Some("abc".to_string()));
        assert_eq!(Filter::TagName.apply_to_text("abc"), None);
        assert!(!Filter::JoinedChildText.accepts_text());
    }

    #[test]
    fn test_names_round_trip() {
        for filter in Filter::ALL {
            assert_eq!(Filter::from_name(filter.name()), Some(filter));
        }
    }
}
