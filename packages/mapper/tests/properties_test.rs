//! Property interpreter scenarios over small inline documents.

use briefedition_mapper::{evaluate, Manifest};
use pretty_assertions::assert_eq;
use serde_json::{json, Value as JsonValue};

/// Evaluate a `properties:` block (YAML, 6-space indented) against `xml`.
fn process(properties: &str, xml: &str) -> JsonValue {
    let yaml = format!("collection: c\nentities:\n  e:\n    xpath: .\n    properties:\n{properties}");
    let manifest = Manifest::from_yaml_str(&yaml).unwrap();
    let doc = roxmltree::Document::parse(xml).unwrap();
    let result = evaluate(&manifest.entity("e").unwrap().properties, doc.root_element()).unwrap();
    serde_json::to_value(result).unwrap()
}

#[test]
fn test_single_nested_context_path() {
    let properties = "      spam:\n        xpath: ['.//spam']\n        properties:\n          foo: { xpath: ['.'] }\n";
    assert_eq!(
        process(properties, "<foo><spam>def</spam></foo>"),
        json!({ "spam": { "foo": "def" } })
    );
}

#[test]
fn test_single_values_at_different_depths() {
    let properties = "      spam: { xpath: ['.//spam'] }\n      ham: { xpath: ['.//ham'] }\n";
    assert_eq!(
        process(properties, "<foo><bar><ham>abc</ham></bar><spam>def</spam></foo>"),
        json!({ "spam": "def", "ham": "abc" })
    );
}

#[test]
fn test_single_values_from_attributes() {
    let properties =
        "      spam: { xpath: ['.//spam'], attrib: [id] }\n      ham: { xpath: ['.//ham'], attrib: [id] }\n";
    assert_eq!(
        process(
            properties,
            "<foo><bar><ham id='x'>abc</ham></bar><spam id='y'>def</spam></foo>"
        ),
        json!({ "spam": "y", "ham": "x" })
    );
}

#[test]
fn test_multiple_values_in_document_order() {
    let properties = "      spam: { xpath: ['.//spam'], multiple: true }\n";
    assert_eq!(
        process(properties, "<foo><bar><spam>abc</spam></bar><spam>def</spam></foo>"),
        json!({ "spam": ["abc", "def"] })
    );
}

#[test]
fn test_nested_without_path_is_relative_to_context() {
    let properties = "      spam:\n        properties:\n          ham: { xpath: ['.//ham'], multiple: true }\n";
    assert_eq!(
        process(
            properties,
            "<foo><ham>xyz</ham><spam><bar><ham>abc</ham><ham>def</ham></bar></spam></foo>"
        ),
        json!({ "spam": { "ham": ["xyz", "abc", "def"] } })
    );
}

#[test]
fn test_nested_with_path_is_relative_to_match() {
    let properties = "      spam:\n        xpath: ['.//spam']\n        sub_properties:\n          ham: { path: ['.//ham'], multiple: true }\n";
    assert_eq!(
        process(
            properties,
            "<foo><ham>xyz</ham><spam><bar><ham>abc</ham><ham>def</ham></bar></spam></foo>"
        ),
        json!({ "spam": { "ham": ["abc", "def"] } })
    );
}

#[test]
fn test_repeated_object_template() {
    let properties = "      foo:\n        xpath: ['.//foo']\n        multiple: true\n        properties:\n          ham: { xpath: ['./ham'] }\n          spam: { xpath: ['./spam'] }\n";
    assert_eq!(
        process(
            properties,
            "<root><foo><ham>abc</ham><spam>def</spam></foo><foo><ham>uvw</ham><spam>xyz</spam></foo></root>"
        ),
        json!({
            "foo": [
                { "ham": "abc", "spam": "def" },
                { "ham": "uvw", "spam": "xyz" }
            ]
        })
    );
}

#[test]
fn test_output_follows_declaration_order() {
    let properties = "      zeta: { xpath: ['./z'] }\n      alpha: { xpath: ['./a'] }\n      mid: { xpath: ['./m'] }\n";
    let result = process(properties, "<r><a>1</a><m>2</m><z>3</z></r>");
    assert_eq!(result.to_string(), r#"{"zeta":"3","alpha":"1","mid":"2"}"#);
}

#[test]
fn test_namespaced_paths() {
    let yaml = "collection: c\nnamespaces:\n  tei: http://www.tei-c.org/ns/1.0\nentities:\n  e:\n    xpath: .\n    properties:\n      tei: { xpath: ['.//tei:title'], multiple: true }\n      any: { xpath: ['.//title'], multiple: true }\n";
    let manifest = Manifest::from_yaml_str(yaml).unwrap();
    let xml = r#"<r xmlns:t="http://www.tei-c.org/ns/1.0"><t:title>TEI</t:title><title>plain</title></r>"#;
    let doc = roxmltree::Document::parse(xml).unwrap();
    let result = evaluate(&manifest.entity("e").unwrap().properties, doc.root_element()).unwrap();
    assert_eq!(
        serde_json::to_value(result).unwrap(),
        json!({ "tei": ["TEI"], "any": ["TEI", "plain"] })
    );
}
