//! XML utilities and the location-path selector.

mod selector;
mod utils;

pub use selector::{select, Selector};
pub use utils::{
    element_children, find_descendant, full_text, get_tag_name, normalize_whitespace,
    normalized_text, resolve_prefix, NamespaceMap, QualifiedName,
};
