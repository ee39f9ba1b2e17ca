//! Location-path selection over roxmltree nodes.
//!
//! Selectors are compiled once, when the manifest is validated, so syntax
//! errors and unbound prefixes are configuration errors rather than
//! per-document failures. The supported dialect is the location-path part
//! of XPath 1.0:
//!
//! - `.` (the context node itself), `..`, `*`, `node()`, `text()`
//! - absolute `/a/b` and `//a`, relative `a/b`, `./a`, `.//a`, `a//b`
//! - explicit axes such as `child::`, `descendant::`, `ancestor::`,
//!   `following-sibling::`
//! - predicates `[n]`, `[last()]`, `[@attr]`, `[@attr='value']`, `[name]`
//!
//! Unprefixed names match the local name in any namespace, so manifests for
//! TEI documents (default namespace) can use plain element names.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use roxmltree::Node;

use super::utils::{get_tag_name, resolve_prefix, NamespaceMap, QualifiedName};
use crate::error::{MapperError, Result};

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}_][\p{L}\p{N}_.\-]*$").expect("valid regex"));

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static ATTRIBUTE_PREDICATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^@([^\s=\[\]]+)\s*(?:=\s*(?:'([^']*)'|"([^"]*)"))?$"#).expect("valid regex")
});

/// A compiled selection path.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    source: String,
    kind: SelectorKind,
}

#[derive(Debug, Clone, PartialEq)]
enum SelectorKind {
    /// The special "." path.
    Context,
    Path { absolute: bool, steps: Vec<Step> },
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    SelfNode,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
}

impl Axis {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "child" => Some(Self::Child),
            "descendant" => Some(Self::Descendant),
            "descendant-or-self" => Some(Self::DescendantOrSelf),
            "self" => Some(Self::SelfNode),
            "parent" => Some(Self::Parent),
            "ancestor" => Some(Self::Ancestor),
            "ancestor-or-self" => Some(Self::AncestorOrSelf),
            "following-sibling" => Some(Self::FollowingSibling),
            "preceding-sibling" => Some(Self::PrecedingSibling),
            _ => None,
        }
    }

    /// Nodes on this axis, in proximity order (reverse axes walk backwards).
    fn nodes<'a, 'input>(self, node: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
        match self {
            Self::Child => node.children().collect(),
            Self::Descendant => node.descendants().skip(1).collect(),
            Self::DescendantOrSelf => node.descendants().collect(),
            Self::SelfNode => vec![node],
            Self::Parent => node.parent().into_iter().collect(),
            Self::Ancestor => node.ancestors().skip(1).collect(),
            Self::AncestorOrSelf => node.ancestors().collect(),
            Self::FollowingSibling => node.next_siblings().skip(1).collect(),
            Self::PrecedingSibling => node.prev_siblings().skip(1).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum NodeTest {
    /// `name` or `prefix:name`.
    Name {
        namespace: Option<String>,
        local: String,
    },
    /// `*`
    AnyElement,
    /// `prefix:*`
    AnyInNamespace(String),
    /// `node()`
    AnyNode,
    /// `text()`
    Text,
}

impl NodeTest {
    fn parse(test: &str, namespaces: &NamespaceMap, path: &str) -> Result<Self> {
        match test {
            "*" => return Ok(Self::AnyElement),
            "node()" => return Ok(Self::AnyNode),
            "text()" => return Ok(Self::Text),
            _ => {}
        }

        let (prefix, local) = match test.split_once(':') {
            Some((prefix, local)) => (Some(prefix), local),
            None => (None, test),
        };

        let namespace = prefix
            .map(|p| {
                if NAME_PATTERN.is_match(p) {
                    resolve_prefix(p, namespaces)
                } else {
                    Err(MapperError::invalid_path(path, format!("invalid prefix '{p}'")))
                }
            })
            .transpose()?;

        if local == "*" {
            return match namespace {
                Some(ns) => Ok(Self::AnyInNamespace(ns)),
                None => Err(MapperError::invalid_path(path, "invalid name test")),
            };
        }

        if !NAME_PATTERN.is_match(local) {
            return Err(MapperError::invalid_path(
                path,
                format!("invalid node test '{test}'"),
            ));
        }

        Ok(Self::Name {
            namespace,
            local: local.to_string(),
        })
    }

    fn matches(&self, node: Node<'_, '_>) -> bool {
        match self {
            Self::Name { namespace, local } => {
                node.is_element()
                    && get_tag_name(node) == local
                    && namespace
                        .as_deref()
                        .map_or(true, |ns| node.tag_name().namespace() == Some(ns))
            }
            Self::AnyElement => node.is_element(),
            Self::AnyInNamespace(ns) => {
                node.is_element() && node.tag_name().namespace() == Some(ns.as_str())
            }
            Self::AnyNode => true,
            Self::Text => node.is_text(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    /// `[n]`, 1-based.
    Position(usize),
    /// `[last()]`
    Last,
    /// `[@attr]`
    HasAttribute(QualifiedName),
    /// `[@attr='value']`
    AttributeEquals(QualifiedName, String),
    /// `[name]`: has a child matching the test.
    HasChild(NodeTest),
}

impl Predicate {
    fn parse(body: &str, namespaces: &NamespaceMap, path: &str) -> Result<Self> {
        let body = body.trim();
        if body.is_empty() {
            return Err(MapperError::invalid_path(path, "empty predicate"));
        }

        if body.chars().all(|c| c.is_ascii_digit()) {
            let position: usize = body
                .parse()
                .map_err(|_| MapperError::invalid_path(path, "position out of range"))?;
            if position == 0 {
                return Err(MapperError::invalid_path(path, "positions start at 1"));
            }
            return Ok(Self::Position(position));
        }

        if body == "last()" {
            return Ok(Self::Last);
        }

        if body.starts_with('@') {
            let captures = ATTRIBUTE_PREDICATE.captures(body).ok_or_else(|| {
                MapperError::invalid_path(path, format!("unsupported predicate '[{body}]'"))
            })?;
            let name = QualifiedName::parse(&captures[1], namespaces)?;
            let value = captures.get(2).or_else(|| captures.get(3));
            return Ok(match value {
                Some(value) => Self::AttributeEquals(name, value.as_str().to_string()),
                None => Self::HasAttribute(name),
            });
        }

        NodeTest::parse(body, namespaces, path)
            .map(Self::HasChild)
            .map_err(|_| MapperError::invalid_path(path, format!("unsupported predicate '[{body}]'")))
    }

    /// Keep the candidates satisfying this predicate; positions are relative
    /// to the candidate list.
    fn filter<'a, 'input>(&self, candidates: Vec<Node<'a, 'input>>) -> Vec<Node<'a, 'input>> {
        match self {
            Self::Position(position) => candidates.into_iter().nth(position - 1).into_iter().collect(),
            Self::Last => candidates.into_iter().last().into_iter().collect(),
            Self::HasAttribute(name) => candidates
                .into_iter()
                .filter(|n| name.attribute(*n).is_some())
                .collect(),
            Self::AttributeEquals(name, value) => candidates
                .into_iter()
                .filter(|n| name.attribute(*n) == Some(value.as_str()))
                .collect(),
            Self::HasChild(test) => candidates
                .into_iter()
                .filter(|n| n.children().any(|c| test.matches(c)))
                .collect(),
        }
    }
}

impl Selector {
    /// Compile a selection path.
    ///
    /// # Examples
    /// ```
    /// use briefedition_mapper::xml::{NamespaceMap, Selector};
    ///
    /// let namespaces = NamespaceMap::new();
    /// assert!(Selector::parse(".//persName[@ref]", &namespaces).is_ok());
    /// assert!(Selector::parse("//", &namespaces).is_err());
    /// ```
    pub fn parse(path: &str, namespaces: &NamespaceMap) -> Result<Self> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(MapperError::invalid_path(path, "empty path"));
        }

        if trimmed == "." {
            return Ok(Self {
                source: trimmed.to_string(),
                kind: SelectorKind::Context,
            });
        }

        let absolute = trimmed.starts_with('/');
        let mut segments = split_steps(trimmed, path)?;
        if absolute {
            segments.remove(0);
        }

        let mut steps = Vec::new();
        let last = segments.len().saturating_sub(1);
        for (index, segment) in segments.iter().enumerate() {
            if segment.is_empty() {
                // "/" alone selects the document root
                if absolute && segments.len() == 1 {
                    break;
                }
                if index == last {
                    return Err(MapperError::invalid_path(path, "path must not end with '/'"));
                }
                steps.push(Step {
                    axis: Axis::DescendantOrSelf,
                    test: NodeTest::AnyNode,
                    predicates: Vec::new(),
                });
                continue;
            }
            steps.push(parse_step(segment, namespaces, path)?);
        }

        Ok(Self {
            source: trimmed.to_string(),
            kind: SelectorKind::Path { absolute, steps },
        })
    }

    /// The path as written in the manifest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether this is the "." path.
    #[must_use]
    pub fn is_context(&self) -> bool {
        matches!(self.kind, SelectorKind::Context)
    }

    /// Evaluate against `context`, returning matches in document order without duplicates.
    pub fn select<'a, 'input>(&self, context: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
        let (absolute, steps) = match &self.kind {
            SelectorKind::Context => return vec![context],
            SelectorKind::Path { absolute, steps } => (*absolute, steps),
        };

        let start = if absolute {
            context.document().root()
        } else {
            context
        };

        let mut current = vec![start];
        for step in steps {
            let mut next = Vec::new();
            for node in &current {
                let mut candidates: Vec<_> = step
                    .axis
                    .nodes(*node)
                    .into_iter()
                    .filter(|n| step.test.matches(*n))
                    .collect();
                for predicate in &step.predicates {
                    candidates = predicate.filter(candidates);
                }
                next.extend(candidates);
            }
            next.sort_by_key(|n| n.id().get());
            next.dedup_by_key(|n| n.id().get());
            if next.is_empty() {
                return next;
            }
            current = next;
        }

        current
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Evaluate `selector` relative to `context`.
pub fn select<'a, 'input>(context: Node<'a, 'input>, selector: &Selector) -> Vec<Node<'a, 'input>> {
    selector.select(context)
}

/// Split a path on '/' outside predicates and quoted strings.
fn split_steps<'p>(path: &'p str, original: &str) -> Result<Vec<&'p str>> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (index, c) in path.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| MapperError::invalid_path(original, "unbalanced ']'"))?;
            }
            (None, '/') if depth == 0 => {
                segments.push(path[start..index].trim());
                start = index + 1;
            }
            _ => {}
        }
    }

    if quote.is_some() {
        return Err(MapperError::invalid_path(original, "unterminated string literal"));
    }
    if depth != 0 {
        return Err(MapperError::invalid_path(original, "unbalanced '['"));
    }

    segments.push(path[start..].trim());
    Ok(segments)
}

fn parse_step(segment: &str, namespaces: &NamespaceMap, path: &str) -> Result<Step> {
    match segment {
        "." => {
            return Ok(Step {
                axis: Axis::SelfNode,
                test: NodeTest::AnyNode,
                predicates: Vec::new(),
            })
        }
        ".." => {
            return Ok(Step {
                axis: Axis::Parent,
                test: NodeTest::AnyNode,
                predicates: Vec::new(),
            })
        }
        _ => {}
    }

    if segment.starts_with('@') || segment.starts_with("attribute::") {
        return Err(MapperError::invalid_path(
            path,
            "attribute steps are not supported, use 'attrib' instead",
        ));
    }

    let (test_part, predicate_part) = match segment.find('[') {
        Some(index) => (&segment[..index], &segment[index..]),
        None => (segment, ""),
    };

    let (axis, test) = match test_part.split_once("::") {
        Some((axis_name, test)) => {
            let axis = Axis::from_name(axis_name.trim()).ok_or_else(|| {
                MapperError::invalid_path(path, format!("unsupported axis '{axis_name}'"))
            })?;
            (axis, test.trim())
        }
        None => (Axis::Child, test_part.trim()),
    };

    Ok(Step {
        axis,
        test: NodeTest::parse(test, namespaces, path)?,
        predicates: parse_predicates(predicate_part, namespaces, path)?,
    })
}

fn parse_predicates(input: &str, namespaces: &NamespaceMap, path: &str) -> Result<Vec<Predicate>> {
    let mut predicates = Vec::new();
    let mut rest = input.trim();

    while !rest.is_empty() {
        let body = rest
            .strip_prefix('[')
            .ok_or_else(|| MapperError::invalid_path(path, "unexpected text after predicate"))?;

        let mut quote: Option<char> = None;
        let mut end = None;
        for (index, c) in body.char_indices() {
            match (quote, c) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, '\'' | '"') => quote = Some(c),
                (None, '[') => {
                    return Err(MapperError::invalid_path(path, "nested predicates are not supported"))
                }
                (None, ']') => {
                    end = Some(index);
                    break;
                }
                _ => {}
            }
        }

        let end = end.ok_or_else(|| MapperError::invalid_path(path, "unbalanced '['"))?;
        predicates.push(Predicate::parse(&body[..end], namespaces, path)?);
        rest = body[end + 1..].trim_start();
    }

    Ok(predicates)
}
