//! Configuration tree: mappings, sequences and scalars with source attribution
//!
//! Trees are owned top-down, so a child is always reached through its parent
//! and `Clone` is a deep structural copy.

use serde::Serialize;
use std::fmt;

use crate::error::{ConfiguratorError, ConfiguratorResult};

/// Where a node came from: the document origin (path or URI) and, when the
/// parser exposes it, the line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Source {
    pub origin: String,
    pub line: Option<usize>,
}

impl Source {
    pub fn new(origin: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            origin: origin.into(),
            line,
        }
    }

    /// Source known only by its origin
    pub fn origin(origin: impl Into<String>) -> Self {
        Self::new(origin, None)
    }

    pub fn at_line(origin: impl Into<String>, line: usize) -> Self {
        Self::new(origin, Some(line))
    }

    /// Line number for reports, `-1` when unknown
    pub fn line_or_unknown(&self) -> i64 {
        self.line.map(|line| line as i64).unwrap_or(-1)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.origin, line),
            None => f.write_str(&self.origin),
        }
    }
}

/// How a scalar is typed when emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Format {
    String,
    Number,
    Boolean,
    MultilineString,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scalar {
    value: String,
    format: Format,
    raw: bool,
    printable_when_empty: bool,
    source: Option<Source>,
}

impl Scalar {
    /// String scalar; values containing a newline are multi-line strings
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let format = if value.contains('\n') {
            Format::MultilineString
        } else {
            Format::String
        };
        Self {
            value,
            format,
            raw: false,
            printable_when_empty: false,
            source: None,
        }
    }

    pub fn number(value: impl fmt::Display) -> Self {
        Self::new(value.to_string()).with_format(Format::Number)
    }

    pub fn boolean(value: bool) -> Self {
        Self::new(value.to_string()).with_format(Format::Boolean)
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Emit a multi-line value as one flow scalar instead of a literal block
    pub fn raw(mut self) -> Self {
        self.raw = true;
        self
    }

    /// Keep the scalar in emitted output even when blank
    pub fn printable_when_empty(mut self) -> Self {
        self.printable_when_empty = true;
        self
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn is_raw(&self) -> bool {
        self.raw
    }

    pub fn is_printable_when_empty(&self) -> bool {
        self.printable_when_empty
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }

    pub fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Ordered mapping with unique string keys
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mapping {
    entries: Vec<(String, Node)>,
    source: Option<Source>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Node>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a value; an existing key keeps its position and the previous
    /// value is returned.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Node>) -> Option<Node> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<Node> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Index of the first key equal to `name` ignoring ASCII case
    pub fn position_ignore_case(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    /// Entry at `index`; panics when out of bounds, like `Vec::remove`
    pub fn remove_at(&mut self, index: usize) -> (String, Node) {
        self.entries.remove(index)
    }

    pub fn entry_at(&self, index: usize) -> Option<(&str, &Node)> {
        self.entries.get(index).map(|(k, v)| (k.as_str(), v))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }
}

impl IntoIterator for Mapping {
    type Item = (String, Node);
    type IntoIter = std::vec::IntoIter<(String, Node)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sequence {
    items: Vec<Node>,
    source: Option<Source>,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with(mut self, item: impl Into<Node>) -> Self {
        self.push(item);
        self
    }

    pub fn push(&mut self, item: impl Into<Node>) {
        self.items.push(item.into());
    }

    pub fn get(&self, index: usize) -> Option<&Node> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }
}

impl IntoIterator for Sequence {
    type Item = Node;
    type IntoIter = std::vec::IntoIter<Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl FromIterator<Node> for Sequence {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
            source: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Mapping,
    Sequence,
    Scalar,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeType::Mapping => "mapping",
            NodeType::Sequence => "sequence",
            NodeType::Scalar => "scalar",
        };
        f.write_str(name)
    }
}

/// A configuration tree node
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Mapping(Mapping),
    Sequence(Sequence),
    Scalar(Scalar),
}

impl Node {
    pub fn node_type(&self) -> NodeType {
        match self {
            Node::Mapping(_) => NodeType::Mapping,
            Node::Sequence(_) => NodeType::Sequence,
            Node::Scalar(_) => NodeType::Scalar,
        }
    }

    pub fn source(&self) -> Option<&Source> {
        match self {
            Node::Mapping(mapping) => mapping.source(),
            Node::Sequence(sequence) => sequence.source(),
            Node::Scalar(scalar) => scalar.source(),
        }
    }

    pub fn as_mapping(&self) -> ConfiguratorResult<&Mapping> {
        match self {
            Node::Mapping(mapping) => Ok(mapping),
            other => Err(other.type_error(NodeType::Mapping)),
        }
    }

    pub fn as_sequence(&self) -> ConfiguratorResult<&Sequence> {
        match self {
            Node::Sequence(sequence) => Ok(sequence),
            other => Err(other.type_error(NodeType::Sequence)),
        }
    }

    pub fn as_scalar(&self) -> ConfiguratorResult<&Scalar> {
        match self {
            Node::Scalar(scalar) => Ok(scalar),
            other => Err(other.type_error(NodeType::Scalar)),
        }
    }

    pub fn into_mapping(self) -> ConfiguratorResult<Mapping> {
        match self {
            Node::Mapping(mapping) => Ok(mapping),
            other => Err(other.type_error(NodeType::Mapping)),
        }
    }

    fn type_error(&self, expected: NodeType) -> ConfiguratorError {
        let error = ConfiguratorError::new(format!(
            "Item isn't a {}, found {}",
            expected,
            self.node_type()
        ));
        match self.source() {
            Some(source) => error.with_location(source.clone()),
            None => error,
        }
    }
}

impl From<Mapping> for Node {
    fn from(mapping: Mapping) -> Self {
        Node::Mapping(mapping)
    }
}

impl From<Sequence> for Node {
    fn from(sequence: Sequence) -> Self {
        Node::Sequence(sequence)
    }
}

impl From<Scalar> for Node {
    fn from(scalar: Scalar) -> Self {
        Node::Scalar(scalar)
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::Scalar(Scalar::new(value))
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::Scalar(Scalar::new(value))
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Node::Scalar(Scalar::boolean(value))
    }
}
