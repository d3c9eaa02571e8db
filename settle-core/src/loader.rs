//! Reading configuration sources into raw documents
//!
//! A candidate is a file, a directory or a `file://` URI. Directories are
//! walked recursively for YAML files, skipping hidden entries, and the files
//! are applied in lexicographic order.
//!
//! Documents are read from parser events, so the resource limits apply
//! before any alias is expanded and every node keeps its line.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use url::Url;
use walkdir::WalkDir;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, TScalarStyle};

use crate::error::{ConfiguratorError, ConfiguratorResult, ResourceLimit};
use crate::merge::{RawDocument, ResourceLimits};
use crate::node::{Mapping, Node, Scalar, Sequence, Source};

/// Extensions picked up when expanding a directory
pub const YAML_EXTENSIONS: [&str; 4] = ["yml", "yaml", "YAML", "YML"];

/// Key whose value is merged into the enclosing mapping
const MERGE_KEY: &str = "<<";

static FLOAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[-+]?(\.[0-9]+|[0-9]+(\.[0-9]*)?)([eE][-+]?[0-9]+)?$").expect("float pattern is valid")
});

/// One document to load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Inline { origin: String, text: String },
}

impl ConfigSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn inline(origin: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Inline {
            origin: origin.into(),
            text: text.into(),
        }
    }

    /// Identity used for source attribution
    pub fn origin(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Inline { origin, .. } => origin.clone(),
        }
    }

    pub fn load(&self, limits: ResourceLimits) -> ConfiguratorResult<RawDocument> {
        match self {
            Self::File(path) => {
                let text = std::fs::read_to_string(path)?;
                parse_document(&self.origin(), &text, limits)
            }
            Self::Inline { origin, text } => parse_document(origin, text, limits),
        }
    }
}

/// Expand candidates into concrete sources, preserving candidate order
pub fn discover(candidates: &[String]) -> ConfiguratorResult<Vec<ConfigSource>> {
    let mut sources = Vec::new();
    for candidate in candidates {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            continue;
        }
        sources.extend(expand_candidate(candidate)?.into_iter().map(ConfigSource::File));
    }
    tracing::debug!(target: "loader", candidates = candidates.len(), sources = sources.len(), "Sources discovered");
    Ok(sources)
}

/// Files named by one candidate
pub fn expand_candidate(candidate: &str) -> ConfiguratorResult<Vec<PathBuf>> {
    let path = if candidate.contains("://") {
        local_path(candidate)?
    } else {
        PathBuf::from(candidate)
    };

    if path.is_dir() {
        yaml_files(&path)
    } else if path.exists() {
        Ok(vec![path])
    } else {
        Err(ConfiguratorError::InvalidSource {
            path: candidate.to_string(),
        })
    }
}

fn local_path(candidate: &str) -> ConfiguratorResult<PathBuf> {
    let invalid = || ConfiguratorError::InvalidSource {
        path: candidate.to_string(),
    };
    let url = Url::parse(candidate).map_err(|_| invalid())?;
    match url.scheme() {
        "file" => url.to_file_path().map_err(|_| invalid()),
        "http" | "https" => Err(ConfiguratorError::new(format!(
            "Remote configuration source '{}' is not supported",
            candidate
        ))),
        _ => Err(invalid()),
    }
}

/// YAML files below `root`, sorted, without hidden entries
pub fn yaml_files(root: &Path) -> ConfiguratorResult<Vec<PathBuf>> {
    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.'));

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        let is_yaml = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| YAML_EXTENSIONS.contains(&ext));
        if entry.file_type().is_file() && is_yaml {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Load every source in order
pub fn load_documents(sources: &[ConfigSource], limits: ResourceLimits) -> ConfiguratorResult<Vec<RawDocument>> {
    sources.iter().map(|source| source.load(limits)).collect()
}

/// Parse YAML text into a document. The code-point and alias bounds are
/// enforced on the text and its events before the tree is built. Merge keys
/// (`<<`) are expanded and an empty document becomes an empty mapping.
pub fn parse_document(origin: &str, text: &str, limits: ResourceLimits) -> ConfiguratorResult<RawDocument> {
    let code_points = text.chars().count();
    limits.check(ResourceLimit::CodePoints, code_points)?;

    let events = parse_events(origin, text)?;
    let aliases = events
        .iter()
        .filter(|(event, _)| matches!(event, Event::Alias(_)))
        .count();
    limits.check(ResourceLimit::Aliases, aliases)?;

    let source = Source::origin(origin);
    let root = match TreeBuilder::new(origin).build(events)? {
        Some(Node::Scalar(scalar)) if scalar.is_blank() => {
            Node::Mapping(Mapping::new().with_source(source.clone()))
        }
        Some(node) => node,
        None => Node::Mapping(Mapping::new().with_source(source.clone())),
    };

    tracing::trace!(target: "loader", origin, aliases, code_points, "Document parsed");
    Ok(RawDocument::new(source, root).with_counts(aliases, code_points))
}

#[derive(Default)]
struct EventLog {
    events: Vec<(Event, Marker)>,
}

impl MarkedEventReceiver for EventLog {
    fn on_event(&mut self, event: Event, mark: Marker) {
        self.events.push((event, mark));
    }
}

fn parse_events(origin: &str, text: &str) -> ConfiguratorResult<Vec<(Event, Marker)>> {
    let mut log = EventLog::default();
    Parser::new(text.chars())
        .load(&mut log, false)
        .map_err(|source| ConfiguratorError::Parse {
            origin: origin.to_string(),
            source,
        })?;
    Ok(log.events)
}

struct PendingKey {
    name: String,
    merge: bool,
}

enum Frame {
    Sequence {
        node: Sequence,
        anchor: usize,
    },
    Mapping {
        node: Mapping,
        anchor: usize,
        key: Option<PendingKey>,
        merges: Vec<Mapping>,
    },
}

/// Assembles nodes from parser events; anchors are kept by id and aliases
/// become copies of the anchored node.
struct TreeBuilder<'a> {
    origin: &'a str,
    anchors: HashMap<usize, Node>,
    stack: Vec<Frame>,
    root: Option<Node>,
}

impl<'a> TreeBuilder<'a> {
    fn new(origin: &'a str) -> Self {
        Self {
            origin,
            anchors: HashMap::new(),
            stack: Vec::new(),
            root: None,
        }
    }

    fn build(mut self, events: Vec<(Event, Marker)>) -> ConfiguratorResult<Option<Node>> {
        for (event, mark) in events {
            let source = Source::at_line(self.origin, mark.line());
            match event {
                Event::Scalar(value, style, anchor, ..) => {
                    let plain = matches!(style, TScalarStyle::Plain);
                    let merge = plain && value == MERGE_KEY;
                    let scalar = if plain { plain_scalar(value) } else { Scalar::new(value) };
                    self.complete(scalar.with_source(source.clone()).into(), anchor, merge, &source)?;
                }
                Event::Alias(id) => {
                    let node = self
                        .anchors
                        .get(&id)
                        .cloned()
                        .ok_or_else(|| located("Reference to an unknown anchor", &source))?;
                    self.complete(node, 0, false, &source)?;
                }
                Event::SequenceStart(anchor, ..) => {
                    let node = Sequence::new().with_source(source.clone());
                    self.open(Frame::Sequence { node, anchor }, &source)?;
                }
                Event::MappingStart(anchor, ..) => {
                    let node = Mapping::new().with_source(source.clone());
                    let frame = Frame::Mapping {
                        node,
                        anchor,
                        key: None,
                        merges: Vec::new(),
                    };
                    self.open(frame, &source)?;
                }
                Event::SequenceEnd | Event::MappingEnd => self.close(&source)?,
                _ => {}
            }
        }
        Ok(self.root)
    }

    fn open(&mut self, frame: Frame, source: &Source) -> ConfiguratorResult<()> {
        if let Some(Frame::Mapping { key: None, .. }) = self.stack.last() {
            return Err(located("Only scalar mapping keys are supported", source));
        }
        self.stack.push(frame);
        Ok(())
    }

    fn close(&mut self, source: &Source) -> ConfiguratorResult<()> {
        let (node, anchor) = match self.stack.pop() {
            Some(Frame::Sequence { node, anchor }) => (Node::Sequence(node), anchor),
            Some(Frame::Mapping {
                mut node,
                anchor,
                merges,
                ..
            }) => {
                for merged in merges {
                    for (key, value) in merged {
                        if !node.contains_key(&key) {
                            node.insert(key, value);
                        }
                    }
                }
                (Node::Mapping(node), anchor)
            }
            None => return Err(located("Unbalanced end of collection", source)),
        };
        self.complete(node, anchor, false, source)
    }

    fn complete(&mut self, node: Node, anchor: usize, merge: bool, source: &Source) -> ConfiguratorResult<()> {
        if anchor != 0 {
            self.anchors.insert(anchor, node.clone());
        }

        let Some(frame) = self.stack.last_mut() else {
            self.root = Some(node);
            return Ok(());
        };

        match frame {
            Frame::Sequence { node: sequence, .. } => sequence.push(node),
            Frame::Mapping {
                node: mapping,
                key,
                merges,
                ..
            } => match key.take() {
                None => match node {
                    Node::Scalar(scalar) => {
                        *key = Some(PendingKey {
                            name: scalar.value().to_string(),
                            merge,
                        });
                    }
                    _ => return Err(located("Only scalar mapping keys are supported", source)),
                },
                Some(PendingKey { merge: true, .. }) => match node {
                    Node::Mapping(merged) => merges.push(merged),
                    Node::Sequence(items) => {
                        for item in items {
                            merges.push(item.into_mapping()?);
                        }
                    }
                    Node::Scalar(_) => {
                        return Err(located("Merge key expects a mapping or a list of mappings", source));
                    }
                },
                Some(PendingKey { name, .. }) => {
                    if mapping.contains_key(&name) {
                        return Err(located(&format!("Duplicate key '{}'", name), source));
                    }
                    mapping.insert(name, node);
                }
            },
        }
        Ok(())
    }
}

fn located(message: &str, source: &Source) -> ConfiguratorError {
    ConfiguratorError::new(format!("{} at {}", message, source)).with_location(source.clone())
}

/// Type an unquoted scalar the way the YAML core schema does
fn plain_scalar(value: String) -> Scalar {
    match value.as_str() {
        "" | "~" | "null" | "Null" | "NULL" => return Scalar::new(""),
        "true" | "True" | "TRUE" => return Scalar::boolean(true),
        "false" | "False" | "FALSE" => return Scalar::boolean(false),
        _ => {}
    }
    match number(&value) {
        Some(number) => Scalar::number(number),
        None => Scalar::new(value),
    }
}

fn number(value: &str) -> Option<String> {
    if let Ok(i) = value.parse::<i64>() {
        return Some(i.to_string());
    }
    if let Ok(u) = value.parse::<u64>() {
        return Some(u.to_string());
    }
    if let Some(hex) = value.strip_prefix("0x") {
        return i64::from_str_radix(hex, 16).ok().map(|i| i.to_string());
    }
    if let Some(octal) = value.strip_prefix("0o") {
        return i64::from_str_radix(octal, 8).ok().map(|i| i.to_string());
    }
    FLOAT.is_match(value).then(|| value.to_string())
}
