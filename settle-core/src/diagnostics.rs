//! Problems collected while checking configuration

use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::error::ConfiguratorError;
use crate::node::{Node, Source};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub source: Option<Source>,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    /// Line for reports, `-1` when unknown
    pub fn line(&self) -> i64 {
        self.source.as_ref().map_or(-1, Source::line_or_unknown)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, source: Option<Source>, severity: Severity, message: impl Into<String>) {
        self.entries.push(Diagnostic {
            source,
            severity,
            message: message.into(),
        });
    }

    pub fn push_warning(&mut self, node: &Node, message: impl Into<String>) {
        self.push(node.source().cloned(), Severity::Warning, message);
    }

    /// Record a hard error, located at its innermost known position
    pub fn push_error(&mut self, error: &ConfiguratorError) {
        let source = error
            .deepest_cause()
            .location()
            .or_else(|| error.location())
            .cloned();
        self.push(source, Severity::Error, error.to_string());
    }

    pub fn from_error(error: &ConfiguratorError) -> Self {
        let mut diagnostics = Self::new();
        diagnostics.push_error(error);
        diagnostics
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Messages grouped by source; unattributed messages come first
    pub fn by_source(&self) -> BTreeMap<Option<Source>, Vec<&Diagnostic>> {
        let mut grouped: BTreeMap<Option<Source>, Vec<&Diagnostic>> = BTreeMap::new();
        for diagnostic in &self.entries {
            grouped
                .entry(diagnostic.source.clone())
                .or_default()
                .push(diagnostic);
        }
        grouped
    }

    /// `[{"line": n, "error"|"warning": message}]`
    pub fn to_json(&self) -> Value {
        Value::Array(
            self.entries
                .iter()
                .map(|d| json!({ "line": d.line(), (d.severity.as_str()): d.message }))
                .collect(),
        )
    }

    /// Errors only, as `[{"line": n, "message": message}]`
    pub fn problems_json(&self) -> Value {
        Value::Array(
            self.errors()
                .map(|d| json!({ "line": d.line(), "message": d.message }))
                .collect(),
        )
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
