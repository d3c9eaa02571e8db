//! Records obsolete-configuration warnings raised while a cycle configures

use parking_lot::RwLock;
use serde::Serialize;

use crate::node::{Node, Source};

/// One recorded warning
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObsoleteEntry {
    pub source: Option<Source>,
    pub message: String,
}

/// Warnings of the last configure cycle. Reset at the start of each cycle
/// and read-only in between.
#[derive(Debug, Default)]
pub struct ObsoleteConfigurationMonitor {
    entries: RwLock<Vec<ObsoleteEntry>>,
}

impl ObsoleteConfigurationMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        self.entries.write().clear();
    }

    pub fn record(&self, node: &Node, message: &str) {
        tracing::warn!(
            target: "monitor",
            source = node.source().map(ToString::to_string).unwrap_or_default(),
            "{}",
            message
        );
        self.entries.write().push(ObsoleteEntry {
            source: node.source().cloned(),
            message: message.to_string(),
        });
    }

    /// Snapshot of the recorded warnings
    pub fn errors(&self) -> Vec<ObsoleteEntry> {
        self.entries.read().clone()
    }

    /// Whether the last cycle recorded anything
    pub fn is_activated(&self) -> bool {
        !self.entries.read().is_empty()
    }
}
