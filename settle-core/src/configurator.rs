//! Configurator capability and its metadata

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use crate::context::ConfigurationContext;
use crate::error::ConfiguratorResult;
use crate::identity::SystemIdentity;
use crate::node::Node;

/// Root configurator priority for determining dispatch order. Priorities
/// compare by value, so `Custom(100)` equals `High`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Priority {
    /// Runs strictly before every other root configurator; at most one per registry
    Bootstrap,
    /// High priority
    High,
    /// Normal priority (default)
    Normal,
    /// Low priority
    Low,
    /// Lowest priority (executes last)
    Lowest,
    /// Custom priority with specific value
    Custom(u16),
}

impl Priority {
    pub fn value(&self) -> u16 {
        match self {
            Priority::Bootstrap => 0,
            Priority::High => 100,
            Priority::Normal => 500,
            Priority::Low => 900,
            Priority::Lowest => 1000,
            Priority::Custom(value) => *value,
        }
    }

    pub fn is_bootstrap(&self) -> bool {
        matches!(self, Priority::Bootstrap)
    }

    fn sort_key(&self) -> (u8, u16) {
        (u8::from(!self.is_bootstrap()), self.value())
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Normal
    }
}

impl PartialEq for Priority {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}

impl Eq for Priority {}

impl Hash for Priority {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sort_key().hash(state);
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<u16> for Priority {
    fn from(value: u16) -> Self {
        match value {
            100 => Self::High,
            500 => Self::Normal,
            900 => Self::Low,
            1000 => Self::Lowest,
            _ => Self::Custom(value),
        }
    }
}

/// Why an attribute is restricted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeRestriction {
    /// Usable when the restriction policy is `beta`
    Beta,
    /// Internal; only accepted when the restriction policy is `warn`
    NoExternalUse,
}

/// A configurable attribute of a semantic type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    name: String,
    target_type: String,
    deprecated: bool,
    restriction: Option<AttributeRestriction>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_type: target_type.into(),
            deprecated: false,
            restriction: None,
        }
    }

    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    pub fn restricted(mut self, restriction: AttributeRestriction) -> Self {
        self.restriction = Some(restriction);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type identifier of the attribute value, used to find nested configurators
    pub fn target_type(&self) -> &str {
        &self.target_type
    }

    pub fn is_deprecated(&self) -> bool {
        self.deprecated
    }

    pub fn restriction(&self) -> Option<AttributeRestriction> {
        self.restriction
    }
}

/// Handler for one semantic type of the live system.
///
/// Root configurators own one top-level key of the configuration document;
/// nested configurators are reachable through [`Attribute::target_type`].
pub trait Configurator: Send + Sync {
    /// Semantic type identifier
    fn target_type(&self) -> &str;

    /// Root key; defaults to the type identifier
    fn name(&self) -> &str {
        self.target_type()
    }

    fn attributes(&self) -> Vec<Attribute> {
        Vec::new()
    }

    /// Current live state as a tree, or `None` when there is nothing to export
    fn describe(&self, context: &ConfigurationContext) -> ConfiguratorResult<Option<Node>>;

    /// Validate `config` without touching the live system
    fn check(&self, config: &Node, context: &ConfigurationContext) -> ConfiguratorResult<()>;

    /// Apply `config` to the live system
    fn configure(
        &self,
        config: &Node,
        context: &ConfigurationContext,
        identity: &SystemIdentity,
    ) -> ConfiguratorResult<()>;
}
