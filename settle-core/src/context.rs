//! Per-cycle policy and state threaded through merge, check and configure

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use settle_config::{Deprecation, Restriction, SettleConfig, Unknown};

use crate::configurator::{AttributeRestriction, Configurator};
use crate::error::{ConfiguratorError, ConfiguratorResult};
use crate::merge::ResourceLimits;
use crate::node::{Mapping, Node};
use crate::registry::ConfiguratorRegistry;
use crate::secrets::{SecretSource, SecretSourceResolver};

/// Model-introspection version. New variants are enabled only by documents
/// that ask for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Version {
    #[default]
    One,
}

impl Version {
    pub fn as_str(&self) -> &'static str {
        match self {
            Version::One => "1",
        }
    }

    pub fn is_at_least(&self, other: Version) -> bool {
        *self >= other
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Version {
    type Err = ConfiguratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(Version::One),
            other => Err(ConfiguratorError::new(format!("unsupported version {}", other))),
        }
    }
}

/// What the dispatcher does when configure fails part-way
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RollbackPolicy {
    /// Sections applied before the failure stay applied
    #[default]
    Partial,
    /// Re-apply the described state of every section touched so far, newest first
    Restore,
}

/// Receives warnings raised while configurators run
pub trait Listener {
    fn warning(&self, node: &Node, message: &str);
}

impl<F> Listener for F
where
    F: Fn(&Node, &str),
{
    fn warning(&self, node: &Node, message: &str) {
        self(node, message)
    }
}

/// State for one reconciliation cycle. Never shared between cycles.
pub struct ConfigurationContext {
    registry: Arc<ConfiguratorRegistry>,
    version: Version,
    deprecated: Deprecation,
    restricted: Restriction,
    unknown: Unknown,
    merge_strategy: Option<String>,
    limits: ResourceLimits,
    rollback: RollbackPolicy,
    mode: Option<String>,
    secret_resolver: SecretSourceResolver,
    listeners: Vec<Box<dyn Listener>>,
}

impl ConfigurationContext {
    /// Context with default policies, limits and no secret sources
    pub fn new(registry: Arc<ConfiguratorRegistry>) -> Self {
        Self {
            registry,
            version: Version::default(),
            deprecated: Deprecation::default(),
            restricted: Restriction::default(),
            unknown: Unknown::default(),
            merge_strategy: None,
            limits: ResourceLimits::default(),
            rollback: RollbackPolicy::default(),
            mode: None,
            secret_resolver: SecretSourceResolver::new(Vec::new()),
            listeners: Vec::new(),
        }
    }

    /// Context seeded from settings
    pub fn from_settings(
        registry: Arc<ConfiguratorRegistry>,
        settings: &SettleConfig,
        secret_sources: Vec<Arc<dyn SecretSource>>,
    ) -> Self {
        let strategy = settings.merge.strategy.trim();
        Self {
            deprecated: settings.policy.deprecated,
            restricted: settings.policy.restricted,
            unknown: settings.policy.unknown,
            merge_strategy: (!strategy.is_empty()).then(|| strategy.to_string()),
            limits: ResourceLimits::from(&settings.limits),
            secret_resolver: SecretSourceResolver::new(secret_sources),
            ..Self::new(registry)
        }
    }

    pub fn with_secret_sources(mut self, secret_sources: Vec<Arc<dyn SecretSource>>) -> Self {
        self.secret_resolver = SecretSourceResolver::new(secret_sources);
        self
    }

    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_merge_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.merge_strategy = Some(strategy.into());
        self
    }

    pub fn registry(&self) -> &ConfiguratorRegistry {
        &self.registry
    }

    pub fn lookup_root_element(&self, name: &str) -> Option<&Arc<dyn Configurator>> {
        self.registry.lookup_root_element(name)
    }

    pub fn lookup(&self, target_type: &str) -> Option<&Arc<dyn Configurator>> {
        self.registry.lookup(target_type)
    }

    pub fn lookup_or_fail(&self, target_type: &str) -> ConfiguratorResult<&Arc<dyn Configurator>> {
        self.registry.lookup_or_fail(target_type)
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    pub fn deprecated(&self) -> Deprecation {
        self.deprecated
    }

    pub fn set_deprecated(&mut self, deprecated: Deprecation) {
        self.deprecated = deprecated;
    }

    pub fn restricted(&self) -> Restriction {
        self.restricted
    }

    pub fn set_restricted(&mut self, restricted: Restriction) {
        self.restricted = restricted;
    }

    pub fn unknown(&self) -> Unknown {
        self.unknown
    }

    pub fn set_unknown(&mut self, unknown: Unknown) {
        self.unknown = unknown;
    }

    pub fn merge_strategy(&self) -> Option<&str> {
        self.merge_strategy.as_deref()
    }

    pub fn limits(&self) -> ResourceLimits {
        self.limits
    }

    pub fn rollback(&self) -> RollbackPolicy {
        self.rollback
    }

    pub fn set_rollback(&mut self, rollback: RollbackPolicy) {
        self.rollback = rollback;
    }

    pub fn mode(&self) -> Option<&str> {
        self.mode.as_deref()
    }

    pub fn set_mode(&mut self, mode: impl Into<String>) {
        self.mode = Some(mode.into());
    }

    pub fn secret_resolver(&self) -> &SecretSourceResolver {
        &self.secret_resolver
    }

    pub fn add_listener(&mut self, listener: impl Listener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn clear_listeners(&mut self) {
        self.listeners.clear();
    }

    /// Forward a warning to every listener
    pub fn warning(&self, node: &Node, message: &str) {
        tracing::debug!(
            target: "context",
            source = node.source().map(ToString::to_string).unwrap_or_default(),
            warning = message,
            "Configuration warning"
        );
        for listener in &self.listeners {
            listener.warning(node, message);
        }
    }

    /// Scalar value of `node` with secret references substituted
    pub fn resolve(&self, node: &Node) -> ConfiguratorResult<String> {
        let scalar = node.as_scalar()?;
        self.secret_resolver.resolve(scalar.value()).map_err(|e| {
            let error = ConfiguratorError::new("Failed to resolve scalar value").caused_by(e);
            match scalar.source() {
                Some(source) => error.with_location(source.clone()),
                None => error,
            }
        })
    }

    /// Apply the unknown, deprecated and restricted attribute policies to the
    /// keys of `config` against the attributes `configurator` declares.
    pub fn check_attributes(
        &self,
        configurator: &dyn Configurator,
        config: &Mapping,
    ) -> ConfiguratorResult<()> {
        let attributes = configurator.attributes();
        for (key, value) in config.iter() {
            let Some(attribute) = attributes.iter().find(|a| a.name() == key) else {
                let valid: Vec<String> = attributes.iter().map(|a| a.name().to_string()).collect();
                match self.unknown {
                    Unknown::Reject => {
                        return Err(self.rejection(
                            configurator,
                            value,
                            format!(
                                "Invalid configuration elements for type {} : {}",
                                configurator.target_type(),
                                key
                            ),
                        )
                        .with_invalid_attribute(key, valid));
                    }
                    Unknown::Warn => {
                        self.warning(value, &format!("'{}' is an unknown attribute", key));
                        continue;
                    }
                }
            };

            if attribute.is_deprecated() {
                let message = format!("'{}' is deprecated", key);
                match self.deprecated {
                    Deprecation::Reject => {
                        return Err(self.rejection(configurator, value, message));
                    }
                    Deprecation::Warn => self.warning(value, &message),
                }
            }

            if let Some(restriction) = attribute.restriction() {
                let message = format!("'{}' is restricted: {:?}", key, restriction);
                match (self.restricted, restriction) {
                    (Restriction::Warn, _) => self.warning(value, &message),
                    (Restriction::Beta, AttributeRestriction::Beta) => {}
                    (Restriction::Beta, AttributeRestriction::NoExternalUse)
                    | (Restriction::Reject, _) => {
                        return Err(self.rejection(configurator, value, message));
                    }
                }
            }
        }
        Ok(())
    }

    fn rejection(
        &self,
        configurator: &dyn Configurator,
        node: &Node,
        message: String,
    ) -> ConfiguratorError {
        let error = ConfiguratorError::for_configurator(configurator.name(), message);
        match node.source() {
            Some(source) => error.with_location(source.clone()),
            None => error,
        }
    }
}

impl fmt::Debug for ConfigurationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationContext")
            .field("version", &self.version)
            .field("deprecated", &self.deprecated)
            .field("restricted", &self.restricted)
            .field("unknown", &self.unknown)
            .field("merge_strategy", &self.merge_strategy)
            .field("limits", &self.limits)
            .field("rollback", &self.rollback)
            .field("mode", &self.mode)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
