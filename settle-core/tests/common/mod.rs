//! A small live system and its configurators, shared by the integration tests

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use settle_config::SettleConfig;
use settle_core::{
    Attribute, ConfigSource, ConfigurationContext, Configurator, ConfiguratorError,
    ConfiguratorRegistry, ConfiguratorResult, Mapping, Node, Priority, Reconciler, Scalar,
    SecretSource, Sequence, SystemIdentity,
};

#[derive(Debug, Clone, PartialEq)]
pub struct ServerState {
    pub host: String,
    pub port: u16,
    pub admin_password: Option<String>,
}

impl Default for ServerState {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
            admin_password: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Installation {
    pub name: String,
    pub home: String,
}

/// The running application being configured
#[derive(Debug, Default)]
pub struct LiveSystem {
    pub plugins: Mutex<Vec<String>>,
    pub server: Mutex<ServerState>,
    pub installations: Mutex<Vec<Installation>>,
    /// Order in which configurators touched the system
    pub journal: Mutex<Vec<String>>,
}

impl LiveSystem {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn record(&self, entry: impl Into<String>) {
        self.journal.lock().push(entry.into());
    }
}

fn optional_scalar(
    mapping: &Mapping,
    key: &str,
    context: &ConfigurationContext,
) -> ConfiguratorResult<Option<String>> {
    mapping.get(key).map(|node| context.resolve(node)).transpose()
}

pub struct PluginsConfigurator {
    live: Arc<LiveSystem>,
}

impl Configurator for PluginsConfigurator {
    fn target_type(&self) -> &str {
        "plugins"
    }

    fn describe(&self, _: &ConfigurationContext) -> ConfiguratorResult<Option<Node>> {
        let plugins = self.live.plugins.lock();
        if plugins.is_empty() {
            return Ok(None);
        }
        Ok(Some(plugins.iter().map(|p| Node::from(p.as_str())).collect::<Sequence>().into()))
    }

    fn check(&self, config: &Node, _: &ConfigurationContext) -> ConfiguratorResult<()> {
        for item in config.as_sequence()?.iter() {
            item.as_scalar()?;
        }
        Ok(())
    }

    fn configure(
        &self,
        config: &Node,
        context: &ConfigurationContext,
        _: &SystemIdentity,
    ) -> ConfiguratorResult<()> {
        let plugins = config
            .as_sequence()?
            .iter()
            .map(|item| context.resolve(item))
            .collect::<ConfiguratorResult<Vec<_>>>()?;
        self.live.record("plugins");
        *self.live.plugins.lock() = plugins;
        Ok(())
    }
}

pub struct ServerConfigurator {
    live: Arc<LiveSystem>,
}

impl ServerConfigurator {
    fn parse(&self, config: &Node, context: &ConfigurationContext) -> ConfiguratorResult<ServerState> {
        let mapping = config.as_mapping()?;
        let defaults = ServerState::default();

        let port = match mapping.get("port").or_else(|| mapping.get("legacyPort")) {
            Some(node) => {
                let value = context.resolve(node)?;
                value.parse::<u16>().map_err(|_| {
                    let error = ConfiguratorError::new(format!("Invalid port '{}'", value));
                    match node.source() {
                        Some(source) => error.with_location(source.clone()),
                        None => error,
                    }
                })?
            }
            None => defaults.port,
        };

        Ok(ServerState {
            host: optional_scalar(mapping, "host", context)?.unwrap_or(defaults.host),
            port,
            admin_password: optional_scalar(mapping, "adminPassword", context)?,
        })
    }
}

impl Configurator for ServerConfigurator {
    fn target_type(&self) -> &str {
        "server"
    }

    fn attributes(&self) -> Vec<Attribute> {
        vec![
            Attribute::new("host", "string"),
            Attribute::new("port", "number"),
            Attribute::new("legacyPort", "number").deprecated(),
            Attribute::new("adminPassword", "secret"),
        ]
    }

    fn describe(&self, _: &ConfigurationContext) -> ConfiguratorResult<Option<Node>> {
        let state = self.live.server.lock().clone();
        let mut described = Mapping::new()
            .with("host", state.host)
            .with("port", Scalar::number(state.port));
        if let Some(password) = state.admin_password {
            described.insert("adminPassword", password);
        }
        Ok(Some(described.into()))
    }

    fn check(&self, config: &Node, context: &ConfigurationContext) -> ConfiguratorResult<()> {
        self.parse(config, context).map(|_| ())
    }

    fn configure(
        &self,
        config: &Node,
        context: &ConfigurationContext,
        identity: &SystemIdentity,
    ) -> ConfiguratorResult<()> {
        let state = self.parse(config, context)?;
        self.live.record(format!("server as {}", identity.principal()));
        *self.live.server.lock() = state;
        Ok(())
    }
}

/// Root `tool` section; each installation is handled by the nested
/// `installation` configurator
pub struct ToolConfigurator {
    live: Arc<LiveSystem>,
}

impl ToolConfigurator {
    fn installations(config: &Node) -> ConfiguratorResult<Option<&Sequence>> {
        config
            .as_mapping()?
            .get("installations")
            .map(Node::as_sequence)
            .transpose()
    }
}

impl Configurator for ToolConfigurator {
    fn target_type(&self) -> &str {
        "tool"
    }

    fn attributes(&self) -> Vec<Attribute> {
        vec![Attribute::new("installations", "installation")]
    }

    fn describe(&self, context: &ConfigurationContext) -> ConfiguratorResult<Option<Node>> {
        let nested = context.lookup_or_fail("installation")?;
        match nested.describe(context)? {
            Some(Node::Sequence(installations)) if !installations.is_empty() => {
                Ok(Some(Mapping::new().with("installations", installations).into()))
            }
            _ => Ok(None),
        }
    }

    fn check(&self, config: &Node, context: &ConfigurationContext) -> ConfiguratorResult<()> {
        let nested = context.lookup_or_fail("installation")?;
        if let Some(installations) = Self::installations(config)? {
            for item in installations.iter() {
                nested.check(item, context)?;
            }
        }
        Ok(())
    }

    fn configure(
        &self,
        config: &Node,
        context: &ConfigurationContext,
        identity: &SystemIdentity,
    ) -> ConfiguratorResult<()> {
        let nested = context.lookup_or_fail("installation")?;
        self.live.record("tool");
        self.live.installations.lock().clear();
        if let Some(installations) = Self::installations(config)? {
            for item in installations.iter() {
                nested.configure(item, context, identity)?;
            }
        }
        Ok(())
    }
}

/// Installations whose home is `/fail` pass the check but cannot be applied
pub struct InstallationConfigurator {
    live: Arc<LiveSystem>,
}

impl Configurator for InstallationConfigurator {
    fn target_type(&self) -> &str {
        "installation"
    }

    fn attributes(&self) -> Vec<Attribute> {
        vec![Attribute::new("name", "string"), Attribute::new("home", "string")]
    }

    fn describe(&self, _: &ConfigurationContext) -> ConfiguratorResult<Option<Node>> {
        let installations: Sequence = self
            .live
            .installations
            .lock()
            .iter()
            .map(|i| Node::from(Mapping::new().with("name", i.name.as_str()).with("home", i.home.as_str())))
            .collect();
        Ok(Some(installations.into()))
    }

    fn check(&self, config: &Node, context: &ConfigurationContext) -> ConfiguratorResult<()> {
        let mapping = config.as_mapping()?;
        context
            .check_attributes(self, mapping)
            .map_err(|e| e.with_configurator(self.name()))?;
        if !mapping.contains_key("name") {
            return Err(ConfiguratorError::for_configurator(self.name(), "Missing required attribute 'name'")
                .with_invalid_attribute("name", ["name", "home"]));
        }
        Ok(())
    }

    fn configure(
        &self,
        config: &Node,
        context: &ConfigurationContext,
        _: &SystemIdentity,
    ) -> ConfiguratorResult<()> {
        let mapping = config.as_mapping()?;
        let name = optional_scalar(mapping, "name", context)?.unwrap_or_default();
        let home = optional_scalar(mapping, "home", context)?.unwrap_or_default();
        if home == "/fail" {
            return Err(ConfiguratorError::for_configurator(
                self.name(),
                format!("Cannot install {} into {}", name, home),
            ));
        }
        self.live.installations.lock().push(Installation { name, home });
        Ok(())
    }
}

pub fn registry(live: &Arc<LiveSystem>) -> ConfiguratorRegistry {
    ConfiguratorRegistry::builder()
        .root(ToolConfigurator { live: Arc::clone(live) }, Priority::Low)
        .root(ServerConfigurator { live: Arc::clone(live) }, Priority::Normal)
        .root(PluginsConfigurator { live: Arc::clone(live) }, Priority::Bootstrap)
        .nested(InstallationConfigurator { live: Arc::clone(live) })
        .build()
        .expect("test registry is valid")
}

/// Secrets held in memory
#[derive(Debug, Default)]
pub struct MapSecretSource {
    values: HashMap<String, String>,
}

impl MapSecretSource {
    pub fn new(values: &[(&str, &str)]) -> Self {
        Self {
            values: values
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl SecretSource for MapSecretSource {
    fn name(&self) -> &str {
        "memory"
    }

    fn reveal(&self, secret: &str) -> std::io::Result<Option<String>> {
        Ok(self.values.get(secret).cloned())
    }
}

/// Install the test subscriber once; later calls are no-ops
pub fn init_tracing() {
    let _ = settle_logging::init_simple_tracing("debug");
}

/// Reconciler over a fresh live system with in-memory secrets only
pub fn reconciler(settings: SettleConfig, secrets: &[(&str, &str)]) -> (Reconciler, Arc<LiveSystem>) {
    init_tracing();
    let live = LiveSystem::new();
    let reconciler = Reconciler::new(Arc::new(registry(&live)), settings)
        .with_secret_sources(vec![Arc::new(MapSecretSource::new(secrets))]);
    (reconciler, live)
}

pub fn inline(text: &str) -> Vec<ConfigSource> {
    vec![ConfigSource::inline("inline.yaml", text)]
}
