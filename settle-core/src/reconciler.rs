//! Entry point tying loading, merging, checking and applying together
//!
//! Every cycle builds a fresh [`ConfigurationContext`], merges its sources
//! into one tree, checks a copy of that tree and only then configures the
//! live system. Cycles on one reconciler are serialized.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

use settle_config::SettleConfig;

use crate::configurator::Configurator;
use crate::context::{ConfigurationContext, RollbackPolicy};
use crate::diagnostics::Diagnostics;
use crate::dispatch::{self, Operation};
use crate::emit::emit_document;
use crate::error::ConfiguratorResult;
use crate::loader::{self, ConfigSource};
use crate::merge::{MergeStrategy, Merger};
use crate::monitor::ObsoleteConfigurationMonitor;
use crate::node::{Mapping, Node};
use crate::registry::ConfiguratorRegistry;
use crate::secrets::{DirectorySecretSource, EnvSecretSource, SecretSource};

#[derive(Debug, Default)]
struct ReconcilerState {
    sources: Vec<ConfigSource>,
    last_time_loaded: Option<DateTime<Utc>>,
}

pub struct Reconciler {
    registry: Arc<ConfiguratorRegistry>,
    settings: SettleConfig,
    secret_sources: Vec<Arc<dyn SecretSource>>,
    strategies: Vec<Arc<dyn MergeStrategy>>,
    rollback: RollbackPolicy,
    monitor: Arc<ObsoleteConfigurationMonitor>,
    /// Held for the duration of a check or configure cycle
    state: Mutex<ReconcilerState>,
}

impl Reconciler {
    /// Reconciler with the secret sources the settings enable
    pub fn new(registry: Arc<ConfiguratorRegistry>, settings: SettleConfig) -> Self {
        let mut secret_sources: Vec<Arc<dyn SecretSource>> = Vec::new();
        if settings.secrets.environment {
            secret_sources.push(Arc::new(EnvSecretSource::new()));
        }
        secret_sources.push(Arc::new(DirectorySecretSource::from_settings(&settings.secrets)));

        Self {
            registry,
            settings,
            secret_sources,
            strategies: Vec::new(),
            rollback: RollbackPolicy::default(),
            monitor: Arc::new(ObsoleteConfigurationMonitor::new()),
            state: Mutex::new(ReconcilerState::default()),
        }
    }

    /// Replace the secret sources, queried in the given order
    pub fn with_secret_sources(mut self, secret_sources: Vec<Arc<dyn SecretSource>>) -> Self {
        self.secret_sources = secret_sources;
        self
    }

    pub fn with_merge_strategy(mut self, strategy: Arc<dyn MergeStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn with_rollback(mut self, rollback: RollbackPolicy) -> Self {
        self.rollback = rollback;
        self
    }

    /// Fresh context for one cycle, seeded from the settings
    pub fn context(&self) -> ConfigurationContext {
        let mut context = ConfigurationContext::from_settings(
            Arc::clone(&self.registry),
            &self.settings,
            self.secret_sources.clone(),
        );
        context.set_rollback(self.rollback);
        context
    }

    fn merger(&self, context: &ConfigurationContext) -> Merger {
        self.strategies
            .iter()
            .fold(Merger::new(context.limits()), |merger, strategy| {
                merger.with_strategy(Arc::clone(strategy))
            })
    }

    /// Load and merge `sources` under the context's merge strategy
    pub fn load(&self, sources: &[ConfigSource], context: &ConfigurationContext) -> ConfiguratorResult<Mapping> {
        let documents = loader::load_documents(sources, context.limits())?;
        Ok(self.merger(context).merge(documents, context.merge_strategy())?)
    }

    /// Check a copy of `entries`. Warnings accumulate; a hard error is
    /// returned as soon as a configurator raises it.
    fn run_check(&self, entries: &Mapping, context: &mut ConfigurationContext) -> ConfiguratorResult<Diagnostics> {
        let collected = Arc::new(Mutex::new(Diagnostics::new()));
        let sink = Arc::clone(&collected);
        context.clear_listeners();
        context.add_listener(move |node: &Node, message: &str| sink.lock().push_warning(node, message));
        context.set_mode(Operation::Check.as_str());

        let result = dispatch::check(entries.clone(), context);
        context.clear_listeners();
        result?;

        let diagnostics = collected.lock().clone();
        Ok(diagnostics)
    }

    /// Check an already merged tree; hard errors become diagnostics
    pub fn check_mapping(&self, entries: &Mapping, context: &mut ConfigurationContext) -> Diagnostics {
        match self.run_check(entries, context) {
            Ok(diagnostics) => diagnostics,
            Err(e) => Diagnostics::from_error(&e),
        }
    }

    /// Check `sources` without touching the live system. Errors loading or
    /// merging the sources are returned as such.
    pub fn check_with(&self, sources: &[ConfigSource]) -> ConfiguratorResult<Diagnostics> {
        let _cycle = self.state.lock();
        let mut context = self.context();
        let entries = self.load(sources, &context)?;
        Ok(self.check_mapping(&entries, &mut context))
    }

    /// Load, check and apply `sources`
    pub fn configure_with(&self, sources: &[ConfigSource]) -> ConfiguratorResult<()> {
        self.configure_with_context(sources, self.context())
    }

    /// Like [`Reconciler::configure_with`], with caller-set policies
    pub fn configure_with_context(
        &self,
        sources: &[ConfigSource],
        mut context: ConfigurationContext,
    ) -> ConfiguratorResult<()> {
        let mut state = self.state.lock();

        let entries = self.load(sources, &context)?;
        context.secret_resolver().init_sources();

        let diagnostics = self.run_check(&entries, &mut context)?;
        for warning in diagnostics.warnings() {
            tracing::warn!(target: "reconciler", line = warning.line(), "{}", warning.message);
        }

        self.monitor.reset();
        context.clear_listeners();
        let monitor = Arc::clone(&self.monitor);
        context.add_listener(move |node: &Node, message: &str| monitor.record(node, message));
        context.set_mode(Operation::Configure.as_str());

        dispatch::configure(entries, &context)?;

        state.last_time_loaded = Some(Utc::now());
        state.sources = sources.to_vec();
        tracing::info!(
            target: "reconciler",
            sources = sources.len(),
            obsolete = self.monitor.errors().len(),
            "Configuration applied"
        );
        Ok(())
    }

    /// Apply the configured standard sources
    pub fn configure(&self) -> ConfiguratorResult<()> {
        let candidates = self.settings.sources.candidates();
        if candidates.is_empty() {
            tracing::info!(target: "reconciler", "No configuration sources found");
        }
        self.configure_from(&candidates)
    }

    /// Apply files, directories or `file://` URIs
    pub fn configure_from(&self, candidates: &[String]) -> ConfiguratorResult<()> {
        let sources = loader::discover(candidates)?;
        self.configure_with(&sources)
    }

    /// Whether `candidates` would pass the check phase
    pub fn can_apply_from(&self, candidates: &[String]) -> bool {
        let diagnostics = loader::discover(candidates)
            .and_then(|sources| self.check_with(&sources))
            .unwrap_or_else(|e| Diagnostics::from_error(&e));
        !diagnostics.has_errors()
    }

    /// Switch to new candidate sources; the live system is only touched
    /// when they check cleanly
    pub fn replace_sources(&self, candidates: &[String]) -> ConfiguratorResult<()> {
        tracing::info!(target: "reconciler", candidates = candidates.join(", "), "Replacing configuration sources");
        self.configure_from(candidates)
    }

    /// Re-apply the sources of the last successful cycle
    pub fn reload(&self) -> ConfiguratorResult<()> {
        let sources = self.sources();
        self.configure_with(&sources)
    }

    /// Diagnostics for `sources`; never fails
    pub fn validate(&self, sources: &[ConfigSource]) -> Diagnostics {
        self.check_with(sources)
            .unwrap_or_else(|e| Diagnostics::from_error(&e))
    }

    /// Described live state of every root configurator, in dispatch order
    pub fn describe_all(&self) -> ConfiguratorResult<Mapping> {
        let context = self.context();
        let mut described = Mapping::new();
        for configurator in self.registry.root_configurators() {
            if let Some(node) = configurator.describe(&context)? {
                described.insert(configurator.name(), node);
            }
        }
        Ok(described)
    }

    /// Live state as YAML text
    pub fn export(&self) -> ConfiguratorResult<String> {
        emit_document(&self.describe_all()?)
    }

    pub fn sources(&self) -> Vec<ConfigSource> {
        self.state.lock().sources.clone()
    }

    pub fn last_time_loaded(&self) -> Option<DateTime<Utc>> {
        self.state.lock().last_time_loaded
    }

    pub fn monitor(&self) -> &ObsoleteConfigurationMonitor {
        &self.monitor
    }

    pub fn registry(&self) -> &Arc<ConfiguratorRegistry> {
        &self.registry
    }

    pub fn settings(&self) -> &SettleConfig {
        &self.settings
    }

    /// Every configurator reachable from the roots
    pub fn configurators(&self) -> Vec<Arc<dyn Configurator>> {
        self.registry.walk()
    }
}
