//! Priority-ordered dispatch of root entries to their configurators

use std::fmt;
use std::sync::Arc;

use crate::configurator::Configurator;
use crate::context::{ConfigurationContext, RollbackPolicy};
use crate::error::{ConfiguratorError, ConfiguratorResult};
use crate::identity::{run_as_system, SystemIdentity};
use crate::node::{Mapping, Node};
use crate::registry::ConfiguratorRegistry;

/// Root keys starting with this prefix hold shared anchors and are never
/// dispatched
pub const ALIAS_PREFIX: &str = "x-";

/// Phase of the two-phase protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Check,
    Configure,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Check => "check",
            Operation::Configure => "configure",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn is_alias_entry(key: &str) -> bool {
    key.starts_with(ALIAS_PREFIX)
}

/// Hand each root configurator the first entry matching its name, in
/// registry order, consuming the entry once `operation` succeeds. Entries
/// left over afterwards, alias entries aside, are reported together.
pub fn invoke_with<F>(
    entries: &mut Mapping,
    registry: &ConfiguratorRegistry,
    mut operation: F,
) -> ConfiguratorResult<()>
where
    F: FnMut(&Arc<dyn Configurator>, &Node) -> ConfiguratorResult<()>,
{
    for configurator in registry.root_configurators() {
        let Some(index) = entries.position_ignore_case(configurator.name()) else {
            continue;
        };
        if let Some((_, node)) = entries.entry_at(index) {
            operation(configurator, node).map_err(|e| e.with_configurator(configurator.name()))?;
        }
        entries.remove_at(index);
    }

    let unknown: Vec<String> = entries
        .keys()
        .filter(|key| !is_alias_entry(key))
        .map(str::to_string)
        .collect();
    if !unknown.is_empty() {
        return Err(ConfiguratorError::UnknownConfigurator { names: unknown });
    }
    Ok(())
}

/// Attribute policies for a root entry, when its configurator declares any
fn check_root_attributes(
    configurator: &Arc<dyn Configurator>,
    node: &Node,
    context: &ConfigurationContext,
) -> ConfiguratorResult<()> {
    match node {
        Node::Mapping(mapping) if !configurator.attributes().is_empty() => {
            context.check_attributes(&**configurator, mapping)
        }
        _ => Ok(()),
    }
}

/// Validate every root entry without touching the live system
pub fn check(mut entries: Mapping, context: &ConfigurationContext) -> ConfiguratorResult<()> {
    invoke_with(&mut entries, context.registry(), |configurator, node| {
        tracing::debug!(target: "dispatch", configurator = configurator.name(), "Checking");
        check_root_attributes(configurator, node, context)?;
        configurator.check(node, context)
    })
}

/// Apply every root entry as the system identity
pub fn configure(mut entries: Mapping, context: &ConfigurationContext) -> ConfiguratorResult<()> {
    run_as_system(|identity| {
        let restore = context.rollback() == RollbackPolicy::Restore;
        let mut touched: Vec<(Arc<dyn Configurator>, Option<Node>)> = Vec::new();

        let result = invoke_with(&mut entries, context.registry(), |configurator, node| {
            if restore {
                touched.push((Arc::clone(configurator), configurator.describe(context)?));
            }
            tracing::info!(target: "dispatch", configurator = configurator.name(), "Configuring");
            check_root_attributes(configurator, node, context)?;
            configurator.configure(node, context, identity)
        });

        if let Err(error) = &result {
            tracing::error!(
                target: "dispatch",
                configurator = error.configurator_name().unwrap_or("-"),
                error = %error,
                "Configuration failed"
            );
            if restore {
                restore_snapshots(touched, context, identity);
            }
        }
        result
    })
}

/// Re-apply described state, newest first. Failures are logged and the
/// remaining sections are still restored.
fn restore_snapshots(
    touched: Vec<(Arc<dyn Configurator>, Option<Node>)>,
    context: &ConfigurationContext,
    identity: &SystemIdentity,
) {
    for (configurator, snapshot) in touched.into_iter().rev() {
        let Some(snapshot) = snapshot else {
            tracing::warn!(target: "dispatch", configurator = configurator.name(), "Nothing to restore");
            continue;
        };
        match configurator.configure(&snapshot, context, identity) {
            Ok(()) => {
                tracing::info!(target: "dispatch", configurator = configurator.name(), "Restored");
            }
            Err(e) => {
                tracing::error!(
                    target: "dispatch",
                    configurator = configurator.name(),
                    error = %e,
                    "Restore failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configurator::{Attribute, Priority};
    use crate::node::Scalar;
    use parking_lot::Mutex;

    /// Records calls into a shared journal; live state is one scalar
    struct Recorder {
        name: &'static str,
        journal: Arc<Mutex<Vec<String>>>,
        state: Mutex<Option<String>>,
        fail_on: Option<&'static str>,
    }

    impl Recorder {
        fn new(name: &'static str, journal: &Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                name,
                journal: Arc::clone(journal),
                state: Mutex::new(Some("initial".to_string())),
                fail_on: None,
            }
        }

        fn failing_on(mut self, value: &'static str) -> Self {
            self.fail_on = Some(value);
            self
        }
    }

    impl Configurator for Recorder {
        fn target_type(&self) -> &str {
            self.name
        }

        fn describe(&self, _: &ConfigurationContext) -> ConfiguratorResult<Option<Node>> {
            Ok(self.state.lock().clone().map(Node::from))
        }

        fn check(&self, _: &Node, _: &ConfigurationContext) -> ConfiguratorResult<()> {
            self.journal.lock().push(format!("check {}", self.name));
            Ok(())
        }

        fn configure(
            &self,
            config: &Node,
            context: &ConfigurationContext,
            identity: &SystemIdentity,
        ) -> ConfiguratorResult<()> {
            let value = context.resolve(config)?;
            self.journal
                .lock()
                .push(format!("configure {} {} as {}", self.name, value, identity.principal()));
            if self.fail_on == Some(value.as_str()) {
                return Err(ConfiguratorError::new(format!("cannot apply {}", value)));
            }
            *self.state.lock() = Some(value);
            Ok(())
        }
    }

    struct Strict;

    impl Configurator for Strict {
        fn target_type(&self) -> &str {
            "strict"
        }

        fn attributes(&self) -> Vec<Attribute> {
            vec![Attribute::new("size", "number")]
        }

        fn describe(&self, _: &ConfigurationContext) -> ConfiguratorResult<Option<Node>> {
            Ok(None)
        }

        fn check(&self, _: &Node, _: &ConfigurationContext) -> ConfiguratorResult<()> {
            Ok(())
        }

        fn configure(&self, _: &Node, _: &ConfigurationContext, _: &SystemIdentity) -> ConfiguratorResult<()> {
            Ok(())
        }
    }

    fn journal() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn context(registry: ConfiguratorRegistry) -> ConfigurationContext {
        ConfigurationContext::new(Arc::new(registry))
    }

    #[test]
    fn test_dispatch_follows_priority_not_document_order() {
        let journal = journal();
        let context = context(
            ConfiguratorRegistry::builder()
                .root(Recorder::new("tool", &journal), Priority::Normal)
                .root(Recorder::new("plugins", &journal), Priority::Bootstrap)
                .build()
                .unwrap(),
        );
        let entries = Mapping::new().with("Tool", "git").with("plugins", "all");

        configure(entries, &context).unwrap();
        assert_eq!(
            *journal.lock(),
            vec!["configure plugins all as SYSTEM", "configure tool git as SYSTEM"]
        );
    }

    #[test]
    fn test_unknown_root_keys_reported_together() {
        let journal = journal();
        let context = context(
            ConfiguratorRegistry::builder()
                .root(Recorder::new("tool", &journal), Priority::Normal)
                .build()
                .unwrap(),
        );
        let entries = Mapping::new()
            .with("frobnicator", Mapping::new())
            .with("x-anchors", "shared")
            .with("tool", "git")
            .with("other", "x");

        let err = check(entries, &context).unwrap_err();
        match err {
            ConfiguratorError::UnknownConfigurator { names } => {
                assert_eq!(names, vec!["frobnicator", "other"]);
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(*journal.lock(), vec!["check tool"]);
    }

    #[test]
    fn test_alias_entries_are_not_dispatched() {
        let context = context(ConfiguratorRegistry::default());
        let entries = Mapping::new().with("x-foo", "bar");
        assert!(check(entries.clone(), &context).is_ok());
        assert!(configure(entries, &context).is_ok());
    }

    #[test]
    fn test_only_first_case_insensitive_match_consumed() {
        let journal = journal();
        let context = context(
            ConfiguratorRegistry::builder()
                .root(Recorder::new("tool", &journal), Priority::Normal)
                .build()
                .unwrap(),
        );
        let entries = Mapping::new().with("TOOL", "a").with("tool", "b");

        let err = check(entries, &context).unwrap_err();
        assert!(matches!(err, ConfiguratorError::UnknownConfigurator { ref names } if names == &["tool"]));
    }

    #[test]
    fn test_failure_attributed_to_configurator() {
        let journal = journal();
        let context = context(
            ConfiguratorRegistry::builder()
                .root(Recorder::new("tool", &journal).failing_on("bad"), Priority::Normal)
                .build()
                .unwrap(),
        );

        let err = configure(Mapping::new().with("tool", "bad"), &context).unwrap_err();
        assert_eq!(err.configurator_name(), Some("tool"));
        assert_eq!(err.error_message(), "cannot apply bad");
    }

    #[test]
    fn test_root_attribute_policy_applied() {
        let context = context(
            ConfiguratorRegistry::builder()
                .root(Strict, Priority::Normal)
                .build()
                .unwrap(),
        );
        let entries = Mapping::new().with("strict", Mapping::new().with("colour", "red"));

        let err = check(entries, &context).unwrap_err();
        assert_eq!(err.invalid_attribute(), Some("colour"));
    }

    #[test]
    fn test_partial_apply_by_default() {
        let journal = journal();
        let first = Arc::new(Recorder::new("first", &journal));
        let registry = ConfiguratorRegistry::builder()
            .root_arc(first.clone(), Priority::High)
            .root(Recorder::new("second", &journal).failing_on("boom"), Priority::Normal)
            .build()
            .unwrap();
        let context = context(registry);
        let entries = Mapping::new().with("first", "applied").with("second", "boom");

        assert!(configure(entries, &context).is_err());
        assert_eq!(first.state.lock().as_deref(), Some("applied"));
    }

    #[test]
    fn test_restore_reapplies_snapshots_newest_first() {
        let journal = journal();
        let first = Arc::new(Recorder::new("first", &journal));
        let registry = ConfiguratorRegistry::builder()
            .root_arc(first.clone(), Priority::High)
            .root(Recorder::new("second", &journal).failing_on("boom"), Priority::Normal)
            .build()
            .unwrap();
        let mut context = context(registry);
        context.set_rollback(RollbackPolicy::Restore);
        let entries = Mapping::new()
            .with("first", Scalar::new("applied"))
            .with("second", "boom");

        assert!(configure(entries, &context).is_err());
        assert_eq!(first.state.lock().as_deref(), Some("initial"));
        assert_eq!(
            *journal.lock(),
            vec![
                "configure first applied as SYSTEM",
                "configure second boom as SYSTEM",
                "configure second initial as SYSTEM",
                "configure first initial as SYSTEM",
            ]
        );
    }
}
