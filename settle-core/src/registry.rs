//! Immutable lookup table from semantic types to configurators

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::configurator::{Configurator, Priority};
use crate::error::{ConfiguratorError, ConfiguratorResult};

struct RootEntry {
    configurator: Arc<dyn Configurator>,
    priority: Priority,
}

/// Registry of configurators, built once at startup and shared by `Arc`
#[derive(Default)]
pub struct ConfiguratorRegistry {
    /// Root configurators in dispatch order
    roots: Vec<RootEntry>,
    by_type: HashMap<String, Arc<dyn Configurator>>,
}

impl ConfiguratorRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Root configurators in dispatch order: bootstrap first, then by priority
    /// and registration order
    pub fn root_configurators(&self) -> impl Iterator<Item = &Arc<dyn Configurator>> {
        self.roots.iter().map(|entry| &entry.configurator)
    }

    pub fn priority_of(&self, name: &str) -> Option<Priority> {
        self.roots
            .iter()
            .find(|entry| entry.configurator.name().eq_ignore_ascii_case(name))
            .map(|entry| entry.priority)
    }

    pub fn lookup_root_element(&self, name: &str) -> Option<&Arc<dyn Configurator>> {
        self.roots
            .iter()
            .map(|entry| &entry.configurator)
            .find(|configurator| configurator.name().eq_ignore_ascii_case(name))
    }

    pub fn lookup(&self, target_type: &str) -> Option<&Arc<dyn Configurator>> {
        self.by_type.get(target_type)
    }

    pub fn lookup_or_fail(&self, target_type: &str) -> ConfiguratorResult<&Arc<dyn Configurator>> {
        self.lookup(target_type)
            .ok_or_else(|| ConfiguratorError::UnresolvedType {
                type_id: target_type.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }

    /// Every configurator reachable from the roots, depth-first in discovery
    /// order. Types already visited are skipped, so cycles in the type graph
    /// terminate.
    pub fn walk(&self) -> Vec<Arc<dyn Configurator>> {
        let mut visited = HashSet::new();
        let mut elements = Vec::new();
        for root in self.root_configurators() {
            if visited.insert(root.target_type().to_string()) {
                elements.push(Arc::clone(root));
            }
        }
        for root in self.root_configurators() {
            self.walk_attributes(root, &mut visited, &mut elements);
        }
        elements
    }

    fn walk_attributes(
        &self,
        configurator: &Arc<dyn Configurator>,
        visited: &mut HashSet<String>,
        elements: &mut Vec<Arc<dyn Configurator>>,
    ) {
        for attribute in configurator.attributes() {
            let Some(nested) = self.lookup(attribute.target_type()) else {
                continue;
            };
            if visited.insert(nested.target_type().to_string()) {
                elements.push(Arc::clone(nested));
                self.walk_attributes(nested, visited, elements);
            }
        }
    }
}

/// Collects configurators and validates the table on [`RegistryBuilder::build`]
#[derive(Default)]
pub struct RegistryBuilder {
    roots: Vec<(Arc<dyn Configurator>, Priority)>,
    nested: Vec<Arc<dyn Configurator>>,
}

impl RegistryBuilder {
    /// Register a configurator owning a top-level key
    pub fn root(self, configurator: impl Configurator + 'static, priority: Priority) -> Self {
        self.root_arc(Arc::new(configurator), priority)
    }

    pub fn root_arc(mut self, configurator: Arc<dyn Configurator>, priority: Priority) -> Self {
        self.roots.push((configurator, priority));
        self
    }

    /// Register a configurator for a nested semantic type
    pub fn nested(self, configurator: impl Configurator + 'static) -> Self {
        self.nested_arc(Arc::new(configurator))
    }

    pub fn nested_arc(mut self, configurator: Arc<dyn Configurator>) -> Self {
        self.nested.push(configurator);
        self
    }

    pub fn build(self) -> ConfiguratorResult<ConfiguratorRegistry> {
        let mut by_type: HashMap<String, Arc<dyn Configurator>> = HashMap::new();
        let mut root_names: Vec<String> = Vec::new();
        let mut bootstrap: Option<String> = None;

        for (configurator, priority) in &self.roots {
            let name = configurator.name();
            if name.trim().is_empty() {
                return Err(ConfiguratorError::new("Root configurator name cannot be empty"));
            }
            if root_names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                return Err(ConfiguratorError::for_configurator(
                    name,
                    "Root configurator already registered",
                ));
            }
            if priority.is_bootstrap() {
                if let Some(existing) = &bootstrap {
                    return Err(ConfiguratorError::for_configurator(
                        name,
                        format!("Bootstrap configurator already registered: {}", existing),
                    ));
                }
                bootstrap = Some(name.to_string());
            }
            root_names.push(name.to_string());
        }

        let all = self
            .roots
            .iter()
            .map(|(configurator, _)| configurator)
            .chain(self.nested.iter());
        for configurator in all {
            let target_type = configurator.target_type().to_string();
            if by_type.contains_key(&target_type) {
                return Err(ConfiguratorError::for_configurator(
                    configurator.name(),
                    format!("Type '{}' already has a configurator", target_type),
                ));
            }
            by_type.insert(target_type, Arc::clone(configurator));
        }

        // Stable sort keeps registration order between equal priorities
        let mut roots: Vec<RootEntry> = self
            .roots
            .into_iter()
            .map(|(configurator, priority)| RootEntry {
                configurator,
                priority,
            })
            .collect();
        roots.sort_by_key(|entry| entry.priority);

        tracing::debug!(
            target: "registry",
            roots = roots.len(),
            types = by_type.len(),
            bootstrap = bootstrap.as_deref().unwrap_or("-"),
            "Configurator registry built"
        );

        Ok(ConfiguratorRegistry { roots, by_type })
    }
}
