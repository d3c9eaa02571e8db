//! Configuration-as-code reconciliation
//!
//! Declarative YAML documents are merged into one canonical tree, checked
//! against a registry of [`Configurator`]s and, only when the check passes,
//! applied to the live system in priority order.
//!
//! ```no_run
//! use std::sync::Arc;
//! use settle_config::SettingsLoader;
//! use settle_core::{ConfiguratorRegistry, Reconciler};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = ConfiguratorRegistry::builder().build()?;
//! let settings = SettingsLoader::new().from_env()?;
//! let reconciler = Reconciler::new(Arc::new(registry), settings);
//! reconciler.configure()?;
//! println!("{}", reconciler.export()?);
//! # Ok(())
//! # }
//! ```

pub mod configurator;
pub mod context;
pub mod diagnostics;
pub mod dispatch;
pub mod emit;
pub mod error;
pub mod identity;
pub mod loader;
pub mod merge;
pub mod monitor;
pub mod node;
pub mod reconciler;
pub mod registry;
pub mod secrets;

pub use configurator::{Attribute, AttributeRestriction, Configurator, Priority};
pub use context::{ConfigurationContext, Listener, RollbackPolicy, Version};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{
    ConfiguratorError, ConfiguratorResult, MergeError, MergeResult, ResourceLimit, SecretError,
    SecretResult,
};
pub use identity::SystemIdentity;
pub use loader::ConfigSource;
pub use merge::{MergeStrategy, Merger, RawDocument, ResourceLimits};
pub use monitor::{ObsoleteConfigurationMonitor, ObsoleteEntry};
pub use node::{Format, Mapping, Node, NodeType, Scalar, Sequence, Source};
pub use reconciler::Reconciler;
pub use registry::{ConfiguratorRegistry, RegistryBuilder};
pub use secrets::{DirectorySecretSource, EnvSecretSource, SecretSource, SecretSourceResolver};
