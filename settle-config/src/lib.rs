//! Settings for the settle configuration reconciler
//!
//! This crate holds the knobs that shape a reconciliation cycle: resource
//! limits applied while merging documents, the merge strategy, where the
//! configuration sources live, where secrets are read from, the default
//! attribute policies and logging. Settings come from a YAML file and/or
//! `SETTLE_*` environment variables and are validated per domain.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{SettingsError, SettingsResult};
pub use loader::SettingsLoader;

// Re-export domain configurations
pub use domains::{
    limits::LimitsConfig,
    logging::{LogFormat, LogLevel, LoggingConfig},
    merge::MergeConfig,
    policy::{Deprecation, PolicyConfig, Restriction, Unknown},
    secrets::SecretsConfig,
    sources::SourcesConfig,
    SettleConfig,
};
