//! Domain-specific settings modules

pub mod limits;
pub mod logging;
pub mod merge;
pub mod policy;
pub mod secrets;
pub mod sources;

use crate::error::SettingsResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Complete reconciler settings combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct SettleConfig {
    /// Resource limits guarding document size and alias expansion
    pub limits: limits::LimitsConfig,

    /// Merge strategy selection
    pub merge: merge::MergeConfig,

    /// Where configuration documents are discovered
    pub sources: sources::SourcesConfig,

    /// Secret provider locations
    pub secrets: secrets::SecretsConfig,

    /// Default attribute policies for each cycle
    pub policy: policy::PolicyConfig,

    /// Logging configuration
    pub logging: logging::LoggingConfig,
}

impl SettleConfig {
    /// Validate all domain settings
    pub fn validate_all(&self) -> SettingsResult<()> {
        self.limits.validate()?;
        self.merge.validate()?;
        self.sources.validate()?;
        self.secrets.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Generate a sample settings file
    pub fn generate_sample() -> String {
        let config = SettleConfig::default();
        serde_yaml::to_string(&config)
            .unwrap_or_else(|_| "# Failed to generate sample settings".to_string())
    }
}
