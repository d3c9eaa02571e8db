//! Settings loading and environment variable handling

use crate::domains::SettleConfig;
use crate::error::{SettingsError, SettingsResult};
use crate::validation::split_candidate_sources;
use std::path::{Path, PathBuf};

/// Environment variable naming the secrets directory (read without prefix)
pub const SECRETS_DIRECTORY_ENV: &str = "SECRETS";

/// Settings loader with environment variable support
pub struct SettingsLoader {
    /// Environment variable prefix
    prefix: String,
}

impl SettingsLoader {
    /// Create a new settings loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "SETTLE".to_string(),
        }
    }

    /// Create a new settings loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load settings from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> SettingsResult<SettleConfig> {
        let content = std::fs::read_to_string(path)?;
        let mut config: SettleConfig = serde_yaml::from_str(&content)?;

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load settings from environment variables only
    pub fn from_env(&self) -> SettingsResult<SettleConfig> {
        let mut config = SettleConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load settings with fallback chain
    pub fn load(&self, settings_path: Option<impl AsRef<Path>>) -> SettingsResult<SettleConfig> {
        match settings_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to settings
    fn apply_env_overrides(&self, config: &mut SettleConfig) -> SettingsResult<()> {
        self.apply_limit_overrides(&mut config.limits);
        self.apply_merge_overrides(&mut config.merge);
        self.apply_source_overrides(&mut config.sources);
        self.apply_secret_overrides(&mut config.secrets);
        self.apply_logging_overrides(&mut config.logging)?;
        Ok(())
    }

    /// Apply resource limit overrides. Unparseable values keep the current limit.
    fn apply_limit_overrides(&self, config: &mut crate::domains::limits::LimitsConfig) {
        if let Some(aliases) = self.get_env_var("YAML_MAX_ALIASES") {
            match aliases.parse() {
                Ok(value) => config.max_aliases = value,
                Err(e) => log::warn!("Ignoring invalid {}_YAML_MAX_ALIASES: {}", self.prefix, e),
            }
        }

        if let Some(limit) = self.get_env_var("YAML_CODE_POINT_LIMIT") {
            match limit.parse() {
                Ok(value) => config.code_point_limit_mib = value,
                Err(e) => {
                    log::warn!("Ignoring invalid {}_YAML_CODE_POINT_LIMIT: {}", self.prefix, e)
                }
            }
        }
    }

    /// Apply merge strategy override
    fn apply_merge_overrides(&self, config: &mut crate::domains::merge::MergeConfig) {
        if let Some(strategy) = self.get_env_var("MERGE_STRATEGY") {
            config.strategy = strategy;
        }
    }

    /// Apply configuration source override
    fn apply_source_overrides(&self, config: &mut crate::domains::sources::SourcesConfig) {
        if let Some(sources) = self.get_env_var("CONFIG") {
            config.paths = split_candidate_sources(&sources);
        }

        if let Some(root) = self.get_env_var("ROOT_DIR") {
            config.root_dir = Some(PathBuf::from(root));
        }
    }

    /// Apply secrets directory override
    fn apply_secret_overrides(&self, config: &mut crate::domains::secrets::SecretsConfig) {
        if let Ok(directory) = std::env::var(SECRETS_DIRECTORY_ENV) {
            if !directory.trim().is_empty() {
                config.directory = PathBuf::from(directory);
            }
        }
    }

    /// Apply logging config overrides
    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> SettingsResult<()> {
        if let Some(log_level) = self.get_env_var("LOG_LEVEL") {
            use std::str::FromStr;
            config.level = crate::domains::logging::LogLevel::from_str(&log_level).map_err(|_| {
                SettingsError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level))
            })?;
        }

        if let Some(format) = self.get_env_var("LOG_FORMAT") {
            use std::str::FromStr;
            config.format = crate::domains::logging::LogFormat::from_str(&format)
                .map_err(|_| SettingsError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    /// Get a non-blank, trimmed environment variable with prefix
    fn get_env_var(&self, name: &str) -> Option<String> {
        std::env::var(format!("{}_{}", self.prefix, name))
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}
