//! Secret provider locations

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::SettingsResult;
use crate::validation::{validate_required_string, Validatable};

/// Default directory holding one file per secret
pub const DEFAULT_SECRETS_DIRECTORY: &str = "/run/secrets/";

/// Secret provider settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretsConfig {
    /// Directory read by the directory secret provider
    pub directory: PathBuf,

    /// Whether environment variables are consulted for secrets
    pub environment: bool,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_SECRETS_DIRECTORY),
            environment: true,
        }
    }
}

impl Validatable for SecretsConfig {
    fn validate(&self) -> SettingsResult<()> {
        validate_required_string(
            &self.directory.to_string_lossy(),
            "directory",
            self.domain_name(),
        )
    }

    fn domain_name(&self) -> &'static str {
        "secrets"
    }
}
