//! Configuration source discovery settings

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::SettingsResult;
use crate::validation::{is_supported_uri, validate_required_string, Validatable};

/// File looked up in the root directory when no source is configured
pub const DEFAULT_CONFIG_FILE: &str = "settle.yaml";

/// Source discovery settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SourcesConfig {
    /// Candidate sources: files, directories or `file://` URIs, applied in order
    pub paths: Vec<String>,

    /// Directory searched for the default configuration file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_dir: Option<PathBuf>,
}

impl SourcesConfig {
    /// Candidate sources, falling back to `<root_dir>/settle.yaml` when it exists
    pub fn candidates(&self) -> Vec<String> {
        if !self.paths.is_empty() {
            return self.paths.clone();
        }
        match &self.root_dir {
            Some(root) => {
                let default = root.join(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    vec![default.to_string_lossy().into_owned()]
                } else {
                    log::debug!("No configuration set nor default config file");
                    Vec::new()
                }
            }
            None => Vec::new(),
        }
    }
}

impl Validatable for SourcesConfig {
    fn validate(&self) -> SettingsResult<()> {
        for path in &self.paths {
            validate_required_string(path, "paths", self.domain_name())?;
            if path.contains("://") && !is_supported_uri(path) {
                return Err(self.validation_error(format!(
                    "source '{}' uses an unsupported URI scheme",
                    path
                )));
            }
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "sources"
    }
}
