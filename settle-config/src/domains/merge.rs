//! Merge strategy selection

use serde::{Deserialize, Serialize};

use crate::error::SettingsResult;
use crate::validation::{validate_required_string, Validatable};

/// Identifier of the built-in merge strategy
pub const DEFAULT_MERGE_STRATEGY: &str = "default";

/// Merge settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Strategy identifier resolved by the merger
    pub strategy: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            strategy: DEFAULT_MERGE_STRATEGY.to_string(),
        }
    }
}

impl Validatable for MergeConfig {
    fn validate(&self) -> SettingsResult<()> {
        validate_required_string(&self.strategy, "strategy", self.domain_name())
    }

    fn domain_name(&self) -> &'static str {
        "merge"
    }
}
