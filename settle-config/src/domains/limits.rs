//! Resource limits applied while loading and merging documents

use serde::{Deserialize, Serialize};

use crate::error::SettingsResult;
use crate::validation::{validate_positive, Validatable};

/// Default number of alias references allowed across all sources
pub const DEFAULT_MAX_ALIASES: usize = 50;

/// Default code-point budget, in MiB
pub const DEFAULT_CODE_POINT_LIMIT_MIB: usize = 3;

/// Limits enforced before any configurator runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum alias references across all merged documents
    pub max_aliases: usize,

    /// Maximum total code points across all merged documents, in MiB
    pub code_point_limit_mib: usize,
}

impl LimitsConfig {
    /// Code-point limit expressed as a count of code points
    pub fn code_point_limit(&self) -> usize {
        self.code_point_limit_mib.saturating_mul(1024 * 1024)
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_aliases: DEFAULT_MAX_ALIASES,
            code_point_limit_mib: DEFAULT_CODE_POINT_LIMIT_MIB,
        }
    }
}

impl Validatable for LimitsConfig {
    fn validate(&self) -> SettingsResult<()> {
        validate_positive(self.code_point_limit_mib, "code_point_limit_mib", self.domain_name())
    }

    fn domain_name(&self) -> &'static str {
        "limits"
    }
}
