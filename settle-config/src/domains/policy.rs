//! Attribute policies applied by configurators during a cycle

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Policy regarding deprecated attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Deprecation {
    #[default]
    Reject,
    Warn,
}

/// Policy regarding restricted attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Restriction {
    #[default]
    Reject,
    /// Accept attributes restricted as beta, reject the rest
    Beta,
    Warn,
}

/// Policy regarding attributes no configurator knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unknown {
    #[default]
    Reject,
    Warn,
}

/// Default policies handed to every configuration context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub deprecated: Deprecation,
    pub restricted: Restriction,
    pub unknown: Unknown,
}

macro_rules! policy_str {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {} policy: {}", stringify!($ty).to_lowercase(), s)),
                }
            }
        }
    };
}

policy_str!(Deprecation { Reject => "reject", Warn => "warn" });
policy_str!(Restriction { Reject => "reject", Beta => "beta", Warn => "warn" });
policy_str!(Unknown { Reject => "reject", Warn => "warn" });

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policies_default_to_reject() {
        let policy = PolicyConfig::default();
        assert_eq!(policy.deprecated, Deprecation::Reject);
        assert_eq!(policy.restricted, Restriction::Reject);
        assert_eq!(policy.unknown, Unknown::Reject);
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!(Restriction::from_str("BETA").unwrap(), Restriction::Beta);
        assert_eq!(Unknown::from_str("warn").unwrap(), Unknown::Warn);
        assert!(Deprecation::from_str("ignore").is_err());
    }

    #[test]
    fn test_policy_yaml() {
        let policy: PolicyConfig = serde_yaml::from_str("unknown: warn\n").unwrap();
        assert_eq!(policy.unknown, Unknown::Warn);
        assert_eq!(policy.deprecated, Deprecation::Reject);
    }
}
