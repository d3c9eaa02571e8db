//! Error types for loading, merging, checking and applying configuration

use std::fmt;
use thiserror::Error;

use crate::node::{NodeType, Source};

/// Configurator result type
pub type ConfiguratorResult<T> = Result<T, ConfiguratorError>;

/// Merge result type
pub type MergeResult<T> = Result<T, MergeError>;

/// Secret resolution result type
pub type SecretResult<T> = Result<T, SecretError>;

/// Errors raised while checking or applying configuration
#[derive(Error, Debug)]
pub enum ConfiguratorError {
    /// A configurator rejected its input
    #[error("{}", describe(.configurator.as_deref(), .message))]
    Configuration {
        configurator: Option<String>,
        message: String,
        invalid_attribute: Option<String>,
        valid_attributes: Vec<String>,
        location: Option<Source>,
        #[source]
        cause: Option<Box<ConfiguratorError>>,
    },

    /// Root keys no registered configurator claimed
    #[error("No configurator for the following root elements: {}", .names.join(", "))]
    UnknownConfigurator { names: Vec<String> },

    /// No configurator registered for a semantic type
    #[error("Cannot find configurator for type {type_id}")]
    UnresolvedType { type_id: String },

    /// A source path does not exist
    #[error("Invalid configuration: '{path}' isn't a valid path.")]
    InvalidSource { path: String },

    /// Document text could not be parsed
    #[error("Failed to parse {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: yaml_rust2::scanner::ScanError,
    },

    /// A described tree could not be serialized
    #[error("Failed to export configuration: {0}")]
    Emit(#[source] serde_yaml::Error),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn describe(configurator: Option<&str>, message: &str) -> String {
    match configurator {
        Some(name) => format!("{}: {}", name, message),
        None => message.to_string(),
    }
}

impl ConfiguratorError {
    /// Configuration error not attributed to a configurator yet
    pub fn new(message: impl Into<String>) -> Self {
        Self::Configuration {
            configurator: None,
            message: message.into(),
            invalid_attribute: None,
            valid_attributes: Vec::new(),
            location: None,
            cause: None,
        }
    }

    /// Configuration error raised by the named configurator
    pub fn for_configurator(configurator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(message).with_configurator(configurator)
    }

    /// Attribute this error to a configurator, if not already attributed
    pub fn with_configurator(mut self, name: impl Into<String>) -> Self {
        if let Self::Configuration { configurator, .. } = &mut self {
            if configurator.is_none() {
                *configurator = Some(name.into());
            }
        }
        self
    }

    /// Name the offending attribute and the attributes that would be accepted
    pub fn with_invalid_attribute(
        mut self,
        attribute: impl Into<String>,
        valid: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        if let Self::Configuration {
            invalid_attribute,
            valid_attributes,
            ..
        } = &mut self
        {
            *invalid_attribute = Some(attribute.into());
            *valid_attributes = valid.into_iter().map(Into::into).collect();
        }
        self
    }

    pub fn with_location(mut self, source: Source) -> Self {
        if let Self::Configuration { location, .. } = &mut self {
            *location = Some(source);
        }
        self
    }

    /// Wrap another error as the cause of this one
    pub fn caused_by(mut self, error: impl Into<ConfiguratorError>) -> Self {
        if let Self::Configuration { cause, .. } = &mut self {
            *cause = Some(Box::new(error.into()));
        }
        self
    }

    pub fn configurator_name(&self) -> Option<&str> {
        match self {
            Self::Configuration { configurator, .. } => configurator.as_deref(),
            _ => None,
        }
    }

    /// Message without the configurator prefix
    pub fn error_message(&self) -> String {
        match self {
            Self::Configuration { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn invalid_attribute(&self) -> Option<&str> {
        match self {
            Self::Configuration {
                invalid_attribute, ..
            } => invalid_attribute.as_deref(),
            _ => None,
        }
    }

    pub fn valid_attributes(&self) -> &[String] {
        match self {
            Self::Configuration {
                valid_attributes, ..
            } => valid_attributes,
            _ => &[],
        }
    }

    pub fn location(&self) -> Option<&Source> {
        match self {
            Self::Configuration { location, .. } => location.as_ref(),
            _ => None,
        }
    }

    /// Innermost configurator error in the cause chain
    pub fn deepest_cause(&self) -> &ConfiguratorError {
        let mut current = self;
        while let Self::Configuration {
            cause: Some(cause), ..
        } = current
        {
            current = cause;
        }
        current
    }

    /// Names a failed reload would point an operator at: the configurator,
    /// or every unmatched root key.
    pub fn target(&self) -> Option<String> {
        match self {
            Self::UnknownConfigurator { names } => Some(names.join(", ")),
            other => other.configurator_name().map(str::to_string),
        }
    }
}

/// Which resource guard tripped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceLimit {
    Aliases,
    CodePoints,
}

impl fmt::Display for ResourceLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceLimit::Aliases => f.write_str("alias"),
            ResourceLimit::CodePoints => f.write_str("code point"),
        }
    }
}

/// Errors raised while merging documents
#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Unknown merge strategy '{0}'")]
    UnknownStrategy(String),

    #[error("{origin}: document root must be a mapping, found {found}")]
    NotAMapping { origin: String, found: NodeType },

    #[error("Merge conflict at '{path}' between {first} and {second}")]
    Conflict {
        path: String,
        first: String,
        second: String,
    },

    #[error("{limit} limit exceeded: {actual} > {max}")]
    ResourceLimitExceeded {
        limit: ResourceLimit,
        actual: usize,
        max: usize,
    },
}

/// Errors raised while substituting secret references
#[derive(Error, Debug)]
pub enum SecretError {
    #[error("Unable to resolve secret '{name}' and no default was provided")]
    Unresolved { name: String },

    #[error("Secret source '{provider}' failed to reveal '{name}': {source}")]
    Provider {
        provider: String,
        name: String,
        #[source]
        source: std::io::Error,
    },
}
