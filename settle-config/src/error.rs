//! Settings error types

use thiserror::Error;

/// Settings result type
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Settings errors
#[derive(Error, Debug)]
pub enum SettingsError {
    /// IO error reading the settings file
    #[error("Failed to read settings file: {0}")]
    FileReadError(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse settings: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvError(String),

    /// Domain-specific validation error
    #[error("Domain configuration error in {domain}: {message}")]
    DomainError { domain: String, message: String },
}
