//! Settings validation traits and utilities

use crate::error::{SettingsError, SettingsResult};

/// URI schemes accepted as configuration sources
pub const SUPPORTED_SOURCE_SCHEMES: [&str; 3] = ["https", "http", "file"];

/// Trait for validatable settings
pub trait Validatable {
    /// Validate the settings
    fn validate(&self) -> SettingsResult<()>;

    /// Get the domain name for error reporting
    fn domain_name(&self) -> &'static str;

    /// Helper to create a domain-specific validation error
    fn validation_error(&self, message: impl Into<String>) -> SettingsError {
        SettingsError::DomainError {
            domain: self.domain_name().to_string(),
            message: message.into(),
        }
    }
}

/// Validate a required string field
pub fn validate_required_string(value: &str, field_name: &str, domain: &str) -> SettingsResult<()> {
    if value.trim().is_empty() {
        return Err(SettingsError::DomainError {
            domain: domain.to_string(),
            message: format!("{} cannot be empty", field_name),
        });
    }
    Ok(())
}

/// Validate a positive number
pub fn validate_positive<T>(value: T, field_name: &str, domain: &str) -> SettingsResult<()>
where
    T: PartialOrd + Default + std::fmt::Display,
{
    if value <= T::default() {
        return Err(SettingsError::DomainError {
            domain: domain.to_string(),
            message: format!("{} must be greater than 0, got {}", field_name, value),
        });
    }
    Ok(())
}

/// Whether a candidate source is a URI with one of the supported schemes.
///
/// Plain filesystem paths are not URIs and return `false`; so do Windows
/// drive paths, whose single-letter "scheme" is rejected explicitly.
pub fn is_supported_uri(candidate: &str) -> bool {
    match url::Url::parse(candidate) {
        Ok(url) => {
            url.scheme().len() > 1 && SUPPORTED_SOURCE_SCHEMES.contains(&url.scheme())
        }
        Err(_) => false,
    }
}

/// Split a comma-separated list of candidate sources, dropping blanks.
pub fn split_candidate_sources(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|candidate| !candidate.is_empty())
        .map(str::to_string)
        .collect()
}
