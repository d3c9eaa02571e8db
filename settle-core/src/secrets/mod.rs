//! Lazy substitution of secret references inside scalar values
//!
//! A reference is written `${name}` or `${name:-default}` and escaped as
//! `^${...}`, which yields the literal text without the caret. Providers are
//! queried in order and the first one that knows the name wins.

mod directory;
mod env;

pub use directory::DirectorySecretSource;
pub use env::EnvSecretSource;

use once_cell::sync::Lazy;
use regex::Regex;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{SecretError, SecretResult};

static SECRET_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\^?\$\{([^{}]*)\}").expect("secret reference pattern is valid"));

/// A provider of sensitive values
pub trait SecretSource: Send + Sync {
    /// Provider name used in error reports
    fn name(&self) -> &str;

    /// Called before every configure cycle
    fn init(&self) {}

    /// Value for `secret`, `None` when this provider does not know it
    fn reveal(&self, secret: &str) -> std::io::Result<Option<String>>;
}

/// A parsed `${name:-default}` reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretReference {
    pub name: String,
    pub default: Option<String>,
}

impl SecretReference {
    /// Parse the text between `${` and `}`
    pub fn parse(inner: &str) -> Self {
        match inner.split_once(":-") {
            Some((name, default)) => Self {
                name: name.trim().to_string(),
                default: Some(default.to_string()),
            },
            None => Self {
                name: inner.trim().to_string(),
                default: None,
            },
        }
    }
}

/// Resolves secret references for one cycle, remembering what each name
/// resolved to.
pub struct SecretSourceResolver {
    sources: Vec<Arc<dyn SecretSource>>,
    revealed: RefCell<HashMap<String, Option<String>>>,
}

impl SecretSourceResolver {
    pub fn new(sources: Vec<Arc<dyn SecretSource>>) -> Self {
        Self {
            sources,
            revealed: RefCell::new(HashMap::new()),
        }
    }

    pub fn sources(&self) -> &[Arc<dyn SecretSource>] {
        &self.sources
    }

    /// (Re)initialize every provider
    pub fn init_sources(&self) {
        for source in &self.sources {
            source.init();
        }
    }

    /// Substitute every reference in `text`
    pub fn resolve(&self, text: &str) -> SecretResult<String> {
        if !text.contains("${") {
            return Ok(text.to_string());
        }

        let mut resolved = String::with_capacity(text.len());
        let mut last = 0;
        for captures in SECRET_REFERENCE.captures_iter(text) {
            let (Some(token), Some(inner)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            resolved.push_str(&text[last..token.start()]);
            match token.as_str().strip_prefix('^') {
                Some(escaped) => resolved.push_str(escaped),
                None => {
                    let reference = SecretReference::parse(inner.as_str());
                    resolved.push_str(&self.substitute(&reference)?);
                }
            }
            last = token.end();
        }
        resolved.push_str(&text[last..]);
        Ok(resolved)
    }

    fn substitute(&self, reference: &SecretReference) -> SecretResult<String> {
        match (self.reveal(&reference.name)?, &reference.default) {
            (Some(value), _) => Ok(value),
            (None, Some(default)) => Ok(default.clone()),
            (None, None) => Err(SecretError::Unresolved {
                name: reference.name.clone(),
            }),
        }
    }

    fn reveal(&self, name: &str) -> SecretResult<Option<String>> {
        if let Some(known) = self.revealed.borrow().get(name) {
            return Ok(known.clone());
        }

        let mut value = None;
        for source in &self.sources {
            match source.reveal(name) {
                Ok(Some(revealed)) => {
                    tracing::debug!(target: "secrets", provider = source.name(), secret = name, "Secret revealed");
                    value = Some(revealed);
                    break;
                }
                Ok(None) => continue,
                Err(e) => {
                    return Err(SecretError::Provider {
                        provider: source.name().to_string(),
                        name: name.to_string(),
                        source: e,
                    });
                }
            }
        }

        self.revealed
            .borrow_mut()
            .insert(name.to_string(), value.clone());
        Ok(value)
    }
}
