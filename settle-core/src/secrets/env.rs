use super::SecretSource;

/// Secrets read from process environment variables
#[derive(Debug, Default)]
pub struct EnvSecretSource;

impl EnvSecretSource {
    pub fn new() -> Self {
        Self
    }
}

impl SecretSource for EnvSecretSource {
    fn name(&self) -> &str {
        "environment"
    }

    fn reveal(&self, secret: &str) -> std::io::Result<Option<String>> {
        if secret.trim().is_empty() {
            return Ok(None);
        }
        Ok(std::env::var(secret).ok())
    }
}
