use std::io;
use std::path::{Component, Path, PathBuf};

use settle_config::SecretsConfig;

use super::SecretSource;

/// Secrets stored one per file in a directory, as container orchestrators
/// mount them. File content is trimmed.
#[derive(Debug, Clone)]
pub struct DirectorySecretSource {
    directory: PathBuf,
}

impl DirectorySecretSource {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn from_settings(settings: &SecretsConfig) -> Self {
        Self::new(settings.directory.clone())
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl SecretSource for DirectorySecretSource {
    fn name(&self) -> &str {
        "directory"
    }

    fn reveal(&self, secret: &str) -> io::Result<Option<String>> {
        if secret.trim().is_empty() {
            return Ok(None);
        }
        // Only a plain file name may address a secret
        let relative = Path::new(secret);
        let mut components = relative.components();
        if !matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        ) {
            tracing::debug!(target: "secrets", secret, "Ignoring secret name that is not a plain file name");
            return Ok(None);
        }

        let file = self.directory.join(relative);
        if file.is_file() {
            Ok(Some(std::fs::read_to_string(&file)?.trim().to_string()))
        } else if file.exists() {
            Err(io::Error::new(
                io::ErrorKind::Other,
                format!("Cannot load non-file {}", file.display()),
            ))
        } else {
            Ok(None)
        }
    }
}
