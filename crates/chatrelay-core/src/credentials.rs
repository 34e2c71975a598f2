//! Renewable session secret storage
//!
//! The secret is a single opaque cookie value kept in a plain file. It is
//! overwritten with restricted permissions (0o600) whenever the backend rotates it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use crate::error::{Error, Result};

/// Secrets shorter than this were almost certainly pasted wrong
pub const MIN_SECRET_LEN: usize = 100;

/// The renewable secret and the file it lives in
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
    secret: String,
}

impl CredentialStore {
    /// Load the secret from `path`
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = fs::read_to_string(&path).map_err(|e| {
            Error::Initialization(format!("failed to read {}: {}", path.display(), e))
        })?;
        let secret = content.trim().to_string();
        if secret.len() < MIN_SECRET_LEN {
            return Err(Error::Initialization(format!(
                "session token in {} is too short ({} chars), is it configured?",
                path.display(),
                secret.len()
            )));
        }
        Ok(Self { path, secret })
    }

    /// Current secret
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the secret and persist it.
    ///
    /// The in-memory value is replaced even if writing the file fails.
    pub fn replace(&mut self, secret: impl Into<String>) -> io::Result<()> {
        self.secret = secret.into();
        fs::write(&self.path, &self.secret)?;

        #[cfg(unix)]
        fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;

        Ok(())
    }
}
