//! Deployment key.
//!
//! Wraps an age x25519 secret key string with secure memory handling and
//! restrictive on-disk permissions.

use std::fs;
use std::path::Path;

use age::secrecy::ExposeSecret;
use age::x25519;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::error::{CipherError, Result};

/// Secret key that seals and unseals one workspace.
///
/// Losing it makes a locked workspace permanently unrecoverable.
#[derive(Clone, PartialEq, Eq)]
pub struct DeploymentKey {
    secret: Zeroizing<String>,
}

impl std::fmt::Debug for DeploymentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentKey")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl DeploymentKey {
    /// Generate a fresh key.
    pub fn generate() -> Self {
        let identity = x25519::Identity::generate();
        Self {
            secret: Zeroizing::new(identity.to_string().expose_secret().to_string()),
        }
    }

    /// Parse a key string (`AGE-SECRET-KEY-...`).
    ///
    /// # Errors
    ///
    /// Returns `CipherError::InvalidKey` if the string is not a valid key.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        trimmed
            .parse::<x25519::Identity>()
            .map_err(|e: &str| CipherError::InvalidKey(e.to_string()))?;
        Ok(Self {
            secret: Zeroizing::new(trimmed.to_string()),
        })
    }

    /// Load a key file.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading deployment key");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(metadata) = fs::metadata(path) {
                let mode = metadata.permissions().mode() & 0o777;
                if mode & 0o077 != 0 {
                    warn!(
                        path = %path.display(),
                        mode = %format!("{:o}", mode),
                        "insecure key file permissions"
                    );
                }
            }
        }

        let contents = Zeroizing::new(fs::read_to_string(path).map_err(CipherError::ReadFailed)?);
        Self::parse(&contents)
    }

    /// Write the key file, readable by the owner only.
    pub fn save(&self, path: &Path) -> Result<()> {
        debug!(path = %path.display(), "saving deployment key");

        fs::write(path, format!("{}\n", self.secret.as_str())).map_err(CipherError::WriteFailed)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))
                .map_err(CipherError::WriteFailed)?;
        }

        Ok(())
    }

    /// The key string. Handle with care.
    pub fn expose(&self) -> &str {
        &self.secret
    }

    pub(super) fn identity(&self) -> Result<x25519::Identity> {
        self.secret
            .parse::<x25519::Identity>()
            .map_err(|e: &str| CipherError::InvalidKey(e.to_string()).into())
    }
}
