//! Deployment SSH keypair.
//!
//! One ed25519 keypair per workspace, stored in `.ssh/`. Sources may supply
//! either half; the first value found wins.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, InventoryError, Result};

/// Private key file name inside the SSH directory.
pub const PRIVATE_KEY_FILE: &str = "id_ed25519";

/// Public key file name inside the SSH directory.
pub const PUBLIC_KEY_FILE: &str = "id_ed25519.pub";

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshKeypair {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
}

impl std::fmt::Debug for SshKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshKeypair")
            .field("public_key", &self.public_key)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl SshKeypair {
    pub fn private_key_path(dir: &Path) -> PathBuf {
        dir.join(PRIVATE_KEY_FILE)
    }

    pub fn public_key_path(dir: &Path) -> PathBuf {
        dir.join(PUBLIC_KEY_FILE)
    }

    /// Read whichever halves exist in `dir`.
    pub fn read(dir: &Path) -> Result<Self> {
        let read = |path: PathBuf| -> Result<Option<String>> {
            if path.exists() {
                Ok(Some(fs::read_to_string(path)?))
            } else {
                Ok(None)
            }
        };
        Ok(Self {
            public_key: read(Self::public_key_path(dir))?,
            private_key: read(Self::private_key_path(dir))?,
        })
    }

    /// Write both halves to `dir`; the private key is owner-only.
    ///
    /// # Errors
    ///
    /// `InventoryError::SshKeypair` if either half is missing.
    pub fn write(&self, dir: &Path) -> Result<()> {
        let (Some(public), Some(private)) = (&self.public_key, &self.private_key) else {
            return Err(InventoryError::SshKeypair("incomplete keypair".to_string()).into());
        };
        fs::create_dir_all(dir)?;
        let private_path = Self::private_key_path(dir);
        fs::write(&private_path, private)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&private_path, fs::Permissions::from_mode(0o600))?;
        }
        fs::write(Self::public_key_path(dir), public)?;
        debug!(dir = %dir.display(), "ssh keypair written");
        Ok(())
    }

    /// Generate a fresh keypair in `dir` with `ssh-keygen`.
    pub fn generate(dir: &Path) -> Result<Self> {
        which::which("ssh-keygen").map_err(|_| Error::MissingBinary("ssh-keygen".to_string()))?;
        fs::create_dir_all(dir)?;

        let private_path = Self::private_key_path(dir);
        let output = Command::new("ssh-keygen")
            .args(["-t", "ed25519", "-N", "", "-q", "-C", "bunker", "-f"])
            .arg(&private_path)
            .output()?;
        if !output.status.success() {
            return Err(InventoryError::SshKeypair(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            )
            .into());
        }
        info!(path = %private_path.display(), "generated ssh keypair");
        Self::read(dir)
    }

    /// Both halves present.
    pub fn is_complete(&self) -> bool {
        self.public_key.is_some() && self.private_key.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.public_key.is_none() && self.private_key.is_none()
    }

    /// Fill missing halves from `other`. Present values are never replaced.
    pub fn fill_from(&mut self, other: SshKeypair) {
        if self.public_key.is_none() {
            self.public_key = other.public_key;
        }
        if self.private_key.is_none() {
            self.private_key = other.private_key;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pair(public: Option<&str>, private: Option<&str>) -> SshKeypair {
        SshKeypair {
            public_key: public.map(str::to_string),
            private_key: private.map(str::to_string),
        }
    }

    #[test]
    fn test_fill_keeps_first_value() {
        let mut first = pair(Some("pub-a"), None);
        first.fill_from(pair(Some("pub-b"), Some("priv-b")));
        assert_eq!(first, pair(Some("pub-a"), Some("priv-b")));
    }

    #[test]
    fn test_read_missing_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(SshKeypair::read(&tmp.path().join(".ssh")).unwrap().is_empty());
    }

    #[test]
    fn test_write_read_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(".ssh");
        let keys = pair(Some("ssh-ed25519 AAAA"), Some("-----BEGIN-----"));
        keys.write(&dir).unwrap();
        assert_eq!(SshKeypair::read(&dir).unwrap(), keys);
    }

    #[test]
    fn test_write_incomplete_fails() {
        let tmp = TempDir::new().unwrap();
        assert!(pair(Some("pub"), None).write(tmp.path()).is_err());
    }

    #[test]
    fn test_debug_hides_private_key() {
        let debug = format!("{:?}", pair(None, Some("very-secret")));
        assert!(!debug.contains("very-secret"));
    }
}
