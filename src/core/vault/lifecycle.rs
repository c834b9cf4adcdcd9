//! Lock and unlock transitions.
//!
//! Steps are ordered so that an interrupted transition never loses data:
//! plaintext is removed only after the encrypted archive has been written
//! and read back, and repository metadata is swapped last.

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use super::{shadow, Vault, ARCHIVE_EXCLUDES, LOCKED_KEEP};
use crate::core::cipher::{self, Age, Cipher};
use crate::core::constants;
use crate::error::{Result, VaultError};

impl Vault {
    /// Seal the workspace.
    ///
    /// Packs the manifest (including `.git`), encrypts it, verifies the
    /// written archive, records its digest and the lock marker, deletes the
    /// plaintext and activates the shadow repository.
    ///
    /// # Errors
    ///
    /// `VaultError::AlreadyLocked` if the workspace is sealed on disk.
    pub fn lock(&mut self) -> Result<()> {
        if self.state_on_disk() {
            self.locked = true;
            return Err(VaultError::AlreadyLocked.into());
        }
        let cipher = Age::new(self.key()?)?;
        let manifest = self.manifest();

        let archive = super::pack(&self.path, &manifest, ARCHIVE_EXCLUDES)?;
        let sealed = cipher.encrypt(&archive)?;
        let encrypted = self.encrypted_archive_path();
        fs::write(&encrypted, &sealed)?;
        debug!(path = %encrypted.display(), bytes = sealed.len(), "encrypted archive written");

        let digest = self.check_written(&cipher, &archive)?;
        fs::write(self.digest_path(), format!("{}\n", digest))?;
        fs::write(
            self.marker_path(),
            format!("locked {}\n", chrono::Utc::now().to_rfc3339()),
        )?;

        let removed = remove_plaintext(&self.path, &manifest)?;
        debug!(removed, "plaintext removed");

        shadow::activate(&self.path, self.remote.clone())?;
        self.locked = true;
        info!(path = %self.path.display(), digest = %digest, "deployment locked");
        Ok(())
    }

    /// Unseal the workspace.
    ///
    /// # Errors
    ///
    /// `VaultError::AlreadyUnlocked` if the workspace is not sealed,
    /// `VaultError::IntegrityVerificationFailed` if the archive does not
    /// match its digest and `force` is false.
    pub fn unlock(&mut self, force: bool) -> Result<()> {
        if !self.state_on_disk() {
            self.locked = false;
            return Err(VaultError::AlreadyUnlocked.into());
        }
        let encrypted = self.encrypted_archive_path();
        if !encrypted.exists() {
            return Err(VaultError::MissingArchive(encrypted).into());
        }

        let actual = cipher::sha256_file(&encrypted)?;
        let expected = self.digest()?;
        if expected.as_deref() != Some(actual.as_str()) {
            let expected = expected.unwrap_or_else(|| "<missing>".to_string());
            if !force {
                return Err(VaultError::IntegrityVerificationFailed { expected, actual }.into());
            }
            warn!(expected = %expected, actual = %actual, "integrity check failed, forcing unlock");
        }

        let cipher = Age::new(self.key()?)?;
        let archive = cipher.decrypt(&fs::read(&encrypted)?)?;

        shadow::park(&self.path)?;
        let entries = super::unpack(&self.path, &archive)?;
        debug!(entries, "plaintext restored");

        for artifact in [self.marker_path(), encrypted, self.digest_path()] {
            if artifact.exists() {
                fs::remove_file(&artifact)?;
            }
        }
        self.locked = false;
        info!(path = %self.path.display(), "deployment unlocked");
        Ok(())
    }

    /// Re-read the written archive: digest it and trial-decrypt it.
    fn check_written(&self, cipher: &Age, archive: &[u8]) -> Result<String> {
        let encrypted = self.encrypted_archive_path();
        let bytes = fs::read(&encrypted)?;
        let digest = cipher::sha256_bytes(&bytes);
        let roundtrip = cipher.decrypt(&bytes)?;
        if roundtrip != archive {
            fs::remove_file(&encrypted)?;
            return Err(VaultError::IntegrityVerificationFailed {
                expected: cipher::sha256_bytes(archive),
                actual: cipher::sha256_bytes(&roundtrip),
            }
            .into());
        }
        Ok(digest)
    }
}

/// Delete archived plaintext, keeping what must survive while locked.
fn remove_plaintext(root: &Path, manifest: &[String]) -> Result<usize> {
    let mut removed = 0;
    for entry in manifest {
        let rel = entry.trim_start_matches("./").trim_end_matches('/');
        let first = rel.split('/').next().unwrap_or(rel);
        if rel.is_empty() || LOCKED_KEEP.contains(&first) || ARCHIVE_EXCLUDES.contains(&first) {
            continue;
        }
        let path = root.join(rel);
        let Ok(meta) = fs::symlink_metadata(&path) else {
            continue;
        };
        if meta.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
        removed += 1;
    }
    prune_empty_parents(root, manifest);
    Ok(removed)
}

/// Remove directories left empty after deleting nested manifest entries.
fn prune_empty_parents(root: &Path, manifest: &[String]) {
    for entry in manifest {
        let mut current = Path::new(entry).parent();
        while let Some(dir) = current {
            if dir.as_os_str().is_empty() || dir == Path::new(constants::GIT_DIR) {
                break;
            }
            // fails when not empty, which ends the walk
            if fs::remove_dir(root.join(dir)).is_err() {
                break;
            }
            current = dir.parent();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_remove_plaintext_keeps_config_and_key() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::write(root.join(constants::CONFIG_FILE), "{}").unwrap();
        fs::write(root.join(constants::KEY_FILE), "k").unwrap();
        fs::write(root.join("hosts.yml"), "").unwrap();
        fs::create_dir_all(root.join("host_vars")).unwrap();
        fs::write(root.join("host_vars/web1"), "").unwrap();

        let manifest: Vec<String> = [constants::CONFIG_FILE, constants::KEY_FILE, "hosts.yml", "host_vars"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let removed = remove_plaintext(root, &manifest).unwrap();

        assert_eq!(removed, 2);
        assert!(root.join(constants::CONFIG_FILE).exists());
        assert!(root.join(constants::KEY_FILE).exists());
        assert!(!root.join("hosts.yml").exists());
        assert!(!root.join("host_vars").exists());
    }

    #[test]
    fn test_nested_entries_leave_no_empty_dirs() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("roles/web/tasks")).unwrap();
        fs::write(root.join("roles/web/tasks/main.yml"), "").unwrap();

        remove_plaintext(root, &["roles/web/tasks/main.yml".to_string()]).unwrap();
        assert!(!root.join("roles").exists());
    }
}
