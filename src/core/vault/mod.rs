//! Sealing and unsealing of a workspace.
//!
//! A [`Vault`] owns the deployment key and the locked/unlocked state of one
//! workspace directory. Locking packs the manifest into an encrypted archive,
//! deletes the plaintext and swaps the repository for a shadow repository
//! that only tracks sealed artifacts; unlocking reverses it.
//!
//! State lives on disk (key file, lock marker, encrypted archive) and is
//! reconstructed on every [`Vault::open`].

mod archive;
mod lifecycle;
mod shadow;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::core::cipher::{self, DeploymentKey};
use crate::core::config::RepoConfig;
use crate::core::constants;
use crate::core::repo::Repository;
use crate::error::{Result, VaultError};

pub use archive::{pack, unpack};

/// Paths that never enter the archive, whatever the manifest says.
const ARCHIVE_EXCLUDES: &[&str] = &[
    constants::KEY_FILE,
    constants::LOCK_MARKER,
    constants::ENCRYPTED_ARCHIVE_FILE,
    constants::DIGEST_FILE,
    constants::SHADOW_GIT_DIR,
];

/// Paths left on disk while locked.
const LOCKED_KEEP: &[&str] = &[
    constants::CONFIG_FILE,
    constants::KEY_FILE,
    constants::SHADOW_GIT_DIR,
];

/// Files the shadow repository tracks.
pub const SHADOW_FILES: &[&str] = &[
    constants::LOCK_MARKER,
    constants::ENCRYPTED_ARCHIVE_FILE,
    constants::DIGEST_FILE,
];

/// Lock state and key of one workspace.
pub struct Vault {
    path: PathBuf,
    files: Vec<String>,
    key: Option<DeploymentKey>,
    remote: Option<RepoConfig>,
    locked: bool,
    new_key_generated: bool,
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("path", &self.path)
            .field("files", &self.files)
            .field("has_key", &self.key.is_some())
            .field("locked", &self.locked)
            .field("new_key_generated", &self.new_key_generated)
            .finish()
    }
}

impl Vault {
    /// Open the vault rooted at `path` with the given manifest.
    ///
    /// An unlocked workspace without a key file gets a fresh key, saved with
    /// owner-only permissions and flagged by [`new_key_generated`]. A locked
    /// workspace without a key stays keyless until [`set_key`] is called;
    /// generating one there would seal nothing and unseal nothing.
    ///
    /// [`new_key_generated`]: Self::new_key_generated
    /// [`set_key`]: Self::set_key
    pub fn open(path: impl Into<PathBuf>, files: Vec<String>) -> Result<Self> {
        let path = path.into();
        let mut vault = Self {
            path,
            files,
            key: None,
            remote: None,
            locked: false,
            new_key_generated: false,
        };
        vault.locked = vault.state_on_disk();

        let key_path = vault.key_path();
        if key_path.exists() {
            vault.key = Some(DeploymentKey::load(&key_path)?);
        } else if !vault.locked {
            let key = DeploymentKey::generate();
            fs::create_dir_all(&vault.path)?;
            key.save(&key_path)?;
            info!(path = %key_path.display(), "generated new deployment key");
            vault.key = Some(key);
            vault.new_key_generated = true;
        } else {
            warn!(path = %key_path.display(), "locked deployment has no key");
        }

        debug!(path = %vault.path.display(), locked = vault.locked, "vault opened");
        Ok(vault)
    }

    /// Remote the shadow repository pushes to.
    pub fn with_remote(mut self, remote: Option<RepoConfig>) -> Self {
        self.remote = remote;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Manifest paths, relative to the vault root.
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Extend the manifest, ignoring duplicates.
    pub fn add_files<I, S>(&mut self, files: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for file in files {
            let file = file.into();
            if !self.files.contains(&file) {
                self.files.push(file);
            }
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Whether [`open`](Self::open) created the key file.
    pub fn new_key_generated(&self) -> bool {
        self.new_key_generated
    }

    pub fn key_path(&self) -> PathBuf {
        self.path.join(constants::KEY_FILE)
    }

    pub fn marker_path(&self) -> PathBuf {
        self.path.join(constants::LOCK_MARKER)
    }

    pub fn encrypted_archive_path(&self) -> PathBuf {
        self.path.join(constants::ENCRYPTED_ARCHIVE_FILE)
    }

    pub fn digest_path(&self) -> PathBuf {
        self.path.join(constants::DIGEST_FILE)
    }

    /// The deployment key.
    ///
    /// # Errors
    ///
    /// `VaultError::MissingKey` if a locked workspace was opened without one.
    pub fn key(&self) -> Result<&DeploymentKey> {
        self.key
            .as_ref()
            .ok_or_else(|| VaultError::MissingKey(self.key_path()).into())
    }

    /// Replace the key and persist it.
    pub fn set_key(&mut self, key: DeploymentKey) -> Result<()> {
        key.save(&self.key_path())?;
        info!(path = %self.key_path().display(), "deployment key replaced");
        self.key = Some(key);
        self.new_key_generated = false;
        Ok(())
    }

    /// Lock state as found on disk right now.
    ///
    /// Either the marker or the encrypted archive counts as locked; having
    /// only one of them means an interrupted transition and is logged.
    pub fn state_on_disk(&self) -> bool {
        let marker = self.marker_path().exists();
        let archive = self.encrypted_archive_path().exists();
        if marker != archive {
            warn!(
                marker,
                archive,
                path = %self.path.display(),
                "inconsistent lock state, treating as locked"
            );
        }
        marker || archive
    }

    /// Persisted digest of the encrypted archive, if any.
    pub fn digest(&self) -> Result<Option<String>> {
        let path = self.digest_path();
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?.trim().to_string()))
    }

    /// Whether the encrypted archive matches its persisted digest.
    pub fn verify(&self) -> Result<bool> {
        let archive = self.encrypted_archive_path();
        if !archive.exists() {
            return Err(VaultError::MissingArchive(archive).into());
        }
        let actual = cipher::sha256_file(&archive)?;
        Ok(self.digest()?.is_some_and(|expected| expected == actual))
    }

    /// Repository exposing only the sealed artifacts.
    pub fn shadow_repository(&self) -> Repository {
        shadow::repository(&self.path, self.remote.clone())
    }

    /// Manifest as archived: the declared files plus repository metadata.
    fn manifest(&self) -> Vec<String> {
        let mut manifest = self.files.clone();
        if !manifest.iter().any(|f| f == constants::GIT_DIR) {
            manifest.push(constants::GIT_DIR.to_string());
        }
        manifest
    }
}
