//! Named blobs stored outside the commit history.
//!
//! Each registered blob is written into the object database with
//! `git hash-object -w` and referenced by an annotated tag of the same name.
//! Tags travel with `push`/`fetch`, so a clone can restore the blob even
//! when the file itself was never committed on the current branch.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::Repository;
use crate::core::config::RepoConfig;
use crate::error::{RepoError, Result};

impl Repository {
    /// Associate the tag `name` with the file at `path`.
    ///
    /// Registration is in-memory; [`store_blobs`](Self::store_blobs)
    /// writes the objects.
    pub fn register_blob(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) {
        let name = name.into();
        let path = path.into();
        debug!(blob = %name, path = %path.display(), "registered blob");
        self.blobs.insert(name, path);
    }

    /// Registered blob names and their source files.
    pub fn blobs(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.blobs.iter().map(|(n, p)| (n.as_str(), p.as_path()))
    }

    /// Write every registered blob and (re)point its tag at the new object.
    ///
    /// Previous versions are dropped first so the object database holds only
    /// the current content.
    pub fn store_blobs(&self) -> Result<()> {
        self.require_repo()?;
        self.cleanup_blobs()?;

        let git = self.git().with_fallback_identity();
        for (name, path) in &self.blobs {
            let file = self.path.join(path).to_string_lossy().to_string();
            let oid = git.run(["hash-object", "-w", "--", file.as_str()])?;
            let oid = oid.trim();
            let message = format!("{} blob", name);
            git.run(["tag", "-a", "-f", "-m", message.as_str(), name.as_str(), oid])?;
            info!(blob = %name, oid, "stored blob");
        }
        Ok(())
    }

    /// Delete the tags of every registered blob and prune unreachable objects.
    pub fn cleanup_blobs(&self) -> Result<()> {
        self.require_repo()?;
        let git = self.git();
        let mut removed = false;
        for name in self.blobs.keys() {
            let tag = format!("refs/tags/{}", name);
            if git.succeeds(["rev-parse", "-q", "--verify", tag.as_str()])? {
                git.run(["tag", "-d", name.as_str()])?;
                removed = true;
            }
        }
        if removed {
            git.run(["gc", "--prune=now", "--quiet"])?;
            debug!(path = %self.path.display(), "pruned old blobs");
        }
        Ok(())
    }

    /// Content of the blob `name`.
    ///
    /// # Errors
    ///
    /// `RepoError::BlobNotFound` if no such tag exists.
    pub fn read_blob(&self, name: &str) -> Result<Vec<u8>> {
        self.require_repo()?;
        let tag = format!("refs/tags/{}", name);
        let git = self.git();
        if !git.succeeds(["rev-parse", "-q", "--verify", tag.as_str()])? {
            return Err(RepoError::BlobNotFound(name.to_string()).into());
        }
        git.run_bytes(["cat-file", "blob", tag.as_str()])
    }

    /// Write each registered blob back to its file if the file is missing.
    ///
    /// Returns the names that were restored.
    pub fn restore_blobs(&self) -> Result<Vec<String>> {
        let mut restored = Vec::new();
        for (name, path) in &self.blobs {
            let file = self.path.join(path);
            if file.exists() {
                continue;
            }
            match self.read_blob(name) {
                Ok(bytes) => {
                    if let Some(parent) = file.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&file, bytes)?;
                    info!(blob = %name, path = %file.display(), "restored blob");
                    restored.push(name.clone());
                }
                Err(crate::error::Error::Repo(RepoError::BlobNotFound(_))) => {
                    warn!(blob = %name, "blob missing, cannot restore");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(restored)
    }

    pub(super) fn push_blobs(&self, remote: &RepoConfig) -> Result<()> {
        let git = self.git();
        for name in self.blobs.keys() {
            let refspec = format!("+refs/tags/{0}:refs/tags/{0}", name);
            let output = git.output(["push", "-q", "--force", "origin", refspec.as_str()])?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(super::classify_remote_failure(
                    &remote.url,
                    &remote.reference,
                    &stderr,
                ));
            }
            debug!(blob = %name, "pushed blob");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_blobs_are_listed() {
        let mut repo = Repository::new("/srv/deploy");
        repo.register_blob("deployment_data", "deployment.tar.gz.enc");
        let blobs: Vec<_> = repo.blobs().collect();
        assert_eq!(
            blobs,
            vec![("deployment_data", Path::new("deployment.tar.gz.enc"))]
        );
    }

    #[test]
    fn test_register_replaces_path() {
        let mut repo = Repository::new("/srv/deploy");
        repo.register_blob("data", "a");
        repo.register_blob("data", "b");
        assert_eq!(repo.blobs().count(), 1);
        assert_eq!(repo.blobs().next().unwrap().1, Path::new("b"));
    }
}
