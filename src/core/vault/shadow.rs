//! Shadow repository swap.
//!
//! While unlocked the shadow repository is parked in `.git.shadow`; locking
//! moves it back into `.git` (or initializes a fresh one), so its history
//! and remote configuration survive any number of lock cycles.

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use super::SHADOW_FILES;
use crate::core::config::RepoConfig;
use crate::core::constants;
use crate::core::repo::Repository;
use crate::error::Result;

pub(super) fn repository(path: &Path, remote: Option<RepoConfig>) -> Repository {
    let files = SHADOW_FILES.iter().map(|f| f.to_string()).collect();
    let mut repo = Repository::new(path)
        .with_remote(remote)
        .with_content(files);
    repo.register_blob(constants::ARCHIVE_BLOB, constants::ENCRYPTED_ARCHIVE_FILE);
    repo
}

/// Install the shadow repository in `.git` and commit the sealed artifacts.
///
/// Expects the deployment repository's `.git` to be gone already.
pub(super) fn activate(path: &Path, remote: Option<RepoConfig>) -> Result<Repository> {
    let git_dir = path.join(constants::GIT_DIR);
    let parked = path.join(constants::SHADOW_GIT_DIR);

    if git_dir.exists() {
        fs::remove_dir_all(&git_dir)?;
    }
    if parked.exists() {
        fs::rename(&parked, &git_dir)?;
        debug!(path = %path.display(), "reactivated parked shadow repository");
    }

    let repo = repository(path, remote);
    repo.init()?;
    repo.update("shadow repository activated.", None, false)?;
    repo.store_blobs()?;

    info!(path = %path.display(), "shadow repository active");
    Ok(repo)
}

/// Move the shadow repository out of the way before extraction.
///
/// A parked copy left by an interrupted unlock is the shadow repository;
/// it is kept, and whatever sits in `.git` is dropped since extraction
/// restores the deployment repository from the archive.
pub(super) fn park(path: &Path) -> Result<()> {
    let git_dir = path.join(constants::GIT_DIR);
    let parked = path.join(constants::SHADOW_GIT_DIR);

    if parked.exists() {
        if git_dir.exists() {
            fs::remove_dir_all(&git_dir)?;
        }
        warn!(path = %path.display(), "shadow repository already parked, resuming unlock");
        return Ok(());
    }
    if !git_dir.exists() {
        debug!(path = %path.display(), "no shadow repository to park");
        return Ok(());
    }
    fs::rename(&git_dir, &parked)?;
    debug!(path = %path.display(), "parked shadow repository");
    Ok(())
}
