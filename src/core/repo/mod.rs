//! Local version-controlled directories.
//!
//! A [`Repository`] wraps one git working tree: commits, change
//! classification, remote synchronization and a small named blob store
//! layered over tags (see [`blobs`]).
//!
//! Repository values are cheap descriptions; all state is read live from
//! disk, so a `Repository` never serves a stale view of the tree.

mod blobs;
mod changes;
pub(crate) mod git;

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::core::config::RepoConfig;
use crate::core::constants;
use crate::error::{RepoError, Result};

pub use changes::ChangeSet;
use git::{classify_checkout_failure, classify_remote_failure, Git};

/// A git working tree managed by bunker.
#[derive(Debug, Clone)]
pub struct Repository {
    path: PathBuf,
    remote: Option<RepoConfig>,
    content: Vec<String>,
    patterns: Vec<String>,
    blobs: BTreeMap<String, PathBuf>,
}

impl Repository {
    /// Describe the repository at `path`. Nothing is touched on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            remote: None,
            content: Vec::new(),
            patterns: Vec::new(),
            blobs: BTreeMap::new(),
        }
    }

    pub fn with_remote(mut self, remote: Option<RepoConfig>) -> Self {
        self.remote = remote;
        self
    }

    /// Paths (relative to the root) that make up the repository's content.
    pub fn with_content(mut self, content: Vec<String>) -> Self {
        self.content = content;
        self
    }

    /// Directory prefixes whose untracked files count as new content.
    pub fn with_patterns(mut self, patterns: Vec<String>) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn remote(&self) -> Option<&RepoConfig> {
        self.remote.as_ref()
    }

    pub fn content(&self) -> &[String] {
        &self.content
    }

    /// Extend the declared content, ignoring duplicates.
    pub fn add_content<I, S>(&mut self, paths: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for path in paths {
            let path = self.relative(path.as_ref());
            if !self.content.contains(&path) {
                self.content.push(path);
            }
        }
    }

    /// Whether a repository exists at the path.
    pub fn exists(&self) -> bool {
        self.path.join(constants::GIT_DIR).join("HEAD").exists()
    }

    fn git(&self) -> Git<'_> {
        Git::new(&self.path)
    }

    fn require_repo(&self) -> Result<()> {
        if self.exists() {
            Ok(())
        } else {
            Err(RepoError::NotARepo(self.path.clone()).into())
        }
    }

    fn require_remote(&self) -> Result<&RepoConfig> {
        self.remote
            .as_ref()
            .ok_or_else(|| RepoError::NoRemoteConfigured(self.path.clone()).into())
    }

    /// Path relative to the repository root, as git reports it.
    fn relative(&self, path: &str) -> String {
        let p = Path::new(path);
        if p.is_absolute() {
            if let Ok(rel) = p.strip_prefix(&self.path) {
                return rel.to_string_lossy().to_string();
            }
        }
        path.trim_start_matches("./").to_string()
    }

    /// Create an empty repository. Existing repositories are left alone.
    pub fn init(&self) -> Result<()> {
        if self.exists() {
            debug!(path = %self.path.display(), "repository already initialized");
        } else {
            std::fs::create_dir_all(&self.path)?;
            self.git().run(["init", "-q"])?;
            info!(path = %self.path.display(), "initialized repository");
        }
        if self.remote.is_some() {
            self.set_remote()?;
        }
        Ok(())
    }

    /// Clone the configured remote into the path.
    ///
    /// # Errors
    ///
    /// `RepoError::RemoteUnavailable` if the remote cannot be reached,
    /// `RepoError::ReferenceNotFound` if the branch does not exist.
    pub fn clone_from_remote(&self) -> Result<()> {
        let remote = self.require_remote()?;
        let parent = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        std::fs::create_dir_all(&parent)?;

        info!(url = %remote.url, reference = %remote.reference, "cloning");
        let args: [&OsStr; 6] = [
            OsStr::new("clone"),
            OsStr::new("-q"),
            OsStr::new("--branch"),
            OsStr::new(&remote.reference),
            OsStr::new(&remote.url),
            self.path.as_os_str(),
        ];
        let output = Git::new(&parent).output(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_remote_failure(&remote.url, &remote.reference, &stderr));
        }
        Ok(())
    }

    /// Point `origin` at the configured remote.
    pub fn set_remote(&self) -> Result<()> {
        let remote = self.require_remote()?;
        self.require_repo()?;
        let git = self.git();
        if git.succeeds(["remote", "get-url", "origin"])? {
            git.run(["remote", "set-url", "origin", remote.url.as_str()])?;
        } else {
            git.run(["remote", "add", "origin", remote.url.as_str()])?;
        }
        debug!(url = %remote.url, "origin configured");
        Ok(())
    }

    /// Classify the live tree into new, staged and unstaged files.
    pub fn update_changed_files(&self) -> Result<ChangeSet> {
        self.require_repo()?;
        let git = self.git();

        let new = git
            .paths(["ls-files", "-z", "--others", "--exclude-standard"])?
            .into_iter()
            .filter(|p| changes::is_declared_content(p, &self.patterns, &self.content))
            .collect();

        let unstaged = git.paths(["diff", "-z", "--name-only"])?;

        let staged = if self.head()?.is_some() {
            git.paths(["diff", "-z", "--name-only", "--cached", "HEAD"])?
        } else {
            git.paths(["ls-files", "-z", "--cached"])?
        };

        let changes = ChangeSet::new(new, staged, unstaged);
        debug!(
            new = changes.new.len(),
            staged = changes.staged.len(),
            unstaged = changes.unstaged.len(),
            "changes computed"
        );
        Ok(changes)
    }

    /// Files in the index.
    pub fn tracked_files(&self) -> Result<Vec<String>> {
        self.require_repo()?;
        self.git().paths(["ls-files", "-z", "--cached"])
    }

    /// Current commit, `None` on an unborn branch.
    pub fn head(&self) -> Result<Option<String>> {
        self.require_repo()?;
        let output = self.git().output(["rev-parse", "-q", "--verify", "HEAD"])?;
        if output.status.success() {
            Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string()))
        } else {
            Ok(None)
        }
    }

    pub fn is_detached(&self) -> Result<bool> {
        self.require_repo()?;
        Ok(!self.git().succeeds(["symbolic-ref", "-q", "HEAD"])?)
    }

    /// Tracked files with modifications not yet staged.
    pub fn is_dirty(&self) -> Result<bool> {
        Ok(!self.update_changed_files()?.unstaged.is_empty())
    }

    /// Fail with `DirtyWorkingTree` when unstaged modifications exist.
    pub fn ensure_clean(&self) -> Result<()> {
        let changes = self.update_changed_files()?;
        if changes.unstaged.is_empty() {
            Ok(())
        } else {
            Err(RepoError::DirtyWorkingTree {
                path: self.path.clone(),
                files: changes.unstaged,
            }
            .into())
        }
    }

    /// Stage `files` (or the declared content) and commit.
    ///
    /// Present paths are added, absent paths are removed from tracking. A
    /// commit is only created when something is staged or `force_commit` is
    /// set. Returns whether a commit was made.
    pub fn update(&self, message: &str, files: Option<&[String]>, force_commit: bool) -> Result<bool> {
        self.require_repo()?;
        let files = files.unwrap_or(self.content.as_slice());
        let git = self.git();

        for file in files {
            let file = self.relative(file);
            if self.path.join(&file).exists() {
                git.run(["add", "-A", "--", file.as_str()])?;
            } else {
                git.run(["rm", "-r", "-q", "--cached", "--ignore-unmatch", "--", file.as_str()])?;
            }
        }

        let changes = self.update_changed_files()?;
        if changes.staged.is_empty() && !force_commit {
            debug!(path = %self.path.display(), "nothing to commit");
            return Ok(false);
        }

        let message = commit_message(message);
        let git = self.git().with_fallback_identity();
        let mut args = vec!["commit", "-q", "--no-verify", "-m", message.as_str()];
        if force_commit {
            args.push("--allow-empty");
        }
        git.run(args)?;
        info!(path = %self.path.display(), message = %message, "committed");
        Ok(true)
    }

    /// Diff of one file: unstaged changes first, staged otherwise.
    pub fn diff(&self, file: &str) -> Result<String> {
        let changes = self.update_changed_files()?;
        let git = self.git();
        if changes.is_unstaged(file) {
            git.run(["diff", "--", file])
        } else if changes.is_staged(file) {
            git.run(["diff", "--cached", "--", file])
        } else {
            Ok(String::new())
        }
    }

    /// Throw away unstaged modifications of one file.
    pub fn discard(&self, file: &str) -> Result<()> {
        self.require_repo()?;
        self.git().run(["checkout", "-q", "--", file])?;
        debug!(file, "discarded changes");
        Ok(())
    }

    fn ensure_origin(&self) -> Result<&RepoConfig> {
        let remote = self.require_remote()?;
        if !self.git().succeeds(["remote", "get-url", "origin"])? {
            self.set_remote()?;
        }
        Ok(remote)
    }

    /// Fetch from origin, check out the configured reference and merge it.
    ///
    /// A reference that leaves HEAD detached (tag, commit) is checked out
    /// but not merged.
    pub fn pull(&self) -> Result<()> {
        self.require_repo()?;
        let remote = self.ensure_origin()?;
        let git = self.git();

        let fetch = git.output([
            "fetch",
            "-q",
            "--force",
            "origin",
            "+refs/heads/*:refs/remotes/origin/*",
            "+refs/tags/*:refs/tags/*",
        ])?;
        if !fetch.status.success() {
            let stderr = String::from_utf8_lossy(&fetch.stderr);
            return Err(classify_remote_failure(&remote.url, &remote.reference, &stderr));
        }

        let checkout = git.output(["checkout", "-q", remote.reference.as_str()])?;
        if !checkout.status.success() {
            let stderr = String::from_utf8_lossy(&checkout.stderr);
            return Err(classify_checkout_failure(&remote.url, &remote.reference, &stderr));
        }

        if self.is_detached()? {
            debug!(reference = %remote.reference, "detached HEAD, skipping merge");
            return Ok(());
        }

        let pull = self.git().with_fallback_identity().output([
            "pull",
            "-q",
            "--no-rebase",
            "origin",
            remote.reference.as_str(),
        ])?;
        if !pull.status.success() {
            let stderr = String::from_utf8_lossy(&pull.stderr);
            return Err(classify_remote_failure(&remote.url, &remote.reference, &stderr));
        }
        info!(url = %remote.url, reference = %remote.reference, "pulled");
        Ok(())
    }

    /// Push the current branch and registered blobs to origin.
    ///
    /// No-op on a detached HEAD.
    pub fn push(&self) -> Result<()> {
        self.require_repo()?;
        let remote = self.ensure_origin()?;

        if self.is_detached()? {
            debug!(path = %self.path.display(), "detached HEAD, skipping push");
            return Ok(());
        }

        let refspec = format!("HEAD:refs/heads/{}", remote.reference);
        let output = self
            .git()
            .output(["push", "-q", "-u", "origin", refspec.as_str()])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_remote_failure(&remote.url, &remote.reference, &stderr));
        }
        self.push_blobs(remote)?;

        info!(url = %remote.url, reference = %remote.reference, "pushed");
        Ok(())
    }
}

/// Prefix and capitalize a commit message.
fn commit_message(message: &str) -> String {
    let mut chars = message.trim().chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    format!("{}: {}", constants::COMMIT_PREFIX, capitalized)
}
