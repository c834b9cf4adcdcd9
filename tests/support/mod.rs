//! Test support utilities for bunker integration tests.
//!
//! Every test gets its own workspace, home directory, roles source
//! repository and bare deployment remote.

#![allow(dead_code)]

pub mod assertions;
pub mod commands;
pub mod fixtures;
pub mod skip;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use std::sync::Arc;

use bunker::core::secret_store::{MemoryStore, SecretStore};
use bunker::core::workspace::Workspace;
use tempfile::TempDir;

/// Isolated workspace with local roles and deployment remotes.
///
/// No process-global state is mutated; git and the binary run with
/// `.current_dir()` so tests can run in parallel.
pub struct Test {
    /// Workspace directory holding `deployment.json`
    pub dir: TempDir,
    /// Temporary home directory for child processes
    pub home: TempDir,
    /// Roles source repository, one commit on `main`
    pub roles: TempDir,
    /// Bare deployment remote
    pub remote: TempDir,
}

impl Test {
    /// Workspace with a manifest, a roles repository and a pre-seeded SSH
    /// keypair, not yet initialized.
    pub fn new() -> Self {
        Self::with_sources(&[])
    }

    /// Same as [`Test::new`] with the given inventory sources configured.
    pub fn with_sources(sources: &[&str]) -> Self {
        let t = Self {
            dir: TempDir::new().expect("failed to create temp dir"),
            home: TempDir::new().expect("failed to create temp home"),
            roles: TempDir::new().expect("failed to create roles dir"),
            remote: TempDir::new().expect("failed to create remote dir"),
        };

        git(t.roles.path(), &["init", "-q", "-b", "main"]);
        for (path, content) in ROLE_FILES {
            t.write_in(t.roles.path(), path, content);
        }
        git(t.roles.path(), &["add", "-A"]);
        git(t.roles.path(), &["commit", "-q", "-m", "add roles"]);

        git(t.remote.path(), &["init", "-q", "--bare", "-b", "main"]);

        t.write("deployment.json", &manifest(t.roles.path(), t.remote.path(), sources));
        t.write(".ssh/id_ed25519", SSH_PRIVATE_KEY);
        t.write(".ssh/id_ed25519.pub", SSH_PUBLIC_KEY);
        t
    }

    /// Workspace already initialized through the library.
    pub fn init() -> Self {
        let t = Self::new();
        t.workspace().create().expect("failed to create workspace");
        t
    }

    /// Load the workspace with an in-memory secret store.
    pub fn workspace(&self) -> Workspace {
        self.workspace_with(Arc::new(MemoryStore::new()))
    }

    pub fn workspace_with(&self, store: Arc<dyn SecretStore>) -> Workspace {
        Workspace::load_with_store(self.dir.path(), store).expect("failed to load workspace")
    }

    pub fn path(&self, rel: &str) -> std::path::PathBuf {
        self.dir.path().join(rel)
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel)).unwrap_or_else(|e| panic!("failed to read {}: {}", rel, e))
    }

    pub fn write(&self, rel: &str, content: &str) {
        self.write_in(self.dir.path(), rel, content);
    }

    fn write_in(&self, root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent dir");
        }
        fs::write(&path, content).expect("failed to write file");
    }

    /// Commit a new version of a role file in the roles source repository.
    pub fn change_role(&self, rel: &str, content: &str) {
        self.write_in(self.roles.path(), rel, content);
        git(self.roles.path(), &["add", "-A"]);
        git(self.roles.path(), &["commit", "-q", "-m", "change role"]);
    }

    /// Run git in the workspace.
    pub fn git(&self, args: &[&str]) -> String {
        stdout(&git(self.dir.path(), args))
    }

    /// Subject of the last commit in the workspace.
    pub fn last_commit(&self) -> String {
        self.git(&["log", "-1", "--format=%s"]).trim().to_string()
    }

    /// Run git against the bare remote.
    pub fn remote_git(&self, args: &[&str]) -> Output {
        git_output(self.remote.path(), args)
    }
}

/// Run git with a fixed identity and assert success.
pub fn git(dir: &Path, args: &[&str]) -> Output {
    let output = git_output(dir, args);
    assert_success(&output);
    output
}

/// Run git with a fixed identity, whatever the outcome.
pub fn git_output(dir: &Path, args: &[&str]) -> Output {
    Command::new("git")
        .current_dir(dir)
        .args(["-c", "user.name=Test", "-c", "user.email=test@example.com"])
        .args(args)
        .output()
        .expect("failed to run git")
}
