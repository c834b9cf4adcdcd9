//! Workspace lifecycle: initialization, refresh, sealing and transport.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::{Workspace, NO_FILES};
use crate::core::constants;
use crate::core::inventory::write_yaml;
use crate::core::playbook;
use crate::core::repo::ChangeSet;
use crate::core::runner::{self, RunOptions};
use crate::core::ssh::SshKeypair;
use crate::error::{ConfigError, Result, VaultError};

/// Part of the workspace an update regenerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    Roles,
    Playbook,
    Inventory,
    GroupVars,
    RunnerConfig,
}

impl Scope {
    pub fn name(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Roles => "roles",
            Self::Playbook => "playbook",
            Self::Inventory => "inventory",
            Self::GroupVars => "group_vars",
            Self::RunnerConfig => "runner_config",
        }
    }

    fn includes(self, part: Scope) -> bool {
        self == Self::All || self == part
    }
}

impl std::str::FromStr for Scope {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "roles" => Ok(Self::Roles),
            "playbook" => Ok(Self::Playbook),
            "inventory" => Ok(Self::Inventory),
            "group_vars" => Ok(Self::GroupVars),
            "runner_config" | "ansible_cfg" => Ok(Self::RunnerConfig),
            other => Err(ConfigError::InvalidValue {
                field: "scope",
                reason: format!("unknown update scope '{}'", other),
            }),
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of [`Workspace::update`]. Nothing is committed yet.
#[derive(Debug, Clone)]
pub struct UpdateReport {
    pub scope: Scope,
    pub changes: ChangeSet,
    pub old_roles_head: Option<String>,
    pub new_roles_head: Option<String>,
}

impl UpdateReport {
    pub fn roles_updated(&self) -> bool {
        self.old_roles_head != self.new_roles_head
    }
}

impl Workspace {
    /// Initialize the workspace: directory layout, deployment repository,
    /// roles clone and every generated file, committed in two steps.
    pub fn create(&mut self) -> Result<()> {
        self.require_unlocked("init")?;

        for dir in constants::DIRECTORY_LAYOUT {
            fs::create_dir_all(self.path.join(dir))?;
        }
        let mut ignore = constants::GITIGNORE_ENTRIES.join("\n");
        ignore.push('\n');
        fs::write(self.path.join(constants::GITIGNORE_FILE), ignore)?;

        self.deployment_repo.init()?;
        self.deployment_repo.update("initial commit", None, true)?;
        if !self.roles_repo.exists() {
            self.roles_repo.clone_from_remote()?;
        }

        playbook::write_runner_config(&self.path)?;
        self.copy_roles()?;
        playbook::write_playbook(&self.path, self.config.name(), self.config.roles())?;
        self.write_role_defaults()?;
        self.write_inventory()?;

        self.deployment_repo.update("add deployment files", None, true)?;
        self.track_vault_files()?;
        info!(path = %self.path.display(), name = %self.config.name(), "workspace created");
        Ok(())
    }

    /// Remove everything [`create`](Self::create) generated. The config, the
    /// key, the SSH keypair and provisioning files stay.
    pub fn delete(&mut self) -> Result<()> {
        self.require_unlocked("delete")?;
        let mut removed = 0;
        for name in [
            constants::SHADOW_GIT_DIR,
            constants::GIT_DIR,
            constants::HOST_VARS_DIR,
            constants::GROUP_VARS_DIR,
            constants::ROLES_DIR,
            constants::ROLES_CLONE_DIR,
            constants::GITIGNORE_FILE,
        ]
        .iter()
        .chain(constants::DEPLOYMENT_FILES)
        {
            if remove_path(&self.path.join(name))? {
                removed += 1;
            }
        }
        self.aggregate = None;
        info!(path = %self.path.display(), removed, "workspace deleted");
        Ok(())
    }

    /// Regenerate `scope` from the roles repository and the inventory
    /// sources. Never commits; returns the resulting change set.
    pub fn update(&mut self, scope: Scope) -> Result<UpdateReport> {
        self.require_unlocked("update")?;
        if !self.roles_repo.exists() {
            self.roles_repo.clone_from_remote()?;
        }
        let old_roles_head = self.roles_repo.head()?;

        if scope.includes(Scope::Roles) {
            self.roles_repo.pull()?;
            self.copy_roles()?;
        }
        if scope.includes(Scope::Playbook) {
            playbook::write_playbook(&self.path, self.config.name(), self.config.roles())?;
        }
        if scope.includes(Scope::Inventory) {
            self.write_inventory()?;
        }
        if scope.includes(Scope::GroupVars) {
            self.write_role_defaults()?;
        }
        if scope.includes(Scope::RunnerConfig) {
            playbook::write_runner_config(&self.path)?;
        }

        let report = UpdateReport {
            scope,
            changes: self.deployment_repo.update_changed_files()?,
            old_roles_head,
            new_roles_head: self.roles_repo.head()?,
        };
        debug!(
            scope = %scope,
            changed = report.changes.all.len(),
            new = report.changes.new.len(),
            "workspace updated"
        );
        Ok(report)
    }

    /// Commit the chosen files of an update together with all new files.
    pub fn commit_update(&mut self, report: &UpdateReport, files: &[String]) -> Result<bool> {
        let mut files = files.to_vec();
        for file in &report.changes.new {
            if !files.contains(file) {
                files.push(file.clone());
            }
        }
        let committed = self.deployment_repo.update(
            &format!("deployment update with scope: {}", report.scope),
            Some(&files),
            false,
        )?;
        self.track_vault_files()?;
        Ok(committed)
    }

    /// Record the current state, then seal the workspace.
    ///
    /// # Errors
    ///
    /// `VaultError::AlreadyLocked` if the workspace is sealed.
    pub fn lock(&mut self) -> Result<()> {
        if self.vault.state_on_disk() {
            return Err(VaultError::AlreadyLocked.into());
        }
        self.deployment_repo.update("lock deployment", None, true)?;
        self.track_vault_files()?;
        self.vault.lock()?;
        self.aggregate = None;
        Ok(())
    }

    /// Unseal the workspace and record the unlock in the restored history.
    ///
    /// # Errors
    ///
    /// `VaultError::AlreadyUnlocked`, or `IntegrityVerificationFailed`
    /// unless `force`.
    pub fn unlock(&mut self, force: bool) -> Result<()> {
        self.vault.unlock(force)?;
        self.deployment_repo.update("unlock deployment", None, true)?;
        self.track_vault_files()?;
        Ok(())
    }

    /// Push the shadow repository and the archive blob.
    pub fn push(&self) -> Result<()> {
        self.require_locked("push")?;
        self.vault.shadow_repository().push()
    }

    /// Pull the shadow repository and restore the archive from its blob.
    /// Returns the restored blob names.
    pub fn pull(&mut self) -> Result<Vec<String>> {
        self.require_locked("pull")?;
        let shadow = self.vault.shadow_repository();
        shadow.pull()?;
        shadow.restore_blobs()
    }

    /// Run the playbook and record the command line as a commit. Returns
    /// the runner's exit code.
    pub fn run(&mut self, options: &RunOptions) -> Result<i32> {
        self.require_unlocked("run")?;
        let code = runner::run_playbook(&self.path, options)?;
        self.deployment_repo.update(
            &format!("run: {}", options.command_line()),
            Some(NO_FILES),
            true,
        )?;
        Ok(code)
    }

    /// Replace `roles/<name>` with the clone's copy for every configured role.
    fn copy_roles(&self) -> Result<()> {
        let dest = self.path.join(constants::ROLES_DIR);
        fs::create_dir_all(&dest)?;
        for role in self.roles()? {
            role.copy_to(&dest)?;
        }
        Ok(())
    }

    /// Write each role's defaults to `group_vars/<role>`; a file that did not
    /// exist before is committed right away.
    fn write_role_defaults(&self) -> Result<()> {
        for role in self.roles()? {
            let defaults = role.default_vars();
            if defaults.is_empty() {
                continue;
            }
            let rel = format!("{}/{}", constants::GROUP_VARS_DIR, role.name());
            let path = self.path.join(&rel);
            let is_new = !path.exists();
            write_yaml(&path, &Value::Object(defaults))?;
            if is_new {
                self.deployment_repo.update(
                    &format!("add new group_vars file from role {}", role.name()),
                    Some(std::slice::from_ref(&rel)),
                    false,
                )?;
            }
        }
        Ok(())
    }

    /// Aggregate and render the inventory; make sure the SSH keypair exists.
    fn write_inventory(&mut self) -> Result<()> {
        let aggregate = self.aggregator().aggregate()?;
        aggregate.model.write(&self.path)?;

        let dir = self.path.join(constants::SSH_DIR);
        let merged = &aggregate.ssh_keypair;
        if merged.is_complete() {
            if SshKeypair::read(&dir)? != *merged {
                merged.write(&dir)?;
            }
        } else if merged.is_empty() {
            SshKeypair::generate(&dir)?;
        } else {
            warn!(dir = %dir.display(), "sources supplied half an ssh keypair, leaving it alone");
        }

        self.aggregate = Some(aggregate);
        Ok(())
    }
}

/// Remove a file or directory tree; `false` if there was nothing.
fn remove_path(path: &Path) -> Result<bool> {
    let Ok(meta) = fs::symlink_metadata(path) else {
        return Ok(false);
    };
    if meta.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_parse() {
        assert_eq!("all".parse::<Scope>().unwrap(), Scope::All);
        assert_eq!("ansible_cfg".parse::<Scope>().unwrap(), Scope::RunnerConfig);
        assert!("everything".parse::<Scope>().is_err());
    }

    #[test]
    fn test_scope_includes() {
        assert!(Scope::All.includes(Scope::GroupVars));
        assert!(Scope::Roles.includes(Scope::Roles));
        assert!(!Scope::Roles.includes(Scope::Playbook));
    }

    #[test]
    fn test_remove_path_missing() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(!remove_path(&tmp.path().join("nope")).unwrap());
        std::fs::create_dir_all(tmp.path().join("d/e")).unwrap();
        assert!(remove_path(&tmp.path().join("d")).unwrap());
        assert!(!tmp.path().join("d").exists());
    }
}
