//! Deployment workspace.
//!
//! A [`Workspace`] ties one deployment directory together: the deployment
//! repository, the hidden clone of the roles repository, the vault that
//! seals them, and the inventory aggregated from the configured sources.
//! Everything is rebuilt from disk on [`Workspace::load`].

mod lifecycle;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::core::config::{DeploymentConfig, PluginKind};
use crate::core::constants;
use crate::core::inventory::{
    Aggregate, Aggregator, InventoryModel, InventorySource, InventoryWriter, PluginContext,
};
use crate::core::repo::Repository;
use crate::core::role::Role;
use crate::core::secret_store::{HttpKvStore, SecretStore};
use crate::core::vault::Vault;
use crate::core::view::{HostView, WorkspaceView};
use crate::error::{ConfigError, InventoryError, Result, VaultError};

pub use lifecycle::{Scope, UpdateReport};

/// Commit nothing but a message.
const NO_FILES: &[String] = &[];

pub struct Workspace {
    path: PathBuf,
    config: DeploymentConfig,
    store: Arc<dyn SecretStore>,
    deployment_repo: Repository,
    roles_repo: Repository,
    vault: Vault,
    aggregate: Option<Aggregate>,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("path", &self.path)
            .field("name", &self.config.name())
            .field("store", &self.store.name())
            .field("vault", &self.vault)
            .finish()
    }
}

impl Workspace {
    /// Load the workspace at `path`, talking to the secret store named by
    /// the environment.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        Self::load_with_store(path, Arc::new(HttpKvStore::from_env()))
    }

    /// Load the workspace at `path` with an explicit secret store.
    ///
    /// # Errors
    ///
    /// `ConfigError::NotFound` if `deployment.json` is missing.
    pub fn load_with_store(path: impl Into<PathBuf>, store: Arc<dyn SecretStore>) -> Result<Self> {
        let path = path.into();
        let config = DeploymentConfig::load(&path.join(constants::CONFIG_FILE))?;
        Self::open(path, config, store)
    }

    /// Build the workspace for an already loaded config.
    pub fn open(path: PathBuf, config: DeploymentConfig, store: Arc<dyn SecretStore>) -> Result<Self> {
        let ctx = context(&path, &config, &store);
        let added = Aggregator::from_kinds(config.inventory_sources(), &ctx).declared_added_files();

        let mut content: Vec<String> = constants::DEPLOYMENT_FILES
            .iter()
            .chain([
                &constants::HOST_VARS_DIR,
                &constants::GROUP_VARS_DIR,
                &constants::ROLES_DIR,
                &constants::CONFIG_FILE,
                &constants::GITIGNORE_FILE,
            ])
            .map(|f| f.to_string())
            .collect();
        content.extend(added.iter().cloned());
        let patterns = constants::CONTENT_PATTERNS.iter().map(|p| p.to_string()).collect();

        let deployment_repo = Repository::new(&path)
            .with_remote(config.deployment_repo().cloned())
            .with_content(content)
            .with_patterns(patterns);
        let roles_repo = Repository::new(path.join(constants::ROLES_CLONE_DIR))
            .with_remote(Some(config.roles_repo().clone()));

        let mut files: Vec<String> = constants::DEPLOYMENT_FILES
            .iter()
            .chain(constants::DIRECTORY_LAYOUT)
            .chain([
                &constants::CONFIG_FILE,
                &constants::ROLES_DIR,
                &constants::GITIGNORE_FILE,
            ])
            .map(|f| f.to_string())
            .collect();
        files.extend(added);
        let vault = Vault::open(&path, files)?.with_remote(config.deployment_repo().cloned());

        let mut workspace = Self {
            path,
            config,
            store,
            deployment_repo,
            roles_repo,
            vault,
            aggregate: None,
        };
        workspace.track_vault_files()?;

        debug!(
            path = %workspace.path.display(),
            name = %workspace.config.name(),
            locked = workspace.vault.is_locked(),
            "workspace loaded"
        );
        Ok(workspace)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &DeploymentConfig {
        &self.config
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    pub fn deployment_repo(&self) -> &Repository {
        &self.deployment_repo
    }

    pub fn roles_repo(&self) -> &Repository {
        &self.roles_repo
    }

    pub fn is_locked(&self) -> bool {
        self.vault.is_locked()
    }

    /// Whether loading created the deployment key.
    pub fn new_key_generated(&self) -> bool {
        self.vault.new_key_generated()
    }

    /// Configured roles, parsed from the roles clone.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidValue` if a role is not in the roles repository.
    pub fn roles(&self) -> Result<Vec<Role>> {
        self.config
            .roles()
            .iter()
            .map(|name| {
                let path = self.roles_repo.path().join(name);
                if !path.is_dir() {
                    return Err(ConfigError::InvalidValue {
                        field: "roles",
                        reason: format!("role '{}' not found in {}", name, self.config.roles_repo()),
                    }
                    .into());
                }
                Role::load(path)
            })
            .collect()
    }

    fn context(&self) -> PluginContext {
        context(&self.path, &self.config, &self.store)
    }

    fn aggregator(&self) -> Aggregator {
        Aggregator::from_kinds(self.config.inventory_sources(), &self.context())
    }

    /// Add the deployment repository's tracked files to the vault manifest.
    fn track_vault_files(&mut self) -> Result<()> {
        if !self.vault.is_locked() && self.deployment_repo.exists() {
            self.vault.add_files(self.deployment_repo.tracked_files()?);
        }
        Ok(())
    }

    fn require_unlocked(&self, operation: &'static str) -> Result<()> {
        if self.vault.state_on_disk() {
            Err(VaultError::RequiresUnlock(operation).into())
        } else {
            Ok(())
        }
    }

    fn require_locked(&self, operation: &'static str) -> Result<()> {
        if self.vault.state_on_disk() {
            Ok(())
        } else {
            Err(VaultError::RequiresLock(operation).into())
        }
    }

    /// Fail unless the workspace is initialized and both repositories have
    /// no unstaged modifications.
    ///
    /// # Errors
    ///
    /// `ConfigError::NotInitialized` or `RepoError::DirtyWorkingTree`.
    pub fn check_environment(&self) -> Result<()> {
        if !self.deployment_repo.exists() || !self.roles_repo.exists() {
            return Err(ConfigError::NotInitialized(self.path.clone()).into());
        }
        self.deployment_repo.ensure_clean()?;
        self.roles_repo.ensure_clean()?;
        Ok(())
    }

    /// The aggregated inventory, computed on first use.
    pub fn inventory(&mut self) -> Result<&Aggregate> {
        let aggregate = match self.aggregate.take() {
            Some(aggregate) => aggregate,
            None => self.aggregator().aggregate()?,
        };
        Ok(self.aggregate.insert(aggregate))
    }

    /// Re-aggregate, optionally from a subset of the configured sources.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidSourceOverride` if an override is neither
    /// `local` nor a configured source.
    pub fn update_inventory(&mut self, overrides: &[PluginKind]) -> Result<&Aggregate> {
        for kind in overrides {
            if *kind != PluginKind::Local && !self.config.inventory_sources().contains(kind) {
                return Err(ConfigError::InvalidSourceOverride(kind.name().to_string()).into());
            }
        }
        if !overrides.is_empty() {
            self.config = self.config.clone().with_inventory_sources(overrides.to_vec());
        }
        let aggregate = self.aggregator().aggregate()?;
        Ok(self.aggregate.insert(aggregate))
    }

    fn writers(&self) -> Result<Vec<InventoryWriter>> {
        let ctx = self.context();
        self.config
            .inventory_writers()
            .iter()
            .map(|kind| InventoryWriter::from_kind(*kind, &ctx))
            .collect()
    }

    /// Mirror the inventory into every configured writer and record a commit.
    ///
    /// Template mode leaves out the deployment key and the SSH keypair.
    /// Returns the writer names.
    ///
    /// # Errors
    ///
    /// `InventoryError::NoWriters` without configured writers.
    pub fn persist(&mut self, template_mode: bool) -> Result<Vec<&'static str>> {
        self.require_unlocked("persist")?;
        let writers = self.writers()?;
        if writers.is_empty() {
            return Err(InventoryError::NoWriters.into());
        }
        let key = if template_mode {
            None
        } else {
            Some(self.vault.key()?.clone())
        };
        let aggregate = self.inventory()?.clone();
        let ssh = (!template_mode).then_some(&aggregate.ssh_keypair);

        for writer in &writers {
            writer.persist(&aggregate.model, key.as_ref(), ssh)?;
        }
        let names: Vec<&'static str> = writers.iter().map(InventoryWriter::name).collect();
        self.deployment_repo.update(
            &format!("running inventory writers: {}", names.join(", ")),
            Some(NO_FILES),
            true,
        )?;
        info!(writers = names.len(), template_mode, "inventory persisted");
        Ok(names)
    }

    /// Purge what the configured writers hold for this deployment.
    pub fn delete_from_writers(&mut self) -> Result<Vec<&'static str>> {
        let writers = self.writers()?;
        if writers.is_empty() {
            return Ok(Vec::new());
        }
        let model = self.inventory()?.model.clone();
        for writer in &writers {
            writer.delete(&model)?;
        }
        Ok(writers.iter().map(InventoryWriter::name).collect())
    }

    /// Replace the deployment key with the one `source` holds.
    ///
    /// # Errors
    ///
    /// `InventoryError::CapabilityUnsupported` if the source yields no key.
    pub fn fetch_key(&mut self, source: PluginKind) -> Result<()> {
        let output = InventorySource::from_kind(source, &self.context()).produce()?;
        let key = output
            .deployment_key
            .ok_or(InventoryError::CapabilityUnsupported {
                plugin: source.name(),
                operation: "fetch key",
            })?;
        self.vault.set_key(key)?;
        info!(source = source.name(), "deployment key fetched");
        Ok(())
    }

    /// Connection variables of one inventory host.
    ///
    /// # Errors
    ///
    /// `InventoryError::UnknownHost` if the host is not in the inventory.
    pub fn connection_details(&mut self, host: &str) -> Result<HostView> {
        let facts = self
            .inventory()?
            .model
            .host_facts(host)
            .ok_or_else(|| InventoryError::UnknownHost(host.to_string()))?;
        Ok(HostView::from_facts(host, &facts))
    }

    /// Presentation of the workspace. Hosts come from the last aggregate, or
    /// from the workspace files when nothing was aggregated yet.
    pub fn view(&self) -> Result<WorkspaceView> {
        let locked = self.vault.is_locked();
        let hosts = if locked {
            Vec::new()
        } else {
            match &self.aggregate {
                Some(aggregate) => HostView::all(&aggregate.model),
                None => HostView::all(&InventoryModel::load(&self.path)?),
            }
        };
        let changes = if !locked && self.deployment_repo.exists() {
            Some(self.deployment_repo.update_changed_files()?)
        } else {
            None
        };
        Ok(WorkspaceView {
            name: self.config.name().to_string(),
            path: self.path.clone(),
            roles: self.config.roles().to_vec(),
            roles_repo: self.config.roles_repo().to_string(),
            deployment_repo: self.config.deployment_repo().map(ToString::to_string),
            locked,
            key_file: self.vault.key_path(),
            hosts,
            changes,
        })
    }
}

fn context(path: &Path, config: &DeploymentConfig, store: &Arc<dyn SecretStore>) -> PluginContext {
    PluginContext {
        root: path.to_path_buf(),
        deployment: config.name().to_string(),
        roles: config.roles().to_vec(),
        ansible_user: config.ansible_user().map(str::to_string),
        store: Arc::clone(store),
    }
}
