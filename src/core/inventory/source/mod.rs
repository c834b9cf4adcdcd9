//! Inventory sources.
//!
//! Each source produces a partial [`InventoryModel`] plus, optionally, the
//! deployment key and SSH keypair. The set of sources is closed; dispatch
//! is a plain `match`.

mod local;
mod provisioning;
mod secret_store;

use std::path::PathBuf;
use std::sync::Arc;

use crate::core::cipher::DeploymentKey;
use crate::core::config::PluginKind;
use crate::core::inventory::InventoryModel;
use crate::core::secret_store::SecretStore;
use crate::core::ssh::SshKeypair;
use crate::core::types::RoleName;
use crate::error::Result;

pub use local::LocalSource;
pub use provisioning::ProvisioningStateSource;
pub use secret_store::SecretStoreSource;

/// What a source contributes to the aggregate.
#[derive(Debug, Clone, Default)]
pub struct SourceOutput {
    pub model: InventoryModel,
    pub deployment_key: Option<DeploymentKey>,
    pub ssh_keypair: SshKeypair,
    /// Workspace files the source depends on, relative to the root.
    pub added_files: Vec<String>,
}

/// Everything a source or writer needs to know about the workspace.
#[derive(Clone)]
pub struct PluginContext {
    pub root: PathBuf,
    pub deployment: String,
    pub roles: Vec<RoleName>,
    pub ansible_user: Option<String>,
    pub store: Arc<dyn SecretStore>,
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext")
            .field("root", &self.root)
            .field("deployment", &self.deployment)
            .field("roles", &self.roles)
            .field("ansible_user", &self.ansible_user)
            .field("store", &self.store.name())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum InventorySource {
    Local(LocalSource),
    ProvisioningState(ProvisioningStateSource),
    SecretStore(SecretStoreSource),
}

impl InventorySource {
    pub fn from_kind(kind: PluginKind, ctx: &PluginContext) -> Self {
        match kind {
            PluginKind::Local => Self::Local(LocalSource::new(ctx)),
            PluginKind::ProvisioningState => {
                Self::ProvisioningState(ProvisioningStateSource::new(ctx))
            }
            PluginKind::SecretStore => Self::SecretStore(SecretStoreSource::new(ctx)),
        }
    }

    pub fn kind(&self) -> PluginKind {
        match self {
            Self::Local(_) => PluginKind::Local,
            Self::ProvisioningState(_) => PluginKind::ProvisioningState,
            Self::SecretStore(_) => PluginKind::SecretStore,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Read the source.
    pub fn produce(&self) -> Result<SourceOutput> {
        match self {
            Self::Local(source) => source.produce(),
            Self::ProvisioningState(source) => source.produce(),
            Self::SecretStore(source) => source.produce(),
        }
    }

    /// Files this source adds to the workspace, known without reading it.
    pub fn declared_added_files(&self) -> Vec<String> {
        match self {
            Self::Local(_) | Self::SecretStore(_) => Vec::new(),
            Self::ProvisioningState(source) => source.declared_added_files(),
        }
    }

    /// Contribution used when [`produce`](Self::produce) fails, if any.
    pub fn fallback(&self) -> Option<SourceOutput> {
        match self {
            Self::ProvisioningState(_) => Some(SourceOutput::default()),
            Self::Local(_) | Self::SecretStore(_) => None,
        }
    }
}
