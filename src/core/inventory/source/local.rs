//! Workspace files as an inventory source.

use std::path::PathBuf;

use tracing::debug;

use super::{PluginContext, SourceOutput};
use crate::core::cipher::DeploymentKey;
use crate::core::constants;
use crate::core::inventory::InventoryModel;
use crate::core::ssh::SshKeypair;
use crate::core::types::RoleName;
use crate::error::Result;

/// Reads `hosts.yml`, the variable directories, the key file and `.ssh/`.
#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
    roles: Vec<RoleName>,
}

impl LocalSource {
    pub fn new(ctx: &PluginContext) -> Self {
        Self {
            root: ctx.root.clone(),
            roles: ctx.roles.clone(),
        }
    }

    pub(super) fn produce(&self) -> Result<SourceOutput> {
        let mut model = InventoryModel::skeleton(&self.roles);
        model.merge(InventoryModel::load(&self.root)?);

        let key_path = self.root.join(constants::KEY_FILE);
        let deployment_key = if key_path.exists() {
            Some(DeploymentKey::load(&key_path)?)
        } else {
            None
        };
        let ssh_keypair = SshKeypair::read(&self.root.join(constants::SSH_DIR))?;

        debug!(
            hosts = model.hosts.len(),
            key = deployment_key.is_some(),
            ssh = ssh_keypair.is_complete(),
            "local source read"
        );
        Ok(SourceOutput {
            model,
            deployment_key,
            ssh_keypair,
            added_files: Vec::new(),
        })
    }
}
