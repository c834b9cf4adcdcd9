//! External secret store as an inventory source.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::{PluginContext, SourceOutput};
use crate::core::cipher::DeploymentKey;
use crate::core::inventory::InventoryModel;
use crate::core::secret_store::{Layout, SecretStore};
use crate::core::ssh::SshKeypair;
use crate::core::types::RoleName;
use crate::error::Result;

#[derive(Clone)]
pub struct SecretStoreSource {
    store: Arc<dyn SecretStore>,
    layout: Layout,
    roles: Vec<RoleName>,
}

impl std::fmt::Debug for SecretStoreSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretStoreSource")
            .field("store", &self.store.name())
            .field("layout", &self.layout)
            .finish()
    }
}

impl SecretStoreSource {
    pub fn new(ctx: &PluginContext) -> Self {
        Self {
            store: Arc::clone(&ctx.store),
            layout: Layout::new(&ctx.deployment),
            roles: ctx.roles.clone(),
        }
    }

    pub(super) fn produce(&self) -> Result<SourceOutput> {
        let mut model = match self.store.read(&self.layout.hosts())? {
            Some(doc) => InventoryModel::from_hosts_document(&Value::Object(doc)),
            None => InventoryModel::default(),
        };

        let groups: BTreeSet<String> = model
            .groups
            .keys()
            .cloned()
            .chain(self.roles.iter().cloned())
            .chain(std::iter::once("all".to_string()))
            .collect();
        for group in groups {
            if let Some(vars) = self.store.read(&self.layout.group_vars(&group))? {
                model.group_vars.insert(group, vars);
            }
        }

        let hosts: Vec<String> = model.hosts.keys().cloned().collect();
        for host in hosts {
            if let Some(vars) = self.store.read(&self.layout.host_vars(&host))? {
                model.host_vars.insert(host, vars);
            }
        }

        let deployment_key = match self.store.read(&self.layout.deployment_key())? {
            Some(doc) => match doc.get("key").and_then(Value::as_str) {
                Some(key) => Some(DeploymentKey::parse(key)?),
                None => None,
            },
            None => None,
        };

        let ssh_keypair = match self.store.read(&self.layout.ssh())? {
            Some(doc) => serde_json::from_value(Value::Object(doc))?,
            None => SshKeypair::default(),
        };

        debug!(
            store = self.store.name(),
            hosts = model.hosts.len(),
            key = deployment_key.is_some(),
            "secret store source read"
        );
        Ok(SourceOutput {
            model,
            deployment_key,
            ssh_keypair,
            added_files: Vec::new(),
        })
    }
}
