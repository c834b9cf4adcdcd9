//! Inventory writers.
//!
//! Writers mirror the merged inventory, and optionally the deployment key
//! and SSH keypair, into an external system. Only the secret store can be
//! written to.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info};

use super::source::PluginContext;
use super::InventoryModel;
use crate::core::cipher::DeploymentKey;
use crate::core::config::PluginKind;
use crate::core::secret_store::{Layout, SecretStore};
use crate::core::ssh::SshKeypair;
use crate::core::types::Vars;
use crate::error::{InventoryError, Result};

#[derive(Debug, Clone)]
pub enum InventoryWriter {
    SecretStore(SecretStoreWriter),
}

impl InventoryWriter {
    /// Build the writer for `kind`.
    ///
    /// # Errors
    ///
    /// `InventoryError::CapabilityUnsupported` for plugins that cannot write.
    pub fn from_kind(kind: PluginKind, ctx: &PluginContext) -> Result<Self> {
        match kind {
            PluginKind::SecretStore => Ok(Self::SecretStore(SecretStoreWriter::new(ctx))),
            PluginKind::Local | PluginKind::ProvisioningState => {
                Err(InventoryError::CapabilityUnsupported {
                    plugin: kind.name(),
                    operation: "write",
                }
                .into())
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SecretStore(_) => PluginKind::SecretStore.name(),
        }
    }

    /// Mirror `model`, plus the key and keypair when given.
    pub fn persist(
        &self,
        model: &InventoryModel,
        key: Option<&DeploymentKey>,
        ssh: Option<&SshKeypair>,
    ) -> Result<()> {
        match self {
            Self::SecretStore(writer) => writer.persist(model, key, ssh),
        }
    }

    /// Remove everything [`persist`](Self::persist) may have written for `model`.
    pub fn delete(&self, model: &InventoryModel) -> Result<()> {
        match self {
            Self::SecretStore(writer) => writer.delete(model),
        }
    }
}

#[derive(Clone)]
pub struct SecretStoreWriter {
    store: Arc<dyn SecretStore>,
    layout: Layout,
}

impl std::fmt::Debug for SecretStoreWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretStoreWriter")
            .field("store", &self.store.name())
            .field("layout", &self.layout)
            .finish()
    }
}

impl SecretStoreWriter {
    pub fn new(ctx: &PluginContext) -> Self {
        Self {
            store: Arc::clone(&ctx.store),
            layout: Layout::new(&ctx.deployment),
        }
    }

    fn persist(
        &self,
        model: &InventoryModel,
        key: Option<&DeploymentKey>,
        ssh: Option<&SshKeypair>,
    ) -> Result<()> {
        self.store
            .write(&self.layout.hosts(), &object(model.hosts_document()))?;
        for (group, vars) in &model.group_vars {
            self.store.write(&self.layout.group_vars(group), vars)?;
        }
        for (host, vars) in &model.host_vars {
            self.store.write(&self.layout.host_vars(host), vars)?;
        }

        if let Some(key) = key {
            self.store
                .write(&self.layout.deployment_key(), &object(json!({ "key": key.expose() })))?;
        }
        if let Some(ssh) = ssh.filter(|s| s.is_complete()) {
            self.store
                .write(&self.layout.ssh(), &object(serde_json::to_value(ssh)?))?;
        }

        info!(
            store = self.store.name(),
            hosts = model.hosts.len(),
            key = key.is_some(),
            "inventory persisted"
        );
        Ok(())
    }

    fn delete(&self, model: &InventoryModel) -> Result<()> {
        let mut paths = vec![
            self.layout.hosts(),
            self.layout.deployment_key(),
            self.layout.ssh(),
        ];
        paths.extend(model.group_vars.keys().map(|g| self.layout.group_vars(g)));
        paths.extend(model.host_vars.keys().map(|h| self.layout.host_vars(h)));
        for path in &paths {
            self.store.delete(path)?;
        }
        debug!(store = self.store.name(), paths = paths.len(), "inventory purged");
        Ok(())
    }
}

fn object(value: Value) -> Vars {
    match value {
        Value::Object(map) => map,
        _ => Vars::new(),
    }
}
