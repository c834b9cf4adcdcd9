//! Provisioning tool state as an inventory source.
//!
//! Reads `terraform.tfstate` and turns supported server resources into
//! hosts of the deployment group.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{PluginContext, SourceOutput};
use crate::core::constants;
use crate::core::inventory::InventoryModel;
use crate::core::types::Vars;
use crate::error::{InventoryError, Result};

/// Login used for the first connection to a fresh server.
const BOOTSTRAP_USER: &str = "root";

#[derive(Debug, Deserialize)]
struct StateFile {
    #[serde(default)]
    resources: Vec<Resource>,
}

#[derive(Debug, Deserialize)]
struct Resource {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    instances: Vec<Instance>,
}

#[derive(Debug, Deserialize)]
struct Instance {
    #[serde(default)]
    attributes: Vars,
}

/// Resource types the source understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServerKind {
    Hcloud,
}

impl ServerKind {
    fn from_type(kind: &str) -> Option<Self> {
        match kind {
            "hcloud_server" => Some(Self::Hcloud),
            _ => None,
        }
    }

    /// Host name and connection address of one instance.
    fn host(&self, attributes: &Vars) -> Option<(String, String)> {
        match self {
            Self::Hcloud => {
                let name = attributes.get("name")?.as_str()?;
                let address = attributes.get("ipv4_address")?.as_str()?;
                Some((name.to_string(), address.to_string()))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProvisioningStateSource {
    root: PathBuf,
    state_file: String,
    ansible_user: Option<String>,
}

impl ProvisioningStateSource {
    pub fn new(ctx: &PluginContext) -> Self {
        Self {
            root: ctx.root.clone(),
            state_file: constants::PROVISIONING_STATE_FILE.to_string(),
            ansible_user: ctx.ansible_user.clone(),
        }
    }

    pub(super) fn declared_added_files(&self) -> Vec<String> {
        vec![self.state_file.clone()]
    }

    pub(super) fn produce(&self) -> Result<SourceOutput> {
        let path = self.root.join(&self.state_file);
        let model = parse_state(&path, self.ansible_user.as_deref())?;
        debug!(hosts = model.hosts.len(), path = %path.display(), "provisioning state read");
        Ok(SourceOutput {
            model,
            added_files: self.declared_added_files(),
            ..SourceOutput::default()
        })
    }
}

fn parse_state(path: &Path, ansible_user: Option<&str>) -> Result<InventoryModel> {
    let invalid = |reason: String| InventoryError::ProvisioningState {
        path: path.to_path_buf(),
        reason,
    };
    if !path.exists() {
        return Err(invalid("does not exist".to_string()).into());
    }
    let contents = fs::read_to_string(path)?;
    let state: StateFile = serde_json::from_str(&contents).map_err(|e| invalid(e.to_string()))?;

    let mut model = InventoryModel::default();
    for resource in state.resources {
        let Some(kind) = ServerKind::from_type(&resource.kind) else {
            continue;
        };
        for instance in resource.instances {
            let Some((name, address)) = kind.host(&instance.attributes) else {
                warn!(resource = %resource.kind, "instance without name or address skipped");
                continue;
            };
            let mut vars = instance.attributes;
            vars.insert("ansible_host".to_string(), Value::String(address));
            vars.insert("bootstrap_user".to_string(), Value::String(BOOTSTRAP_USER.to_string()));
            if let Some(user) = ansible_user {
                vars.insert("ansible_user".to_string(), Value::String(user.to_string()));
            }
            model.add_host(&name, Some(constants::DEPLOYMENT_GROUP));
            model.host_vars.insert(name, vars);
        }
    }
    Ok(model)
}
