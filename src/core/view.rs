//! Typed presentation of a workspace for `show` and `status`.

use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;

use crate::core::inventory::InventoryModel;
use crate::core::repo::ChangeSet;
use crate::core::types::{HostName, RoleName, Vars};

/// Connection details of one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostView {
    pub name: HostName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ansible_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ansible_user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ansible_port: Option<String>,
}

impl HostView {
    /// Pick the connection variables out of a host's effective facts.
    pub fn from_facts(name: &str, facts: &Vars) -> Self {
        let field = |key: &str| {
            facts.get(key).and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
        };
        Self {
            name: name.to_string(),
            ansible_host: field("ansible_host"),
            ansible_user: field("ansible_user"),
            ansible_port: field("ansible_port"),
        }
    }

    /// Every host of `model` in name order.
    pub fn all(model: &InventoryModel) -> Vec<Self> {
        model
            .hosts
            .keys()
            .filter_map(|host| model.host_facts(host).map(|f| Self::from_facts(host, &f)))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceView {
    pub name: String,
    pub path: PathBuf,
    pub roles: Vec<RoleName>,
    pub roles_repo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_repo: Option<String>,
    pub locked: bool,
    pub key_file: PathBuf,
    pub hosts: Vec<HostView>,
    /// `None` while locked: the deployment repository is sealed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<ChangeSet>,
}
