//! Rendered workspace files: the playbook and the runner configuration.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::core::constants;
use crate::core::types::RoleName;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Play {
    pub name: String,
    pub hosts: String,
    pub roles: Vec<PlayRole>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayRole {
    pub role: RoleName,
    /// Tagged with the role name so runs can be narrowed to one role.
    pub tags: Vec<String>,
}

/// Single play applying every role to `hosts`.
pub fn render_playbook(name: &str, hosts: &str, roles: &[RoleName]) -> Result<String> {
    let play = Play {
        name: name.to_string(),
        hosts: hosts.to_string(),
        roles: roles
            .iter()
            .map(|role| PlayRole {
                role: role.clone(),
                tags: vec![role.clone()],
            })
            .collect(),
    };
    Ok(serde_yaml_ng::to_string(&vec![play])?)
}

pub fn write_playbook(root: &Path, name: &str, roles: &[RoleName]) -> Result<()> {
    let path = root.join(constants::PLAYBOOK_FILE);
    fs::write(&path, render_playbook(name, "all", roles)?)?;
    debug!(path = %path.display(), roles = roles.len(), "playbook written");
    Ok(())
}

pub fn render_runner_config() -> String {
    let mut config = constants::RUNNER_CONFIG.join("\n");
    config.push('\n');
    config
}

pub fn write_runner_config(root: &Path) -> Result<()> {
    let path = root.join(constants::RUNNER_CONFIG_FILE);
    fs::write(&path, render_runner_config())?;
    debug!(path = %path.display(), "runner config written");
    Ok(())
}
