//! Deployment manifest.
//!
//! Reads and writes `deployment.json`. The loaded [`DeploymentConfig`] is an
//! immutable value; changes go through the consuming `with_*` methods.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::types::RoleName;
use crate::error::{ConfigError, Result};

/// Remote repository location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfig {
    /// Clonable url or path.
    #[serde(alias = "repo")]
    pub url: String,
    /// Branch to check out.
    #[serde(alias = "branch")]
    pub reference: String,
}

impl RepoConfig {
    pub fn new(url: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reference: reference.into(),
        }
    }
}

impl std::fmt::Display for RepoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.url, self.reference)
    }
}

/// Inventory plugin names accepted in the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginKind {
    /// Files in the workspace itself.
    Local,
    /// Provisioning tool state file.
    #[serde(alias = "terraform")]
    ProvisioningState,
    /// External key/value secret store.
    #[serde(alias = "vault")]
    SecretStore,
}

impl PluginKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::ProvisioningState => "provisioning_state",
            Self::SecretStore => "secret_store",
        }
    }
}

impl std::str::FromStr for PluginKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "provisioning_state" | "terraform" => Ok(Self::ProvisioningState),
            "secret_store" | "vault" => Ok(Self::SecretStore),
            other => Err(ConfigError::InvalidValue {
                field: "inventory plugin",
                reason: format!("unknown plugin '{}'", other),
            }),
        }
    }
}

impl std::fmt::Display for PluginKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Deployment configuration stored in `deployment.json`.
///
/// Inventory sources are queried in the order given; later sources take
/// precedence over earlier ones. Writers persist the merged inventory
/// elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    name: String,
    #[serde(default)]
    roles: Vec<RoleName>,
    #[serde(alias = "rolesRepoRef", alias = "roles_src")]
    roles_repo: RepoConfig,
    #[serde(
        default,
        alias = "deploymentRepoRef",
        skip_serializing_if = "Option::is_none"
    )]
    deployment_repo: Option<RepoConfig>,
    #[serde(default, alias = "inventorySources")]
    inventory_sources: Vec<PluginKind>,
    #[serde(default, alias = "inventoryWriters")]
    inventory_writers: Vec<PluginKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ansible_user: Option<String>,
}

impl DeploymentConfig {
    pub fn new(name: impl Into<String>, roles_repo: RepoConfig) -> Self {
        Self {
            name: name.into(),
            roles: Vec::new(),
            roles_repo,
            deployment_repo: None,
            inventory_sources: Vec::new(),
            inventory_writers: Vec::new(),
            ansible_user: None,
        }
    }

    /// Load the manifest.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the file doesn't exist, or
    /// `ConfigError::Parse` if the JSON is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading config");

        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()).into());
        }
        let contents = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let config: Self = serde_json::from_str(&contents).map_err(ConfigError::Parse)?;
        config.validate()?;

        debug!(
            name = %config.name,
            roles = config.roles.len(),
            sources = config.inventory_sources.len(),
            "config loaded"
        );
        Ok(config)
    }

    /// Write the manifest as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        debug!(path = %path.display(), "saving config");
        let contents = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, format!("{}\n", contents))?;
        Ok(())
    }

    /// Validate the manifest contents.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "name",
                reason: "must not be empty".to_string(),
            }
            .into());
        }
        if self.name.contains('/') {
            return Err(ConfigError::InvalidValue {
                field: "name",
                reason: format!("'{}' must not contain '/'", self.name),
            }
            .into());
        }
        for role in &self.roles {
            if role.is_empty() || role.contains('/') || role.starts_with('.') {
                return Err(ConfigError::InvalidValue {
                    field: "roles",
                    reason: format!("invalid role name '{}'", role),
                }
                .into());
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn roles(&self) -> &[RoleName] {
        &self.roles
    }

    pub fn roles_repo(&self) -> &RepoConfig {
        &self.roles_repo
    }

    pub fn deployment_repo(&self) -> Option<&RepoConfig> {
        self.deployment_repo.as_ref()
    }

    pub fn inventory_sources(&self) -> &[PluginKind] {
        &self.inventory_sources
    }

    pub fn inventory_writers(&self) -> &[PluginKind] {
        &self.inventory_writers
    }

    pub fn ansible_user(&self) -> Option<&str> {
        self.ansible_user.as_deref()
    }

    pub fn with_roles(self, roles: Vec<RoleName>) -> Self {
        Self { roles, ..self }
    }

    pub fn with_deployment_repo(self, deployment_repo: Option<RepoConfig>) -> Self {
        Self {
            deployment_repo,
            ..self
        }
    }

    pub fn with_inventory_sources(self, inventory_sources: Vec<PluginKind>) -> Self {
        Self {
            inventory_sources,
            ..self
        }
    }

    pub fn with_inventory_writers(self, inventory_writers: Vec<PluginKind>) -> Self {
        Self {
            inventory_writers,
            ..self
        }
    }

    pub fn with_ansible_user(self, ansible_user: Option<String>) -> Self {
        Self {
            ansible_user,
            ..self
        }
    }
}
