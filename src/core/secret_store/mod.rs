//! External key/value secret store.
//!
//! Inventory data, the deployment key and the SSH keypair can be mirrored
//! into a path-addressed store. Everything for one deployment lives below
//! `<prefix>/<deployment>/`:
//!
//! ```text
//! hosts                 inventory hosts document
//! group_vars/<group>    group variables
//! host_vars/<host>      host variables
//! deployment_key        {"key": "AGE-SECRET-KEY-..."}
//! ssh                   {"public_key": "...", "private_key": "..."}
//! ```
//!
//! Implementations must never log or format secret values.

mod http;
mod memory;

use crate::core::types::Vars;
use crate::error::Result;

pub use http::HttpKvStore;
pub use memory::MemoryStore;

/// Path-addressed key/value store.
pub trait SecretStore: Send + Sync {
    /// Read the document at `path`, `None` if nothing is stored there.
    ///
    /// # Errors
    ///
    /// `SecretStoreError::Unavailable` for connection or auth failures.
    fn read(&self, path: &str) -> Result<Option<Vars>>;

    /// Create or replace the document at `path`.
    fn write(&self, path: &str, data: &Vars) -> Result<()>;

    /// Remove the document at `path`. Missing paths are not an error.
    fn delete(&self, path: &str) -> Result<()>;

    /// Store name for display.
    fn name(&self) -> &'static str;
}

/// Paths of one deployment's documents.
#[derive(Debug, Clone)]
pub struct Layout {
    base: String,
}

impl Layout {
    pub fn new(deployment: &str) -> Self {
        Self {
            base: deployment.trim_matches('/').to_string(),
        }
    }

    pub fn hosts(&self) -> String {
        format!("{}/hosts", self.base)
    }

    pub fn group_vars(&self, group: &str) -> String {
        format!("{}/group_vars/{}", self.base, group)
    }

    pub fn host_vars(&self, host: &str) -> String {
        format!("{}/host_vars/{}", self.base, host)
    }

    pub fn deployment_key(&self) -> String {
        format!("{}/deployment_key", self.base)
    }

    pub fn ssh(&self) -> String {
        format!("{}/ssh", self.base)
    }
}
