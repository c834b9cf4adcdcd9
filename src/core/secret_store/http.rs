//! Key/value version 2 store over HTTP.
//!
//! Connection settings come from the environment:
//! `VAULT_ADDR`, `VAULT_TOKEN`, and optionally `BUNKER_SECRET_MOUNT`
//! (default `secret`) and `BUNKER_SECRET_PREFIX` (default `bunker`).
//! Missing settings are reported when the store is first used, so
//! workspaces that never touch the store need no configuration.

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::{debug, trace};

use super::SecretStore;
use crate::core::constants;
use crate::core::types::Vars;
use crate::error::{Result, SecretStoreError};

const TOKEN_HEADER: &str = "X-Vault-Token";
const DEFAULT_MOUNT: &str = "secret";
const DEFAULT_PREFIX: &str = "bunker";

pub struct HttpKvStore {
    client: Client,
    address: Option<String>,
    token: Option<String>,
    mount: String,
    prefix: String,
}

impl std::fmt::Debug for HttpKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpKvStore")
            .field("address", &self.address)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("mount", &self.mount)
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl HttpKvStore {
    pub fn new(address: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            address: Some(address.into()),
            token: Some(token.into()),
            mount: DEFAULT_MOUNT.to_string(),
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }

    /// Build from `VAULT_ADDR`, `VAULT_TOKEN` and the bunker overrides.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            client: Client::new(),
            address: var("VAULT_ADDR"),
            token: var("VAULT_TOKEN"),
            mount: var(constants::SECRET_MOUNT_ENV).unwrap_or_else(|| DEFAULT_MOUNT.to_string()),
            prefix: var(constants::SECRET_PREFIX_ENV)
                .unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
        }
    }

    pub fn with_mount(mut self, mount: impl Into<String>) -> Self {
        self.mount = mount.into();
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn endpoint(&self, kind: &str, path: &str) -> Result<String> {
        let address = self
            .address
            .as_deref()
            .ok_or_else(|| SecretStoreError::Unavailable("VAULT_ADDR not set".to_string()))?;
        Ok(format!(
            "{}/v1/{}/{}/{}/{}",
            address.trim_end_matches('/'),
            self.mount.trim_matches('/'),
            kind,
            self.prefix.trim_matches('/'),
            path.trim_start_matches('/')
        ))
    }

    fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| SecretStoreError::Unavailable("VAULT_TOKEN not set".to_string()).into())
    }

    fn send(&self, request: reqwest::blocking::RequestBuilder) -> Result<Response> {
        let response = request
            .header(TOKEN_HEADER, self.token()?)
            .send()
            .map_err(|e| SecretStoreError::Unavailable(e.to_string()))?;
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(SecretStoreError::Unavailable("authentication rejected".to_string()).into())
            }
            _ => Ok(response),
        }
    }
}

impl SecretStore for HttpKvStore {
    fn read(&self, path: &str) -> Result<Option<Vars>> {
        let url = self.endpoint("data", path)?;
        trace!(path, "secret store read");
        let response = self.send(self.client.get(&url))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(path, "no secret stored");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SecretStoreError::InvalidResponse {
                path: path.to_string(),
                reason: format!("status {}", status.as_u16()),
            }
            .into());
        }

        let body: Value = response.json().map_err(|e| SecretStoreError::InvalidResponse {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        match body.pointer("/data/data") {
            Some(Value::Object(data)) => Ok(Some(data.clone())),
            Some(Value::Null) | None => Ok(None),
            Some(_) => Err(SecretStoreError::InvalidResponse {
                path: path.to_string(),
                reason: "data is not a mapping".to_string(),
            }
            .into()),
        }
    }

    fn write(&self, path: &str, data: &Vars) -> Result<()> {
        let url = self.endpoint("data", path)?;
        trace!(path, "secret store write");
        let response = self.send(self.client.post(&url).json(&json!({ "data": data })))?;
        if !response.status().is_success() {
            return Err(SecretStoreError::InvalidResponse {
                path: path.to_string(),
                reason: format!("status {}", response.status().as_u16()),
            }
            .into());
        }
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<()> {
        let url = self.endpoint("metadata", path)?;
        trace!(path, "secret store delete");
        let response = self.send(self.client.delete(&url))?;
        let status = response.status();
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            return Err(SecretStoreError::InvalidResponse {
                path: path.to_string(),
                reason: format!("status {}", status.as_u16()),
            }
            .into());
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "kv"
    }
}
