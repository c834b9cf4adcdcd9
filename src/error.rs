//! Error types.
//!
//! One enum per domain, folded into [`Error`] so every operation can return
//! the crate-wide [`Result`] and propagate with `?`.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error returned by all bunker operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    SecretStore(#[from] SecretStoreError),

    /// A required external program could not be launched.
    #[error("required program not found: {0}")]
    MissingBinary(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    /// A confirming operation ran without a terminal and without its flag.
    #[error("{0} needs confirmation but no terminal is attached")]
    ConfirmationRequired(&'static str),

    #[error("operation cancelled")]
    Cancelled,
}

/// Deployment manifest errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("deployment config ({0}) doesn't exist")]
    NotFound(PathBuf),

    #[error("failed to read deployment config: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse deployment config: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("failed to serialize deployment config: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("invalid inventory source override: {0}")]
    InvalidSourceOverride(String),

    #[error("deployment directory not initialized: {0}")]
    NotInitialized(PathBuf),
}

/// Version control errors.
#[derive(Error, Debug)]
pub enum RepoError {
    #[error("remote unavailable: {url}: {reason}")]
    RemoteUnavailable { url: String, reason: String },

    #[error("reference '{reference}' not found in {url}")]
    ReferenceNotFound { url: String, reference: String },

    #[error("no remote configured for {0}")]
    NoRemoteConfigured(PathBuf),

    #[error("not a repository: {0}")]
    NotARepo(PathBuf),

    #[error("working tree is dirty in {}: {}", path.display(), files.join(", "))]
    DirtyWorkingTree { path: PathBuf, files: Vec<String> },

    #[error("blob not found: {0}")]
    BlobNotFound(String),

    #[error("git {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },
}

/// Lock/unlock state machine errors.
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("deployment already locked")]
    AlreadyLocked,

    #[error("deployment already unlocked")]
    AlreadyUnlocked,

    #[error("verification of encrypted deployment failed: expected {expected}, found {actual}")]
    IntegrityVerificationFailed { expected: String, actual: String },

    #[error("{0} requires a locked deployment")]
    RequiresLock(&'static str),

    #[error("{0} requires an unlocked deployment")]
    RequiresUnlock(&'static str),

    #[error("deployment key missing: {0}")]
    MissingKey(PathBuf),

    #[error("encrypted archive missing: {0}")]
    MissingArchive(PathBuf),

    #[error("invalid archive entry: {0}")]
    InvalidEntry(PathBuf),
}

/// Encryption and key errors.
#[derive(Error, Debug)]
pub enum CipherError {
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("failed to read key file: {0}")]
    ReadFailed(#[source] std::io::Error),

    #[error("failed to write key file: {0}")]
    WriteFailed(#[source] std::io::Error),
}

/// Inventory aggregation errors.
#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("operation '{operation}' not supported by plugin ({plugin})")]
    CapabilityUnsupported {
        plugin: &'static str,
        operation: &'static str,
    },

    #[error("invalid provisioning state {}: {reason}", path.display())]
    ProvisioningState { path: PathBuf, reason: String },

    #[error("invalid inventory file {}: {reason}", path.display())]
    InvalidFile { path: PathBuf, reason: String },

    #[error("no inventory writers configured")]
    NoWriters,

    #[error("host not in inventory: {0}")]
    UnknownHost(String),

    #[error("ssh keypair error: {0}")]
    SshKeypair(String),
}

/// External secret store errors.
#[derive(Error, Debug)]
pub enum SecretStoreError {
    #[error("secret store unavailable: {0}")]
    Unavailable(String),

    #[error("unexpected secret store response for {path}: {reason}")]
    InvalidResponse { path: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
