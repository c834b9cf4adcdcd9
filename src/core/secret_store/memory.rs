//! In-process store, used when no external store is wanted and in tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use super::SecretStore;
use crate::core::types::Vars;
use crate::error::{Result, SecretStoreError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Vars>>,
    unavailable: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every call fails as unreachable.
    pub fn unavailable() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            unavailable: true,
        }
    }

    /// Stored paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.entries
            .lock()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Vars>>> {
        if self.unavailable {
            return Err(SecretStoreError::Unavailable("memory store offline".to_string()).into());
        }
        self.entries
            .lock()
            .map_err(|_| SecretStoreError::Unavailable("memory store poisoned".to_string()).into())
    }
}

impl SecretStore for MemoryStore {
    fn read(&self, path: &str) -> Result<Option<Vars>> {
        Ok(self.entries()?.get(path).cloned())
    }

    fn write(&self, path: &str, data: &Vars) -> Result<()> {
        self.entries()?.insert(path.to_string(), data.clone());
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<()> {
        self.entries()?.remove(path);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
