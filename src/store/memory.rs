//! In-memory artifact store.

use super::{ArtifactStore, StoreKey};
use anyhow::Result;
use dashmap::DashMap;

/// `DashMap`-backed [`ArtifactStore`].
///
/// Contents live as long as the value does. Useful for tests and for
/// sessions that should not leave anything on disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<StoreKey, Vec<u8>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries across all namespaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ArtifactStore for MemoryStore {
    async fn get(&self, key: &StoreKey) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &StoreKey, value: Vec<u8>) -> Result<()> {
        self.entries.insert(key.clone(), value);
        Ok(())
    }

    async fn has(&self, key: &StoreKey) -> Result<bool> {
        Ok(self.entries.contains_key(key))
    }

    async fn remove(&self, key: &StoreKey) -> Result<bool> {
        Ok(self.entries.remove(key).is_some())
    }
}
