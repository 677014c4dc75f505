//! In-process storage adapter
//!
//! Keeps values in a map for the lifetime of the process. Used by default
//! and in tests.

use async_trait::async_trait;
use park_core::error::AppError;
use park_core::traits::StorageAdapter;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::keys;

/// Map-backed storage adapter
///
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    namespace: String,
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of stored entries across all keys
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl StorageAdapter for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let key = keys::namespaced(&self.namespace, key);
        debug!("GET {}", key);
        Ok(self.entries.read().get(&key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let key = keys::namespaced(&self.namespace, key);
        debug!("SET {}", key);
        self.entries.write().insert(key, value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, AppError> {
        let key = keys::namespaced(&self.namespace, key);
        debug!("DEL {}", key);
        Ok(self.entries.write().remove(&key).is_some())
    }
}
