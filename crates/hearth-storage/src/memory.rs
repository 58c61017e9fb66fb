//! In-memory store for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value as Json;
use tokio::sync::RwLock;

use crate::error::StorageResult;
use crate::store::{Store, validate_segment};

/// A [`Store`] kept entirely in memory. Contents die with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, HashMap<String, Json>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn put(&self, namespace: &str, key: &str, record: Json) -> StorageResult<()> {
        validate_segment(namespace)?;
        validate_segment(key)?;
        self.records
            .write()
            .await
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), record);
        Ok(())
    }

    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Json>> {
        validate_segment(namespace)?;
        validate_segment(key)?;
        Ok(self
            .records
            .read()
            .await
            .get(namespace)
            .and_then(|ns| ns.get(key))
            .cloned())
    }

    async fn remove(&self, namespace: &str, key: &str) -> StorageResult<()> {
        validate_segment(namespace)?;
        validate_segment(key)?;
        if let Some(ns) = self.records.write().await.get_mut(namespace) {
            ns.remove(key);
        }
        Ok(())
    }

    async fn list(&self, namespace: &str) -> StorageResult<Vec<(String, Json)>> {
        validate_segment(namespace)?;
        Ok(self
            .records
            .read()
            .await
            .get(namespace)
            .map(|ns| ns.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    async fn clear(&self, namespace: &str) -> StorageResult<()> {
        validate_segment(namespace)?;
        self.records.write().await.remove(namespace);
        Ok(())
    }
}
