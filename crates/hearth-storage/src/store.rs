//! The store trait and typed record helpers.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as Json;

use crate::error::{StorageError, StorageResult};

/// Well-known namespaces used by the core.
pub mod namespaces {
    /// One record per configured thing.
    pub const THINGS: &str = "things";
    /// One record per rule.
    pub const RULES: &str = "rules";
    /// Engine bookkeeping (last observed tick).
    pub const ENGINE: &str = "engine";
}

/// Grouped-record persistence.
///
/// Records are JSON documents addressed by `(namespace, key)`. A `put` is
/// atomic at the record level: after a crash either the old or the new
/// document is observed, never a torn write. Keys are restricted to
/// `[a-z0-9_-]` so ids map straight onto file names.
#[async_trait]
pub trait Store: Send + Sync {
    /// Write (or replace) one record.
    async fn put(&self, namespace: &str, key: &str, record: Json) -> StorageResult<()>;

    /// Read one record, `None` if absent.
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Json>>;

    /// Delete one record. Deleting an absent record is not an error.
    async fn remove(&self, namespace: &str, key: &str) -> StorageResult<()>;

    /// All records in a namespace, as `(key, record)` pairs.
    async fn list(&self, namespace: &str) -> StorageResult<Vec<(String, Json)>>;

    /// Delete every record in a namespace.
    async fn clear(&self, namespace: &str) -> StorageResult<()>;
}

/// Serialize a typed record and store it.
///
/// # Errors
///
/// Propagates serialization and store errors.
pub async fn put_record<T: Serialize + Sync>(
    store: &dyn Store,
    namespace: &str,
    key: &str,
    record: &T,
) -> StorageResult<()> {
    let json = serde_json::to_value(record)?;
    store.put(namespace, key, json).await
}

/// Load a typed record, `None` if absent.
///
/// # Errors
///
/// Propagates deserialization and store errors.
pub async fn get_record<T: DeserializeOwned>(
    store: &dyn Store,
    namespace: &str,
    key: &str,
) -> StorageResult<Option<T>> {
    match store.get(namespace, key).await? {
        Some(json) => Ok(Some(serde_json::from_value(json)?)),
        None => Ok(None),
    }
}

/// Load every typed record in a namespace.
///
/// # Errors
///
/// Propagates deserialization and store errors.
pub async fn list_records<T: DeserializeOwned>(
    store: &dyn Store,
    namespace: &str,
) -> StorageResult<Vec<(String, T)>> {
    store
        .list(namespace)
        .await?
        .into_iter()
        .map(|(key, json)| Ok((key, serde_json::from_value(json)?)))
        .collect()
}

pub(crate) fn validate_segment(segment: &str) -> StorageResult<()> {
    let ok = !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(segment.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_validation() {
        assert!(validate_segment("things").is_ok());
        assert!(validate_segment("0d4f53c2-8f7a-4b9e-9c3d-1a2b3c4d5e6f").is_ok());
        assert!(validate_segment("last_tick").is_ok());
        assert!(validate_segment("").is_err());
        assert!(validate_segment("../escape").is_err());
        assert!(validate_segment("UPPER").is_err());
        assert!(validate_segment("with space").is_err());
    }
}
