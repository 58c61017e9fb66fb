//! File-backed store: one JSON document per record.
//!
//! Layout: `{data_dir}/{namespace}/{key}.json`. Writes go through a temp
//! file in the same directory followed by a rename, so a crash mid-write
//! leaves the previous document intact. Persisted plugin configuration may
//! contain secrets: files are created `0o600`, directories `0o700`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use serde_json::Value as Json;
use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};
use crate::store::{Store, validate_segment};

const LOG: &str = "storage";

/// A [`Store`] persisting records under a data directory.
///
/// Holds an exclusive lock on the directory for its lifetime so two daemon
/// instances cannot share one data dir.
#[derive(Debug)]
pub struct FileStore {
    data_dir: PathBuf,
    // Held for the lifetime of the store; the lock releases on drop.
    _lock: fs::File,
}

impl FileStore {
    /// Open (creating if needed) a store at the given directory.
    ///
    /// # Errors
    ///
    /// [`StorageError::Locked`] when another instance holds the directory,
    /// or an I/O error when the directory cannot be created.
    pub fn open(data_dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let data_dir = data_dir.into();
        create_private_dir(&data_dir)?;

        let lock_path = data_dir.join(".lock");
        let lock = fs::File::create(&lock_path)?;
        lock.try_lock_exclusive()
            .map_err(|_| StorageError::Locked(data_dir.display().to_string()))?;

        debug!(target: LOG, dir = %data_dir.display(), "opened file store");
        Ok(Self {
            data_dir,
            _lock: lock,
        })
    }

    /// The directory this store persists into.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn namespace_dir(&self, namespace: &str) -> StorageResult<PathBuf> {
        validate_segment(namespace)?;
        Ok(self.data_dir.join(namespace))
    }

    fn record_path(&self, namespace: &str, key: &str) -> StorageResult<PathBuf> {
        validate_segment(key)?;
        Ok(self.namespace_dir(namespace)?.join(format!("{key}.json")))
    }
}

#[async_trait]
impl Store for FileStore {
    async fn put(&self, namespace: &str, key: &str, record: Json) -> StorageResult<()> {
        let dir = self.namespace_dir(namespace)?;
        let path = self.record_path(namespace, key)?;
        let bytes = serde_json::to_vec_pretty(&record)?;
        tokio::task::spawn_blocking(move || write_atomic(&dir, &path, &bytes))
            .await
            .map_err(|e| StorageError::Io(std::io::Error::other(e)))?
    }

    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Json>> {
        let path = self.record_path(namespace, key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, namespace: &str, key: &str) -> StorageResult<()> {
        let path = self.record_path(namespace, key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, namespace: &str) -> StorageResult<Vec<(String, Json)>> {
        let dir = self.namespace_dir(namespace)?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let Some(key) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix(".json"))
            else {
                continue;
            };
            match fs::read(&path).map_err(StorageError::from).and_then(|bytes| {
                serde_json::from_slice::<Json>(&bytes).map_err(StorageError::from)
            }) {
                Ok(json) => records.push((key.to_string(), json)),
                Err(e) => {
                    warn!(target: LOG, path = %path.display(), error = %e, "skipping unreadable record");
                },
            }
        }
        records.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(records)
    }

    async fn clear(&self, namespace: &str) -> StorageResult<()> {
        let dir = self.namespace_dir(namespace)?;
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn create_private_dir(dir: &Path) -> StorageResult<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true).mode(0o700);
        builder.create(dir)?;
    }
    #[cfg(not(unix))]
    {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> StorageResult<()> {
    create_private_dir(dir)?;
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.flush()?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(temp.path(), fs::Permissions::from_mode(0o600))?;
    }
    temp.persist(path)
        .map_err(|e| StorageError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{get_record, put_record};
    use serde_json::json;

    #[tokio::test]
    async fn test_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("data")).unwrap();

        store
            .put("things", "abc-123", json!({"name": "lamp", "power": true}))
            .await
            .unwrap();
        assert_eq!(
            store.get("things", "abc-123").await.unwrap(),
            Some(json!({"name": "lamp", "power": true}))
        );

        let listed = store.list("things").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].0, "abc-123");
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data");
        {
            let store = FileStore::open(&path).unwrap();
            store.put("rules", "r1", json!({"enabled": true})).await.unwrap();
        }
        let store = FileStore::open(&path).unwrap();
        assert_eq!(
            store.get("rules", "r1").await.unwrap(),
            Some(json!({"enabled": true}))
        );
    }

    #[tokio::test]
    async fn test_second_instance_is_locked_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data");
        let _first = FileStore::open(&path).unwrap();
        assert!(matches!(
            FileStore::open(&path),
            Err(StorageError::Locked(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_absent_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("data")).unwrap();
        store.remove("things", "never-there").await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data");
        let store = FileStore::open(&path).unwrap();
        store.put("things", "secret", json!({"token": "hunter2"})).await.unwrap();

        let dir_mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(dir_mode, 0o700);
        let file_mode = fs::metadata(path.join("things/secret.json"))
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(file_mode, 0o600);
    }

    #[tokio::test]
    async fn test_typed_helpers() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Record {
            name: String,
        }

        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("data")).unwrap();
        let record = Record {
            name: "lamp".into(),
        };
        put_record(&store, "things", "t1", &record).await.unwrap();
        let loaded: Option<Record> = get_record(&store, "things", "t1").await.unwrap();
        assert_eq!(loaded, Some(record));
    }
}
