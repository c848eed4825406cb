use crate::{KeyValueStore, StorageError, StorageResult};
use std::path::Path;

/// Embedded `sled` database store
#[derive(Debug, Clone)]
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Open (or create) a database at `path`
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Temporary database, removed when dropped
    pub fn temporary() -> StorageResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }
}

#[async_trait::async_trait]
impl KeyValueStore for SledStore {
    fn name(&self) -> &str {
        "sled"
    }

    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        match self.db.get(key.as_bytes())? {
            Some(bytes) => String::from_utf8(bytes.to_vec())
                .map(Some)
                .map_err(|e| StorageError::Corrupt {
                    key: key.to_string(),
                    message: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        let previous = self.db.insert(key.as_bytes(), value.as_bytes())?;
        if let Err(e) = self.db.flush_async().await {
            if let Err(restore_err) = self.restore(key, previous) {
                tracing::warn!(
                    key,
                    error = %restore_err,
                    "Could not restore previous value after failed flush"
                );
            }
            return Err(e.into());
        }
        Ok(())
    }
}

impl SledStore {
    /// Put back whatever `insert` replaced (or drop the key if it was new)
    fn restore(&self, key: &str, previous: Option<sled::IVec>) -> sled::Result<()> {
        match previous {
            Some(value) => self.db.insert(key.as_bytes(), value).map(drop),
            None => self.db.remove(key.as_bytes()).map(drop),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_temporary_roundtrip() {
        let store = SledStore::temporary().unwrap();
        assert_eq!(store.get("config").await.unwrap(), None);
        store.set("config", "sealed").await.unwrap();
        assert_eq!(store.get("config").await.unwrap().as_deref(), Some("sealed"));
    }

    #[tokio::test]
    async fn test_restore_undoes_unflushed_insert() {
        let store = SledStore::temporary().unwrap();
        store.set("config", "v1").await.unwrap();

        let previous = store.db.insert("config".as_bytes(), "v2".as_bytes()).unwrap();
        store.restore("config", previous).unwrap();
        assert_eq!(store.get("config").await.unwrap().as_deref(), Some("v1"));

        let previous = store.db.insert("fresh".as_bytes(), "x".as_bytes()).unwrap();
        assert!(previous.is_none());
        store.restore("fresh", previous).unwrap();
        assert_eq!(store.get("fresh").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reopen_keeps_value() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("db");
        {
            let store = SledStore::open(&path).unwrap();
            store.set("config", "v1").await.unwrap();
        }
        let store = SledStore::open(&path).unwrap();
        assert_eq!(store.get("config").await.unwrap().as_deref(), Some("v1"));
    }
}
