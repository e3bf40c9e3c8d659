//! Durable key-value store on an embedded `sled` database

use super::{KeyValueStore, WriteOp};
use crate::error::{ChatkeepError, Result};
use async_trait::async_trait;
use sled::{Batch, Db, IVec};
use std::path::{Path, PathBuf};

/// `KeyValueStore` persisted in a `sled` database directory
///
/// Every write is flushed before the call returns, so a successful `set`
/// or `apply_batch` survives a crash.
pub struct SledStore {
    db: Db,
    path: PathBuf,
}

impl SledStore {
    /// Open or create a store at `path`
    ///
    /// Parent directories are created when missing.
    ///
    /// # Errors
    ///
    /// Returns `ChatkeepError::Storage` if the directory cannot be created
    /// or the database cannot be opened (for example because another
    /// process holds it).
    ///
    /// # Examples
    ///
    /// ```
    /// use chatkeep::kv::SledStore;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let store = SledStore::open(dir.path().join("history")).unwrap();
    /// assert!(store.path().ends_with("history"));
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ChatkeepError::Storage(format!("Failed to create data directory: {}", e))
            })?;
        }

        let db = sled::open(&path)
            .map_err(|e| ChatkeepError::Storage(format!("Failed to open database: {}", e)))?;
        tracing::debug!("Opened sled store at {}", path.display());

        Ok(Self { db, path })
    }

    /// Location of the database directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self) -> Result<()> {
        self.db
            .flush_async()
            .await
            .map_err(|e| ChatkeepError::Storage(format!("Flush failed: {}", e)))?;
        Ok(())
    }
}

fn decode(key: &str, bytes: IVec) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| {
        ChatkeepError::Storage(format!("Value under {} is not valid UTF-8: {}", key, e)).into()
    })
}

#[async_trait]
impl KeyValueStore for SledStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self
            .db
            .get(key.as_bytes())
            .map_err(|e| ChatkeepError::Storage(format!("Get failed: {}", e)))?
        {
            Some(bytes) => Ok(Some(decode(key, bytes)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.db
            .insert(key.as_bytes(), value.as_bytes())
            .map_err(|e| ChatkeepError::Storage(format!("Insert failed: {}", e)))?;
        self.flush().await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.db
            .remove(key.as_bytes())
            .map_err(|e| ChatkeepError::Storage(format!("Remove failed: {}", e)))?;
        self.flush().await
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        let mut entries = Vec::new();
        for result in self.db.scan_prefix(prefix.as_bytes()) {
            let (key, value) =
                result.map_err(|e| ChatkeepError::Storage(format!("Iteration failed: {}", e)))?;
            let key = String::from_utf8(key.to_vec())
                .map_err(|e| ChatkeepError::Storage(format!("Key is not valid UTF-8: {}", e)))?;
            let value = decode(&key, value)?;
            entries.push((key, value));
        }
        Ok(entries)
    }

    async fn apply_batch(&self, ops: Vec<WriteOp>) -> Result<()> {
        let count = ops.len();
        let mut batch = Batch::default();
        for op in ops {
            match op {
                WriteOp::Set { key, value } => batch.insert(key.as_bytes(), value.as_bytes()),
                WriteOp::Remove { key } => batch.remove(key.as_bytes()),
            }
        }

        self.db
            .apply_batch(batch)
            .map_err(|e| ChatkeepError::Storage(format!("Batch write failed: {}", e)))?;
        tracing::debug!("Applied batch of {} operations", count);
        self.flush().await
    }
}
