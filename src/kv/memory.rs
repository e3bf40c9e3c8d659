//! In-memory key-value store
//!
//! Backed by a `BTreeMap` behind a tokio `RwLock`. Nothing survives the
//! process; used by tests and by callers that only need a scratch store.

use super::{KeyValueStore, WriteOp};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Ephemeral `KeyValueStore`
///
/// # Examples
///
/// ```
/// use chatkeep::kv::{KeyValueStore, MemoryStore};
///
/// # #[tokio::main]
/// # async fn main() -> chatkeep::Result<()> {
/// let store = MemoryStore::new();
/// store.set("greeting", "hello").await?;
/// assert_eq!(store.get("greeting").await?, Some("hello".to_string()));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store holds no keys
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        let entries = self.entries.read().await;
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn apply_batch(&self, ops: Vec<WriteOp>) -> Result<()> {
        let mut entries = self.entries.write().await;
        for op in ops {
            match op {
                WriteOp::Set { key, value } => {
                    entries.insert(key, value);
                }
                WriteOp::Remove { key } => {
                    entries.remove(&key);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_missing_key_returns_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_replaces_value() {
        let store = MemoryStore::new();
        store.set("k", "one").await.unwrap();
        store.set("k", "two").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("two".to_string()));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_remove_missing_key_is_ok() {
        let store = MemoryStore::new();
        store.remove("absent").await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_scan_prefix_only_returns_matching_keys_in_order() {
        let store = MemoryStore::new();
        store.set("CONV_2", "b").await.unwrap();
        store.set("BACKEND_URL", "x").await.unwrap();
        store.set("CONV_1", "a").await.unwrap();
        store.set("CONVERT", "c").await.unwrap();

        let found = store.scan_prefix("CONV_").await.unwrap();
        assert_eq!(
            found,
            vec![
                ("CONV_1".to_string(), "a".to_string()),
                ("CONV_2".to_string(), "b".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_apply_batch_sets_and_removes() {
        let store = MemoryStore::new();
        store.set("old", "value").await.unwrap();
        store
            .apply_batch(vec![WriteOp::set("new", "value"), WriteOp::remove("old")])
            .await
            .unwrap();

        assert_eq!(store.get("old").await.unwrap(), None);
        assert_eq!(store.get("new").await.unwrap(), Some("value".to_string()));
    }
}
