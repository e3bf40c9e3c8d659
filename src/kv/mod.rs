//! Persistent key-value substrate
//!
//! The conversation store and the settings layer only need string keys and
//! string values. `KeyValueStore` captures that surface so the same store
//! logic runs against an embedded `sled` database on disk or a purely
//! in-memory map in tests.

use crate::error::Result;
use async_trait::async_trait;

pub mod memory;
pub mod sled_store;

pub use memory::MemoryStore;
pub use sled_store::SledStore;

/// A single write inside a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Insert or replace `key` with `value`
    Set {
        /// Key to write
        key: String,
        /// Value to store
        value: String,
    },
    /// Remove `key` if present
    Remove {
        /// Key to delete
        key: String,
    },
}

impl WriteOp {
    /// Build a `Set` operation
    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Set {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Build a `Remove` operation
    pub fn remove(key: impl Into<String>) -> Self {
        Self::Remove { key: key.into() }
    }
}

/// Asynchronous string key-value storage
///
/// Every method may fail with `ChatkeepError::Storage`. Implementations must
/// serialize individual key operations; `apply_batch` must apply all of its
/// operations or none of them.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`; removing a missing key is not an error
    async fn remove(&self, key: &str) -> Result<()>;

    /// Return every `(key, value)` pair whose key starts with `prefix`,
    /// in ascending key order
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>>;

    /// Apply `ops` atomically
    async fn apply_batch(&self, ops: Vec<WriteOp>) -> Result<()>;
}
