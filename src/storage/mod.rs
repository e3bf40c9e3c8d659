//! Local conversation history
//!
//! Each conversation is written once under its own key (`CONV_<ms>`), and a
//! single aggregate key (`CONV_INDEX`) holds the list of summaries, newest
//! first. Record and index are always written together in one batch so the
//! index mirrors the stored records between operations.

use crate::derive::{preview_from_messages, DEFAULT_PREVIEW_CHARS};
use crate::error::{ChatkeepError, Result};
use crate::ids::{now_ms, IdGenerator, TimestampIdGenerator};
use crate::kv::{KeyValueStore, WriteOp};
use directories::ProjectDirs;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

pub mod types;
pub use types::{
    ChatMessage, ConsistencyReport, ConversationRecord, ConversationSummary, HistoryItem,
    LoadedConversation, Role,
};

/// Key holding the JSON array of conversation summaries
pub const INDEX_KEY: &str = "CONV_INDEX";

/// Prefix shared by every conversation record key
pub const RECORD_PREFIX: &str = "CONV_";

/// Environment variable that overrides the default data directory
pub const STORAGE_PATH_ENV: &str = "CHATKEEP_STORAGE_PATH";

const MAX_ID_ATTEMPTS: usize = 16;

/// Whether `key` names a conversation record (as opposed to the index or
/// an unrelated setting)
pub fn is_record_key(key: &str) -> bool {
    key.starts_with(RECORD_PREFIX) && key != INDEX_KEY
}

/// Resolve the directory that holds the history database
///
/// Honors `CHATKEEP_STORAGE_PATH` first, then falls back to the platform
/// data directory.
pub fn default_data_dir() -> Result<PathBuf> {
    if let Ok(override_path) = std::env::var(STORAGE_PATH_ENV) {
        if !override_path.trim().is_empty() {
            return Ok(PathBuf::from(override_path));
        }
    }

    let proj_dirs = ProjectDirs::from("com", "chatkeep", "chatkeep")
        .ok_or_else(|| ChatkeepError::Storage("Could not determine data directory".into()))?;
    Ok(proj_dirs.data_dir().join("history"))
}

/// Persistent store of chat conversations
///
/// Generic over the key-value substrate. Index updates are read-modify-write,
/// so every mutating operation holds an internal lock for its duration;
/// two `ConversationStore` instances over the same substrate do not
/// coordinate with each other.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use chatkeep::kv::MemoryStore;
/// use chatkeep::storage::{ChatMessage, ConversationStore, HistoryItem, Role};
///
/// # #[tokio::main]
/// # async fn main() -> chatkeep::Result<()> {
/// let store = ConversationStore::new(Arc::new(MemoryStore::new()));
/// let messages = vec![ChatMessage::new("msg_1_1", Role::User, "Plan a trip", 1)];
/// let history = vec![HistoryItem::user("Plan a trip")];
///
/// let id = store.save("Trip planning", &messages, &history).await?;
/// assert_eq!(store.list().await?[0].id, id);
///
/// let loaded = store.load(&id).await?.expect("just saved");
/// assert_eq!(loaded.messages, messages);
/// # Ok(())
/// # }
/// ```
pub struct ConversationStore<S: KeyValueStore> {
    kv: Arc<S>,
    ids: Arc<dyn IdGenerator>,
    preview_chars: usize,
    index_lock: Mutex<()>,
}

impl<S: KeyValueStore> ConversationStore<S> {
    /// Create a store over `kv` with the default `CONV_<ms>` id scheme
    pub fn new(kv: Arc<S>) -> Self {
        Self {
            kv,
            ids: Arc::new(TimestampIdGenerator::conversations()),
            preview_chars: DEFAULT_PREVIEW_CHARS,
            index_lock: Mutex::new(()),
        }
    }

    /// Replace the id generator
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Change how many characters of the first user message go into the preview
    pub fn with_preview_chars(mut self, preview_chars: usize) -> Self {
        self.preview_chars = preview_chars;
        self
    }

    /// The underlying substrate
    pub fn kv(&self) -> &Arc<S> {
        &self.kv
    }

    /// Persist a new conversation and return its id
    ///
    /// The record and the updated index (new summary first) are written in
    /// a single batch.
    ///
    /// # Errors
    ///
    /// Returns `ChatkeepError::Storage` if the substrate fails, if the
    /// existing index is unreadable, or if no unused id could be generated.
    pub async fn save(
        &self,
        title: &str,
        messages: &[ChatMessage],
        conversation_history: &[HistoryItem],
    ) -> Result<String> {
        let _guard = self.index_lock.lock().await;

        let created_at = now_ms();
        let id = self.allocate_id(created_at).await?;
        let record = ConversationRecord {
            id: id.clone(),
            title: title.to_string(),
            preview: preview_from_messages(messages, self.preview_chars),
            created_at,
            message_count: messages.len(),
            messages: messages.to_vec(),
            conversation_history: conversation_history.to_vec(),
        };

        let mut index = self.read_index().await?;
        index.insert(0, record.summary());

        self.kv
            .apply_batch(vec![
                WriteOp::set(id.clone(), encode(&record)?),
                index_op(&index)?,
            ])
            .await?;

        tracing::info!(
            id = %id,
            messages = record.message_count,
            "Saved conversation"
        );
        Ok(id)
    }

    /// Summaries of all stored conversations, newest first
    ///
    /// Returns the index exactly as stored; an empty list when nothing has
    /// been saved yet.
    pub async fn list(&self) -> Result<Vec<ConversationSummary>> {
        self.read_index().await
    }

    /// Load the messages and API history of a conversation
    ///
    /// Returns `Ok(None)` when no record exists under `id`, including when
    /// the index still lists it.
    pub async fn load(&self, id: &str) -> Result<Option<LoadedConversation>> {
        Ok(self.read_record(id).await?.map(|record| LoadedConversation {
            messages: record.messages,
            conversation_history: record.conversation_history,
        }))
    }

    /// Load the complete record, including title and preview
    pub async fn get(&self, id: &str) -> Result<Option<ConversationRecord>> {
        self.read_record(id).await
    }

    /// Remove a conversation and its index entry
    ///
    /// Deleting an unknown id is a no-op.
    pub async fn delete(&self, id: &str) -> Result<()> {
        if !is_record_key(id) {
            tracing::debug!("Ignoring delete of non-conversation key {}", id);
            return Ok(());
        }

        let _guard = self.index_lock.lock().await;

        let mut index = self.read_index().await?;
        let before = index.len();
        index.retain(|summary| summary.id != id);

        let mut ops = vec![WriteOp::remove(id)];
        if index.len() != before {
            ops.push(index_op(&index)?);
        }
        self.kv.apply_batch(ops).await?;

        tracing::info!(id = %id, removed = before != index.len(), "Deleted conversation");
        Ok(())
    }

    /// Append messages to an existing conversation, keeping its id
    ///
    /// `conversation_history` replaces the stored API history, since the
    /// backend returns the full history after every turn. Title and creation
    /// time are kept; preview and message count are recomputed. The index
    /// entry keeps its position.
    ///
    /// Returns the refreshed summary, or `None` if `id` does not exist.
    pub async fn append_and_resave(
        &self,
        id: &str,
        new_messages: &[ChatMessage],
        conversation_history: &[HistoryItem],
    ) -> Result<Option<ConversationSummary>> {
        let _guard = self.index_lock.lock().await;

        let Some(mut record) = self.read_record(id).await? else {
            return Ok(None);
        };

        record.messages.extend_from_slice(new_messages);
        record.conversation_history = conversation_history.to_vec();
        record.message_count = record.messages.len();
        record.preview = preview_from_messages(&record.messages, self.preview_chars);
        let summary = record.summary();

        let mut index = self.read_index().await?;
        match index.iter_mut().find(|s| s.id == id) {
            Some(entry) => *entry = summary.clone(),
            None => {
                tracing::warn!(id = %id, "Record missing from index; re-adding it");
                index.insert(0, summary.clone());
            }
        }

        self.kv
            .apply_batch(vec![
                WriteOp::set(id.to_string(), encode(&record)?),
                index_op(&index)?,
            ])
            .await?;

        tracing::info!(
            id = %id,
            appended = new_messages.len(),
            messages = record.message_count,
            "Resaved conversation"
        );
        Ok(Some(summary))
    }

    /// Compare the index against the stored records
    pub async fn check_consistency(&self) -> Result<ConsistencyReport> {
        let _guard = self.index_lock.lock().await;

        let index = self.read_index().await?;
        let records = self.scan_records().await?;
        let by_id: HashMap<&str, &ConversationRecord> =
            records.iter().map(|r| (r.id.as_str(), r)).collect();
        let indexed: HashSet<&str> = index.iter().map(|s| s.id.as_str()).collect();

        let mut report = ConsistencyReport::default();
        for summary in &index {
            match by_id.get(summary.id.as_str()) {
                None => report.dangling.push(summary.id.clone()),
                Some(record) if record.summary() != *summary => {
                    report.stale.push(summary.id.clone())
                }
                Some(_) => {}
            }
        }
        for record in &records {
            if !indexed.contains(record.id.as_str()) {
                report.orphaned.push(record.id.clone());
            }
        }

        Ok(report)
    }

    /// Rebuild the index from the stored records
    ///
    /// Entries are ordered by creation time, newest first; ids minted in the
    /// same millisecond are ordered by their numeric suffix. Records that
    /// cannot be parsed are left out. Returns the number of indexed
    /// conversations.
    pub async fn rebuild_index(&self) -> Result<usize> {
        let _guard = self.index_lock.lock().await;

        let mut summaries: Vec<ConversationSummary> = self
            .scan_records()
            .await?
            .iter()
            .map(ConversationRecord::summary)
            .collect();
        summaries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| id_sequence(&b.id).cmp(&id_sequence(&a.id)))
                .then_with(|| b.id.cmp(&a.id))
        });

        self.kv.apply_batch(vec![index_op(&summaries)?]).await?;

        tracing::info!(entries = summaries.len(), "Rebuilt conversation index");
        Ok(summaries.len())
    }

    /// Rebuild the index if it has drifted from the records
    ///
    /// Returns `true` when a rebuild was needed.
    pub async fn repair(&self) -> Result<bool> {
        let report = self.check_consistency().await?;
        if report.is_consistent() {
            return Ok(false);
        }

        tracing::warn!(
            dangling = report.dangling.len(),
            orphaned = report.orphaned.len(),
            stale = report.stale.len(),
            "Conversation index out of sync; rebuilding"
        );
        self.rebuild_index().await?;
        Ok(true)
    }

    async fn allocate_id(&self, now: i64) -> Result<String> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = self.ids.next_id(now);
            if !is_record_key(&candidate) {
                return Err(ChatkeepError::Storage(format!(
                    "Id generator produced {} which is not a conversation key",
                    candidate
                ))
                .into());
            }
            if self.kv.get(&candidate).await?.is_none() {
                return Ok(candidate);
            }
            tracing::debug!("Conversation id {} already taken; retrying", candidate);
        }

        Err(ChatkeepError::Storage(format!(
            "Could not allocate an unused conversation id after {} attempts",
            MAX_ID_ATTEMPTS
        ))
        .into())
    }

    async fn read_index(&self) -> Result<Vec<ConversationSummary>> {
        match self.kv.get(INDEX_KEY).await? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                ChatkeepError::Storage(format!("Corrupt conversation index: {}", e)).into()
            }),
            None => Ok(Vec::new()),
        }
    }

    async fn read_record(&self, id: &str) -> Result<Option<ConversationRecord>> {
        if !is_record_key(id) {
            return Ok(None);
        }

        match self.kv.get(id).await? {
            Some(raw) => {
                let record = serde_json::from_str(&raw).map_err(|e| {
                    ChatkeepError::Storage(format!("Corrupt conversation {}: {}", id, e))
                })?;
                Ok(Some(record))
            }
            None => {
                tracing::debug!("Conversation {} not found", id);
                Ok(None)
            }
        }
    }

    async fn scan_records(&self) -> Result<Vec<ConversationRecord>> {
        let mut records = Vec::new();
        for (key, raw) in self.kv.scan_prefix(RECORD_PREFIX).await? {
            if !is_record_key(&key) {
                continue;
            }
            match serde_json::from_str::<ConversationRecord>(&raw) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("Skipping unreadable conversation {}: {}", key, e),
            }
        }
        Ok(records)
    }
}

/// Same-millisecond sequence of a `CONV_<ms>_<n>` id; 0 without a suffix
fn id_sequence(id: &str) -> u64 {
    id.strip_prefix(RECORD_PREFIX)
        .and_then(|rest| rest.split_once('_'))
        .and_then(|(_, seq)| seq.parse().ok())
        .unwrap_or(0)
}

fn encode(record: &ConversationRecord) -> Result<String> {
    serde_json::to_string(record)
        .map_err(|e| ChatkeepError::Storage(format!("Serialization failed: {}", e)).into())
}

fn index_op(index: &[ConversationSummary]) -> Result<WriteOp> {
    let raw = serde_json::to_string(index)
        .map_err(|e| ChatkeepError::Storage(format!("Serialization failed: {}", e)))?;
    Ok(WriteOp::set(INDEX_KEY, raw))
}
