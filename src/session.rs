//! In-memory chat thread
//!
//! A `ChatSession` is what the front-end renders: the displayed messages and
//! the API history that goes out with the next turn. Finished threads are
//! archived into a [`ConversationStore`] and can be restored from it.

use crate::client::{ChatBackend, ImageAttachment};
use crate::derive::{title_from_messages, DEFAULT_TITLE_CHARS};
use crate::error::Result;
use crate::ids::{now_ms, IdGenerator, TimestampIdGenerator};
use crate::kv::KeyValueStore;
use crate::storage::{ChatMessage, ConversationStore, HistoryItem, Role};
use std::sync::Arc;

/// Opening assistant message shown in a fresh thread
pub const GREETING: &str = "Hi! I'm your personal assistant 👋\n\nI can **search the web**, manage your **calendar**, take **notes**, set **reminders**, remember your **preferences**, and more.\n\nHow can I help you today?";

/// Where a restored thread came from
#[derive(Debug, Clone, PartialEq, Eq)]
struct Restored {
    id: String,
    len_at_restore: usize,
}

/// What happened when a session was archived
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// Nothing worth keeping (no user message)
    Discarded,
    /// Stored as a new conversation
    Saved(String),
    /// New turns appended to the conversation it was restored from
    Appended(String),
    /// Restored conversation with no new turns; left as stored
    Unchanged(String),
}

impl ArchiveOutcome {
    /// Id of the stored conversation, if any
    pub fn id(&self) -> Option<&str> {
        match self {
            ArchiveOutcome::Discarded => None,
            ArchiveOutcome::Saved(id)
            | ArchiveOutcome::Appended(id)
            | ArchiveOutcome::Unchanged(id) => Some(id),
        }
    }
}

/// The conversation currently on screen
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    conversation_history: Vec<HistoryItem>,
    ids: Arc<dyn IdGenerator>,
    title_chars: usize,
    restored: Option<Restored>,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    /// Empty session with `msg_<ms>_<n>` message ids
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            conversation_history: Vec::new(),
            ids: Arc::new(TimestampIdGenerator::messages()),
            title_chars: DEFAULT_TITLE_CHARS,
            restored: None,
        }
    }

    /// Replace the message id generator
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Maximum title length used when archiving
    pub fn with_title_chars(mut self, title_chars: usize) -> Self {
        self.title_chars = title_chars;
        self
    }

    /// Displayed messages, oldest first
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// API history sent with the next turn
    pub fn conversation_history(&self) -> &[HistoryItem] {
        &self.conversation_history
    }

    /// Id of the stored conversation this session was restored from
    pub fn restored_from(&self) -> Option<&str> {
        self.restored.as_ref().map(|r| r.id.as_str())
    }

    /// Whether the session has nothing in it
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Whether at least one user message exists
    pub fn has_user_messages(&self) -> bool {
        self.messages.iter().any(|m| m.role == Role::User)
    }

    /// Add the standard greeting if the thread is empty
    pub fn greet(&mut self) {
        if self.messages.is_empty() {
            self.push_assistant(GREETING);
        }
    }

    /// Append a user message and return it
    pub fn push_user(&mut self, content: impl Into<String>) -> &ChatMessage {
        self.push(Role::User, content.into(), None)
    }

    /// Append an assistant message and return it
    pub fn push_assistant(&mut self, content: impl Into<String>) -> &ChatMessage {
        self.push(Role::Assistant, content.into(), None)
    }

    fn push(&mut self, role: Role, content: String, image_uri: Option<String>) -> &ChatMessage {
        let now = now_ms();
        let mut message = ChatMessage::new(self.ids.next_id(now), role, content, now);
        message.image_uri = image_uri;
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    /// Send one turn through `backend`
    ///
    /// The user message is appended first. On success the reply is appended
    /// and the API history replaced by the one the backend returned. On
    /// failure an error message is appended to the thread, the history is
    /// left untouched, and the error is returned.
    pub async fn send<B: ChatBackend + ?Sized>(
        &mut self,
        backend: &B,
        text: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<String> {
        self.push(Role::User, text.to_string(), image.map(|i| i.uri.clone()));

        match backend
            .send_message(text, &self.conversation_history, image)
            .await
        {
            Ok(reply) => {
                self.push_assistant(reply.reply.clone());
                self.conversation_history = reply.history;
                Ok(reply.reply)
            }
            Err(e) => {
                tracing::warn!("Chat turn failed: {}", e);
                self.push_assistant(format!(
                    "⚠️ **Error:** {}\n\nCheck your backend URL in Settings.",
                    e
                ));
                Err(e)
            }
        }
    }

    /// Drop all messages and history
    pub fn clear(&mut self) {
        self.messages.clear();
        self.conversation_history.clear();
        self.restored = None;
    }

    /// Store the session and start over
    ///
    /// A fresh session is saved as a new conversation. A restored session
    /// with new turns has them appended to the conversation it came from;
    /// without new turns nothing is written. Sessions without any user
    /// message are discarded. On error the session is kept as is.
    pub async fn archive<S: KeyValueStore>(
        &mut self,
        store: &ConversationStore<S>,
    ) -> Result<ArchiveOutcome> {
        if !self.has_user_messages() {
            self.clear();
            return Ok(ArchiveOutcome::Discarded);
        }

        let outcome = match self.restored.clone() {
            Some(restored) if self.messages.len() == restored.len_at_restore => {
                ArchiveOutcome::Unchanged(restored.id)
            }
            Some(restored) => {
                let appended = store
                    .append_and_resave(
                        &restored.id,
                        &self.messages[restored.len_at_restore..],
                        &self.conversation_history,
                    )
                    .await?;
                match appended {
                    Some(summary) => ArchiveOutcome::Appended(summary.id),
                    None => {
                        tracing::warn!(
                            "Conversation {} disappeared; saving as new",
                            restored.id
                        );
                        ArchiveOutcome::Saved(self.save_new(store).await?)
                    }
                }
            }
            None => ArchiveOutcome::Saved(self.save_new(store).await?),
        };

        self.clear();
        Ok(outcome)
    }

    async fn save_new<S: KeyValueStore>(&self, store: &ConversationStore<S>) -> Result<String> {
        let title = title_from_messages(&self.messages, self.title_chars);
        store
            .save(&title, &self.messages, &self.conversation_history)
            .await
    }

    /// Replace the session with a stored conversation
    ///
    /// Returns `false` (and leaves the session alone) if `id` is not stored.
    pub async fn restore<S: KeyValueStore>(
        &mut self,
        store: &ConversationStore<S>,
        id: &str,
    ) -> Result<bool> {
        let Some(loaded) = store.load(id).await? else {
            return Ok(false);
        };

        self.restored = Some(Restored {
            id: id.to_string(),
            len_at_restore: loaded.messages.len(),
        });
        self.messages = loaded.messages;
        self.conversation_history = loaded.conversation_history;
        tracing::debug!("Restored conversation {}", id);
        Ok(true)
    }

    /// Archive this session and open the stored conversation `id`
    ///
    /// Returns `Ok(None)` when `id` is not stored. The target is read before
    /// anything is archived, so an unreadable target or a failed save
    /// returns the error with the session untouched.
    pub async fn switch_to<S: KeyValueStore>(
        &mut self,
        store: &ConversationStore<S>,
        id: &str,
    ) -> Result<Option<ArchiveOutcome>> {
        if store.get(id).await?.is_none() {
            return Ok(None);
        }
        let archived = self.archive(store).await?;
        if !self.restore(store, id).await? {
            tracing::warn!("Conversation {} vanished while switching", id);
        }
        Ok(Some(archived))
    }
}
