use serde::{Deserialize, Serialize};
use std::fmt;

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Typed (or dictated) by the person using the client
    User,
    /// Produced by the assistant backend
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One entry of the displayed conversation thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Client-side message id
    pub id: String,
    /// Who wrote the message
    pub role: Role,
    /// Message text (markdown)
    pub content: String,
    /// Creation time in unix milliseconds
    pub timestamp: i64,
    /// Reference to an attached image, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_uri: Option<String>,
}

impl ChatMessage {
    /// Create a message without an image
    pub fn new(
        id: impl Into<String>,
        role: Role,
        content: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            id: id.into(),
            role,
            content: content.into(),
            timestamp,
            image_uri: None,
        }
    }

    /// Attach an image reference
    pub fn with_image(mut self, image_uri: impl Into<String>) -> Self {
        self.image_uri = Some(image_uri.into());
        self
    }
}

/// Role/content pair in the shape the chat backend expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    /// Speaker
    pub role: Role,
    /// Text of the turn
    pub content: String,
}

impl HistoryItem {
    /// Build a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Build an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A conversation as persisted under its own key
///
/// Records written by the mobile client (`timestamp`, `apiHistory`) can be
/// read. Records are always written with `createdAt` and
/// `conversationHistory`, which that client does not read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    /// Unique id, also the storage key
    pub id: String,
    /// Display title
    pub title: String,
    /// Opening of the first user message
    pub preview: String,
    /// When the record was created (unix ms)
    #[serde(alias = "timestamp")]
    pub created_at: i64,
    /// Number of messages at save time
    pub message_count: usize,
    /// Full thread as displayed
    pub messages: Vec<ChatMessage>,
    /// API-facing projection of the thread
    #[serde(alias = "apiHistory")]
    pub conversation_history: Vec<HistoryItem>,
}

impl ConversationRecord {
    /// Project the index entry for this record
    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            preview: self.preview.clone(),
            created_at: self.created_at,
            message_count: self.message_count,
        }
    }
}

/// Lightweight index entry used for listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    /// Record id
    pub id: String,
    /// Display title
    pub title: String,
    /// Opening of the first user message
    pub preview: String,
    /// When the record was created (unix ms)
    #[serde(alias = "timestamp")]
    pub created_at: i64,
    /// Number of messages in the record
    pub message_count: usize,
}

/// What `load` hands back to restore a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedConversation {
    /// Thread as displayed
    pub messages: Vec<ChatMessage>,
    /// History to send with the next turn
    pub conversation_history: Vec<HistoryItem>,
}

/// Differences between the index and the stored records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    /// Indexed ids with no record behind them
    pub dangling: Vec<String>,
    /// Records missing from the index
    pub orphaned: Vec<String>,
    /// Indexed ids whose summary no longer matches the record
    pub stale: Vec<String>,
}

impl ConsistencyReport {
    /// True when the index mirrors the stored records exactly
    pub fn is_consistent(&self) -> bool {
        self.dangling.is_empty() && self.orphaned.is_empty() && self.stale.is_empty()
    }
}
