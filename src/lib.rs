//! Chatkeep - personal assistant chat client core
//!
//! This library keeps a chat thread in memory, sends turns to a remote
//! assistant backend, and stores finished conversations in a local
//! key-value database with an ordered index for listing.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `kv`: Key-value substrate (`SledStore` on disk, `MemoryStore` in memory)
//! - `storage`: `ConversationStore` and the persisted data model
//! - `ids`: Conversation and message id generation
//! - `derive`: Title and preview derivation
//! - `settings`: The saved backend URL
//! - `client`: HTTP client for the assistant backend
//! - `session`: The in-memory chat thread
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli` / `commands`: Command-line front-end
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use chatkeep::kv::SledStore;
//! use chatkeep::ConversationStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let kv = Arc::new(SledStore::open("/tmp/chatkeep-history")?);
//!     let store = ConversationStore::new(kv);
//!     for summary in store.list().await? {
//!         println!("{} {}", summary.id, summary.title);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod derive;
pub mod error;
pub mod ids;
pub mod kv;
pub mod session;
pub mod settings;
pub mod storage;

// Re-export commonly used types
pub use client::{ChatBackend, ChatClient, ChatReply, ImageAttachment};
pub use config::Config;
pub use error::{ChatkeepError, Result};
pub use session::{ArchiveOutcome, ChatSession};
pub use settings::Settings;
pub use storage::{
    ChatMessage, ConversationRecord, ConversationStore, ConversationSummary, HistoryItem,
    LoadedConversation, Role,
};
