use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use chatkeep::kv::SledStore;
use chatkeep::storage::{ChatMessage, HistoryItem, Role};

#[allow(dead_code)]
pub fn create_temp_store() -> (Arc<SledStore>, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let store = SledStore::open(tmp.path().join("history")).expect("failed to open sled store");
    (Arc::new(store), tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// A short exchange: greeting, user question, assistant answer
#[allow(dead_code)]
pub fn sample_thread(question: &str) -> (Vec<ChatMessage>, Vec<HistoryItem>) {
    let messages = vec![
        ChatMessage::new("msg_1_1", Role::Assistant, "Hi! How can I help?", 1_000),
        ChatMessage::new("msg_1_2", Role::User, question, 2_000),
        ChatMessage::new("msg_1_3", Role::Assistant, "Sure.", 3_000),
    ];
    let history = vec![HistoryItem::user(question), HistoryItem::assistant("Sure.")];
    (messages, history)
}
