//! Conversation store behavior over the on-disk substrate

mod common;

use chatkeep::kv::{KeyValueStore, SledStore};
use chatkeep::storage::{ChatMessage, ConversationStore, Role, INDEX_KEY};
use std::collections::HashSet;
use std::sync::Arc;

#[tokio::test]
async fn test_save_list_delete_scenario() {
    let (kv, _tmp) = common::create_temp_store();
    let store = ConversationStore::new(kv);
    let (messages, history) = common::sample_thread("Plan a trip to Lisbon");

    let id = store.save("Trip planning", &messages, &history).await.unwrap();

    let list = store.list().await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].id, id);
    assert_eq!(list[0].title, "Trip planning");
    assert_eq!(list[0].message_count, 3);
    assert_eq!(list[0].preview, "Plan a trip to Lisbon");

    store.delete(&id).await.unwrap();
    assert!(store.list().await.unwrap().is_empty());
    assert!(store.load(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_round_trip_preserves_messages_and_history() {
    let (kv, _tmp) = common::create_temp_store();
    let store = ConversationStore::new(kv);
    let (mut messages, history) = common::sample_thread("What's in this photo? 📷");
    messages[1] = messages[1].clone().with_image("file:///photos/cat.jpg");

    let id = store.save("Photo", &messages, &history).await.unwrap();
    let loaded = store.load(&id).await.unwrap().unwrap();

    assert_eq!(loaded.messages, messages);
    assert_eq!(loaded.conversation_history, history);
}

#[tokio::test]
async fn test_rapid_saves_get_distinct_ids_newest_first() {
    let (kv, _tmp) = common::create_temp_store();
    let store = ConversationStore::new(kv);
    let (messages, history) = common::sample_thread("hello");

    let mut ids = Vec::new();
    for i in 0..20 {
        let id = store
            .save(&format!("conversation {}", i), &messages, &history)
            .await
            .unwrap();
        ids.push(id);
    }

    let unique: HashSet<&String> = ids.iter().collect();
    assert_eq!(unique.len(), 20);

    let listed: Vec<String> = store.list().await.unwrap().into_iter().map(|s| s.id).collect();
    ids.reverse();
    assert_eq!(listed, ids);
}

#[tokio::test]
async fn test_concurrent_saves_through_shared_store() {
    let (kv, _tmp) = common::create_temp_store();
    let store = Arc::new(ConversationStore::new(kv));

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let messages = vec![ChatMessage::new(
                format!("msg_{}", i),
                Role::User,
                format!("question {}", i),
                i,
            )];
            store.save("concurrent", &messages, &[]).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(store.list().await.unwrap().len(), 8);
    assert!(store.check_consistency().await.unwrap().is_consistent());
}

#[tokio::test]
async fn test_delete_twice_and_unknown_id_are_noops() {
    let (kv, _tmp) = common::create_temp_store();
    let store = ConversationStore::new(kv);
    let (messages, history) = common::sample_thread("keep");
    let keep = store.save("keep", &messages, &history).await.unwrap();
    let gone = store.save("gone", &messages, &history).await.unwrap();

    store.delete(&gone).await.unwrap();
    let before = store.list().await.unwrap();
    store.delete(&gone).await.unwrap();
    store.delete("CONV_0").await.unwrap();
    store.delete(INDEX_KEY).await.unwrap();
    assert_eq!(store.list().await.unwrap(), before);
    assert_eq!(before[0].id, keep);
}

#[tokio::test]
async fn test_index_rebuilt_after_record_removed_behind_the_store() {
    let (kv, _tmp) = common::create_temp_store();
    let store = ConversationStore::new(kv.clone());
    let (messages, history) = common::sample_thread("one");
    let first = store.save("one", &messages, &history).await.unwrap();
    let second = store.save("two", &messages, &history).await.unwrap();

    kv.remove(&first).await.unwrap();

    let report = store.check_consistency().await.unwrap();
    assert_eq!(report.dangling, vec![first.clone()]);
    assert!(store.load(&first).await.unwrap().is_none());

    assert_eq!(store.rebuild_index().await.unwrap(), 1);
    let list = store.list().await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].id, second);
    assert!(store.check_consistency().await.unwrap().is_consistent());
}

#[tokio::test]
async fn test_append_and_resave_keeps_id_and_position() {
    let (kv, _tmp) = common::create_temp_store();
    let store = ConversationStore::new(kv);
    let (messages, history) = common::sample_thread("first question");
    let older = store.save("older", &messages, &history).await.unwrap();
    let newer = store.save("newer", &messages, &history).await.unwrap();

    let extra = vec![
        ChatMessage::new("msg_9_1", Role::User, "follow-up", 9_000),
        ChatMessage::new("msg_9_2", Role::Assistant, "answer", 9_001),
    ];
    let summary = store
        .append_and_resave(&older, &extra, &history)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(summary.id, older);
    assert_eq!(summary.title, "older");
    assert_eq!(summary.message_count, 5);

    let list = store.list().await.unwrap();
    assert_eq!(list[0].id, newer);
    assert_eq!(list[1], summary);
}

#[tokio::test]
async fn test_history_survives_reopen() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("history");
    let (messages, history) = common::sample_thread("persist me");

    let id = {
        let store = ConversationStore::new(Arc::new(SledStore::open(&path).unwrap()));
        store.save("persisted", &messages, &history).await.unwrap()
    };

    let store = ConversationStore::new(Arc::new(SledStore::open(&path).unwrap()));
    assert_eq!(store.list().await.unwrap()[0].id, id);
    assert_eq!(store.load(&id).await.unwrap().unwrap().messages, messages);
}

#[tokio::test]
async fn test_reads_records_written_by_mobile_client() {
    let (kv, _tmp) = common::create_temp_store();
    let record = r#"{"id":"CONV_1700000000000","title":"Groceries","preview":"Add milk","timestamp":1700000000000,"messageCount":1,"messages":[{"id":"msg_1700000000000_1","role":"user","content":"Add milk","timestamp":1700000000000}],"apiHistory":[{"role":"user","content":"Add milk"}]}"#;
    let index = r#"[{"id":"CONV_1700000000000","title":"Groceries","preview":"Add milk","timestamp":1700000000000,"messageCount":1}]"#;
    kv.set("CONV_1700000000000", record).await.unwrap();
    kv.set(INDEX_KEY, index).await.unwrap();

    let store = ConversationStore::new(kv);
    let list = store.list().await.unwrap();
    assert_eq!(list[0].created_at, 1_700_000_000_000);

    let loaded = store.load("CONV_1700000000000").await.unwrap().unwrap();
    assert_eq!(loaded.conversation_history.len(), 1);
    assert!(store.check_consistency().await.unwrap().is_consistent());
}
