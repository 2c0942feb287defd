//! Tests for [`InMemoryStore`] behaving like the remote store.

use std::time::Duration;

use mimir::store::glob_match;
use mimir::{InMemoryStore, RemoteStats, StoreClient};

#[tokio::test]
async fn delete_counts_only_existing_keys() {
    let store = InMemoryStore::new();
    store.set("ai_cache:a", b"raw:1", Duration::from_secs(60)).await.unwrap();
    store.set("ai_cache:b", b"raw:2", Duration::from_secs(60)).await.unwrap();

    let removed = store
        .delete(&[
            "ai_cache:a".to_string(),
            "ai_cache:b".to_string(),
            "ai_cache:c".to_string(),
        ])
        .await
        .unwrap();
    assert_eq!(removed, 2);
    assert!(store.is_empty());
}

#[tokio::test]
async fn scan_matches_cache_key_patterns() {
    let store = InMemoryStore::new();
    for key in [
        "ai_cache:op:sentiment|good",
        "ai_cache:op:sentiment|bad",
        "ai_cache:op:summarize|doc",
        "other:op:sentiment|x",
    ] {
        store.set(key, b"raw:1", Duration::from_secs(60)).await.unwrap();
    }

    let mut keys = store.scan("ai_cache:*op:sentiment*").await.unwrap();
    keys.sort();
    assert_eq!(
        keys,
        vec!["ai_cache:op:sentiment|bad", "ai_cache:op:sentiment|good"]
    );
    assert_eq!(store.scan("ai_cache:*").await.unwrap().len(), 3);
}

#[tokio::test]
async fn overwrite_resets_ttl() {
    let store = InMemoryStore::new();
    store.set("k", b"raw:1", Duration::from_millis(50)).await.unwrap();
    store.set("k", b"raw:2", Duration::from_secs(60)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(store.get("k").await.unwrap(), Some(b"raw:2".to_vec()));
}

#[tokio::test]
async fn remote_stats_track_bytes() {
    let store = InMemoryStore::new();
    store.set("key", b"12345", Duration::from_secs(60)).await.unwrap();
    let stats = store.remote_stats().await.unwrap();
    assert_eq!(stats.key_count, Some(1));
    assert_eq!(stats.used_memory_bytes, Some(8));
}

#[test]
fn glob_semantics() {
    assert!(glob_match("ai_cache:*", "ai_cache:"));
    assert!(glob_match("*op:qa*", "ai_cache:op:qa|text"));
    assert!(!glob_match("*op:qa*", "ai_cache:op:sentiment|qa"));
    assert!(glob_match("a?c", "abc"));
    assert!(!glob_match("a?c", "ac"));
}
