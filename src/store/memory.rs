//! In-process [`StoreClient`] backed by moka.
//!
//! Honors the TTL passed to each `set` through a per-entry expiry policy,
//! so it behaves like the remote store for expiry purposes. Useful for
//! tests and single-process deployments where no shared backend exists.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::sync::Cache;

use super::{RemoteStats, RemoteStoreStats, StoreClient, glob_match};
use crate::Result;

/// Default maximum number of entries.
const DEFAULT_MAX_ENTRIES: u64 = 100_000;

#[derive(Clone)]
struct StoredBytes {
    bytes: Arc<[u8]>,
    ttl: Duration,
}

/// Expire each entry after the TTL it was written with; rewrites reset it.
struct PerEntryTtl;

impl Expiry<String, StoredBytes> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredBytes,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredBytes,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Moka-backed key-value store with per-entry TTL and glob scan.
pub struct InMemoryStore {
    entries: Cache<String, StoredBytes>,
}

impl InMemoryStore {
    /// Create a store with the default capacity (100,000 entries).
    pub fn new() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }

    /// Create a store with a custom capacity.
    pub fn with_max_entries(max: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max)
            .expire_after(PerEntryTtl)
            .build();
        Self { entries }
    }

    /// Number of live entries.
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreClient for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).map(|e| e.bytes.to_vec()))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool> {
        self.entries.insert(
            key.to_string(),
            StoredBytes {
                bytes: Arc::from(value),
                ttl,
            },
        );
        Ok(true)
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        let removed = keys
            .iter()
            .filter(|k| self.entries.remove(k.as_str()).is_some())
            .count();
        Ok(removed as u64)
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>> {
        Ok(self
            .entries
            .iter()
            .filter(|(k, _)| glob_match(pattern, k))
            .map(|(k, _)| k.to_string())
            .collect())
    }

    async fn ping(&self) -> Result<bool> {
        Ok(true)
    }
}

#[async_trait]
impl RemoteStats for InMemoryStore {
    async fn remote_stats(&self) -> Result<RemoteStoreStats> {
        self.entries.run_pending_tasks();
        let used: u64 = self
            .entries
            .iter()
            .map(|(k, v)| (k.len() + v.bytes.len()) as u64)
            .sum();
        Ok(RemoteStoreStats {
            used_memory_bytes: Some(used),
            key_count: Some(self.entries.entry_count()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_delete_round_trip() {
        let store = InMemoryStore::new();
        assert!(store.set("k", b"v", Duration::from_secs(60)).await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));
        assert_eq!(store.delete(&["k".to_string(), "missing".to_string()]).await.unwrap(), 1);
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn entries_expire_after_their_ttl() {
        let store = InMemoryStore::new();
        store.set("short", b"1", Duration::from_millis(20)).await.unwrap();
        store.set("long", b"2", Duration::from_secs(60)).await.unwrap();
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(store.get("short").await.unwrap(), None);
        assert!(store.get("long").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn scan_filters_by_glob() {
        let store = InMemoryStore::new();
        let ttl = Duration::from_secs(60);
        store.set("ai_cache:op:a|x", b"1", ttl).await.unwrap();
        store.set("ai_cache:op:b|x", b"2", ttl).await.unwrap();
        store.set("other", b"3", ttl).await.unwrap();

        let mut keys = store.scan("ai_cache:*").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["ai_cache:op:a|x", "ai_cache:op:b|x"]);
        assert_eq!(store.scan("ai_cache:*op:b*").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn remote_stats_reports_entries() {
        let store = InMemoryStore::new();
        store.set("ab", b"cde", Duration::from_secs(60)).await.unwrap();
        let stats = store.remote_stats().await.unwrap();
        assert_eq!(stats.key_count, Some(1));
        assert_eq!(stats.used_memory_bytes, Some(5));
    }
}
