//! Shared store doubles for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use mimir::key::Options;
use mimir::{
    CacheConfig, CacheEngine, InMemoryStore, MimirError, RemoteStats, RemoteStoreStats, Result,
    StoreClient,
};

// ============================================================================
// Counting store
// ============================================================================

/// Wraps an [`InMemoryStore`], counting calls and recording write TTLs.
#[derive(Default)]
pub struct CountingStore {
    pub inner: InMemoryStore,
    pub gets: AtomicUsize,
    pub sets: AtomicUsize,
    pub scans: AtomicUsize,
    pub ttls: Mutex<Vec<(String, Duration)>>,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    /// TTL of the last write to a key containing `needle`.
    pub fn ttl_for(&self, needle: &str) -> Option<Duration> {
        self.ttls
            .lock()
            .iter()
            .rev()
            .find(|(key, _)| key.contains(needle))
            .map(|(_, ttl)| *ttl)
    }
}

#[async_trait]
impl StoreClient for CountingStore {
    fn name(&self) -> &str {
        "counting"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.ttls.lock().push((key.to_string(), ttl));
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        self.inner.delete(keys).await
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        self.inner.scan(pattern).await
    }

    async fn ping(&self) -> Result<bool> {
        self.inner.ping().await
    }
}

#[async_trait]
impl RemoteStats for CountingStore {
    async fn remote_stats(&self) -> Result<RemoteStoreStats> {
        self.inner.remote_stats().await
    }
}

// ============================================================================
// Failing store
// ============================================================================

/// Every call fails as if the backend were unreachable.
pub struct FailingStore;

#[async_trait]
impl StoreClient for FailingStore {
    fn name(&self) -> &str {
        "failing"
    }

    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        Err(MimirError::StoreUnavailable("connection refused".into()))
    }

    async fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> Result<bool> {
        Err(MimirError::StoreUnavailable("connection refused".into()))
    }

    async fn delete(&self, _keys: &[String]) -> Result<u64> {
        Err(MimirError::StoreOperation {
            operation: "delete",
            message: "READONLY".into(),
        })
    }

    async fn scan(&self, _pattern: &str) -> Result<Vec<String>> {
        Err(MimirError::StoreUnavailable("connection refused".into()))
    }

    async fn ping(&self) -> Result<bool> {
        Err(MimirError::StoreUnavailable("connection refused".into()))
    }
}

#[async_trait]
impl RemoteStats for FailingStore {
    async fn remote_stats(&self) -> Result<RemoteStoreStats> {
        Err(MimirError::StoreUnavailable("connection refused".into()))
    }
}

// ============================================================================
// Slow store
// ============================================================================

/// Sleeps before every call, for exercising the store timeout.
pub struct SlowStore {
    pub delay: Duration,
}

#[async_trait]
impl StoreClient for SlowStore {
    fn name(&self) -> &str {
        "slow"
    }

    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        tokio::time::sleep(self.delay).await;
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> Result<bool> {
        tokio::time::sleep(self.delay).await;
        Ok(true)
    }

    async fn delete(&self, _keys: &[String]) -> Result<u64> {
        tokio::time::sleep(self.delay).await;
        Ok(0)
    }

    async fn scan(&self, _pattern: &str) -> Result<Vec<String>> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }

    async fn ping(&self) -> Result<bool> {
        tokio::time::sleep(self.delay).await;
        Ok(true)
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn opts() -> Options {
    Options::new()
}

pub fn engine_with(config: CacheConfig, store: Arc<dyn StoreClient>) -> CacheEngine {
    CacheEngine::builder()
        .config(config)
        .store(store)
        .build()
        .expect("valid engine config")
}
