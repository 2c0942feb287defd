//! Two-tier cache engine.
//!
//! [`CacheEngine`] routes values between the in-process [`MemoryTier`] and
//! a shared [`StoreClient`]. It holds no state of its own beyond the memory
//! tier contents; everything else is injected through
//! [`CacheEngineBuilder`].
//!
//! # Read path
//!
//! Small-tier texts are looked up in the memory tier first, and a hit there
//! never touches the remote store. Everything else (and small-tier misses)
//! goes to the store; a small-tier remote hit is copied into the memory
//! tier on the way out.
//!
//! # Degradation
//!
//! Every remote call is bounded by `store_timeout_ms`. Store failures and
//! timeouts are logged, counted, and turned into a miss (`get`), a no-op
//! (`set`, `delete`) or a failed invalidation record. The only error a
//! caller ever sees is [`MimirError::Decode`] from `get`, which means the
//! stored bytes are corrupt.
//!
//! # Writes
//!
//! `set` does not seed the memory tier for new keys. A small-tier key only
//! enters the tier through a remote hit on `get`. A key already resident
//! is refreshed in place after a successful write so the tier never serves
//! a value older than the store's.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::MemoryTier;
use crate::codec::{Codec, Encoded};
use crate::config::CacheConfig;
use crate::error::ConstraintViolation;
use crate::key::{CacheKey, KEY_PREFIX, KeyGenerator, Options};
use crate::monitor::PerformanceMonitor;
use crate::store::{RemoteStats, StoreClient};
use crate::telemetry;
use crate::types::{
    Extra, InvalidationKind, MemorySample, MemoryUsageMetric, STATUS_FAILED, STATUS_FIELD,
    STATUS_SUCCESS, SizeTier, StoredValue,
};
use crate::{MimirError, Result};

fn op_extra(status: &str, tier: SizeTier, operation: &str) -> Extra {
    let mut extra = Extra::new();
    extra.insert(STATUS_FIELD.into(), Value::from(status));
    extra.insert("tier".into(), Value::from(tier.as_str()));
    extra.insert("operation".into(), Value::from(operation));
    extra
}

fn mark_failed(extra: &mut Extra, error: &MimirError) {
    extra.insert(STATUS_FIELD.into(), Value::from(STATUS_FAILED));
    extra.insert("error".into(), Value::from(error.to_string()));
}

/// Two-tier response cache over an injected remote store.
///
/// ```rust
/// # use std::sync::Arc;
/// # use mimir::{CacheEngine, InMemoryStore};
/// # use mimir::key::Options;
/// # use serde_json::json;
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> mimir::Result<()> {
/// let engine = CacheEngine::builder()
///     .store(Arc::new(InMemoryStore::new()))
///     .build()?;
///
/// let opts = Options::new();
/// engine.set("I loved it", "sentiment", &opts, json!({"label": "pos"}), None).await;
/// let hit = engine.get("I loved it", "sentiment", &opts, None).await?;
/// assert_eq!(hit.unwrap().get("label"), Some(&json!("pos")));
/// # Ok(())
/// # }
/// ```
pub struct CacheEngine {
    config: CacheConfig,
    keys: KeyGenerator,
    codec: Codec,
    memory: MemoryTier,
    store: Arc<dyn StoreClient>,
    remote_stats: Option<Arc<dyn RemoteStats>>,
    monitor: Arc<PerformanceMonitor>,
}

impl CacheEngine {
    pub fn builder() -> CacheEngineBuilder {
        CacheEngineBuilder::new()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn monitor(&self) -> &Arc<PerformanceMonitor> {
        &self.monitor
    }

    pub fn memory_tier(&self) -> &MemoryTier {
        &self.memory
    }

    /// Size tier of `text` under the configured thresholds.
    pub fn size_tier(&self, text: &str) -> SizeTier {
        self.config.size_tiers.classify(text.chars().count())
    }

    /// The key `get`/`set` would use, without recording a timing sample.
    pub fn cache_key(
        &self,
        text: &str,
        operation: &str,
        options: &Options,
        question: Option<&str>,
    ) -> CacheKey {
        self.keys.generate(text, operation, options, question)
    }

    // ------------------------------------------------------------------
    // Data path
    // ------------------------------------------------------------------

    /// Look up a cached value.
    ///
    /// Returns `Ok(None)` on a miss and whenever the remote store fails.
    /// Returns [`MimirError::Decode`] if the stored bytes are corrupt.
    pub async fn get(
        &self,
        text: &str,
        operation: &str,
        options: &Options,
        question: Option<&str>,
    ) -> Result<Option<StoredValue>> {
        let start = Instant::now();
        let text_length = text.chars().count();
        let tier = self.config.size_tiers.classify(text_length);
        let key = self.generate_key(text, operation, options, question, text_length);

        let resident = match tier {
            SizeTier::Small => self.memory.get(key.as_str()),
            _ => None,
        };
        if let Some(value) = resident {
            metrics::counter!(telemetry::CACHE_HITS_TOTAL, "tier" => "memory").increment(1);
            debug!(key = %key, "memory tier hit");
            let mut extra = op_extra(STATUS_SUCCESS, tier, operation);
            extra.insert("source".into(), Value::from("memory"));
            self.record_op("get", start, true, text_length, extra);
            return Ok(Some(value));
        }

        let mut extra = op_extra(STATUS_SUCCESS, tier, operation);
        let bytes = match self.bounded("get", self.store.get(key.as_str())).await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.store_failure("get", &e);
                mark_failed(&mut extra, &e);
                None
            }
        };

        let Some(bytes) = bytes else {
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
            debug!(key = %key, "cache miss");
            self.record_op("get", start, false, text_length, extra);
            return Ok(None);
        };

        let value: StoredValue = match self.codec.decode(&bytes) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "corrupt cache entry");
                mark_failed(&mut extra, &e);
                self.record_op("get", start, false, text_length, extra);
                return Err(e);
            }
        };

        if tier == SizeTier::Small {
            self.memory.insert(key.as_str(), value.clone());
        }
        metrics::counter!(telemetry::CACHE_HITS_TOTAL, "tier" => "remote").increment(1);
        debug!(key = %key, "remote store hit");
        extra.insert("source".into(), Value::from("remote"));
        self.record_op("get", start, true, text_length, extra);
        Ok(Some(value))
    }

    /// Store a value. Failures are logged and recorded, never returned.
    pub async fn set(
        &self,
        text: &str,
        operation: &str,
        options: &Options,
        value: Value,
        question: Option<&str>,
    ) {
        let start = Instant::now();
        let text_length = text.chars().count();
        let tier = self.config.size_tiers.classify(text_length);
        let key = self.generate_key(text, operation, options, question, text_length);
        let mut extra = op_extra(STATUS_SUCCESS, tier, operation);

        let mut stored = StoredValue::new(value, operation, text_length);
        let encoded = match self.encode(&mut stored) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(key = %key, error = %e, "failed to encode cache value");
                mark_failed(&mut extra, &e);
                self.record_op("set", start, false, text_length, extra);
                return;
            }
        };

        if encoded.compressed {
            metrics::counter!(telemetry::COMPRESSED_WRITES_TOTAL).increment(1);
            self.monitor.record_compression_ratio(
                encoded.original_size,
                encoded.compressed_size,
                encoded.compression_time,
                operation,
            );
        }

        let ttl = self.config.ttl_for(operation);
        match self
            .bounded("set", self.store.set(key.as_str(), &encoded.bytes, ttl))
            .await
        {
            Ok(true) => {
                if tier == SizeTier::Small {
                    self.memory.replace_if_present(key.as_str(), stored);
                }
                debug!(
                    key = %key,
                    ttl_secs = ttl.as_secs(),
                    compressed = encoded.compressed,
                    "cached value"
                );
            }
            Ok(false) => {
                let e = MimirError::StoreOperation {
                    operation: "set",
                    message: "store rejected the write".into(),
                };
                self.store_failure("set", &e);
                mark_failed(&mut extra, &e);
            }
            Err(e) => {
                self.store_failure("set", &e);
                mark_failed(&mut extra, &e);
            }
        }
        self.record_op("set", start, false, text_length, extra);
    }

    /// Remove a cached value from both tiers.
    ///
    /// Returns whether the remote store held the key; `false` on failure.
    pub async fn delete(
        &self,
        text: &str,
        operation: &str,
        options: &Options,
        question: Option<&str>,
    ) -> bool {
        let start = Instant::now();
        let text_length = text.chars().count();
        let tier = self.config.size_tiers.classify(text_length);
        let key = self.generate_key(text, operation, options, question, text_length);
        let mut extra = op_extra(STATUS_SUCCESS, tier, operation);

        self.memory.remove(key.as_str());
        let keys = [key.into_string()];
        let removed = match self.bounded("delete", self.store.delete(&keys)).await {
            Ok(n) => n > 0,
            Err(e) => {
                self.store_failure("delete", &e);
                mark_failed(&mut extra, &e);
                false
            }
        };
        self.record_op("delete", start, false, text_length, extra);
        removed
    }

    /// Whether a value is cached, checking the memory tier first.
    pub async fn exists(
        &self,
        text: &str,
        operation: &str,
        options: &Options,
        question: Option<&str>,
    ) -> bool {
        let start = Instant::now();
        let text_length = text.chars().count();
        let tier = self.config.size_tiers.classify(text_length);
        let key = self.generate_key(text, operation, options, question, text_length);
        let mut extra = op_extra(STATUS_SUCCESS, tier, operation);

        let found = if tier == SizeTier::Small && self.memory.contains(key.as_str()) {
            true
        } else {
            match self.bounded("exists", self.store.get(key.as_str())).await {
                Ok(bytes) => bytes.is_some(),
                Err(e) => {
                    self.store_failure("exists", &e);
                    mark_failed(&mut extra, &e);
                    false
                }
            }
        };
        self.record_op("exists", start, false, text_length, extra);
        found
    }

    // ------------------------------------------------------------------
    // Invalidation
    // ------------------------------------------------------------------

    /// Delete every remote key containing `pattern`.
    ///
    /// An empty pattern matches every cache key and also clears the memory
    /// tier. Returns the number of remote keys removed (0 on failure).
    pub async fn invalidate_pattern(&self, pattern: &str, context: &str) -> u64 {
        let kind = if pattern.is_empty() {
            InvalidationKind::All
        } else {
            InvalidationKind::Pattern
        };
        self.invalidate(pattern, kind, context).await
    }

    pub async fn invalidate_all(&self, context: &str) -> u64 {
        self.invalidate("", InvalidationKind::All, context).await
    }

    /// Delete every remote key cached under exactly `operation`.
    ///
    /// The pattern includes the `|` that closes the operation segment, so
    /// `sent` does not match keys written under `sentiment`.
    pub async fn invalidate_by_operation(&self, operation: &str, context: &str) -> u64 {
        self.invalidate(&format!("op:{operation}|"), InvalidationKind::Operation, context)
            .await
    }

    /// Clear the memory tier only, returning the number of entries dropped.
    pub fn invalidate_memory_tier(&self, context: &str) -> usize {
        let start = Instant::now();
        let cleared = self.memory.clear();
        let mut extra = Extra::new();
        extra.insert(STATUS_FIELD.into(), Value::from(STATUS_SUCCESS));
        metrics::counter!(
            telemetry::KEYS_INVALIDATED_TOTAL,
            "kind" => InvalidationKind::Memory.as_str()
        )
        .increment(cleared as u64);
        info!(cleared, context, "cleared memory tier");
        self.monitor.record_invalidation_event(
            "",
            cleared as u64,
            start.elapsed(),
            InvalidationKind::Memory,
            context,
            extra,
        );
        cleared
    }

    async fn invalidate(&self, pattern: &str, kind: InvalidationKind, context: &str) -> u64 {
        let start = Instant::now();
        let glob = if pattern.is_empty() {
            self.memory.clear();
            format!("{KEY_PREFIX}*")
        } else {
            format!("{KEY_PREFIX}*{pattern}*")
        };

        let mut extra = Extra::new();
        extra.insert(STATUS_FIELD.into(), Value::from(STATUS_SUCCESS));
        let removed = match self.scan_and_delete(&glob).await {
            Ok(n) => {
                info!(pattern, kind = %kind, removed = n, context, "invalidated cache keys");
                n
            }
            Err(e) => {
                self.store_failure("invalidate", &e);
                mark_failed(&mut extra, &e);
                0
            }
        };
        metrics::counter!(telemetry::KEYS_INVALIDATED_TOTAL, "kind" => kind.as_str())
            .increment(removed);
        self.monitor.record_invalidation_event(
            pattern,
            removed,
            start.elapsed(),
            kind,
            context,
            extra,
        );
        removed
    }

    async fn scan_and_delete(&self, glob: &str) -> Result<u64> {
        let keys = self.bounded("scan", self.store.scan(glob)).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        self.bounded("delete", self.store.delete(&keys)).await
    }

    // ------------------------------------------------------------------
    // Health and footprint
    // ------------------------------------------------------------------

    /// Ping the remote store. Any failure reads as unhealthy.
    pub async fn health_check(&self) -> bool {
        match self.bounded("ping", self.store.ping()).await {
            Ok(alive) => alive,
            Err(e) => {
                self.store_failure("ping", &e);
                false
            }
        }
    }

    /// Record a memory snapshot with the monitor.
    ///
    /// Remote figures are included when a [`RemoteStats`] provider was
    /// configured and answers in time. `process_memory_mb` is supplied by
    /// the caller.
    pub async fn record_memory_snapshot(
        &self,
        process_memory_mb: Option<f64>,
    ) -> MemoryUsageMetric {
        let mut sample = MemorySample {
            memory_tier_entry_count: self.memory.len(),
            memory_tier_size_bytes: self.memory.size_bytes() as u64,
            memory_tier_capacity: self.memory.capacity(),
            process_memory_mb,
            ..Default::default()
        };
        if let Some(stats) = &self.remote_stats {
            match self.bounded("remote_stats", stats.remote_stats()).await {
                Ok(remote) => {
                    sample.remote_size_bytes = remote.used_memory_bytes;
                    sample.remote_key_count = remote.key_count;
                }
                Err(e) => self.store_failure("remote_stats", &e),
            }
        }
        self.monitor.record_memory_usage(sample)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let timeout = self.config.store_timeout_duration();
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(MimirError::Timeout { operation, timeout }),
        }
    }

    fn store_failure(&self, operation: &'static str, error: &MimirError) {
        metrics::counter!(telemetry::STORE_ERRORS_TOTAL, "operation" => operation).increment(1);
        warn!(
            store = self.store.name(),
            operation,
            error = %error,
            "remote store call failed, degrading"
        );
    }

    fn generate_key(
        &self,
        text: &str,
        operation: &str,
        options: &Options,
        question: Option<&str>,
        text_length: usize,
    ) -> CacheKey {
        let start = Instant::now();
        let key = self.keys.generate(text, operation, options, question);
        self.monitor.record_key_generation_time(
            start.elapsed(),
            text_length,
            operation,
            Extra::new(),
        );
        key
    }

    /// Serialize and frame `stored`, setting `compression_used` to match.
    fn encode(&self, stored: &mut StoredValue) -> Result<Encoded> {
        let payload = self.codec.serialize(stored)?;
        if !self.codec.should_compress(payload.len()) {
            return self.codec.frame(payload, false);
        }
        stored.metadata.compression_used = true;
        let payload = self.codec.serialize(stored)?;
        self.codec.frame(payload, true)
    }

    fn record_op(
        &self,
        operation: &'static str,
        start: Instant,
        cache_hit: bool,
        text_length: usize,
        extra: Extra,
    ) {
        let elapsed = start.elapsed();
        metrics::histogram!(telemetry::OPERATION_DURATION_SECONDS, "operation" => operation)
            .record(elapsed.as_secs_f64());
        self.monitor
            .record_cache_operation_time(operation, elapsed, cache_hit, text_length, extra);
    }
}

/// Builder for [`CacheEngine`].
pub struct CacheEngineBuilder {
    config: CacheConfig,
    store: Option<Arc<dyn StoreClient>>,
    remote_stats: Option<Arc<dyn RemoteStats>>,
    monitor: Option<Arc<PerformanceMonitor>>,
}

impl Default for CacheEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheEngineBuilder {
    pub fn new() -> Self {
        Self {
            config: CacheConfig::default(),
            store: None,
            remote_stats: None,
            monitor: None,
        }
    }

    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Remote store backing the engine (required).
    pub fn store(mut self, store: Arc<dyn StoreClient>) -> Self {
        self.store = Some(store);
        self
    }

    /// Optional provider of remote memory figures for memory snapshots.
    pub fn remote_stats(mut self, stats: Arc<dyn RemoteStats>) -> Self {
        self.remote_stats = Some(stats);
        self
    }

    /// Share an existing monitor. Without one, the engine creates its own
    /// from `config.monitor`.
    pub fn monitor(mut self, monitor: Arc<PerformanceMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Validate the configuration and build the engine.
    pub fn build(self) -> Result<CacheEngine> {
        let mut violations = match self.config.validate() {
            Ok(()) => Vec::new(),
            Err(MimirError::Validation(v)) => v,
            Err(e) => return Err(e),
        };
        if self.store.is_none() {
            violations.push(ConstraintViolation::new(
                "store",
                "none",
                "a StoreClient is required",
            ));
        }
        let Some(store) = self.store else {
            return Err(MimirError::Validation(violations));
        };
        if !violations.is_empty() {
            return Err(MimirError::Validation(violations));
        }

        let config = self.config;
        let monitor = self
            .monitor
            .unwrap_or_else(|| Arc::new(PerformanceMonitor::new(config.monitor.clone())));
        let keys = KeyGenerator::new()
            .hash_threshold(config.key_hash_threshold_chars)
            .algorithm(config.key_hash_algorithm);
        let codec = Codec::new(config.compression_threshold_bytes, config.compression_level);
        let memory = MemoryTier::new(config.memory_tier_capacity);

        Ok(CacheEngine {
            config,
            keys,
            codec,
            memory,
            store,
            remote_stats: self.remote_stats,
            monitor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    #[test]
    fn build_requires_store() {
        let err = CacheEngine::builder().build().err().unwrap();
        assert_eq!(err.violations()[0].field, "store");
    }

    #[test]
    fn build_reports_config_and_store_together() {
        let err = CacheEngine::builder()
            .config(CacheConfig::new().compression_level(0))
            .build()
            .err()
            .unwrap();
        let fields: Vec<_> = err.violations().iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["compression_level", "store"]);
    }

    #[tokio::test]
    async fn compressed_writes_flag_metadata() {
        let engine = CacheEngine::builder()
            .config(CacheConfig::new().compression_threshold(64))
            .store(Arc::new(InMemoryStore::new()))
            .build()
            .unwrap();
        let opts = Options::new();
        engine
            .set("t", "summarize", &opts, Value::from("x".repeat(500)), None)
            .await;
        let v = engine
            .get("t", "summarize", &opts, None)
            .await
            .unwrap()
            .unwrap();
        assert!(v.metadata.compression_used);
        assert_eq!(engine.monitor().compression_metrics().len(), 1);
    }
}
