//! Mimir - two-tier response cache for expensive text-keyed computations
//!
//! Results of AI inference calls (sentiment, summaries, answers to questions
//! about a text) are cached under deterministic keys derived from the input
//! text, the operation name, its options and an optional question. Small
//! inputs are served from a bounded in-process tier; everything is persisted
//! to a shared remote store.
//!
//! Every cache operation is instrumented: an explicit [`PerformanceMonitor`]
//! collects timings, compression ratios, memory footprint and invalidation
//! activity and turns them into percentiles, outliers and warnings.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use mimir::{CacheConfig, CacheEngine, InMemoryStore, PerformanceMonitor};
//! use mimir::key::Options;
//! use serde_json::json;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> mimir::Result<()> {
//! let config = CacheConfig::new().operation_ttl("summarize", Duration::from_secs(86_400));
//! let monitor = Arc::new(PerformanceMonitor::new(config.monitor.clone()));
//! let engine = CacheEngine::builder()
//!     .config(config)
//!     .store(Arc::new(InMemoryStore::new()))
//!     .monitor(monitor.clone())
//!     .build()?;
//!
//! let opts = Options::new();
//! engine.set("short text", "sentiment", &opts, json!({"label": "pos"}), None).await;
//! let cached = engine.get("short text", "sentiment", &opts, None).await?;
//! assert!(cached.is_some());
//!
//! let stats = monitor.get_performance_stats();
//! assert_eq!(stats.cache_hits, 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Remote store
//!
//! The engine talks to its backend through [`StoreClient`]. An in-process
//! [`InMemoryStore`] is always available; `RedisStore` is enabled by the
//! `redis` feature.

pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod key;
pub mod monitor;
pub mod store;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use cache::{CacheEngine, CacheEngineBuilder, MemoryTier};
pub use codec::Codec;
pub use config::{CacheConfig, MonitorConfig};
pub use error::{ConstraintViolation, MimirError, Result};
pub use key::{CacheKey, KeyGenerator, KeyHashAlgorithm};
pub use monitor::{
    InvalidationStats, MemoryUsageStats, PerformanceMonitor, PerformanceStats,
    PerformanceWarning, Severity, WarningKind,
};
#[cfg(feature = "redis")]
pub use store::RedisStore;
pub use store::{InMemoryStore, RemoteStats, RemoteStoreStats, StoreClient};

// Re-export all types
pub use types::{
    CacheMetadata, CacheOperationMetric, CompressionMetric, InvalidationEvent, InvalidationKind,
    KeyGenerationMetric, MemorySample, MemoryUsageMetric, SizeTier, SizeTierThresholds,
    StoredValue,
};
