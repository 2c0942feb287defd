//! Performance metric records.
//!
//! Every record is immutable once created and stamped with the time it was
//! recorded. Records store what they are given: zero durations and
//! zero-length inputs are accepted as-is, and the statistics in
//! [`monitor`](crate::monitor) guard against them.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form extra attributes attached to a record.
pub type Extra = Map<String, Value>;

/// Key under which degraded operations store `"failed"` in [`Extra`].
pub const STATUS_FIELD: &str = "status";
pub const STATUS_FAILED: &str = "failed";
pub const STATUS_SUCCESS: &str = "success";

fn extra_is_failed(extra: &Extra) -> bool {
    extra.get(STATUS_FIELD).and_then(Value::as_str) == Some(STATUS_FAILED)
}

/// Time spent deriving one cache key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyGenerationMetric {
    pub duration: Duration,
    pub text_length: usize,
    pub operation_type: String,
    pub timestamp: DateTime<Utc>,
    pub extra: Extra,
}

/// One cache operation (`get`, `set`, `delete`, `exists`, or external).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheOperationMetric {
    pub operation_type: String,
    pub duration: Duration,
    pub cache_hit: bool,
    pub text_length: usize,
    pub timestamp: DateTime<Utc>,
    pub extra: Extra,
}

impl CacheOperationMetric {
    /// Whether the operation degraded because of a store failure.
    pub fn is_failed(&self) -> bool {
        extra_is_failed(&self.extra)
    }
}

/// Outcome of compressing one payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionMetric {
    pub original_size: usize,
    pub compressed_size: usize,
    /// `compressed_size / original_size`; lower is better.
    pub compression_ratio: f64,
    pub compression_time: Duration,
    pub operation_type: String,
    pub timestamp: DateTime<Utc>,
}

impl CompressionMetric {
    /// Build a record, deriving the ratio when `original_size > 0`.
    ///
    /// With a zero original size the ratio is left at 1.0 (no change).
    pub fn new(
        original_size: usize,
        compressed_size: usize,
        compression_time: Duration,
        operation_type: impl Into<String>,
    ) -> Self {
        let compression_ratio = if original_size > 0 {
            compressed_size as f64 / original_size as f64
        } else {
            1.0
        };
        Self {
            original_size,
            compressed_size,
            compression_ratio,
            compression_time,
            operation_type: operation_type.into(),
            timestamp: Utc::now(),
        }
    }

    /// Bytes saved by compression (zero if it grew).
    pub fn bytes_saved(&self) -> usize {
        self.original_size.saturating_sub(self.compressed_size)
    }
}

/// Raw memory figures supplied by the caller of
/// [`PerformanceMonitor::record_memory_usage`](crate::monitor::PerformanceMonitor::record_memory_usage).
///
/// Remote figures are optional: they are only known when the engine has a
/// [`RemoteStats`](crate::store::RemoteStats) provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySample {
    pub memory_tier_entry_count: usize,
    pub memory_tier_size_bytes: u64,
    pub memory_tier_capacity: usize,
    pub remote_size_bytes: Option<u64>,
    pub remote_key_count: Option<u64>,
    pub process_memory_mb: Option<f64>,
    pub extra: Extra,
}

/// Point-in-time memory footprint of the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryUsageMetric {
    pub memory_tier_entry_count: usize,
    pub memory_tier_size_bytes: u64,
    /// Memory tier bytes plus remote store bytes, when known.
    pub total_cache_size_bytes: u64,
    /// Memory tier entries plus remote key count, when known.
    pub cache_entry_count: u64,
    pub avg_entry_size_bytes: f64,
    /// Memory tier occupancy against its capacity.
    pub cache_utilization_percent: f64,
    pub warning_threshold_reached: bool,
    pub process_memory_mb: f64,
    pub timestamp: DateTime<Utc>,
    pub extra: Extra,
}

impl MemoryUsageMetric {
    /// Derive a metric from a raw sample, flagging it against `warning_bytes`.
    pub fn from_sample(sample: MemorySample, warning_bytes: u64) -> Self {
        let total_cache_size_bytes =
            sample.memory_tier_size_bytes + sample.remote_size_bytes.unwrap_or(0);
        let cache_entry_count =
            sample.memory_tier_entry_count as u64 + sample.remote_key_count.unwrap_or(0);
        let avg_entry_size_bytes = if cache_entry_count > 0 {
            total_cache_size_bytes as f64 / cache_entry_count as f64
        } else {
            0.0
        };
        let cache_utilization_percent = if sample.memory_tier_capacity > 0 {
            sample.memory_tier_entry_count as f64 / sample.memory_tier_capacity as f64 * 100.0
        } else {
            0.0
        };
        Self {
            memory_tier_entry_count: sample.memory_tier_entry_count,
            memory_tier_size_bytes: sample.memory_tier_size_bytes,
            total_cache_size_bytes,
            cache_entry_count,
            avg_entry_size_bytes,
            cache_utilization_percent,
            warning_threshold_reached: total_cache_size_bytes >= warning_bytes,
            process_memory_mb: sample.process_memory_mb.unwrap_or(0.0),
            timestamp: Utc::now(),
            extra: sample.extra,
        }
    }
}

/// How an invalidation was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidationKind {
    /// Keys matching an arbitrary substring pattern.
    Pattern,
    /// Every cache key, plus the memory tier.
    All,
    /// Keys of one operation type.
    Operation,
    /// The memory tier only; the remote store is untouched.
    Memory,
}

impl InvalidationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidationKind::Pattern => "pattern",
            InvalidationKind::All => "all",
            InvalidationKind::Operation => "operation",
            InvalidationKind::Memory => "memory",
        }
    }
}

impl std::fmt::Display for InvalidationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One invalidation request and its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidationEvent {
    pub pattern: String,
    pub keys_invalidated: u64,
    pub duration: Duration,
    pub invalidation_type: InvalidationKind,
    pub operation_context: String,
    pub timestamp: DateTime<Utc>,
    pub extra: Extra,
}

impl InvalidationEvent {
    /// Whether the remote store could not be reached for this invalidation.
    pub fn is_failed(&self) -> bool {
        extra_is_failed(&self.extra)
    }
}
