//! Telemetry metric name constants.
//!
//! Centralised metric names for mimir cache operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! These complement the in-process [`PerformanceMonitor`](crate::monitor::PerformanceMonitor),
//! which keeps raw samples for percentile and outlier analysis. The
//! counters here are for external dashboards.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `mimir_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `operation`: cache operation (e.g. "get", "set", "delete")
//! - `tier`: where a hit was served from: "memory" or "remote"
//! - `kind`: invalidation kind: "pattern", "all", "operation", "memory"

/// Total cache hits.
///
/// Labels: `tier` ("memory" | "remote").
pub const CACHE_HITS_TOTAL: &str = "mimir_cache_hits_total";

/// Total cache misses (absent at every tier, or degraded by a store error).
pub const CACHE_MISSES_TOTAL: &str = "mimir_cache_misses_total";

/// Total remote store calls that failed or timed out.
///
/// Labels: `operation`.
pub const STORE_ERRORS_TOTAL: &str = "mimir_store_errors_total";

/// Cache operation duration in seconds.
///
/// Labels: `operation`.
pub const OPERATION_DURATION_SECONDS: &str = "mimir_operation_duration_seconds";

/// Total writes whose payload crossed the compression threshold.
pub const COMPRESSED_WRITES_TOTAL: &str = "mimir_compressed_writes_total";

/// Total entries evicted from the memory tier on capacity overflow.
pub const MEMORY_TIER_EVICTIONS_TOTAL: &str = "mimir_memory_tier_evictions_total";

/// Total keys removed by invalidation.
///
/// Labels: `kind`.
pub const KEYS_INVALIDATED_TOTAL: &str = "mimir_keys_invalidated_total";
