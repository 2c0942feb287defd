//! Performance and statistics monitor.
//!
//! [`PerformanceMonitor`] receives recording calls from the
//! [`CacheEngine`](crate::cache::CacheEngine) (and any other instrumented
//! component) and turns raw samples into percentiles, outlier sets,
//! confidence intervals and threshold-based warnings.
//!
//! # Buffers
//!
//! Each metric kind is kept in its own bounded buffer. Appending drops the
//! oldest samples once `max_measurements` is exceeded and drops samples
//! older than `retention_hours`. Running counters (operations, hits,
//! misses, invalidations) are cumulative and unaffected by trimming.
//!
//! All buffers sit behind one mutex held only for the append-and-trim step
//! or for copying samples out; statistics are computed after the lock is
//! released.
//!
//! # Hit rate
//!
//! `hit_rate = cache_hits / total_operations * 100`. Every cache operation
//! (`set`, `delete`, `exists`, external `record_operation` calls) counts
//! toward `total_operations`, but only `get` operations count toward hits
//! and misses, so non-`get` traffic dilutes the rate.

pub mod stats;

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::MonitorConfig;
use crate::types::{
    CacheOperationMetric, CompressionMetric, Extra, InvalidationEvent, InvalidationKind,
    KeyGenerationMetric, MemorySample, MemoryUsageMetric, STATUS_FAILED, STATUS_FIELD,
    STATUS_SUCCESS,
};

pub use stats::{
    ConfidenceInterval, DurationSummary, confidence_interval, detect_outliers, mean, percentile,
    std_dev,
};

/// Operation type whose outcomes count toward hits and misses.
const GET_OPERATION: &str = "get";

/// Number of events returned in [`InvalidationStats::recent`].
const RECENT_INVALIDATIONS: usize = 10;

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1_000.0
}

trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

macro_rules! timestamped {
    ($($t:ty),*) => {
        $(impl Timestamped for $t {
            fn timestamp(&self) -> DateTime<Utc> {
                self.timestamp
            }
        })*
    };
}

timestamped!(
    KeyGenerationMetric,
    CacheOperationMetric,
    CompressionMetric,
    MemoryUsageMetric,
    InvalidationEvent
);

fn push_bounded<T: Timestamped>(
    buf: &mut VecDeque<T>,
    item: T,
    max: usize,
    cutoff: Option<DateTime<Utc>>,
) {
    buf.push_back(item);
    while buf.len() > max {
        buf.pop_front();
    }
    if let Some(cutoff) = cutoff {
        while buf.front().is_some_and(|m| m.timestamp() < cutoff) {
            buf.pop_front();
        }
    }
}

/// Cumulative counters, unaffected by buffer trimming.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub total_operations: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub total_invalidations: u64,
    pub total_keys_invalidated: u64,
}

impl Counters {
    /// `cache_hits / total_operations * 100`, or 0 with no operations.
    pub fn hit_rate_percent(&self) -> f64 {
        if self.total_operations == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total_operations as f64 * 100.0
        }
    }
}

struct State {
    key_generation: VecDeque<KeyGenerationMetric>,
    cache_operations: VecDeque<CacheOperationMetric>,
    compression: VecDeque<CompressionMetric>,
    memory: VecDeque<MemoryUsageMetric>,
    invalidations: VecDeque<InvalidationEvent>,
    counters: Counters,
    started_at: DateTime<Utc>,
}

impl State {
    fn new() -> Self {
        Self {
            key_generation: VecDeque::new(),
            cache_operations: VecDeque::new(),
            compression: VecDeque::new(),
            memory: VecDeque::new(),
            invalidations: VecDeque::new(),
            counters: Counters::default(),
            started_at: Utc::now(),
        }
    }
}

/// Severity of a [`PerformanceWarning`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

/// What a [`PerformanceWarning`] is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    SlowKeyGeneration,
    SlowCacheOperation,
    MemoryUsage,
    SuccessRate,
    LatencyRegression,
    HitRateRegression,
}

/// A threshold crossed by recorded samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceWarning {
    pub kind: WarningKind,
    pub severity: Severity,
    /// Observed value (ms, bytes, or percent depending on `kind`).
    pub value: f64,
    pub threshold: f64,
    pub message: String,
}

/// Per-operation-type breakdown of cache operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OperationBreakdown {
    pub count: usize,
    pub avg_ms: f64,
    pub max_ms: f64,
    pub hits: usize,
    pub failures: usize,
}

/// Aggregated compression efficiency.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompressionSummary {
    pub count: usize,
    pub avg_ratio: f64,
    /// Lowest ratio seen (best compression).
    pub best_ratio: f64,
    /// Highest ratio seen (worst compression).
    pub worst_ratio: f64,
    pub total_bytes_saved: u64,
    pub avg_compression_time_ms: f64,
}

/// Result of [`PerformanceMonitor::get_performance_stats`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceStats {
    pub total_operations: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub hit_rate_percent: f64,
    /// Retained operations not marked failed; 100 with no samples.
    pub success_rate_percent: f64,
    pub key_generation: DurationSummary,
    pub cache_operations: DurationSummary,
    pub operations_by_type: BTreeMap<String, OperationBreakdown>,
    pub compression: CompressionSummary,
    /// Slow key generations plus slow cache operations.
    pub slow_operations: usize,
    pub warnings: Vec<PerformanceWarning>,
    pub uptime_seconds: f64,
}

/// Result of [`PerformanceMonitor::get_memory_usage_stats`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryUsageStats {
    pub sample_count: usize,
    pub latest: Option<MemoryUsageMetric>,
    pub current_total_bytes: u64,
    pub peak_total_bytes: u64,
    pub avg_total_bytes: f64,
    pub warning_threshold_bytes: u64,
    pub critical_threshold_bytes: u64,
    pub warning_threshold_reached: bool,
    pub critical_threshold_reached: bool,
}

/// Result of [`PerformanceMonitor::get_invalidation_frequency_stats`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvalidationStats {
    pub total_invalidations: u64,
    pub total_keys_invalidated: u64,
    pub failed_invalidations: usize,
    pub by_kind: BTreeMap<String, u64>,
    pub avg_keys_per_invalidation: f64,
    pub avg_duration_ms: f64,
    /// Retained events per hour over the span they cover.
    pub invalidations_per_hour: f64,
    /// Most recent events, newest last.
    pub recent: Vec<InvalidationEvent>,
}

/// Collects metric samples and computes statistics over them.
///
/// Shared by reference between the engine and whoever reads statistics;
/// create one at startup and pass an `Arc` to the engine builder.
pub struct PerformanceMonitor {
    config: MonitorConfig,
    state: Mutex<State>,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}

impl PerformanceMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            state: Mutex::new(State::new()),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    fn cutoff(&self) -> Option<DateTime<Utc>> {
        let retention = TimeDelta::from_std(self.config.retention()).ok()?;
        Utc::now().checked_sub_signed(retention)
    }

    fn mark_slow(extra: &mut Extra, duration: Duration, threshold: Duration) -> bool {
        let slow = duration > threshold;
        if slow {
            extra.insert("slow".into(), Value::Bool(true));
        }
        slow
    }

    // ------------------------------------------------------------------
    // Recording
    // ------------------------------------------------------------------

    pub fn record_key_generation_time(
        &self,
        duration: Duration,
        text_length: usize,
        operation_type: &str,
        mut extra: Extra,
    ) {
        if Self::mark_slow(&mut extra, duration, self.config.key_generation_threshold()) {
            debug!(
                operation = operation_type,
                duration_ms = millis(duration),
                "slow key generation"
            );
        }
        let metric = KeyGenerationMetric {
            duration,
            text_length,
            operation_type: operation_type.to_string(),
            timestamp: Utc::now(),
            extra,
        };
        let cutoff = self.cutoff();
        let mut state = self.state.lock();
        push_bounded(
            &mut state.key_generation,
            metric,
            self.config.max_measurements,
            cutoff,
        );
    }

    pub fn record_cache_operation_time(
        &self,
        operation_type: &str,
        duration: Duration,
        cache_hit: bool,
        text_length: usize,
        mut extra: Extra,
    ) {
        if Self::mark_slow(&mut extra, duration, self.config.cache_operation_threshold()) {
            debug!(
                operation = operation_type,
                duration_ms = millis(duration),
                "slow cache operation"
            );
        }
        let metric = CacheOperationMetric {
            operation_type: operation_type.to_string(),
            duration,
            cache_hit,
            text_length,
            timestamp: Utc::now(),
            extra,
        };
        let cutoff = self.cutoff();
        let mut state = self.state.lock();
        state.counters.total_operations += 1;
        if operation_type == GET_OPERATION {
            if cache_hit {
                state.counters.cache_hits += 1;
            } else {
                state.counters.cache_misses += 1;
            }
        }
        push_bounded(
            &mut state.cache_operations,
            metric,
            self.config.max_measurements,
            cutoff,
        );
    }

    pub fn record_compression_ratio(
        &self,
        original_size: usize,
        compressed_size: usize,
        compression_time: Duration,
        operation_type: &str,
    ) {
        let metric = CompressionMetric::new(
            original_size,
            compressed_size,
            compression_time,
            operation_type,
        );
        let cutoff = self.cutoff();
        let mut state = self.state.lock();
        push_bounded(
            &mut state.compression,
            metric,
            self.config.max_measurements,
            cutoff,
        );
    }

    /// Record a memory snapshot, returning the derived metric.
    pub fn record_memory_usage(&self, sample: MemorySample) -> MemoryUsageMetric {
        let metric = MemoryUsageMetric::from_sample(sample, self.config.memory_warning_bytes);
        let cutoff = self.cutoff();
        let mut state = self.state.lock();
        push_bounded(
            &mut state.memory,
            metric.clone(),
            self.config.max_measurements,
            cutoff,
        );
        metric
    }

    pub fn record_invalidation_event(
        &self,
        pattern: &str,
        keys_invalidated: u64,
        duration: Duration,
        invalidation_type: InvalidationKind,
        operation_context: &str,
        extra: Extra,
    ) {
        let event = InvalidationEvent {
            pattern: pattern.to_string(),
            keys_invalidated,
            duration,
            invalidation_type,
            operation_context: operation_context.to_string(),
            timestamp: Utc::now(),
            extra,
        };
        let cutoff = self.cutoff();
        let mut state = self.state.lock();
        state.counters.total_invalidations += 1;
        state.counters.total_keys_invalidated += keys_invalidated;
        push_bounded(
            &mut state.invalidations,
            event,
            self.config.max_measurements,
            cutoff,
        );
    }

    /// Generic hook for external integrations.
    ///
    /// Recorded as a cache operation that is never a hit; `success = false`
    /// marks it failed for the success rate.
    pub fn record_operation(
        &self,
        operation_type: &str,
        duration: Duration,
        success: bool,
        mut extra: Extra,
    ) {
        let status = if success {
            STATUS_SUCCESS
        } else {
            STATUS_FAILED
        };
        extra.insert(STATUS_FIELD.into(), Value::from(status));
        self.record_cache_operation_time(operation_type, duration, false, 0, extra);
    }

    // ------------------------------------------------------------------
    // Raw access
    // ------------------------------------------------------------------

    pub fn counters(&self) -> Counters {
        self.state.lock().counters
    }

    pub fn key_generation_metrics(&self) -> Vec<KeyGenerationMetric> {
        self.state.lock().key_generation.iter().cloned().collect()
    }

    pub fn cache_operation_metrics(&self) -> Vec<CacheOperationMetric> {
        self.state.lock().cache_operations.iter().cloned().collect()
    }

    pub fn compression_metrics(&self) -> Vec<CompressionMetric> {
        self.state.lock().compression.iter().cloned().collect()
    }

    pub fn memory_usage_metrics(&self) -> Vec<MemoryUsageMetric> {
        self.state.lock().memory.iter().cloned().collect()
    }

    pub fn invalidation_events(&self) -> Vec<InvalidationEvent> {
        self.state.lock().invalidations.iter().cloned().collect()
    }

    /// Drop all samples and zero the counters.
    pub fn reset(&self) {
        *self.state.lock() = State::new();
    }

    // ------------------------------------------------------------------
    // Statistics
    // ------------------------------------------------------------------

    pub fn get_performance_stats(&self) -> PerformanceStats {
        let (key_gen, ops, compression, counters, started_at) = {
            let state = self.state.lock();
            (
                state
                    .key_generation
                    .iter()
                    .map(|m| millis(m.duration))
                    .collect::<Vec<_>>(),
                state.cache_operations.iter().cloned().collect::<Vec<_>>(),
                state.compression.iter().cloned().collect::<Vec<_>>(),
                state.counters,
                state.started_at,
            )
        };

        let op_durations: Vec<f64> = ops.iter().map(|m| millis(m.duration)).collect();
        let key_generation = DurationSummary::from_millis(
            &key_gen,
            millis(self.config.key_generation_threshold()),
        );
        let cache_operations = DurationSummary::from_millis(
            &op_durations,
            millis(self.config.cache_operation_threshold()),
        );

        let success_rate_percent = if ops.is_empty() {
            100.0
        } else {
            let ok = ops.iter().filter(|m| !m.is_failed()).count();
            ok as f64 / ops.len() as f64 * 100.0
        };

        let mut stats = PerformanceStats {
            total_operations: counters.total_operations,
            cache_hits: counters.cache_hits,
            cache_misses: counters.cache_misses,
            hit_rate_percent: counters.hit_rate_percent(),
            success_rate_percent,
            slow_operations: key_generation.slow_count + cache_operations.slow_count,
            key_generation,
            cache_operations,
            operations_by_type: breakdown_by_type(&ops),
            compression: summarize_compression(&compression),
            warnings: Vec::new(),
            uptime_seconds: (Utc::now() - started_at).num_milliseconds() as f64 / 1_000.0,
        };
        stats.warnings = self.performance_warnings(&stats);
        if let Some(w) = self.memory_warning() {
            stats.warnings.push(w);
        }
        stats
    }

    pub fn get_memory_usage_stats(&self) -> MemoryUsageStats {
        let samples: Vec<MemoryUsageMetric> = self.state.lock().memory.iter().cloned().collect();
        let totals: Vec<u64> = samples.iter().map(|m| m.total_cache_size_bytes).collect();
        let current = totals.last().copied().unwrap_or(0);
        MemoryUsageStats {
            sample_count: samples.len(),
            current_total_bytes: current,
            peak_total_bytes: totals.iter().copied().max().unwrap_or(0),
            avg_total_bytes: if totals.is_empty() {
                0.0
            } else {
                totals.iter().sum::<u64>() as f64 / totals.len() as f64
            },
            warning_threshold_bytes: self.config.memory_warning_bytes,
            critical_threshold_bytes: self.config.memory_critical_bytes,
            warning_threshold_reached: !samples.is_empty()
                && current >= self.config.memory_warning_bytes,
            critical_threshold_reached: !samples.is_empty()
                && current >= self.config.memory_critical_bytes,
            latest: samples.into_iter().last(),
        }
    }

    pub fn get_invalidation_frequency_stats(&self) -> InvalidationStats {
        let (events, counters) = {
            let state = self.state.lock();
            (
                state.invalidations.iter().cloned().collect::<Vec<_>>(),
                state.counters,
            )
        };

        let mut by_kind: BTreeMap<String, u64> = BTreeMap::new();
        for e in &events {
            *by_kind
                .entry(e.invalidation_type.as_str().to_string())
                .or_default() += 1;
        }

        let n = events.len();
        let (avg_keys, avg_duration_ms) = if n == 0 {
            (0.0, 0.0)
        } else {
            (
                events.iter().map(|e| e.keys_invalidated).sum::<u64>() as f64 / n as f64,
                events.iter().map(|e| millis(e.duration)).sum::<f64>() / n as f64,
            )
        };

        let invalidations_per_hour = match events.first() {
            Some(first) => {
                // Floor the window at one minute so a burst does not read as
                // an enormous hourly rate.
                let span_secs = (Utc::now() - first.timestamp).num_seconds().max(60) as f64;
                n as f64 / (span_secs / 3_600.0)
            }
            None => 0.0,
        };

        InvalidationStats {
            total_invalidations: counters.total_invalidations,
            total_keys_invalidated: counters.total_keys_invalidated,
            failed_invalidations: events.iter().filter(|e| e.is_failed()).count(),
            by_kind,
            avg_keys_per_invalidation: avg_keys,
            avg_duration_ms,
            invalidations_per_hour,
            recent: events[n.saturating_sub(RECENT_INVALIDATIONS)..].to_vec(),
        }
    }

    /// Evaluate every configured threshold against the current samples.
    pub fn check_thresholds(&self) -> Vec<PerformanceWarning> {
        self.get_performance_stats().warnings
    }

    /// Compare `current` against a `baseline` taken earlier.
    ///
    /// Flags a rise in average cache-operation latency or a drop in hit
    /// rate, relative to the baseline, using the configured regression
    /// percentages.
    pub fn compare_against(
        &self,
        baseline: &PerformanceStats,
        current: &PerformanceStats,
    ) -> Vec<PerformanceWarning> {
        let mut warnings = Vec::new();

        let base_latency = baseline.cache_operations.avg_ms;
        if base_latency > 0.0 {
            let change = (current.cache_operations.avg_ms - base_latency) / base_latency * 100.0;
            if let Some(severity) = self.regression_severity(change) {
                warnings.push(PerformanceWarning {
                    kind: WarningKind::LatencyRegression,
                    severity,
                    value: change,
                    threshold: self.regression_threshold(severity),
                    message: format!(
                        "average cache operation latency rose {change:.1}% ({base_latency:.3}ms -> {:.3}ms)",
                        current.cache_operations.avg_ms
                    ),
                });
            }
        }

        let base_hit_rate = baseline.hit_rate_percent;
        if base_hit_rate > 0.0 {
            let drop = (base_hit_rate - current.hit_rate_percent) / base_hit_rate * 100.0;
            if let Some(severity) = self.regression_severity(drop) {
                warnings.push(PerformanceWarning {
                    kind: WarningKind::HitRateRegression,
                    severity,
                    value: drop,
                    threshold: self.regression_threshold(severity),
                    message: format!(
                        "hit rate fell {drop:.1}% ({base_hit_rate:.1}% -> {:.1}%)",
                        current.hit_rate_percent
                    ),
                });
            }
        }

        warnings
    }

    fn regression_severity(&self, change_percent: f64) -> Option<Severity> {
        if change_percent >= self.config.regression_critical_percent {
            Some(Severity::Critical)
        } else if change_percent >= self.config.regression_warning_percent {
            Some(Severity::Warning)
        } else {
            None
        }
    }

    fn regression_threshold(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Warning => self.config.regression_warning_percent,
            Severity::Critical => self.config.regression_critical_percent,
        }
    }

    fn performance_warnings(&self, stats: &PerformanceStats) -> Vec<PerformanceWarning> {
        let mut warnings = Vec::new();

        if stats.key_generation.slow_count > 0 {
            let threshold = self.config.key_generation_warning_ms as f64;
            warnings.push(PerformanceWarning {
                kind: WarningKind::SlowKeyGeneration,
                severity: Severity::Warning,
                value: stats.key_generation.max_ms,
                threshold,
                message: format!(
                    "{} key generations exceeded {threshold}ms",
                    stats.key_generation.slow_count
                ),
            });
        }
        if stats.cache_operations.slow_count > 0 {
            let threshold = self.config.cache_operation_warning_ms as f64;
            warnings.push(PerformanceWarning {
                kind: WarningKind::SlowCacheOperation,
                severity: Severity::Warning,
                value: stats.cache_operations.max_ms,
                threshold,
                message: format!(
                    "{} cache operations exceeded {threshold}ms",
                    stats.cache_operations.slow_count
                ),
            });
        }
        if stats.cache_operations.count > 0
            && stats.success_rate_percent < self.config.min_success_rate_percent
        {
            warnings.push(PerformanceWarning {
                kind: WarningKind::SuccessRate,
                severity: Severity::Warning,
                value: stats.success_rate_percent,
                threshold: self.config.min_success_rate_percent,
                message: format!(
                    "success rate {:.1}% below minimum {:.1}%",
                    stats.success_rate_percent, self.config.min_success_rate_percent
                ),
            });
        }
        warnings
    }

    fn memory_warning(&self) -> Option<PerformanceWarning> {
        let latest = self.state.lock().memory.back()?.total_cache_size_bytes;
        let (severity, threshold) = if latest >= self.config.memory_critical_bytes {
            (Severity::Critical, self.config.memory_critical_bytes)
        } else if latest >= self.config.memory_warning_bytes {
            (Severity::Warning, self.config.memory_warning_bytes)
        } else {
            return None;
        };
        Some(PerformanceWarning {
            kind: WarningKind::MemoryUsage,
            severity,
            value: latest as f64,
            threshold: threshold as f64,
            message: format!("total cache size {latest} bytes reached {threshold} bytes"),
        })
    }
}

fn breakdown_by_type(ops: &[CacheOperationMetric]) -> BTreeMap<String, OperationBreakdown> {
    let mut out: BTreeMap<String, OperationBreakdown> = BTreeMap::new();
    for m in ops {
        let entry = out.entry(m.operation_type.clone()).or_default();
        let ms = millis(m.duration);
        // Running mean keeps a single pass.
        entry.count += 1;
        entry.avg_ms += (ms - entry.avg_ms) / entry.count as f64;
        entry.max_ms = entry.max_ms.max(ms);
        if m.cache_hit {
            entry.hits += 1;
        }
        if m.is_failed() {
            entry.failures += 1;
        }
    }
    out
}

fn summarize_compression(samples: &[CompressionMetric]) -> CompressionSummary {
    if samples.is_empty() {
        return CompressionSummary::default();
    }
    let ratios: Vec<f64> = samples.iter().map(|m| m.compression_ratio).collect();
    CompressionSummary {
        count: samples.len(),
        avg_ratio: mean(&ratios),
        best_ratio: ratios.iter().copied().fold(f64::INFINITY, f64::min),
        worst_ratio: ratios.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        total_bytes_saved: samples.iter().map(|m| m.bytes_saved() as u64).sum(),
        avg_compression_time_ms: samples
            .iter()
            .map(|m| millis(m.compression_time))
            .sum::<f64>()
            / samples.len() as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_drop_oldest_beyond_max() {
        let monitor = PerformanceMonitor::new(MonitorConfig::new().max_measurements(3));
        for i in 0..5 {
            monitor.record_key_generation_time(
                Duration::from_millis(i),
                i as usize,
                "op",
                Extra::new(),
            );
        }
        let lengths: Vec<usize> = monitor
            .key_generation_metrics()
            .iter()
            .map(|m| m.text_length)
            .collect();
        assert_eq!(lengths, vec![2, 3, 4]);
    }

    fn key_metric_at(timestamp: DateTime<Utc>, text_length: usize) -> KeyGenerationMetric {
        KeyGenerationMetric {
            duration: Duration::ZERO,
            text_length,
            operation_type: "op".into(),
            timestamp,
            extra: Extra::new(),
        }
    }

    #[test]
    fn retention_cutoff_drops_stale_front_samples() {
        let now = Utc::now();
        let cutoff = now - TimeDelta::hours(1);
        let mut buf = VecDeque::new();
        push_bounded(&mut buf, key_metric_at(now - TimeDelta::hours(3), 0), 10, None);
        push_bounded(&mut buf, key_metric_at(now - TimeDelta::hours(2), 1), 10, None);
        assert_eq!(buf.len(), 2);

        push_bounded(&mut buf, key_metric_at(now - TimeDelta::minutes(30), 2), 10, Some(cutoff));
        push_bounded(&mut buf, key_metric_at(now, 3), 10, Some(cutoff));

        let lengths: Vec<usize> = buf.iter().map(|m| m.text_length).collect();
        assert_eq!(lengths, vec![2, 3]);
    }

    #[test]
    fn count_cap_applies_without_cutoff() {
        let old = Utc::now() - TimeDelta::days(30);
        let mut buf = VecDeque::new();
        for i in 0..5 {
            push_bounded(&mut buf, key_metric_at(old, i), 2, None);
        }
        let lengths: Vec<usize> = buf.iter().map(|m| m.text_length).collect();
        assert_eq!(lengths, vec![3, 4]);
    }

    #[test]
    fn counters_survive_trimming() {
        let monitor = PerformanceMonitor::new(MonitorConfig::new().max_measurements(1));
        for _ in 0..3 {
            monitor.record_cache_operation_time("get", Duration::ZERO, true, 1, Extra::new());
        }
        assert_eq!(monitor.cache_operation_metrics().len(), 1);
        assert_eq!(monitor.counters().cache_hits, 3);
    }

    #[test]
    fn slow_samples_are_tagged() {
        let monitor = PerformanceMonitor::default();
        monitor.record_cache_operation_time(
            "set",
            Duration::from_millis(80),
            false,
            1,
            Extra::new(),
        );
        let m = &monitor.cache_operation_metrics()[0];
        assert_eq!(m.extra.get("slow"), Some(&Value::Bool(true)));
    }
}
