//! Engine and monitor configuration.
//!
//! Both config types can be built in code with chained setters or loaded
//! from TOML. Configuration is loaded with the following resolution order:
//! 1. `CacheConfig::load(Some(path))` (explicit path)
//! 2. `~/.mimir/config.toml` (user)
//! 3. `/etc/mimir/config.toml` (system)
//!
//! Loaded configs are validated before being returned; validation collects
//! every violated constraint rather than stopping at the first one.
//!
//! ```toml
//! default_ttl_secs = 3600
//! memory_tier_capacity = 500
//! compression_level = 6
//!
//! [operation_ttls]
//! summarize = 86400
//! sentiment = 7200
//!
//! [size_tiers]
//! small = 500
//! medium = 5000
//! large = 50000
//!
//! [monitor]
//! max_measurements = 5000
//! cache_operation_warning_ms = 25
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_MEMORY_TIER_CAPACITY;
use crate::codec::{DEFAULT_COMPRESSION_LEVEL, DEFAULT_COMPRESSION_THRESHOLD};
use crate::error::ConstraintViolation;
use crate::key::{DEFAULT_HASH_THRESHOLD, KeyHashAlgorithm};
use crate::types::SizeTierThresholds;
use crate::{MimirError, Result};

const MIB: u64 = 1024 * 1024;

/// Configuration consumed by [`CacheEngine`](crate::cache::CacheEngine).
///
/// ```rust
/// # use mimir::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .default_ttl(Duration::from_secs(1800))
///     .operation_ttl("summarize", Duration::from_secs(86_400))
///     .memory_tier_capacity(256);
/// assert_eq!(config.ttl_for("summarize"), Duration::from_secs(86_400));
/// assert_eq!(config.ttl_for("translate"), Duration::from_secs(1800));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL for operations without an entry in `operation_ttls`. Default: 1 hour.
    pub default_ttl_secs: u64,
    /// Per-operation TTL overrides, in seconds.
    pub operation_ttls: BTreeMap<String, u64>,
    /// Maximum memory tier entries; 0 disables the tier. Default: 1,000.
    pub memory_tier_capacity: usize,
    /// Character-length thresholds for size tiers. Default: 500/5,000/50,000.
    pub size_tiers: SizeTierThresholds,
    /// Serialized size above which payloads are compressed. Default: 1,024.
    pub compression_threshold_bytes: usize,
    /// zstd level, 1–9. Default: 6.
    pub compression_level: i32,
    /// Text length above which keys hash the text. Default: 1,000.
    pub key_hash_threshold_chars: usize,
    /// Digest used in keys. Default: sha256.
    pub key_hash_algorithm: KeyHashAlgorithm,
    /// Upper bound on any single remote store call. Default: 5,000ms.
    pub store_timeout_ms: u64,
    pub monitor: MonitorConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 3_600,
            operation_ttls: BTreeMap::new(),
            memory_tier_capacity: DEFAULT_MEMORY_TIER_CAPACITY,
            size_tiers: SizeTierThresholds::default(),
            compression_threshold_bytes: DEFAULT_COMPRESSION_THRESHOLD,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            key_hash_threshold_chars: DEFAULT_HASH_THRESHOLD,
            key_hash_algorithm: KeyHashAlgorithm::default(),
            store_timeout_ms: 5_000,
            monitor: MonitorConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the TTL used for operations without an override.
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl_secs = ttl.as_secs();
        self
    }

    /// Override the TTL for one operation.
    pub fn operation_ttl(mut self, operation: impl Into<String>, ttl: Duration) -> Self {
        self.operation_ttls.insert(operation.into(), ttl.as_secs());
        self
    }

    /// Set the memory tier capacity (0 disables the tier).
    pub fn memory_tier_capacity(mut self, n: usize) -> Self {
        self.memory_tier_capacity = n;
        self
    }

    /// Set the size tier thresholds.
    pub fn size_tiers(mut self, thresholds: SizeTierThresholds) -> Self {
        self.size_tiers = thresholds;
        self
    }

    /// Set the compression threshold in serialized bytes.
    pub fn compression_threshold(mut self, bytes: usize) -> Self {
        self.compression_threshold_bytes = bytes;
        self
    }

    /// Set the compression level (1–9).
    pub fn compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    /// Set the text length above which keys hash the text.
    pub fn key_hash_threshold(mut self, chars: usize) -> Self {
        self.key_hash_threshold_chars = chars;
        self
    }

    /// Set the key digest algorithm.
    pub fn key_hash_algorithm(mut self, algorithm: KeyHashAlgorithm) -> Self {
        self.key_hash_algorithm = algorithm;
        self
    }

    /// Set the per-call remote store timeout.
    pub fn store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the monitor configuration.
    pub fn monitor(mut self, monitor: MonitorConfig) -> Self {
        self.monitor = monitor;
        self
    }

    /// Resolve the TTL for an operation.
    pub fn ttl_for(&self, operation: &str) -> Duration {
        let secs = self
            .operation_ttls
            .get(operation)
            .copied()
            .unwrap_or(self.default_ttl_secs);
        Duration::from_secs(secs)
    }

    pub fn store_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Check every constraint, returning all violations at once.
    pub fn validate(&self) -> Result<()> {
        let mut violations = Vec::new();

        if self.default_ttl_secs == 0 {
            violations.push(ConstraintViolation::new(
                "default_ttl_secs",
                self.default_ttl_secs,
                "must be greater than 0",
            ));
        }
        for (op, ttl) in &self.operation_ttls {
            if *ttl == 0 {
                violations.push(ConstraintViolation::new(
                    format!("operation_ttls.{op}"),
                    ttl,
                    "must be greater than 0",
                ));
            }
            if op.is_empty() {
                violations.push(ConstraintViolation::new(
                    "operation_ttls",
                    "\"\"",
                    "operation names must not be empty",
                ));
            }
        }
        if !self.size_tiers.is_ascending() {
            violations.push(ConstraintViolation::new(
                "size_tiers",
                format!(
                    "{}/{}/{}",
                    self.size_tiers.small, self.size_tiers.medium, self.size_tiers.large
                ),
                "thresholds must be strictly ascending",
            ));
        }
        if !(1..=9).contains(&self.compression_level) {
            violations.push(ConstraintViolation::new(
                "compression_level",
                self.compression_level,
                "must be between 1 and 9",
            ));
        }
        if self.store_timeout_ms == 0 {
            violations.push(ConstraintViolation::new(
                "store_timeout_ms",
                self.store_timeout_ms,
                "must be greater than 0",
            ));
        }
        violations.extend(self.monitor.violations("monitor."));

        if violations.is_empty() {
            Ok(())
        } else {
            Err(MimirError::Validation(violations))
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| MimirError::Configuration(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.mimir/config.toml`
    /// 3. `/etc/mimir/config.toml`
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_config_path(explicit_path)?;
        let content = fs::read_to_string(&path).map_err(|e| {
            MimirError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        Self::from_toml_str(&content)
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(path.to_path_buf());
            }
            return Err(MimirError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".mimir").join("config.toml");
            if user_config.exists() {
                return Ok(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/mimir/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }

        Err(MimirError::Configuration(
            "No config file found. Create ~/.mimir/config.toml or /etc/mimir/config.toml".into(),
        ))
    }
}

/// Thresholds and retention for [`PerformanceMonitor`](crate::monitor::PerformanceMonitor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Samples kept per metric kind; oldest dropped first. Default: 10,000.
    pub max_measurements: usize,
    /// Samples older than this are dropped. Default: 24.
    pub retention_hours: u64,
    /// Key generation slower than this is flagged. Default: 100ms.
    pub key_generation_warning_ms: u64,
    /// Cache operations slower than this are flagged. Default: 50ms.
    pub cache_operation_warning_ms: u64,
    /// Total cache size that raises a warning. Default: 50 MiB.
    pub memory_warning_bytes: u64,
    /// Total cache size that is critical. Default: 100 MiB.
    pub memory_critical_bytes: u64,
    /// Slowdown (percent) versus a baseline that raises a warning. Default: 10.
    pub regression_warning_percent: f64,
    /// Slowdown (percent) versus a baseline that is critical. Default: 25.
    pub regression_critical_percent: f64,
    /// Success rate (percent) below which a warning is raised. Default: 95.
    pub min_success_rate_percent: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            max_measurements: 10_000,
            retention_hours: 24,
            key_generation_warning_ms: 100,
            cache_operation_warning_ms: 50,
            memory_warning_bytes: 50 * MIB,
            memory_critical_bytes: 100 * MIB,
            regression_warning_percent: 10.0,
            regression_critical_percent: 25.0,
            min_success_rate_percent: 95.0,
        }
    }
}

impl MonitorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_measurements(mut self, n: usize) -> Self {
        self.max_measurements = n;
        self
    }

    pub fn retention_hours(mut self, hours: u64) -> Self {
        self.retention_hours = hours;
        self
    }

    pub fn key_generation_warning(mut self, threshold: Duration) -> Self {
        self.key_generation_warning_ms = threshold.as_millis() as u64;
        self
    }

    pub fn cache_operation_warning(mut self, threshold: Duration) -> Self {
        self.cache_operation_warning_ms = threshold.as_millis() as u64;
        self
    }

    /// Set the warning and critical total-size thresholds in bytes.
    pub fn memory_thresholds(mut self, warning: u64, critical: u64) -> Self {
        self.memory_warning_bytes = warning;
        self.memory_critical_bytes = critical;
        self
    }

    /// Set the warning and critical regression percentages.
    pub fn regression_thresholds(mut self, warning: f64, critical: f64) -> Self {
        self.regression_warning_percent = warning;
        self.regression_critical_percent = critical;
        self
    }

    pub fn min_success_rate(mut self, percent: f64) -> Self {
        self.min_success_rate_percent = percent;
        self
    }

    pub fn key_generation_threshold(&self) -> Duration {
        Duration::from_millis(self.key_generation_warning_ms)
    }

    pub fn cache_operation_threshold(&self) -> Duration {
        Duration::from_millis(self.cache_operation_warning_ms)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_hours * 3_600)
    }

    /// Check every constraint, returning all violations at once.
    pub fn validate(&self) -> Result<()> {
        let violations = self.violations("");
        if violations.is_empty() {
            Ok(())
        } else {
            Err(MimirError::Validation(violations))
        }
    }

    fn violations(&self, prefix: &str) -> Vec<ConstraintViolation> {
        let mut v = Vec::new();
        let field = |name: &str| format!("{prefix}{name}");

        if self.max_measurements == 0 {
            v.push(ConstraintViolation::new(
                field("max_measurements"),
                self.max_measurements,
                "must be greater than 0",
            ));
        }
        if self.retention_hours == 0 {
            v.push(ConstraintViolation::new(
                field("retention_hours"),
                self.retention_hours,
                "must be greater than 0",
            ));
        }
        if self.memory_critical_bytes < self.memory_warning_bytes {
            v.push(ConstraintViolation::new(
                field("memory_critical_bytes"),
                self.memory_critical_bytes,
                format!(
                    "must be at least memory_warning_bytes ({})",
                    self.memory_warning_bytes
                ),
            ));
        }
        if !(self.regression_warning_percent >= 0.0) {
            v.push(ConstraintViolation::new(
                field("regression_warning_percent"),
                self.regression_warning_percent,
                "must be non-negative",
            ));
        }
        if !(self.regression_critical_percent >= self.regression_warning_percent) {
            v.push(ConstraintViolation::new(
                field("regression_critical_percent"),
                self.regression_critical_percent,
                format!(
                    "must be at least regression_warning_percent ({})",
                    self.regression_warning_percent
                ),
            ));
        }
        if !(0.0..=100.0).contains(&self.min_success_rate_percent) {
            v.push(ConstraintViolation::new(
                field("min_success_rate_percent"),
                self.min_success_rate_percent,
                "must be between 0 and 100",
            ));
        }
        v
    }
}
