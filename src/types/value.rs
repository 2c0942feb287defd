//! Cached value and engine-added metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata the engine attaches to every cached value on write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMetadata {
    /// When the value was written.
    pub cached_at: DateTime<Utc>,
    /// Always `true` once a value has been materialized from storage.
    pub cache_hit: bool,
    /// Operation name the value was cached under (e.g. `"sentiment"`).
    pub operation: String,
    /// Length of the source text in characters.
    pub text_length: usize,
    /// Whether the stored bytes were compressed.
    pub compression_used: bool,
}

/// A caller's structured payload plus engine metadata.
///
/// Returned unchanged (metadata included) by
/// [`CacheEngine::get`](crate::cache::CacheEngine::get).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredValue {
    pub value: Value,
    pub metadata: CacheMetadata,
}

impl StoredValue {
    /// Wrap a payload with fresh metadata for a write.
    ///
    /// `compression_used` starts out `false`; the engine flips it once the
    /// codec decides to compress.
    pub fn new(value: Value, operation: impl Into<String>, text_length: usize) -> Self {
        Self {
            value,
            metadata: CacheMetadata {
                cached_at: Utc::now(),
                cache_hit: true,
                operation: operation.into(),
                text_length,
                compression_used: false,
            },
        }
    }

    /// Look up a top-level field of the payload (if it is a JSON object).
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.value.get(field)
    }

    /// Approximate in-memory footprint, used for memory-tier accounting.
    pub fn estimated_size(&self) -> usize {
        serde_json::to_vec(self).map(|v| v.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_value_marks_cache_hit() {
        let v = StoredValue::new(json!({"label": "pos"}), "sentiment", 5);
        assert!(v.metadata.cache_hit);
        assert!(!v.metadata.compression_used);
        assert_eq!(v.metadata.operation, "sentiment");
        assert_eq!(v.get("label"), Some(&json!("pos")));
    }

    #[test]
    fn estimated_size_grows_with_payload() {
        let small = StoredValue::new(json!("a"), "op", 1);
        let big = StoredValue::new(json!("a".repeat(1_000)), "op", 1);
        assert!(big.estimated_size() > small.estimated_size());
    }
}
