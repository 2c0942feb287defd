//! Public data types: cached values, size tiers and metric records.

mod metric;
mod tier;
mod value;

pub use metric::{
    CacheOperationMetric, CompressionMetric, Extra, InvalidationEvent, InvalidationKind,
    KeyGenerationMetric, MemorySample, MemoryUsageMetric, STATUS_FAILED, STATUS_FIELD,
    STATUS_SUCCESS,
};
pub use tier::{SizeTier, SizeTierThresholds};
pub use value::{CacheMetadata, StoredValue};
