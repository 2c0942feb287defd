//! Caching subsystem.
//!
//! - [`MemoryTier`]: bounded, FIFO-evicting in-process map (L1). Holds
//!   small-tier entries only.
//! - [`CacheEngine`]: routes reads and writes between the memory tier and
//!   the remote [`StoreClient`](crate::store::StoreClient) (L2), applies
//!   compression and per-operation TTLs, and handles invalidation. See
//!   [`engine`] module docs for the read path and degradation rules.

pub mod engine;
pub mod memory;

pub use engine::{CacheEngine, CacheEngineBuilder};
pub use memory::{DEFAULT_MEMORY_TIER_CAPACITY, MemoryTier};
