//! Remote store interface.
//!
//! The remote store (L2) is an independently operated key-value service
//! reached over a get/set/delete/scan protocol. The engine only depends on
//! the [`StoreClient`] trait; concrete adapters live in submodules:
//!
//! - [`InMemoryStore`]: moka-backed, per-entry TTL, for tests and
//!   single-process deployments.
//! - `RedisStore`: Redis via a multiplexed connection manager
//!   (requires the `redis` feature).
//!
//! Adapters report failures as typed errors
//! ([`MimirError::StoreUnavailable`](crate::MimirError::StoreUnavailable),
//! [`MimirError::StoreOperation`](crate::MimirError::StoreOperation)); the
//! engine converts them into misses or logged no-ops.

mod memory;
#[cfg(feature = "redis")]
mod redis;

pub use memory::InMemoryStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisStore;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::Result;

/// Async client for the shared key-value backend.
///
/// All keys and patterns passed in are the engine's own
/// `ai_cache:`-prefixed strings. Patterns are shell-glob style.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Backend name for logging/debugging.
    fn name(&self) -> &str;

    /// Fetch the bytes stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool>;

    /// Delete `keys`, returning how many existed.
    async fn delete(&self, keys: &[String]) -> Result<u64>;

    /// List keys matching a glob `pattern`.
    async fn scan(&self, pattern: &str) -> Result<Vec<String>>;

    /// Liveness probe.
    async fn ping(&self) -> Result<bool>;
}

/// Size figures reported by a remote store, when it can provide them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RemoteStoreStats {
    pub used_memory_bytes: Option<u64>,
    pub key_count: Option<u64>,
}

/// Optional capability: report remote store memory and key count.
///
/// Injected into the engine separately from [`StoreClient`] so that
/// backends without introspection simply don't provide one.
#[async_trait]
pub trait RemoteStats: Send + Sync {
    async fn remote_stats(&self) -> Result<RemoteStoreStats>;
}

/// Shell-glob match supporting `*` (any run, including empty) and `?`
/// (exactly one character).
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    // Position of the last `*` seen and the text index it was tried at.
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            backtrack = Some((pi, ti));
            pi += 1;
        } else if let Some((star, matched)) = backtrack {
            pi = star + 1;
            ti = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::glob_match;

    #[test]
    fn star_matches_any_run() {
        assert!(glob_match("ai_cache:*", "ai_cache:op:x|t"));
        assert!(glob_match("ai_cache:*op:sentiment*", "ai_cache:op:sentiment|hello"));
        assert!(glob_match("*", ""));
        assert!(glob_match("a**b", "ab"));
        assert!(!glob_match("ai_cache:*op:summarize*", "ai_cache:op:sentiment|x"));
    }

    #[test]
    fn question_mark_matches_one_char() {
        assert!(glob_match("k?y", "key"));
        assert!(!glob_match("k?y", "ky"));
    }

    #[test]
    fn literal_match_is_exact() {
        assert!(glob_match("abc", "abc"));
        assert!(!glob_match("abc", "abcd"));
        assert!(!glob_match("abcd", "abc"));
    }
}
