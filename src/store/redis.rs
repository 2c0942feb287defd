//! Redis [`StoreClient`].
//!
//! Uses a multiplexed [`ConnectionManager`] that reconnects on its own, so
//! a single `RedisStore` can be shared by every engine task. Scans use the
//! cursor-based `SCAN MATCH` rather than `KEYS` to avoid blocking the
//! server on large keyspaces.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use super::{RemoteStats, RemoteStoreStats, StoreClient};
use crate::{MimirError, Result};

/// Keys requested per `SCAN` round trip.
const SCAN_COUNT: usize = 500;

fn op_err(operation: &'static str) -> impl Fn(redis::RedisError) -> MimirError {
    move |e| {
        if e.is_connection_dropped() || e.is_connection_refusal() || e.is_io_error() {
            MimirError::StoreUnavailable(e.to_string())
        } else {
            MimirError::StoreOperation {
                operation,
                message: e.to_string(),
            }
        }
    }
}

pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    /// Connect to `connection_string` (e.g. `redis://localhost:6379/0`).
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let client = Client::open(connection_string)
            .map_err(|e| MimirError::Configuration(format!("invalid redis URL: {e}")))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| MimirError::StoreUnavailable(e.to_string()))?;
        Ok(Self { connection })
    }

    /// Wrap an existing connection manager.
    pub fn from_connection(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl StoreClient for RedisStore {
    fn name(&self) -> &str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.connection.clone();
        let value: Option<Vec<u8>> = conn.get(key).await.map_err(op_err("get"))?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool> {
        let mut conn = self.connection.clone();
        // Redis rejects EX 0; sub-second TTLs round up to one second.
        let secs = ttl.as_secs().max(1);
        let _: () = conn.set_ex(key, value, secs).await.map_err(op_err("set"))?;
        Ok(true)
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection.clone();
        let removed: u64 = conn.del(keys).await.map_err(op_err("delete"))?;
        Ok(removed)
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.connection.clone();
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await
                .map_err(op_err("scan"))?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        // SCAN may return a key more than once across iterations.
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn ping(&self) -> Result<bool> {
        let mut conn = self.connection.clone();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| MimirError::StoreUnavailable(e.to_string()))?;
        Ok(pong == "PONG")
    }
}

#[async_trait]
impl RemoteStats for RedisStore {
    async fn remote_stats(&self) -> Result<RemoteStoreStats> {
        let mut conn = self.connection.clone();
        let info: String = redis::cmd("INFO")
            .arg("memory")
            .query_async(&mut conn)
            .await
            .map_err(op_err("info"))?;
        let key_count: u64 = redis::cmd("DBSIZE")
            .query_async(&mut conn)
            .await
            .map_err(op_err("dbsize"))?;
        Ok(RemoteStoreStats {
            used_memory_bytes: parse_used_memory(&info),
            key_count: Some(key_count),
        })
    }
}

/// Extract `used_memory:<bytes>` from an `INFO memory` reply.
fn parse_used_memory(info: &str) -> Option<u64> {
    info.lines()
        .find_map(|line| line.strip_prefix("used_memory:"))
        .and_then(|v| v.trim().parse().ok())
}
