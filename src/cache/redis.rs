//! Redis-backed `KvStore`
//!
//! Production implementation over a `ConnectionManager`, which multiplexes
//! and transparently reconnects. Scans use SCAN with MATCH/COUNT, never KEYS,
//! so enumeration stays non-blocking on large keyspaces.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::store::{CacheError, KvStore, StoreResult};

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Backend(err.to_string())
    }
}

#[derive(Clone)]
pub struct RedisKvStore {
    conn: ConnectionManager,
}

impl RedisKvStore {
    /// Connect to the store at `url` (e.g. `redis://127.0.0.1/`).
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;

        tracing::info!("Connected to key-value store");

        Ok(Self { conn })
    }
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl_seconds).await?;
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> StoreResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        Ok(conn.del(keys.to_vec()).await?)
    }

    async fn incr(&self, key: &str) -> StoreResult<i64> {
        let mut conn = self.conn.clone();
        Ok(conn.incr(key, 1i64).await?)
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        Ok(conn.expire(key, ttl_seconds as i64).await?)
    }

    async fn scan_page(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> StoreResult<(u64, Vec<String>)> {
        let mut conn = self.conn.clone();
        let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await?;

        Ok((next, keys))
    }
}
