// src/cache/redis.rs

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::{AppendCache, CacheError};

/// Redis-backed cache built on the `APPEND` command. Every write refreshes
/// the entry's TTL, so an entry only expires once nothing has touched it
/// for the full window.
pub struct RedisCache {
    conn: ConnectionManager,
    ttl_secs: u64,
}

impl RedisCache {
    /// Wrap an existing connection. A `ttl_secs` of zero disables expiry.
    pub fn new(conn: ConnectionManager, ttl_secs: u64) -> Self {
        Self { conn, ttl_secs }
    }

    pub async fn connect(url: &str, ttl_secs: u64) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self::new(conn, ttl_secs))
    }
}

#[async_trait]
impl AppendCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn append(&self, key: &str, text: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.append(key, text).await?;
        if self.ttl_secs > 0 {
            let _: bool = conn.expire(key, self.ttl_secs as i64).await?;
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.del(key).await?;
        Ok(())
    }
}
