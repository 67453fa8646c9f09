// src/history/redis.rs

use anyhow::Result;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::{HistoryStore, Turn};

/// Redis-backed history: one list per session, one JSON-encoded turn per
/// element. Each append refreshes the session's TTL, so idle conversations
/// age out while active ones stay.
pub struct RedisHistory {
    conn: ConnectionManager,
    ttl_secs: u64,
}

impl RedisHistory {
    /// Wrap an existing connection. A `ttl_secs` of zero disables expiry.
    pub fn new(conn: ConnectionManager, ttl_secs: u64) -> Self {
        Self { conn, ttl_secs }
    }

    pub async fn connect(url: &str, ttl_secs: u64) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self::new(conn, ttl_secs))
    }

    fn session_key(session_id: &str) -> String {
        format!("chat_history:{session_id}")
    }
}

#[async_trait]
impl HistoryStore for RedisHistory {
    async fn append(&self, session_id: &str, turn: &Turn) -> Result<()> {
        let key = Self::session_key(session_id);
        let payload = serde_json::to_string(turn)?;
        let mut conn = self.conn.clone();
        let _: i64 = conn.rpush(&key, payload).await?;
        if self.ttl_secs > 0 {
            let _: bool = conn.expire(&key, self.ttl_secs as i64).await?;
        }
        Ok(())
    }

    async fn load_all(&self, session_id: &str) -> Result<Vec<Turn>> {
        let mut conn = self.conn.clone();
        let raw: Vec<String> = conn
            .lrange(Self::session_key(session_id), 0, -1)
            .await?;
        raw.iter()
            .map(|item| serde_json::from_str::<Turn>(item).map_err(anyhow::Error::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "needs a reachable redis server"]
    async fn appends_round_trip_in_order() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/0".into());
        let store = RedisHistory::connect(&url, 60).await.unwrap();

        let session_id = "dripfeed_test_session";
        let mut conn = store.conn.clone();
        let _: i64 = conn.del(RedisHistory::session_key(session_id)).await.unwrap();

        store.append(session_id, &Turn::human("你好")).await.unwrap();
        store.append(session_id, &Turn::assistant("你好，有什么可以帮你？")).await.unwrap();

        let turns = store.load_all(session_id).await.unwrap();
        assert_eq!(
            turns,
            vec![Turn::human("你好"), Turn::assistant("你好，有什么可以帮你？")]
        );

        let _: i64 = conn.del(RedisHistory::session_key(session_id)).await.unwrap();
    }
}
