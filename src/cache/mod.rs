// src/cache/mod.rs

//! Append-only answer cache.
//!
//! One entry per in-flight question, written by exactly one producer task
//! and read by any number of polls. The contract is deliberately narrow:
//! entries can be read whole, appended to, and deleted, nothing else.
//! Backends are picked once at startup; callers never know which one they
//! are talking to.

mod file;
mod redis;

pub use file::FileCache;
pub use redis::RedisCache;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Key-value store for accumulating answer text.
#[async_trait]
pub trait AppendCache: Send + Sync {
    /// Read the full accumulated value. `None` means the entry does not
    /// exist, which is distinct from an entry holding the empty string.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Concatenate text onto the entry, creating it when absent. Appending
    /// the empty string still creates the entry.
    async fn append(&self, key: &str, text: &str) -> Result<(), CacheError>;

    /// Remove the entry. Deleting an absent key is a no-op.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}
