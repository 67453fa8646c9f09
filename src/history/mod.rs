// src/history/mod.rs

//! Durable conversation history.
//!
//! Every completed exchange is persisted here in full; the token budget
//! only trims the in-memory window handed to the model, never the store.

mod file;
mod redis;

pub use file::{list_session_files, load_session_file, FileHistory};
pub use redis::RedisHistory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Assistant,
}

impl Role {
    /// Role name used on the chat-completions wire.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Role::Human => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Speaker label used when flattening a conversation to plain text.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Human => "Human",
            Role::Assistant => "AI",
        }
    }
}

/// One utterance in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn human(content: impl Into<String>) -> Self {
        Self { role: Role::Human, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Persistence for per-session conversation transcripts.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append one turn to a session's transcript.
    async fn append(&self, session_id: &str, turn: &Turn) -> Result<()>;

    /// Load a session's full transcript, oldest first. Unknown sessions
    /// load as empty.
    async fn load_all(&self, session_id: &str) -> Result<Vec<Turn>>;
}
