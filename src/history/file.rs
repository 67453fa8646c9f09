// src/history/file.rs

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::{HistoryStore, Turn};

/// Filesystem-backed history: one pretty-printed `<session>.json` file per
/// session. Appends rewrite the whole file, which is fine at conversation
/// scale and keeps the files hand-readable.
pub struct FileHistory {
    dir: PathBuf,
}

impl FileHistory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn session_path(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{session_id}.json"))
    }
}

#[async_trait]
impl HistoryStore for FileHistory {
    async fn append(&self, session_id: &str, turn: &Turn) -> Result<()> {
        let mut turns = self.load_all(session_id).await?;
        turns.push(turn.clone());
        let json = serde_json::to_string_pretty(&turns)?;
        tokio::fs::write(self.session_path(session_id), json)
            .await
            .with_context(|| format!("writing history for session {session_id}"))?;
        Ok(())
    }

    async fn load_all(&self, session_id: &str) -> Result<Vec<Turn>> {
        match tokio::fs::read_to_string(self.session_path(session_id)).await {
            Ok(json) => serde_json::from_str(&json)
                .with_context(|| format!("parsing history for session {session_id}")),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }
}

/// File names (`<session>.json`) of every persisted conversation under
/// `dir`, sorted for a stable listing. A missing directory lists as empty.
pub async fn list_session_files(dir: impl AsRef<Path>) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let mut entries = match tokio::fs::read_dir(dir.as_ref()).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(names),
        Err(err) => return Err(err.into()),
    };
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".json") {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Load the turns stored in one history file, addressed by the file name
/// `list_session_files` reported. `None` when no such file exists.
pub async fn load_session_file(dir: impl AsRef<Path>, file_name: &str) -> Result<Option<Vec<Turn>>> {
    match tokio::fs::read_to_string(dir.as_ref().join(file_name)).await {
        Ok(json) => Ok(Some(
            serde_json::from_str(&json).with_context(|| format!("parsing {file_name}"))?,
        )),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}
