// src/qa/mod.rs

//! Submit/poll orchestration: the background producer that streams an
//! answer into the cache, and the poll side that decides how much of it a
//! client may see.

use std::sync::Arc;

use anyhow::Result;
use futures::StreamExt;
use rand::Rng;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::cache::{AppendCache, CacheError};
use crate::config::Config;
use crate::history::HistoryStore;
use crate::llm::LanguageModel;
use crate::memory::ConversationMemory;
use crate::sentence;

/// Marker appended to a cache entry when generation stops, successfully or
/// not. Answer text never contains it.
pub const END_MARK: &str = "<END>";

/// Random lowercase-hex identifier; `bytes` is the entropy in bytes, so
/// the result is twice that many characters.
pub fn token_hex(bytes: usize) -> String {
    let mut rng = rand::rng();
    (0..bytes).map(|_| format!("{:02x}", rng.random::<u8>())).collect()
}

/// Cache key of one question's answer entry.
pub fn answer_key(session_id: &str, question_id: &str) -> String {
    format!("{session_id}_{question_id}")
}

/// Launch the background producer for one question. Fire-and-forget from
/// the submit path; the handle is returned for tests.
pub fn spawn_producer(
    cache: Arc<dyn AppendCache>,
    history: Arc<dyn HistoryStore>,
    model: Arc<dyn LanguageModel>,
    config: Arc<Config>,
    session_id: String,
    question_id: String,
    question: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(err) = produce_answer(
            cache,
            history,
            model,
            config,
            &session_id,
            &question_id,
            &question,
        )
        .await
        {
            error!("{} producer for question {} failed: {:#}", session_id, question_id, err);
        }
    })
}

/// Generate one answer into the cache entry for (session, question).
///
/// Model failures, at start or mid-stream, end generation early but still
/// terminate the entry with the end marker so pollers finish cleanly; the
/// truncated exchange is not saved to history. Cache and history failures
/// abort the task instead and can leave the entry unterminated.
pub async fn produce_answer(
    cache: Arc<dyn AppendCache>,
    history: Arc<dyn HistoryStore>,
    model: Arc<dyn LanguageModel>,
    config: Arc<Config>,
    session_id: &str,
    question_id: &str,
    question: &str,
) -> Result<()> {
    let key = answer_key(session_id, question_id);
    let mut memory = ConversationMemory::new(
        history,
        model.clone(),
        session_id,
        config.max_token_limit,
    );
    let window = memory.load().await?;

    let mut stream = match model
        .stream_chat(&config.system_template, window, question)
        .await
    {
        Ok(stream) => stream,
        Err(err) => {
            warn!("{} generation failed to start: {:#}", session_id, err);
            cache.append(&key, END_MARK).await?;
            return Ok(());
        }
    };

    let mut answer = String::new();
    let mut generation_error = None;
    while let Some(token) = stream.next().await {
        match token {
            Ok(token) => {
                cache.append(&key, &token).await?;
                answer.push_str(&token);
            }
            Err(err) => {
                generation_error = Some(err);
                break;
            }
        }
    }
    cache.append(&key, END_MARK).await?;

    if let Some(err) = generation_error {
        warn!("{} generation failed mid-stream: {:#}", session_id, err);
        return Ok(());
    }

    memory.save(question, &answer).await?;
    info!("{} answer: {}", session_id, answer);
    Ok(())
}

/// What one poll of the answer cache found.
#[derive(Debug, PartialEq, Eq)]
pub enum PollReply {
    /// No entry: never created, expired, or already delivered and removed.
    Missing,
    /// Generation finished; the entry has been deleted by this call.
    Finished(String),
    /// Still generating; holds the prefix currently safe to show, which
    /// may be empty.
    Running(String),
}

/// One poll cycle: read the entry, classify it, and for finished answers
/// delete it on the way out so the full text is delivered exactly once.
/// Unfinished text is re-examined from scratch on every poll.
pub async fn poll_answer(
    cache: &dyn AppendCache,
    session_id: &str,
    question_id: &str,
) -> Result<PollReply, CacheError> {
    let key = answer_key(session_id, question_id);
    let Some(text) = cache.get(&key).await? else {
        return Ok(PollReply::Missing);
    };
    if let Some(answer) = text.strip_suffix(END_MARK) {
        let answer = answer.to_string();
        cache.delete(&key).await?;
        return Ok(PollReply::Finished(answer));
    }
    let reveal = sentence::split_text(&text).map_or("", |(reveal, _)| reveal);
    Ok(PollReply::Running(reveal.to_string()))
}
