// src/server/handlers.rs

//! Request handlers for the ask/answer protocol and history browsing.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::AppState;
use crate::history::{self, Turn};
use crate::qa::{self, PollReply};

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub question_id: Option<String>,
}

fn request_token(headers: &HeaderMap) -> Option<&str> {
    headers.get("token").and_then(|value| value.to_str().ok())
}

fn fail_response() -> Json<Value> {
    Json(json!({ "status": "fail" }))
}

fn internal_error(err: impl std::fmt::Display) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

/// Accept a question and start producing its answer in the background.
pub async fn ask_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AskRequest>,
) -> Result<Json<Value>, (StatusCode, String)> {
    if !state.config.token_allowed(request_token(&headers)) {
        return Ok(fail_response());
    }

    let question_id = qa::token_hex(8);
    let session_id = match req.session_id {
        Some(session_id) if !session_id.is_empty() => session_id,
        _ => qa::token_hex(16),
    };
    info!("{} question: {}", session_id, req.question);

    // Create the entry before the producer starts, so a poll racing it
    // sees a running question rather than a finished one.
    let key = qa::answer_key(&session_id, &question_id);
    state.cache.append(&key, "").await.map_err(internal_error)?;

    qa::spawn_producer(
        state.cache.clone(),
        state.history.clone(),
        state.model.clone(),
        state.config.clone(),
        session_id.clone(),
        question_id.clone(),
        req.question,
    );

    Ok(Json(json!({
        "status": "ok",
        "session_id": session_id,
        "question_id": question_id,
    })))
}

/// Poll for the answer to a previously submitted question.
pub async fn answer_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<Value>, (StatusCode, String)> {
    if !state.config.token_allowed(request_token(&headers)) {
        return Ok(fail_response());
    }
    let (Some(session_id), Some(question_id)) = (req.session_id, req.question_id) else {
        return Ok(fail_response());
    };

    let reply = qa::poll_answer(state.cache.as_ref(), &session_id, &question_id)
        .await
        .map_err(internal_error)?;

    let body = match reply {
        PollReply::Missing => json!({ "status": "end" }),
        PollReply::Finished(msg) => json!({ "status": "end", "msg": msg }),
        PollReply::Running(msg) => json!({ "status": "running", "msg": msg }),
    };
    Ok(Json(body))
}

/// List the persisted conversation files.
pub async fn chat_history_list_handler(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let chat_history_list = history::list_session_files(&state.config.cache_path)
        .await
        .map_err(internal_error)?;
    Ok(Json(json!({
        "status": "ok",
        "chat_history_list": chat_history_list,
    })))
}

/// One conversation, as stored.
pub async fn chat_history_handler(
    State(state): State<AppState>,
    Path(session_file): Path<String>,
) -> Result<Json<Value>, (StatusCode, String)> {
    match history::load_session_file(&state.config.cache_path, &session_file).await {
        Ok(Some(turns)) => Ok(Json(json!({ "status": "ok", "chat_history": turns }))),
        Ok(None) => Ok(fail_response()),
        Err(err) => Err(internal_error(err)),
    }
}

/// One conversation as a readable transcript.
pub async fn chat_history_text_handler(
    State(state): State<AppState>,
    Path(session_file): Path<String>,
) -> Result<Response, (StatusCode, String)> {
    match history::load_session_file(&state.config.cache_path, &session_file).await {
        Ok(Some(turns)) => Ok(Html(render_transcript(&turns)).into_response()),
        Ok(None) => Ok(fail_response().into_response()),
        Err(err) => Err(internal_error(err)),
    }
}

/// Transcript of the most recent conversation in the listing.
pub async fn latest_text_handler(
    State(state): State<AppState>,
) -> Result<Response, (StatusCode, String)> {
    let files = history::list_session_files(&state.config.cache_path)
        .await
        .map_err(internal_error)?;
    let Some(latest) = files.last() else {
        return Ok(fail_response().into_response());
    };
    match history::load_session_file(&state.config.cache_path, latest).await {
        Ok(Some(turns)) => Ok(Html(render_transcript(&turns)).into_response()),
        Ok(None) => Ok(fail_response().into_response()),
        Err(err) => Err(internal_error(err)),
    }
}

fn render_transcript(turns: &[Turn]) -> String {
    let mut text = String::new();
    for exchange in turns.chunks(2) {
        for turn in exchange {
            text.push_str(&format!("<p>{} :{}</p><br/>", turn.role.label(), turn.content));
        }
        text.push_str("<br/><p>-------------------</p><br/>");
    }
    text
}
