// src/server/mod.rs

//! HTTP surface of the question/answer service:
//! - `POST /api/ask` — submit a question, receive (session_id, question_id)
//! - `POST /api/answer` — poll for the accumulated answer
//! - `GET /api/chat_history` — list persisted conversations
//! - `GET /api/chat_history/latest_text` — transcript of the newest one
//! - `GET /api/chat_history/{session_id}` — one conversation as stored
//! - `GET /api/chat_history/{session_id}/text` — readable transcript

mod handlers;

use std::sync::Arc;

use anyhow::Result;
use axum::routing::{get, post};
use axum::Router;
use tracing::info;

use crate::cache::AppendCache;
use crate::config::Config;
use crate::history::HistoryStore;
use crate::llm::LanguageModel;

// ============================================================================
// Server State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cache: Arc<dyn AppendCache>,
    pub history: Arc<dyn HistoryStore>,
    pub model: Arc<dyn LanguageModel>,
}

// ============================================================================
// Routes
// ============================================================================

/// Create the router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/ask", post(handlers::ask_handler))
        .route("/api/answer", post(handlers::answer_handler))
        .route("/api/chat_history", get(handlers::chat_history_list_handler))
        .route("/api/chat_history/latest_text", get(handlers::latest_text_handler))
        .route("/api/chat_history/{session_id}", get(handlers::chat_history_handler))
        .route("/api/chat_history/{session_id}/text", get(handlers::chat_history_text_handler))
        .with_state(state)
}

/// Run the HTTP server until it is shut down
pub async fn run(
    config: Arc<Config>,
    cache: Arc<dyn AppendCache>,
    history: Arc<dyn HistoryStore>,
    model: Arc<dyn LanguageModel>,
) -> Result<()> {
    let bind_address = config.bind_address();
    let state = AppState { config, cache, history, model };
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Server listening on http://{}", bind_address);
    axum::serve(listener, app).await?;

    Ok(())
}
