// src/llm/mod.rs

//! Language model abstraction and the OpenAI-compatible client behind it.

mod openai;

pub use openai::OpenAIClient;

use std::pin::Pin;

use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;

use crate::history::Turn;

/// Stream of answer fragments in emission order. The stream ends when
/// generation finishes; an `Err` item reports a mid-generation failure,
/// after which no further fragments arrive.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// The model capability the service needs: stream an answer for a
/// conversation, and measure conversations against a token budget.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Start generating an answer to `question`, given the system prompt
    /// and the prior conversation window.
    async fn stream_chat(
        &self,
        system_prompt: &str,
        history: &[Turn],
        question: &str,
    ) -> Result<TokenStream>;

    /// Estimated token cost of feeding these turns back to the model.
    fn count_tokens(&self, turns: &[Turn]) -> usize;
}

/// Rough token estimate (~4 characters per token).
pub fn estimate_tokens(text: &str) -> usize {
    (text.len() + 3) / 4
}
