// src/memory/mod.rs

//! Token-bounded view over a session's conversation history.

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::history::{HistoryStore, Turn};
use crate::llm::LanguageModel;

/// The conversation window fed to the model, pruned to a token budget.
///
/// Pruning only narrows this in-memory window; the underlying store keeps
/// every turn ever saved.
pub struct ConversationMemory {
    store: Arc<dyn HistoryStore>,
    model: Arc<dyn LanguageModel>,
    session_id: String,
    max_token_limit: usize,
    window: Vec<Turn>,
}

impl ConversationMemory {
    pub fn new(
        store: Arc<dyn HistoryStore>,
        model: Arc<dyn LanguageModel>,
        session_id: impl Into<String>,
        max_token_limit: usize,
    ) -> Self {
        Self {
            store,
            model,
            session_id: session_id.into(),
            max_token_limit,
            window: Vec::new(),
        }
    }

    /// The turns to hand the model, loaded from the store and pruned on
    /// first access.
    pub async fn load(&mut self) -> Result<&[Turn]> {
        if self.window.is_empty() {
            self.window = self.store.load_all(&self.session_id).await?;
            self.prune();
        }
        Ok(&self.window)
    }

    /// Persist a completed exchange, then re-prune the window.
    pub async fn save(&mut self, question: &str, answer: &str) -> Result<()> {
        let question = Turn::human(question);
        let answer = Turn::assistant(answer);
        self.store.append(&self.session_id, &question).await?;
        self.store.append(&self.session_id, &answer).await?;
        self.window.push(question);
        self.window.push(answer);
        self.prune();
        Ok(())
    }

    /// Drop oldest turns one at a time until the window fits the budget.
    /// The newest turn is always kept, even when it alone is over.
    fn prune(&mut self) {
        let before = self.window.len();
        while self.model.count_tokens(&self.window) > self.max_token_limit
            && self.window.len() > 1
        {
            self.window.remove(0);
        }
        if self.window.len() < before {
            debug!(
                "{} dropped {} turns to fit {} tokens",
                self.session_id,
                before - self.window.len(),
                self.max_token_limit
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::llm::TokenStream;

    struct RecordingStore {
        turns: Mutex<Vec<Turn>>,
    }

    impl RecordingStore {
        fn new(turns: Vec<Turn>) -> Arc<Self> {
            Arc::new(Self { turns: Mutex::new(turns) })
        }
    }

    #[async_trait]
    impl HistoryStore for RecordingStore {
        async fn append(&self, _session_id: &str, turn: &Turn) -> Result<()> {
            self.turns.lock().unwrap().push(turn.clone());
            Ok(())
        }

        async fn load_all(&self, _session_id: &str) -> Result<Vec<Turn>> {
            Ok(self.turns.lock().unwrap().clone())
        }
    }

    /// Bills one token per four content bytes, like the real estimate.
    struct CharBudgetModel;

    #[async_trait]
    impl LanguageModel for CharBudgetModel {
        async fn stream_chat(
            &self,
            _system_prompt: &str,
            _history: &[Turn],
            _question: &str,
        ) -> Result<TokenStream> {
            Ok(Box::pin(futures::stream::empty()))
        }

        fn count_tokens(&self, turns: &[Turn]) -> usize {
            turns.iter().map(|turn| turn.content.len() / 4).sum()
        }
    }

    fn turn_of_tokens(role: &str, tokens: usize) -> Turn {
        let content = "x".repeat(tokens * 4);
        match role {
            "human" => Turn::human(content),
            _ => Turn::assistant(content),
        }
    }

    #[tokio::test]
    async fn window_drops_oldest_until_it_fits() {
        // Five turns of 600 tokens against a 2000-token budget: the two
        // oldest go, the newest three stay.
        let stored = vec![
            turn_of_tokens("human", 600),
            turn_of_tokens("assistant", 600),
            turn_of_tokens("human", 600),
            turn_of_tokens("assistant", 600),
            turn_of_tokens("human", 600),
        ];
        let store = RecordingStore::new(stored.clone());
        let mut memory =
            ConversationMemory::new(store.clone(), Arc::new(CharBudgetModel), "s1", 2000);

        let window = memory.load().await.unwrap();
        assert_eq!(window, &stored[2..]);

        // The store itself is untouched by pruning.
        assert_eq!(store.load_all("s1").await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn window_within_budget_is_left_alone() {
        let stored = vec![turn_of_tokens("human", 100), turn_of_tokens("assistant", 100)];
        let store = RecordingStore::new(stored.clone());
        let mut memory =
            ConversationMemory::new(store, Arc::new(CharBudgetModel), "s1", 2000);

        assert_eq!(memory.load().await.unwrap(), &stored[..]);
    }

    #[tokio::test]
    async fn newest_turn_survives_even_when_oversized() {
        let stored = vec![turn_of_tokens("human", 10), turn_of_tokens("assistant", 5000)];
        let store = RecordingStore::new(stored.clone());
        let mut memory =
            ConversationMemory::new(store, Arc::new(CharBudgetModel), "s1", 2000);

        let window = memory.load().await.unwrap();
        assert_eq!(window, &stored[1..]);
    }

    #[tokio::test]
    async fn save_persists_both_turns_before_pruning() {
        let store = RecordingStore::new(Vec::new());
        let mut memory =
            ConversationMemory::new(store.clone(), Arc::new(CharBudgetModel), "s1", 10);

        memory.load().await.unwrap();
        let question = "q".repeat(200);
        let answer = "a".repeat(200);
        memory.save(&question, &answer).await.unwrap();

        // Both turns reached the store even though the window kept only one.
        let persisted = store.load_all("s1").await.unwrap();
        assert_eq!(
            persisted,
            vec![Turn::human(question), Turn::assistant(answer.clone())]
        );
        assert_eq!(memory.window, vec![Turn::assistant(answer)]);
    }
}
