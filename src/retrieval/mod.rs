// Retrieval orchestration
// Embeds a question, picks the closest knowledge sentence and asks the chat model with it as context


use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::settings::DEFAULT_PERSONA;
use crate::llm::{ChatClient, ClientError, EmbeddingClient};
use crate::store::SharedStore;

/// Context used when the store has nothing to offer
pub const NO_CONTEXT_SENTENCE: &str = "No relevant information was found.";

/// Shown to the player when the question itself could not be embedded
pub const EMBEDDING_FALLBACK_MESSAGE: &str =
    "Sorry, I couldn't quite understand your question. Could you ask again?";

/// Shown to the player when no knowledge store is loaded
pub const NOT_READY_MESSAGE: &str = "My memory is still hazy. Please come back in a moment.";

/// Build the user prompt for one question
#[inline]
pub fn compose_prompt(sentence: &str, question: &str) -> String {
    format!(
        "Reference material: \"{}\"\n\nBased on the above, answer the following question:\nQuestion: \"{}\"",
        sentence, question
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    EmbeddingUnavailable,
    GenerationUnavailable,
}

impl fmt::Display for FailureReason {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmbeddingUnavailable => write!(f, "embedding unavailable"),
            Self::GenerationUnavailable => write!(f, "generation unavailable"),
        }
    }
}

/// Outcome of one question
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// Reply from the chat model, verbatim
    Generated(String),
    /// A remote call failed; `message` is safe to show to the player
    Unavailable {
        reason: FailureReason,
        message: String,
    },
    /// No knowledge store has been loaded
    NotReady,
}

impl Answer {
    /// Text to show the player
    #[inline]
    pub fn text(&self) -> &str {
        match self {
            Self::Generated(text) => text,
            Self::Unavailable { message, .. } => message,
            Self::NotReady => NOT_READY_MESSAGE,
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Generated(_))
    }
}

/// Knowledge picked for a question
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieved {
    pub id: i64,
    pub sentence: String,
    pub similarity: f32,
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("knowledge store is not loaded")]
    NotReady,

    #[error("failed to embed question: {0}")]
    Embedding(#[from] ClientError),
}

/// Answers player questions against the currently loaded store
#[derive(Clone)]
pub struct Orchestrator {
    store: SharedStore,
    embedder: Arc<dyn EmbeddingClient>,
    chat: Arc<dyn ChatClient>,
    persona: String,
}

impl fmt::Debug for Orchestrator {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("store", &self.store)
            .field("persona", &self.persona)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    #[inline]
    pub fn new(
        store: SharedStore,
        embedder: Arc<dyn EmbeddingClient>,
        chat: Arc<dyn ChatClient>,
    ) -> Self {
        Self {
            store,
            embedder,
            chat,
            persona: DEFAULT_PERSONA.to_string(),
        }
    }

    /// Replace the system prompt sent with every question
    #[inline]
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    #[inline]
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Find the knowledge sentence closest to `question`.
    ///
    /// `Ok(None)` means the store is loaded but empty.
    #[inline]
    pub async fn retrieve(&self, question: &str) -> Result<Option<Retrieved>, RetrievalError> {
        let store = self.store.snapshot().await.ok_or(RetrievalError::NotReady)?;

        debug!("Embedding question");
        let query = self.embedder.embed(question).await?;

        debug!("Searching {} records", store.len());
        Ok(store.search(&query).map(|hit| Retrieved {
            id: hit.record.id,
            sentence: hit.record.sentence.clone(),
            similarity: hit.similarity,
        }))
    }

    /// Answer a player question, degrading instead of failing
    #[inline]
    pub async fn answer(&self, question: &str) -> Answer {
        let context = match self.retrieve(question).await {
            Ok(context) => context,
            Err(RetrievalError::NotReady) => {
                warn!("Question received before the knowledge store was loaded");
                return Answer::NotReady;
            }
            Err(RetrievalError::Embedding(e)) => {
                warn!("Could not embed question: {}", e);
                return Answer::Unavailable {
                    reason: FailureReason::EmbeddingUnavailable,
                    message: EMBEDDING_FALLBACK_MESSAGE.to_string(),
                };
            }
        };

        let sentence = match &context {
            Some(retrieved) => {
                info!(
                    "Using item {} as context (similarity {:.4})",
                    retrieved.id, retrieved.similarity
                );
                retrieved.sentence.as_str()
            }
            None => {
                info!("No knowledge available, answering without context");
                NO_CONTEXT_SENTENCE
            }
        };

        let prompt = compose_prompt(sentence, question);
        debug!("Final prompt:\n{}", prompt);

        match self.chat.complete(&self.persona, &prompt).await {
            Ok(reply) => Answer::Generated(reply),
            Err(e) => {
                warn!("Chat completion failed: {}", e);
                Answer::Unavailable {
                    reason: FailureReason::GenerationUnavailable,
                    message: format!("Error: {}", e),
                }
            }
        }
    }
}
