// Remote model clients
// Embedding and chat-completion seams consumed by the store build and the orchestrator

pub mod openai;

use async_trait::async_trait;
use thiserror::Error;

pub use openai::OpenAiClient;

/// Failure of a single remote call. Timeouts surface as `Transport`.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("API key '{0}' not found")]
    MissingCredential(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Request task failed: {0}")]
    Task(String),
}

/// Turns text into a fixed-length vector
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ClientError>;
}

/// Generates a reply for a system prompt followed by one user message
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str)
    -> Result<String, ClientError>;
}
