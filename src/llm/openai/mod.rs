
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use url::Url;

use super::{ChatClient, ClientError, EmbeddingClient};
use crate::config::{Config, ConfigError, Secrets};

const EXPONENTIAL_BACKOFF_BASE: u32 = 2;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Client for OpenAI-compatible `/embeddings` and `/chat/completions` endpoints.
///
/// HTTP is blocking (`ureq`); the trait methods move each call onto the
/// blocking pool so async callers are never stalled.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    base_url: Url,
    embedding_model: String,
    chat_model: String,
    api_key_name: String,
    api_key: Option<ApiKey>,
    agent: ureq::Agent,
    retry_attempts: u32,
    retry_delay: Duration,
}

#[derive(Clone)]
struct ApiKey(String);

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(..)")
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingObject {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingObject>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

impl OpenAiClient {
    #[inline]
    pub fn new(config: &Config, secrets: &Secrets) -> Result<Self, ConfigError> {
        let openai = &config.openai;
        let base_url = openai.api_url()?;

        let api_key = secrets
            .get(&openai.api_key_name)
            .map(|key| ApiKey(key.to_string()));
        if api_key.is_none() {
            warn!(
                "API key '{}' is not set, remote calls will fail",
                openai.api_key_name
            );
        }

        Ok(Self {
            base_url,
            embedding_model: openai.embedding_model.clone(),
            chat_model: openai.chat_model.clone(),
            api_key_name: openai.api_key_name.clone(),
            api_key,
            agent: build_agent(Duration::from_secs(openai.timeout_seconds)),
            retry_attempts: openai.retry_attempts,
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts.max(1);
        self
    }

    /// Delay before the first retry; doubles on each further attempt
    #[inline]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    #[inline]
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Blocking embedding call
    #[inline]
    pub fn embed_blocking(&self, text: &str) -> Result<Vec<f32>, ClientError> {
        debug!("Generating embedding for text (length: {})", text.len());

        let request = EmbeddingRequest {
            input: text,
            model: &self.embedding_model,
        };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| ClientError::MalformedResponse(format!("request encoding: {}", e)))?;

        let response_text = self.post_json("embeddings", &request_json)?;

        let response: EmbeddingResponse = serde_json::from_str(&response_text).map_err(|e| {
            ClientError::MalformedResponse(format!("Failed to parse embedding response: {}", e))
        })?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|object| object.embedding)
            .ok_or_else(|| {
                ClientError::MalformedResponse("no embedding data returned".to_string())
            })?;

        debug!("Generated embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }

    /// Blocking chat-completion call returning the first choice's text
    #[inline]
    pub fn complete_blocking(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ClientError> {
        debug!(
            "Requesting chat completion from {} (prompt length: {})",
            self.chat_model,
            user_prompt.len()
        );

        let request = ChatRequest {
            model: &self.chat_model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Some(system_prompt.to_string()),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Some(user_prompt.to_string()),
                },
            ],
        };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| ClientError::MalformedResponse(format!("request encoding: {}", e)))?;

        let response_text = self.post_json("chat/completions", &request_json)?;

        let response: ChatResponse = serde_json::from_str(&response_text).map_err(|e| {
            ClientError::MalformedResponse(format!("Failed to parse chat response: {}", e))
        })?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::MalformedResponse("no choices returned".to_string()))?;

        choice.message.content.ok_or_else(|| {
            ClientError::MalformedResponse("first choice has no message content".to_string())
        })
    }

    fn post_json(&self, endpoint: &str, body: &str) -> Result<String, ClientError> {
        let ApiKey(api_key) = self
            .api_key
            .as_ref()
            .ok_or_else(|| ClientError::MissingCredential(self.api_key_name.clone()))?;

        let url = self
            .base_url
            .join(endpoint)
            .map_err(|e| ClientError::Transport(format!("Failed to build URL: {}", e)))?;

        let authorization = format!("Bearer {}", api_key);

        self.make_request_with_retry(&url, || {
            self.agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .header("Authorization", &authorization)
                .send(body)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
    }

    fn make_request_with_retry<F>(&self, url: &Url, mut request_fn: F) -> Result<String, ClientError>
    where
        F: FnMut() -> Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!("HTTP request attempt {}/{}", attempt, self.retry_attempts);

            match request_fn() {
                Ok(response_text) => {
                    debug!("Request succeeded on attempt {}", attempt);
                    return Ok(response_text);
                }
                Err(ureq::Error::StatusCode(status)) if status >= 500 => {
                    warn!(
                        "Server error (status {}), attempt {}/{}",
                        status, attempt, self.retry_attempts
                    );
                    last_error = Some(ClientError::Status(status));
                }
                Err(ureq::Error::StatusCode(status)) => {
                    warn!("Client error (status {}), not retrying", status);
                    return Err(ClientError::Status(status));
                }
                Err(
                    error @ (ureq::Error::ConnectionFailed
                    | ureq::Error::HostNotFound
                    | ureq::Error::Timeout(_)
                    | ureq::Error::Io(_)),
                ) => {
                    warn!(
                        "Transport error: {}, attempt {}/{}",
                        error, attempt, self.retry_attempts
                    );
                    last_error = Some(ClientError::Transport(error.to_string()));
                }
                Err(error) => {
                    warn!("Non-retryable error: {}", error);
                    return Err(ClientError::Transport(error.to_string()));
                }
            }

            if attempt < self.retry_attempts {
                let delay = self.retry_delay * EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1);
                debug!("Waiting {:?} before retry", delay);
                std::thread::sleep(delay);
            }
        }

        error!("All retry attempts failed for request to {}", url);

        Err(last_error
            .unwrap_or_else(|| ClientError::Transport("Request failed after retries".to_string())))
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiClient {
    #[inline]
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ClientError> {
        let client = self.clone();
        let text = text.to_string();
        tokio::task::spawn_blocking(move || client.embed_blocking(&text))
            .await
            .map_err(|e| ClientError::Task(e.to_string()))?
    }
}

#[async_trait]
impl ChatClient for OpenAiClient {
    #[inline]
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ClientError> {
        let client = self.clone();
        let system_prompt = system_prompt.to_string();
        let user_prompt = user_prompt.to_string();
        tokio::task::spawn_blocking(move || client.complete_blocking(&system_prompt, &user_prompt))
            .await
            .map_err(|e| ClientError::Task(e.to_string()))?
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}
