use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use super::types::ChatRequest;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{provider} returned {status}: {message}")]
    Api {
        provider: &'static str,
        status: StatusCode,
        message: String,
    },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Turns text into an embedding vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// return the embedding model name (e.g. "models/embedding-001")
    fn model_name(&self) -> &str;

    /// embed a search query
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, LlmError>;
}

/// Produces a completion for a chat request.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// return the chat model name (e.g. "models/gemini-1.5-pro-latest")
    fn model_name(&self) -> &str;

    /// chat completion (non-streaming); `None` when the model produced no text
    async fn complete(&self, request: ChatRequest) -> Result<Option<String>, LlmError>;
}
