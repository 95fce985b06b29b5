use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::{ChatOutcome, ChatRequest};
use crate::core::errors::ApiError;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "gemini", "groq")
    fn name(&self) -> &str;

    /// check if the provider is reachable with the configured credentials
    async fn health_check(&self) -> Result<bool, ApiError>;

    /// chat completion (non-streaming); may return tool calls
    async fn chat(&self, request: &ChatRequest) -> Result<ChatOutcome, ApiError>;

    /// chat completion (streaming text deltas)
    async fn stream_chat(
        &self,
        request: &ChatRequest,
    ) -> Result<mpsc::Receiver<Result<String, ApiError>>, ApiError>;

    /// generate embeddings
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError>;
}
