//! Provider dispatch with fallback.
//!
//! The configured provider is tried first; on any upstream failure the
//! remaining providers are tried once each, in order. First success wins,
//! otherwise the last error is returned.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use super::gemini::GeminiProvider;
use super::groq::GroqProvider;
use super::provider::LlmProvider;
use super::types::{ChatOutcome, ChatRequest};
use crate::core::config::{settings, ConfigService};
use crate::core::errors::ApiError;

#[derive(Clone)]
pub struct LlmManager {
    providers: Vec<Arc<dyn LlmProvider>>,
}

impl LlmManager {
    pub fn new(providers: Vec<Arc<dyn LlmProvider>>) -> Self {
        Self { providers }
    }

    pub fn from_config(config_service: &ConfigService, config: &Value) -> Self {
        let temperature = settings::llm_temperature(config);
        let timeout = settings::llm_request_timeout_secs(config);

        let mut gemini_keys = Vec::new();
        if let Some(key) = config_service.secret(config, "llm.google_api_key", "GOOGLE_API_KEY") {
            gemini_keys.push(key);
        }
        if let Some(key) = config_service.secret(
            config,
            "llm.google_fallback_api_key",
            "GOOGLE_FALLBACK_API_KEY",
        ) {
            gemini_keys.push(key);
        }

        let gemini: Arc<dyn LlmProvider> = Arc::new(GeminiProvider::new(
            gemini_keys,
            settings::gemini_model_pool(config),
            settings::embedding_model(config),
            temperature,
            timeout,
        ));

        let groq_key = config_service.secret(config, "llm.groq_api_key", "GROQ_API_KEY");
        let groq: Arc<dyn LlmProvider> = Arc::new(GroqProvider::new(
            groq_key,
            settings::groq_model_pool(config),
            temperature,
            timeout,
        ));

        let providers = match settings::llm_provider(config).as_str() {
            "groq" => vec![groq, gemini],
            _ => vec![gemini, groq],
        };

        tracing::info!(
            "LLM manager initialized, provider order: {:?}",
            providers.iter().map(|p| p.name()).collect::<Vec<_>>()
        );
        Self { providers }
    }

    pub fn active_provider_name(&self) -> &str {
        self.providers
            .first()
            .map(|p| p.name())
            .unwrap_or("none")
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatOutcome, ApiError> {
        let mut last_error = ApiError::ServiceUnavailable("no LLM provider configured".to_string());
        for provider in &self.providers {
            match provider.chat(request).await {
                Ok(outcome) => return Ok(outcome),
                Err(err) => {
                    tracing::warn!("Provider {} failed: {}", provider.name(), err);
                    last_error = err;
                }
            }
        }
        Err(last_error)
    }

    pub async fn stream_chat(
        &self,
        request: &ChatRequest,
    ) -> Result<mpsc::Receiver<Result<String, ApiError>>, ApiError> {
        let mut last_error = ApiError::ServiceUnavailable("no LLM provider configured".to_string());
        for provider in &self.providers {
            match provider.stream_chat(request).await {
                Ok(rx) => return Ok(rx),
                Err(err) => {
                    tracing::warn!(
                        "Provider {} failed to open a stream: {}",
                        provider.name(),
                        err
                    );
                    last_error = err;
                }
            }
        }
        Err(last_error)
    }

    pub async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        let mut last_error = ApiError::ServiceUnavailable("no LLM provider configured".to_string());
        for provider in &self.providers {
            match provider.embed(inputs).await {
                Ok(vectors) => return Ok(vectors),
                Err(err) => {
                    tracing::debug!("Provider {} cannot embed: {}", provider.name(), err);
                    last_error = err;
                }
            }
        }
        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::ChatMessage;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedProvider {
        name: &'static str,
        fail: bool,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(name: &'static str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                fail,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn health_check(&self) -> Result<bool, ApiError> {
            Ok(!self.fail)
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatOutcome, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ApiError::Upstream(format!("{} is down", self.name)))
            } else {
                Ok(ChatOutcome::Text(format!("answer from {}", self.name)))
            }
        }

        async fn stream_chat(
            &self,
            _request: &ChatRequest,
        ) -> Result<mpsc::Receiver<Result<String, ApiError>>, ApiError> {
            if self.fail {
                return Err(ApiError::Upstream(format!("{} is down", self.name)));
            }
            let (tx, rx) = mpsc::channel(4);
            let name = self.name;
            tokio::spawn(async move {
                let _ = tx.send(Ok(format!("chunk from {}", name))).await;
            });
            Ok(rx)
        }

        async fn embed(&self, _inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
            if self.fail {
                Err(ApiError::Upstream(format!("{} is down", self.name)))
            } else {
                Ok(vec![vec![0.0; 4]])
            }
        }
    }

    #[tokio::test]
    async fn primary_success_skips_fallback() {
        let primary = ScriptedProvider::new("primary", false);
        let fallback = ScriptedProvider::new("fallback", false);
        let manager = LlmManager::new(vec![primary.clone(), fallback.clone()]);

        let request = ChatRequest::new(vec![ChatMessage::user("hi")]);
        match manager.chat(&request).await.unwrap() {
            ChatOutcome::Text(text) => assert_eq!(text, "answer from primary"),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fallback_engages_on_primary_failure() {
        let primary = ScriptedProvider::new("primary", true);
        let fallback = ScriptedProvider::new("fallback", false);
        let manager = LlmManager::new(vec![primary, fallback]);

        let request = ChatRequest::new(vec![ChatMessage::user("hi")]);
        match manager.chat(&request).await.unwrap() {
            ChatOutcome::Text(text) => assert_eq!(text, "answer from fallback"),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn all_failures_return_last_error() {
        let manager = LlmManager::new(vec![
            ScriptedProvider::new("primary", true) as Arc<dyn LlmProvider>,
            ScriptedProvider::new("fallback", true),
        ]);

        let request = ChatRequest::new(vec![ChatMessage::user("hi")]);
        let err = manager.chat(&request).await.unwrap_err();
        assert!(err.to_string().contains("fallback is down"));
    }

    #[tokio::test]
    async fn stream_falls_back_too() {
        let manager = LlmManager::new(vec![
            ScriptedProvider::new("primary", true) as Arc<dyn LlmProvider>,
            ScriptedProvider::new("fallback", false),
        ]);

        let request = ChatRequest::new(vec![ChatMessage::user("hi")]);
        let mut rx = manager.stream_chat(&request).await.unwrap();
        let chunk = rx.recv().await.unwrap().unwrap();
        assert_eq!(chunk, "chunk from fallback");
    }
}
