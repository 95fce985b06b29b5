//! Google Gemini provider.
//!
//! Talks to the Generative Language REST API directly. Every request walks
//! the configured model pool, and the whole pool is retried with the
//! fallback API key when the primary key is exhausted or rejected.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use super::provider::LlmProvider;
use super::types::{ChatOutcome, ChatRequest, ToolCall};
use crate::core::errors::ApiError;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone)]
pub struct GeminiProvider {
    base_url: String,
    api_keys: Vec<String>,
    model_pool: Vec<String>,
    embedding_model: String,
    temperature: f64,
    client: Client,
}

impl GeminiProvider {
    pub fn new(
        api_keys: Vec<String>,
        model_pool: Vec<String>,
        embedding_model: String,
        temperature: f64,
        timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_keys,
            model_pool,
            embedding_model,
            temperature,
            client,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_keys.is_empty()
    }

    fn require_keys(&self) -> Result<&[String], ApiError> {
        if self.api_keys.is_empty() {
            return Err(ApiError::ServiceUnavailable(
                "No Google API key configured. Set GOOGLE_API_KEY or GOOGLE_FALLBACK_API_KEY."
                    .to_string(),
            ));
        }
        Ok(&self.api_keys)
    }

    pub(crate) fn build_body(&self, request: &ChatRequest) -> Value {
        let mut system_parts = Vec::new();
        let mut contents = Vec::new();

        for message in &request.messages {
            match message.role.as_str() {
                "system" => system_parts.push(json!({"text": message.content})),
                "assistant" => contents.push(json!({
                    "role": "model",
                    "parts": [{"text": message.content}],
                })),
                _ => contents.push(json!({
                    "role": "user",
                    "parts": [{"text": message.content}],
                })),
            }
        }

        let mut body = json!({
            "contents": contents,
            "generationConfig": {
                "temperature": request.temperature.unwrap_or(self.temperature),
            },
        });

        if let Some(obj) = body.as_object_mut() {
            if !system_parts.is_empty() {
                obj.insert(
                    "systemInstruction".to_string(),
                    json!({"parts": system_parts}),
                );
            }
            if !request.tools.is_empty() {
                let declarations: Vec<Value> = request
                    .tools
                    .iter()
                    .map(|tool| {
                        json!({
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.parameters,
                        })
                    })
                    .collect();
                obj.insert(
                    "tools".to_string(),
                    json!([{"functionDeclarations": declarations}]),
                );
            }
            if let Some(max_tokens) = request.max_tokens {
                if let Some(cfg) = obj
                    .get_mut("generationConfig")
                    .and_then(|v| v.as_object_mut())
                {
                    cfg.insert("maxOutputTokens".to_string(), json!(max_tokens));
                }
            }
        }

        body
    }

    pub(crate) fn parse_outcome(payload: &Value) -> Result<ChatOutcome, ApiError> {
        let parts = payload["candidates"][0]["content"]["parts"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        let mut tool_calls = Vec::new();
        let mut text = String::new();

        for part in &parts {
            if let Some(call) = part.get("functionCall") {
                let name = call["name"].as_str().unwrap_or_default().to_string();
                let arguments = call.get("args").cloned().unwrap_or(Value::Null);
                tool_calls.push(ToolCall { name, arguments });
            } else if let Some(fragment) = part.get("text").and_then(|v| v.as_str()) {
                text.push_str(fragment);
            }
        }

        if !tool_calls.is_empty() {
            return Ok(ChatOutcome::ToolCalls(tool_calls));
        }
        if text.is_empty() {
            let reason = payload["candidates"][0]["finishReason"]
                .as_str()
                .unwrap_or("no content");
            return Err(ApiError::Upstream(format!(
                "Gemini returned an empty response ({})",
                reason
            )));
        }
        Ok(ChatOutcome::Text(text))
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        let Some(key) = self.api_keys.first() else {
            return Ok(false);
        };
        let url = format!("{}/models?key={}", self.base_url, key);
        match self.client.get(&url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatOutcome, ApiError> {
        let keys = self.require_keys()?;
        let body = self.build_body(request);

        let mut last_error = None;
        for key in keys {
            for model in &self.model_pool {
                let url = format!(
                    "{}/models/{}:generateContent?key={}",
                    self.base_url, model, key
                );
                let res = match self.client.post(&url).json(&body).send().await {
                    Ok(res) => res,
                    Err(err) => {
                        tracing::warn!("Gemini request failed for model {}: {}", model, err);
                        last_error = Some(err.to_string());
                        continue;
                    }
                };

                if !res.status().is_success() {
                    let status = res.status();
                    let detail = res.text().await.unwrap_or_default();
                    tracing::warn!("Gemini model {} returned {}: {}", model, status, detail);
                    last_error = Some(format!("{}: {}", status, detail));
                    continue;
                }

                let payload: Value = res.json().await.map_err(ApiError::upstream)?;
                return Self::parse_outcome(&payload);
            }
        }

        Err(ApiError::Upstream(format!(
            "All Gemini API keys and models failed. Last error: {}",
            last_error.unwrap_or_else(|| "unknown".to_string())
        )))
    }

    async fn stream_chat(
        &self,
        request: &ChatRequest,
    ) -> Result<mpsc::Receiver<Result<String, ApiError>>, ApiError> {
        let keys = self.require_keys()?;
        // streamGenerateContent takes the same request body
        let body = self.build_body(request);

        let mut last_error = None;
        for key in keys {
            for model in &self.model_pool {
                let url = format!(
                    "{}/models/{}:streamGenerateContent?alt=sse&key={}",
                    self.base_url, model, key
                );
                let res = match self.client.post(&url).json(&body).send().await {
                    Ok(res) => res,
                    Err(err) => {
                        last_error = Some(err.to_string());
                        continue;
                    }
                };

                if !res.status().is_success() {
                    let status = res.status();
                    let detail = res.text().await.unwrap_or_default();
                    tracing::warn!("Gemini stream {} returned {}: {}", model, status, detail);
                    last_error = Some(format!("{}: {}", status, detail));
                    continue;
                }

                let (tx, rx) = mpsc::channel(32);
                let mut stream = res.bytes_stream();

                tokio::spawn(async move {
                    let mut pending = String::new();
                    while let Some(item) = stream.next().await {
                        match item {
                            Ok(bytes) => {
                                pending.push_str(&String::from_utf8_lossy(&bytes));
                                while let Some(newline) = pending.find('\n') {
                                    let line = pending[..newline].trim().to_string();
                                    pending.drain(..=newline);
                                    let Some(data) = line.strip_prefix("data: ") else {
                                        continue;
                                    };
                                    if let Some(chunk) = extract_stream_text(data) {
                                        if !chunk.is_empty()
                                            && tx.send(Ok(chunk)).await.is_err()
                                        {
                                            return;
                                        }
                                    }
                                }
                            }
                            Err(err) => {
                                let _ = tx.send(Err(ApiError::upstream(err))).await;
                                return;
                            }
                        }
                    }
                });

                return Ok(rx);
            }
        }

        Err(ApiError::Upstream(format!(
            "All Gemini API keys and models failed to open a stream. Last error: {}",
            last_error.unwrap_or_else(|| "unknown".to_string())
        )))
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        let keys = self.require_keys()?;
        let model = &self.embedding_model;

        let requests: Vec<Value> = inputs
            .iter()
            .map(|text| {
                json!({
                    "model": model,
                    "content": {"parts": [{"text": text}]},
                })
            })
            .collect();
        let body = json!({"requests": requests});

        let mut last_error = None;
        for key in keys {
            let url = format!("{}/{}:batchEmbedContents?key={}", self.base_url, model, key);
            let res = match self.client.post(&url).json(&body).send().await {
                Ok(res) => res,
                Err(err) => {
                    last_error = Some(err.to_string());
                    continue;
                }
            };

            if !res.status().is_success() {
                let status = res.status();
                let detail = res.text().await.unwrap_or_default();
                last_error = Some(format!("{}: {}", status, detail));
                continue;
            }

            let payload: Value = res.json().await.map_err(ApiError::upstream)?;
            let mut embeddings = Vec::new();
            if let Some(data) = payload["embeddings"].as_array() {
                for item in data {
                    let values: Vec<f32> = item["values"]
                        .as_array()
                        .map(|vals| {
                            vals.iter()
                                .filter_map(|v| v.as_f64().map(|f| f as f32))
                                .collect()
                        })
                        .unwrap_or_default();
                    embeddings.push(values);
                }
            }
            return Ok(embeddings);
        }

        Err(ApiError::Upstream(format!(
            "Gemini embeddings failed for all API keys. Last error: {}",
            last_error.unwrap_or_else(|| "unknown".to_string())
        )))
    }
}

fn extract_stream_text(data: &str) -> Option<String> {
    let payload: Value = serde_json::from_str(data).ok()?;
    let parts = payload["candidates"][0]["content"]["parts"].as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(|v| v.as_str()))
        .collect();
    Some(text)
}
