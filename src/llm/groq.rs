//! Groq provider, speaking the OpenAI-compatible chat completions API.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use super::provider::LlmProvider;
use super::types::{ChatOutcome, ChatRequest, ToolCall};
use crate::core::errors::ApiError;

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

#[derive(Clone)]
pub struct GroqProvider {
    base_url: String,
    api_key: Option<String>,
    model_pool: Vec<String>,
    temperature: f64,
    client: Client,
}

impl GroqProvider {
    pub fn new(
        api_key: Option<String>,
        model_pool: Vec<String>,
        temperature: f64,
        timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            model_pool,
            temperature,
            client,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn require_key(&self) -> Result<&str, ApiError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ApiError::ServiceUnavailable("GROQ_API_KEY is not configured.".to_string()))
    }

    pub(crate) fn build_body(&self, request: &ChatRequest, model: &str, stream: bool) -> Value {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|m| json!({"role": m.role, "content": m.content}))
            .collect();

        let mut body = json!({
            "model": model,
            "messages": messages,
            "temperature": request.temperature.unwrap_or(self.temperature),
            "stream": stream,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(max_tokens) = request.max_tokens {
                obj.insert("max_tokens".to_string(), json!(max_tokens));
            }
            if !request.tools.is_empty() {
                let tools: Vec<Value> = request
                    .tools
                    .iter()
                    .map(|tool| {
                        json!({
                            "type": "function",
                            "function": {
                                "name": tool.name,
                                "description": tool.description,
                                "parameters": tool.parameters,
                            },
                        })
                    })
                    .collect();
                obj.insert("tools".to_string(), json!(tools));
            }
        }

        body
    }

    pub(crate) fn parse_outcome(payload: &Value) -> Result<ChatOutcome, ApiError> {
        let message = &payload["choices"][0]["message"];

        if let Some(raw_calls) = message["tool_calls"].as_array() {
            let calls: Vec<ToolCall> = raw_calls
                .iter()
                .filter_map(|call| {
                    let function = call.get("function")?;
                    let name = function["name"].as_str()?.to_string();
                    let arguments = function["arguments"]
                        .as_str()
                        .and_then(|raw| serde_json::from_str(raw).ok())
                        .unwrap_or(Value::Null);
                    Some(ToolCall { name, arguments })
                })
                .collect();
            if !calls.is_empty() {
                return Ok(ChatOutcome::ToolCalls(calls));
            }
        }

        match message["content"].as_str() {
            Some(content) if !content.is_empty() => Ok(ChatOutcome::Text(content.to_string())),
            _ => Err(ApiError::Upstream(
                "Groq returned an empty response".to_string(),
            )),
        }
    }
}

#[async_trait]
impl LlmProvider for GroqProvider {
    fn name(&self) -> &str {
        "groq"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        let Some(key) = self.api_key.as_deref() else {
            return Ok(false);
        };
        let url = format!("{}/models", self.base_url);
        match self.client.get(&url).bearer_auth(key).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatOutcome, ApiError> {
        let key = self.require_key()?;
        let url = format!("{}/chat/completions", self.base_url);

        let mut last_error = None;
        for model in &self.model_pool {
            let body = self.build_body(request, model, false);
            let res = match self.client.post(&url).bearer_auth(key).json(&body).send().await {
                Ok(res) => res,
                Err(err) => {
                    tracing::warn!("Groq request failed for model {}: {}", model, err);
                    last_error = Some(err.to_string());
                    continue;
                }
            };

            if !res.status().is_success() {
                let status = res.status();
                let detail = res.text().await.unwrap_or_default();
                tracing::warn!("Groq model {} returned {}: {}", model, status, detail);
                last_error = Some(format!("{}: {}", status, detail));
                continue;
            }

            let payload: Value = res.json().await.map_err(ApiError::upstream)?;
            return Self::parse_outcome(&payload);
        }

        Err(ApiError::Upstream(format!(
            "All Groq models in pool failed. Last error: {}",
            last_error.unwrap_or_else(|| "unknown".to_string())
        )))
    }

    async fn stream_chat(
        &self,
        request: &ChatRequest,
    ) -> Result<mpsc::Receiver<Result<String, ApiError>>, ApiError> {
        let key = self.require_key()?;
        let url = format!("{}/chat/completions", self.base_url);

        let mut last_error = None;
        for model in &self.model_pool {
            let body = self.build_body(request, model, true);
            let res = match self.client.post(&url).bearer_auth(key).json(&body).send().await {
                Ok(res) => res,
                Err(err) => {
                    last_error = Some(err.to_string());
                    continue;
                }
            };

            if !res.status().is_success() {
                let status = res.status();
                let detail = res.text().await.unwrap_or_default();
                tracing::warn!("Groq stream {} returned {}: {}", model, status, detail);
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
                                if line == "data: [DONE]" {
                                    return;
                                }
                                let Some(data) = line.strip_prefix("data: ") else {
                                    continue;
                                };
                                if let Some(chunk) = extract_delta(data) {
                                    if !chunk.is_empty() && tx.send(Ok(chunk)).await.is_err() {
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

        Err(ApiError::Upstream(format!(
            "All Groq models failed to open a stream. Last error: {}",
            last_error.unwrap_or_else(|| "unknown".to_string())
        )))
    }

    async fn embed(&self, _inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        Err(ApiError::Upstream(
            "Groq does not expose an embeddings API".to_string(),
        ))
    }
}

fn extract_delta(data: &str) -> Option<String> {
    let payload: Value = serde_json::from_str(data).ok()?;
    payload["choices"][0]["delta"]["content"]
        .as_str()
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::{ChatMessage, ToolSpec};

    fn provider() -> GroqProvider {
        GroqProvider::new(
            Some("test-key".to_string()),
            vec!["llama-3.3-70b-versatile".to_string()],
            0.3,
            30,
        )
    }

    #[test]
    fn body_keeps_openai_roles() {
        let request = ChatRequest::new(vec![
            ChatMessage::system("persona"),
            ChatMessage::user("hi"),
        ]);
        let body = provider().build_body(&request, "llama-3.3-70b-versatile", false);

        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn tools_use_openai_function_format() {
        let request = ChatRequest::new(vec![ChatMessage::user("hi")]).with_tools(vec![ToolSpec {
            name: "lookup_iata_code".to_string(),
            description: "IATA lookup".to_string(),
            parameters: serde_json::json!({"type": "object"}),
        }]);
        let body = provider().build_body(&request, "llama-3.3-70b-versatile", false);

        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "lookup_iata_code");
    }

    #[test]
    fn parse_outcome_reads_content() {
        let payload = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Namaste!"}}]
        });
        match GroqProvider::parse_outcome(&payload).unwrap() {
            ChatOutcome::Text(text) => assert_eq!(text, "Namaste!"),
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn parse_outcome_decodes_tool_call_arguments() {
        let payload = serde_json::json!({
            "choices": [{"message": {"tool_calls": [
                {"function": {"name": "search_flights", "arguments": "{\"origin\":\"DEL\",\"destination\":\"GOI\"}"}}
            ]}}]
        });
        match GroqProvider::parse_outcome(&payload).unwrap() {
            ChatOutcome::ToolCalls(calls) => {
                assert_eq!(calls[0].arguments["destination"], "GOI");
            }
            other => panic!("expected tool calls, got {:?}", other),
        }
    }

    #[test]
    fn delta_extraction_reads_streamed_content() {
        let data = r#"{"choices":[{"delta":{"content":"Nam"}}]}"#;
        assert_eq!(extract_delta(data), Some("Nam".to_string()));
        assert_eq!(extract_delta(r#"{"choices":[{"delta":{}}]}"#), None);
    }
}
