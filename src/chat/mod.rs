//! Chat orchestration: memory + retrieval + persona prompt + LLM + tools.

use tokio::sync::mpsc;

use crate::core::errors::ApiError;
use crate::language;
use crate::llm::types::{ChatMessage, ChatOutcome, ChatRequest};
use crate::llm::LlmManager;
use crate::memory::MemoryService;
use crate::prompts;
use crate::rag::retriever::format_context;
use crate::rag::Retriever;
use crate::tools::ToolRegistry;

/// How many tool rounds a single turn may take before the model is forced
/// to answer with text.
const MAX_TOOL_ROUNDS: usize = 2;

const PRIMING_ACK: &str = "I understand. I am Maharaja Assistant, Air India's virtual assistant. \
                           I have access to the provided policies and history. I am ready to help.";

pub struct ChatReply {
    pub message: String,
    pub provider: String,
    pub language: String,
}

#[derive(Clone)]
pub struct ChatService {
    llm: LlmManager,
    memory: MemoryService,
    retriever: Option<Retriever>,
    tools: ToolRegistry,
    history_limit: usize,
}

impl ChatService {
    pub fn new(
        llm: LlmManager,
        memory: MemoryService,
        retriever: Option<Retriever>,
        tools: ToolRegistry,
        history_limit: usize,
    ) -> Self {
        if retriever.is_none() {
            tracing::warn!("ChatService running without RAG retrieval (degraded mode)");
        }
        Self {
            llm,
            memory,
            retriever,
            tools,
            history_limit,
        }
    }

    pub async fn process_message(
        &self,
        session_id: &str,
        user_message: &str,
    ) -> Result<ChatReply, ApiError> {
        tracing::info!("Processing message for session {}", session_id);

        let lang = self.note_user_message(session_id, user_message).await;
        let messages = self.build_messages(session_id, user_message, &lang).await;

        let mut request = ChatRequest::new(messages).with_tools(self.tools.specs());

        let mut rounds = 0;
        let text = loop {
            match self.llm.chat(&request).await? {
                ChatOutcome::Text(text) => break text,
                ChatOutcome::ToolCalls(calls) => {
                    rounds += 1;
                    let mut results = String::from("TOOL RESULTS:\n");
                    for call in &calls {
                        let output = self.tools.execute(call).await;
                        results.push_str(&format!("{}:\n{}\n\n", call.name, output));
                    }
                    results.push_str("Use these results to answer the user's last question.");
                    request.messages.push(ChatMessage::user(results));

                    if rounds >= MAX_TOOL_ROUNDS {
                        request.tools.clear();
                    }
                }
            }
        };

        self.memory
            .add_message(session_id, "assistant", &text)
            .await;

        tracing::info!("Response generated for session {}", session_id);
        Ok(ChatReply {
            message: text,
            provider: self.llm.active_provider_name().to_string(),
            language: lang,
        })
    }

    /// Streaming variant. Tool calls are not exercised here; the stream
    /// carries text deltas only, and the completed reply is recorded in
    /// memory once the provider stream ends.
    pub async fn stream_message(
        &self,
        session_id: &str,
        user_message: &str,
    ) -> Result<mpsc::Receiver<Result<String, ApiError>>, ApiError> {
        tracing::info!("Streaming message for session {}", session_id);

        let lang = self.note_user_message(session_id, user_message).await;
        let messages = self.build_messages(session_id, user_message, &lang).await;
        let request = ChatRequest::new(messages);

        let mut provider_rx = self.llm.stream_chat(&request).await?;

        let (tx, rx) = mpsc::channel(32);
        let memory = self.memory.clone();
        let session_id = session_id.to_string();

        tokio::spawn(async move {
            let mut full_text = String::new();
            while let Some(item) = provider_rx.recv().await {
                match item {
                    Ok(chunk) => {
                        full_text.push_str(&chunk);
                        if tx.send(Ok(chunk)).await.is_err() {
                            // client went away; still record what we have
                            break;
                        }
                    }
                    Err(err) => {
                        let _ = tx.send(Err(err)).await;
                        return;
                    }
                }
            }
            if !full_text.is_empty() {
                memory.add_message(&session_id, "assistant", &full_text).await;
            }
        });

        Ok(rx)
    }

    pub async fn clear_session(&self, session_id: &str) -> bool {
        self.memory.clear_session(session_id).await
    }

    async fn note_user_message(&self, session_id: &str, user_message: &str) -> String {
        let hint = self.memory.language_hint(session_id).await;
        let lang = language::detect_language(user_message, "en", hint.as_deref());

        self.memory
            .add_message(session_id, "user", user_message)
            .await;
        self.memory.set_language_hint(session_id, &lang).await;
        lang
    }

    async fn build_messages(
        &self,
        session_id: &str,
        user_message: &str,
        lang: &str,
    ) -> Vec<ChatMessage> {
        let context = match &self.retriever {
            Some(retriever) => match retriever.retrieve(user_message).await {
                Ok(chunks) => format_context(&chunks),
                Err(err) => {
                    tracing::warn!("Retrieval failed, answering without context: {}", err);
                    String::new()
                }
            },
            None => String::new(),
        };

        let instructions = format!(
            "{}\n{}",
            prompts::system_prompt(&context),
            language::language_instruction(lang)
        );

        // persona arrives as a primed user/assistant exchange; some models
        // drop the identity when it only appears as a system turn
        let mut messages = vec![
            ChatMessage::user(format!(
                "SYSTEM INSTRUCTIONS:\n{}\n\nCONFIRM YOU UNDERSTAND.",
                instructions
            )),
            ChatMessage::assistant(PRIMING_ACK),
        ];
        messages.extend(self.memory.get_history(session_id, self.history_limit).await);
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flights::FlightService;
    use crate::llm::provider::LlmProvider;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Provider that answers a scripted sequence of outcomes and records
    /// every request it sees.
    struct ScriptedProvider {
        outcomes: Mutex<Vec<ChatOutcome>>,
        seen: Mutex<Vec<ChatRequest>>,
        stream_chunks: Vec<&'static str>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(outcomes: Vec<ChatOutcome>, stream_chunks: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes),
                seen: Mutex::new(Vec::new()),
                stream_chunks,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn health_check(&self) -> Result<bool, ApiError> {
            Ok(true)
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatOutcome, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request.clone());
            let mut outcomes = self.outcomes.lock().unwrap();
            if outcomes.is_empty() {
                return Ok(ChatOutcome::Text("default answer".to_string()));
            }
            Ok(outcomes.remove(0))
        }

        async fn stream_chat(
            &self,
            request: &ChatRequest,
        ) -> Result<mpsc::Receiver<Result<String, ApiError>>, ApiError> {
            self.seen.lock().unwrap().push(request.clone());
            let (tx, rx) = mpsc::channel(8);
            let chunks = self.stream_chunks.clone();
            tokio::spawn(async move {
                for chunk in chunks {
                    if tx.send(Ok(chunk.to_string())).await.is_err() {
                        return;
                    }
                }
            });
            Ok(rx)
        }

        async fn embed(&self, _inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
            Err(ApiError::Upstream("no embeddings in tests".to_string()))
        }
    }

    fn chat_service(provider: Arc<ScriptedProvider>) -> ChatService {
        let llm = LlmManager::new(vec![provider]);
        let tools = ToolRegistry::new(Arc::new(FlightService::new(None, false)));
        ChatService::new(llm, MemoryService::new(60), None, tools, 40)
    }

    #[tokio::test]
    async fn plain_turn_records_both_messages() {
        let provider = ScriptedProvider::new(
            vec![ChatOutcome::Text("Namaste! How can I help?".to_string())],
            vec![],
        );
        let service = chat_service(provider.clone());

        let reply = service.process_message("s1", "hello").await.unwrap();
        assert_eq!(reply.message, "Namaste! How can I help?");
        assert_eq!(reply.language, "en");
        assert_eq!(reply.provider, "scripted");

        let history = service.memory.get_history("s1", 10).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, "user");
        assert_eq!(history[1].role, "assistant");
    }

    #[tokio::test]
    async fn persona_and_language_are_primed() {
        let provider = ScriptedProvider::new(
            vec![ChatOutcome::Text("¡Namaste!".to_string())],
            vec![],
        );
        let service = chat_service(provider.clone());

        service.process_message("s1", "hola").await.unwrap();

        let seen = provider.seen.lock().unwrap();
        let first = &seen[0].messages[0];
        assert_eq!(first.role, "user");
        assert!(first.content.starts_with("SYSTEM INSTRUCTIONS:"));
        assert!(first.content.contains("Maharaja Assistant"));
        assert!(first.content.contains("SPANISH"));
        assert_eq!(seen[0].messages[1].content, PRIMING_ACK);
        assert!(!seen[0].tools.is_empty());
    }

    #[tokio::test]
    async fn tool_calls_are_executed_and_fed_back() {
        let provider = ScriptedProvider::new(
            vec![
                ChatOutcome::ToolCalls(vec![crate::llm::types::ToolCall {
                    name: "search_flights".to_string(),
                    arguments: json!({"origin": "DEL", "destination": "BOM"}),
                }]),
                ChatOutcome::Text("Here are tomorrow's flights.".to_string()),
            ],
            vec![],
        );
        let service = chat_service(provider.clone());

        let reply = service
            .process_message("s1", "flights from Delhi to Mumbai?")
            .await
            .unwrap();
        assert_eq!(reply.message, "Here are tomorrow's flights.");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);

        let seen = provider.seen.lock().unwrap();
        let followup = seen[1].messages.last().unwrap();
        assert!(followup.content.starts_with("TOOL RESULTS:"));
        assert!(followup.content.contains("AI 865"));
    }

    #[tokio::test]
    async fn tool_rounds_are_bounded() {
        let tool_call = || {
            ChatOutcome::ToolCalls(vec![crate::llm::types::ToolCall {
                name: "lookup_iata_code".to_string(),
                arguments: json!({"city_name": "Delhi"}),
            }])
        };
        let provider = ScriptedProvider::new(
            vec![
                tool_call(),
                tool_call(),
                ChatOutcome::Text("DEL it is.".to_string()),
            ],
            vec![],
        );
        let service = chat_service(provider.clone());

        let reply = service.process_message("s1", "code for Delhi?").await.unwrap();
        assert_eq!(reply.message, "DEL it is.");

        // After the cap the request goes out without tools.
        let seen = provider.seen.lock().unwrap();
        assert!(seen.last().unwrap().tools.is_empty());
    }

    #[tokio::test]
    async fn streaming_records_the_full_reply() {
        let provider =
            ScriptedProvider::new(vec![], vec!["Nam", "aste", "!"]);
        let service = chat_service(provider.clone());

        let mut rx = service.stream_message("s1", "hello").await.unwrap();
        let mut collected = String::new();
        while let Some(chunk) = rx.recv().await {
            collected.push_str(&chunk.unwrap());
        }
        assert_eq!(collected, "Namaste!");

        // give the recording task a beat
        tokio::task::yield_now().await;
        let history = service.memory.get_history("s1", 10).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content, "Namaste!");
    }

    #[tokio::test]
    async fn clear_session_forgets_history() {
        let provider = ScriptedProvider::new(
            vec![ChatOutcome::Text("hi".to_string())],
            vec![],
        );
        let service = chat_service(provider);

        service.process_message("s1", "hello").await.unwrap();
        assert!(service.clear_session("s1").await);
        assert!(service.memory.get_history("s1", 10).await.is_empty());
    }
}
