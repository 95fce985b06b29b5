//! Session-scoped conversation memory.
//!
//! Messages live in process memory and are lost on restart. Sessions that
//! have not been touched within the TTL are dropped on the next access.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use crate::llm::types::ChatMessage;

struct SessionMemory {
    messages: Vec<ChatMessage>,
    language_hint: Option<String>,
    last_accessed: DateTime<Utc>,
}

impl SessionMemory {
    fn new() -> Self {
        Self {
            messages: Vec::new(),
            language_hint: None,
            last_accessed: Utc::now(),
        }
    }
}

#[derive(Clone)]
pub struct MemoryService {
    sessions: Arc<RwLock<HashMap<String, SessionMemory>>>,
    ttl: Duration,
}

impl MemoryService {
    pub fn new(ttl_minutes: i64) -> Self {
        tracing::info!("Memory service initialized with TTL={} minutes", ttl_minutes);
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub async fn add_message(&self, session_id: &str, role: &str, content: &str) {
        let mut sessions = self.sessions.write().await;
        Self::evict_expired(&mut sessions, self.ttl);

        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(SessionMemory::new);
        session.messages.push(ChatMessage {
            role: role.to_string(),
            content: content.to_string(),
        });
        session.last_accessed = Utc::now();
    }

    pub async fn get_history(&self, session_id: &str, limit: usize) -> Vec<ChatMessage> {
        let mut sessions = self.sessions.write().await;
        Self::evict_expired(&mut sessions, self.ttl);

        let Some(session) = sessions.get_mut(session_id) else {
            return Vec::new();
        };
        session.last_accessed = Utc::now();

        let messages = &session.messages;
        let start = messages.len().saturating_sub(limit);
        messages[start..].to_vec()
    }

    pub async fn language_hint(&self, session_id: &str) -> Option<String> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id)?.language_hint.clone()
    }

    pub async fn set_language_hint(&self, session_id: &str, language: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(session_id) {
            session.language_hint = Some(language.to_string());
        }
    }

    pub async fn clear_session(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(session_id).is_some();
        if removed {
            tracing::info!("Cleared session {}", session_id);
        } else {
            tracing::warn!("Attempted to clear non-existent session {}", session_id);
        }
        removed
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    fn evict_expired(sessions: &mut HashMap<String, SessionMemory>, ttl: Duration) {
        let now = Utc::now();
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, session)| now - session.last_accessed > ttl)
            .map(|(id, _)| id.clone())
            .collect();

        for session_id in &expired {
            sessions.remove(session_id);
            tracing::info!("Cleaned up expired session {}", session_id);
        }
    }
}
