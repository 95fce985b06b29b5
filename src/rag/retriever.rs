//! Query-time retrieval: embed the user message, search the policy store,
//! and format the hits into the prompt context block.

use std::sync::Arc;

use super::store::{PolicyStore, RetrievedChunk};
use crate::core::errors::ApiError;
use crate::llm::LlmManager;

#[derive(Clone)]
pub struct Retriever {
    store: Arc<PolicyStore>,
    llm: LlmManager,
    top_k: usize,
}

impl Retriever {
    pub fn new(store: Arc<PolicyStore>, llm: LlmManager, top_k: usize) -> Self {
        Self { store, llm, top_k }
    }

    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedChunk>, ApiError> {
        let embeddings = self.llm.embed(&[query.to_string()]).await?;
        let query_embedding = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Upstream("embedding response was empty".to_string()))?;

        self.store.search(query_embedding, self.top_k).await
    }
}

/// Render retrieved chunks the way the prompt expects them. Empty input
/// renders to an empty string so the context section is omitted entirely.
pub fn format_context(chunks: &[RetrievedChunk]) -> String {
    if chunks.is_empty() {
        return String::new();
    }

    let mut context = String::from("RELEVANT AIR INDIA POLICIES:\n");
    for chunk in chunks {
        context.push_str(&format!("--- FROM DOCUMENT: {} ---\n", chunk.source));
        context.push_str(&chunk.content);
        context.push_str("\n\n");
    }
    context.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_formatting_labels_sources() {
        let chunks = vec![
            RetrievedChunk {
                source: "baggage.md".to_string(),
                content: "Economy allows 23 kg.".to_string(),
                score: 0.91,
            },
            RetrievedChunk {
                source: "checkin.md".to_string(),
                content: "Web check-in opens 48h before departure.".to_string(),
                score: 0.84,
            },
        ];

        let context = format_context(&chunks);
        assert!(context.starts_with("RELEVANT AIR INDIA POLICIES:"));
        assert!(context.contains("--- FROM DOCUMENT: baggage.md ---"));
        assert!(context.contains("--- FROM DOCUMENT: checkin.md ---"));
        assert!(context.contains("23 kg"));
    }

    #[test]
    fn empty_retrieval_renders_nothing() {
        assert_eq!(format_context(&[]), "");
    }
}
