//! Policy document ingestion.
//!
//! Reads `*.md` files from the policies directory (or a directory passed on
//! the command line), chunks them, embeds the chunks through the configured
//! LLM provider, and stores the vectors in Postgres. Embedding calls are
//! paced to stay inside the free-tier quota.
//!
//! Usage: `ingest [--reset] [DIR]`

use std::num::NonZeroU32;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use governor::{Quota, RateLimiter};

use maharaja_backend::core::config::{settings, AppPaths, ConfigService};
use maharaja_backend::core::logging;
use maharaja_backend::llm::LlmManager;
use maharaja_backend::rag::chunker::{self, ChunkerConfig};
use maharaja_backend::rag::PolicyStore;

const EMBED_BATCH_SIZE: usize = 8;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);

    let mut reset = false;
    let mut directory: Option<PathBuf> = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--reset" => reset = true,
            other => directory = Some(PathBuf::from(other)),
        }
    }
    let directory = directory.unwrap_or_else(|| paths.policies_dir.clone());

    let config_service = ConfigService::new(paths);
    let config = config_service.load_config()?;

    let llm = LlmManager::from_config(&config_service, &config);
    let store = PolicyStore::connect(
        &settings::database_url(&config),
        &settings::rag_collection(&config),
        settings::embedding_dimension(&config),
    )
    .await?;

    if reset {
        store.reset().await?;
        tracing::info!("Cleared existing policy chunks");
    }

    let chunker_config = ChunkerConfig {
        chunk_size: settings::rag_chunk_size(&config),
        chunk_overlap: settings::rag_chunk_overlap(&config),
    };

    let mut chunks = Vec::new();
    let entries = std::fs::read_dir(&directory)
        .with_context(|| format!("Failed to read {}", directory.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("md") {
            continue;
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let source = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let pieces = chunker::split_document(&text, &source, &chunker_config);
        tracing::info!("{}: {} chunks", source, pieces.len());
        chunks.extend(pieces);
    }

    if chunks.is_empty() {
        bail!("No markdown documents found in {}", directory.display());
    }

    let rpm = settings::ingest_requests_per_minute(&config).max(1);
    let limiter = RateLimiter::direct(Quota::per_minute(
        NonZeroU32::new(rpm).expect("rpm is at least 1"),
    ));

    let total = chunks.len();
    let mut inserted = 0usize;
    for batch in chunks.chunks(EMBED_BATCH_SIZE) {
        limiter.until_ready().await;

        let inputs: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
        let embeddings = llm.embed(&inputs).await?;
        if embeddings.len() != batch.len() {
            bail!(
                "Embedding count mismatch: got {} for {} chunks",
                embeddings.len(),
                batch.len()
            );
        }

        let items: Vec<(String, String, Option<serde_json::Value>, Vec<f32>)> = batch
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| (chunk.source.clone(), chunk.content.clone(), None, embedding))
            .collect();
        store.insert_batch(items).await?;

        inserted += batch.len();
        tracing::info!("Ingested {}/{} chunks", inserted, total);
    }

    tracing::info!(
        "Ingestion complete: {} chunks from {} now in the store ({} total rows)",
        total,
        directory.display(),
        store.count().await?
    );
    Ok(())
}
