//! Policy chunk storage in Postgres + pgvector.

use pgvector::Vector;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::core::errors::ApiError;

/// A chunk retrieved by similarity search.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub source: String,
    pub content: String,
    /// Cosine similarity, higher is better.
    pub score: f32,
}

#[derive(Clone)]
pub struct PolicyStore {
    pool: PgPool,
    table: String,
    dimension: i32,
}

impl PolicyStore {
    pub async fn connect(
        database_url: &str,
        table: &str,
        dimension: i32,
    ) -> Result<Self, ApiError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to connect to database: {}", e)))?;

        let store = Self {
            pool,
            table: table.to_string(),
            dimension,
        };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), ApiError> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to enable pgvector: {}", e)))?;

        let create = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id UUID PRIMARY KEY,
                source TEXT NOT NULL,
                content TEXT NOT NULL,
                metadata JSONB,
                embedding vector({})
            )",
            self.table, self.dimension
        );
        sqlx::query(&create)
            .execute(&self.pool)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to create policy table: {}", e)))?;

        Ok(())
    }

    pub async fn insert_batch(
        &self,
        items: Vec<(String, String, Option<Value>, Vec<f32>)>,
    ) -> Result<(), ApiError> {
        let insert = format!(
            "INSERT INTO {} (id, source, content, metadata, embedding) VALUES ($1, $2, $3, $4, $5)",
            self.table
        );

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;
        for (source, content, metadata, embedding) in items {
            sqlx::query(&insert)
                .bind(Uuid::new_v4())
                .bind(source)
                .bind(content)
                .bind(metadata)
                .bind(Vector::from(embedding))
                .execute(&mut *tx)
                .await
                .map_err(ApiError::internal)?;
        }
        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    /// Nearest-neighbor search by cosine distance.
    pub async fn search(
        &self,
        query_embedding: Vec<f32>,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, ApiError> {
        let select = format!(
            "SELECT source, content, 1 - (embedding <=> $1) AS score
             FROM {}
             ORDER BY embedding <=> $1
             LIMIT $2",
            self.table
        );

        let rows = sqlx::query(&select)
            .bind(Vector::from(query_embedding))
            .bind(k as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            results.push(RetrievedChunk {
                source: row.try_get("source").unwrap_or_default(),
                content: row.try_get("content").unwrap_or_default(),
                score: row.try_get::<f64, _>("score").unwrap_or(0.0) as f32,
            });
        }
        Ok(results)
    }

    pub async fn count(&self) -> Result<i64, ApiError> {
        let query = format!("SELECT COUNT(*) FROM {}", self.table);
        let count: i64 = sqlx::query(&query)
            .fetch_one(&self.pool)
            .await
            .map(|row| row.get(0))
            .map_err(ApiError::internal)?;
        Ok(count)
    }

    /// Drop all stored chunks. Used when the embedding model changes and the
    /// vectors are no longer comparable.
    pub async fn reset(&self) -> Result<(), ApiError> {
        let truncate = format!("TRUNCATE {}", self.table);
        sqlx::query(&truncate)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(())
    }
}
