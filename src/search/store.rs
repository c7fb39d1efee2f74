//! SQLite-backed vector store.
//!
//! Notes live in a single `notes` table, partitioned by collection, with the
//! metadata and embedding stored as JSON text. Search loads the collection,
//! scores every note against the query embedding and keeps the best `top_k`.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{cosine_similarity, EmbeddingProvider, Metadata, SearchHit, SearchIndex, SearchResult};
use crate::error::{InsightError, Result};

/// Persistent note store searched by embedding similarity.
pub struct SqliteVectorStore {
    pool: SqlitePool,
    collection: String,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl SqliteVectorStore {
    /// Opens or creates the store at `path`.
    pub async fn open(
        path: &Path,
        collection: &str,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                InsightError::search(format!(
                    "Failed to create store directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let conn_str = format!("sqlite:{}?mode=rwc", path.display());
        let options = SqliteConnectOptions::from_str(&conn_str)
            .map_err(|e| InsightError::search(format!("Invalid store path: {e}")))?
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|e| InsightError::search(format!("Failed to open note store: {e}")))?;

        let store = Self::with_pool(pool, collection, embedder).await?;
        info!("Note store opened at {}", path.display());
        Ok(store)
    }

    /// Creates a store that lives only as long as the process.
    pub async fn in_memory(collection: &str, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        // A single connection keeps every query on the same in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| InsightError::search(format!("Failed to open note store: {e}")))?;

        Self::with_pool(pool, collection, embedder).await
    }

    async fn with_pool(
        pool: SqlitePool,
        collection: &str,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                collection TEXT NOT NULL,
                text TEXT NOT NULL,
                metadata TEXT,
                embedding TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| InsightError::search(format!("Failed to create notes table: {e}")))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_notes_collection ON notes(collection)")
            .execute(&pool)
            .await
            .map_err(|e| InsightError::search(format!("Failed to create notes index: {e}")))?;

        Ok(Self {
            pool,
            collection: collection.to_string(),
            embedder,
        })
    }

    /// Returns the number of notes in this store's collection.
    pub async fn count(&self) -> Result<usize> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM notes WHERE collection = ?")
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| InsightError::search(format!("Failed to count notes: {e}")))?;
        Ok(count.max(0) as usize)
    }

    /// Returns the collection name.
    pub fn collection(&self) -> &str {
        &self.collection
    }
}

#[async_trait]
impl SearchIndex for SqliteVectorStore {
    async fn search(&self, query: &str, top_k: usize) -> Result<SearchResult> {
        if top_k == 0 {
            return Ok(SearchResult::default());
        }

        let query_embedding = self.embedder.embed(query).await?;

        let rows: Vec<(String, Option<String>, String)> = sqlx::query_as(
            "SELECT text, metadata, embedding FROM notes WHERE collection = ? ORDER BY id",
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| InsightError::search(format!("Failed to load notes: {e}")))?;

        let mut hits = Vec::with_capacity(rows.len());
        for (text, metadata, embedding) in rows {
            let embedding: Vec<f32> = match serde_json::from_str(&embedding) {
                Ok(v) => v,
                Err(e) => {
                    warn!("Skipping note with unreadable embedding: {e}");
                    continue;
                }
            };
            if embedding.len() != query_embedding.len() {
                warn!(
                    expected = query_embedding.len(),
                    found = embedding.len(),
                    "Skipping note embedded with a different dimension"
                );
                continue;
            }

            let metadata: Option<Metadata> = metadata.and_then(|m| serde_json::from_str(&m).ok());
            hits.push(SearchHit {
                score: cosine_similarity(&query_embedding, &embedding),
                text,
                metadata,
            });
        }

        // Stable sort: equal scores keep insertion order.
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);

        debug!(
            collection = %self.collection,
            hits = hits.len(),
            "Semantic search complete"
        );

        Ok(SearchResult::new(hits))
    }

    async fn add_documents(
        &self,
        texts: &[String],
        metadatas: Option<&[Metadata]>,
    ) -> Result<usize> {
        if let Some(metadatas) = metadatas {
            if metadatas.len() != texts.len() {
                return Err(InsightError::search(format!(
                    "Mismatch: {} texts but {} metadata entries",
                    texts.len(),
                    metadatas.len()
                )));
            }
        }
        if texts.is_empty() {
            return Ok(0);
        }

        let embeddings = self.embedder.embed_batch(texts).await?;
        if embeddings.len() != texts.len() {
            return Err(InsightError::search(format!(
                "Mismatch: {} texts but {} embeddings",
                texts.len(),
                embeddings.len()
            )));
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| InsightError::search(format!("Failed to start transaction: {e}")))?;

        for (i, (text, embedding)) in texts.iter().zip(&embeddings).enumerate() {
            let metadata = metadatas
                .and_then(|m| m.get(i))
                .map(serde_json::to_string)
                .transpose()
                .map_err(|e| InsightError::search(format!("Invalid metadata: {e}")))?;
            let embedding = serde_json::to_string(embedding)
                .map_err(|e| InsightError::search(format!("Invalid embedding: {e}")))?;

            sqlx::query(
                "INSERT INTO notes (collection, text, metadata, embedding) VALUES (?, ?, ?, ?)",
            )
            .bind(&self.collection)
            .bind(text)
            .bind(metadata)
            .bind(embedding)
            .execute(&mut *tx)
            .await
            .map_err(|e| InsightError::search(format!("Failed to insert note: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| InsightError::search(format!("Failed to commit notes: {e}")))?;

        info!(
            collection = %self.collection,
            count = texts.len(),
            model = self.embedder.model_name(),
            "Added documents"
        );
        Ok(texts.len())
    }
}
