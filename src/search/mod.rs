//! Semantic search over free-text order notes.
//!
//! A `SearchIndex` returns the stored snippets most similar to a query,
//! highest similarity first. The production index is a SQLite file of
//! embedded notes ranked by cosine similarity; tests use the in-memory mock.

mod embeddings;
mod mock;
mod store;

pub use embeddings::{
    cosine_similarity, embedder_for, EmbeddingProvider, HashingEmbedder, OllamaEmbedder,
};
pub use mock::MockSearchIndex;
pub use store::SqliteVectorStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::SearchConfig;
use crate::error::Result;

/// Per-snippet metadata tags, e.g. `{"type": "complaint"}`.
pub type Metadata = BTreeMap<String, String>;

/// A single ranked snippet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Stored note text.
    pub text: String,
    /// Optional metadata stored with the note.
    pub metadata: Option<Metadata>,
    /// Similarity to the query, higher is closer.
    pub score: f32,
}

impl SearchHit {
    /// Creates a hit without metadata.
    pub fn new(text: impl Into<String>, score: f32) -> Self {
        Self {
            text: text.into(),
            metadata: None,
            score,
        }
    }

    /// Attaches metadata to the hit.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Ranked snippets for one query, highest similarity first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub hits: Vec<SearchHit>,
}

impl SearchResult {
    /// Creates a result from hits already in rank order.
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self { hits }
    }

    /// Returns true if nothing matched.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Returns the snippet texts in rank order.
    pub fn documents(&self) -> Vec<&str> {
        self.hits.iter().map(|h| h.text.as_str()).collect()
    }

    /// Renders the snippets as a bulleted list, one per line.
    pub fn to_bullets(&self) -> String {
        self.hits
            .iter()
            .map(|h| format!("- {}", h.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Trait for semantic search backends.
///
/// Implementations must be thread-safe (Send + Sync) to support async operations.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Returns up to `top_k` snippets ranked by similarity to `query`.
    async fn search(&self, query: &str, top_k: usize) -> Result<SearchResult>;

    /// Adds documents with optional per-document metadata.
    ///
    /// When `metadatas` is given it must have one entry per text.
    /// Returns the number of documents stored.
    async fn add_documents(&self, texts: &[String], metadatas: Option<&[Metadata]>)
        -> Result<usize>;
}

/// Opens the configured persistent index.
pub async fn open_index(config: &SearchConfig) -> Result<Arc<dyn SearchIndex>> {
    let embedder = embedder_for(config)?;
    let store = SqliteVectorStore::open(&config.store_path(), &config.collection, embedder).await?;
    Ok(Arc::new(store))
}
