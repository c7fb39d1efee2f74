//! Embedding providers.
//!
//! `OllamaEmbedder` calls a local Ollama `/api/embed` endpoint.
//! `HashingEmbedder` is a deterministic bag-of-words feature hasher that needs
//! no model at all; it is used offline and in tests.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use crate::config::SearchConfig;
use crate::error::{InsightError, Result};
use crate::llm::ollama::DEFAULT_OLLAMA_URL;

/// Trait for embedding providers that convert text to vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| InsightError::search("Embedder returned no vectors"))
    }

    /// Generate embeddings for a batch of texts.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Return the dimensionality of embeddings produced.
    fn dimensions(&self) -> usize;

    /// Return the model name.
    fn model_name(&self) -> &str;
}

/// Builds the embedder named in the search config.
///
/// The Ollama endpoint comes from `OLLAMA_URL`, defaulting to localhost.
pub fn embedder_for(config: &SearchConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.embedder.to_lowercase().as_str() {
        "ollama" => {
            let endpoint =
                std::env::var("OLLAMA_URL").unwrap_or_else(|_| DEFAULT_OLLAMA_URL.to_string());
            Ok(Arc::new(OllamaEmbedder::new(
                &config.embedding_model,
                endpoint,
                config.dimensions,
            )?))
        }
        "hashing" => Ok(Arc::new(HashingEmbedder::new(config.dimensions))),
        other => Err(InsightError::config(format!(
            "Unknown embedder '{}'. Expected 'ollama' or 'hashing'",
            other
        ))),
    }
}

/// Cosine similarity of two vectors. Zero when either has no magnitude or
/// the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[derive(Debug, Serialize)]
struct OllamaEmbeddingRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Ollama embedding provider.
pub struct OllamaEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dims: usize,
}

impl OllamaEmbedder {
    /// Creates a provider for `model` (e.g. "all-minilm", "nomic-embed-text").
    pub fn new(model: impl Into<String>, endpoint: impl Into<String>, dims: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| InsightError::search(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            dims,
        })
    }

    fn embed_url(&self) -> String {
        format!("{}/api/embed", self.endpoint)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = OllamaEmbeddingRequest {
            model: self.model.clone(),
            input: texts.to_vec(),
        };

        let response = self
            .client
            .post(self.embed_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| InsightError::search(format!("Embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(InsightError::search(format!(
                "Ollama API error {status}: {body}"
            )));
        }

        let result: OllamaEmbeddingResponse = response
            .json()
            .await
            .map_err(|e| InsightError::search(format!("Invalid embedding response: {}", e)))?;

        if result.embeddings.len() != texts.len() {
            return Err(InsightError::search(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                result.embeddings.len()
            )));
        }

        Ok(result.embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Deterministic feature-hashing embedder.
///
/// Each lower-cased alphanumeric token increments one bucket, and the vector
/// is L2-normalised. Texts sharing words score higher; nothing else is
/// understood.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dims: usize,
}

impl HashingEmbedder {
    /// Creates an embedder producing `dims`-wide vectors (at least 1).
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dims];

        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let bucket = (hasher.finish() % self.dims as u64) as usize;
            vector[bucket] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        "hashing"
    }
}
