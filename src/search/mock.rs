//! In-memory search index for testing.

use async_trait::async_trait;
use std::sync::Mutex;

use super::{Metadata, SearchHit, SearchIndex, SearchResult};
use crate::error::{InsightError, Result};

/// Search index returning canned hits, or failing on every call.
///
/// Canned hits are returned in order regardless of the query, truncated to
/// `top_k`. Documents added later are appended with a zero score. Queries are
/// recorded.
#[derive(Debug, Default)]
pub struct MockSearchIndex {
    hits: Mutex<Vec<SearchHit>>,
    failure: Option<String>,
    queries: Mutex<Vec<String>>,
}

impl MockSearchIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an index returning `texts` in order, scores descending.
    pub fn with_documents<S: AsRef<str>>(texts: &[S]) -> Self {
        let count = texts.len().max(1) as f32;
        let hits = texts
            .iter()
            .enumerate()
            .map(|(i, t)| SearchHit::new(t.as_ref(), 1.0 - i as f32 / count))
            .collect();
        Self {
            hits: Mutex::new(hits),
            ..Self::default()
        }
    }

    /// Creates an index whose every call fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Returns every query searched so far.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SearchIndex for MockSearchIndex {
    async fn search(&self, query: &str, top_k: usize) -> Result<SearchResult> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.to_string());
        }
        if let Some(message) = &self.failure {
            return Err(InsightError::search(message.clone()));
        }

        let hits = self
            .hits
            .lock()
            .map(|h| h.iter().take(top_k).cloned().collect())
            .unwrap_or_default();
        Ok(SearchResult::new(hits))
    }

    async fn add_documents(
        &self,
        texts: &[String],
        metadatas: Option<&[Metadata]>,
    ) -> Result<usize> {
        if let Some(message) = &self.failure {
            return Err(InsightError::search(message.clone()));
        }

        let mut hits = self
            .hits
            .lock()
            .map_err(|_| InsightError::internal("mock index lock poisoned"))?;
        for (i, text) in texts.iter().enumerate() {
            let mut hit = SearchHit::new(text.clone(), 0.0);
            if let Some(metadata) = metadatas.and_then(|m| m.get(i)) {
                hit = hit.with_metadata(metadata.clone());
            }
            hits.push(hit);
        }
        Ok(texts.len())
    }
}
