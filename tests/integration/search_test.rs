//! Note store integration tests.
//!
//! Exercises the SQLite-backed store through the public search API.

use order_insight::cli::parse_seed;
use order_insight::config::SearchConfig;
use order_insight::search::{open_index, HashingEmbedder, SearchIndex, SqliteVectorStore};
use std::sync::Arc;
use tempfile::TempDir;

const NOTES: &str = r#"[
    {"text": "Customer complained about late delivery of the parcel", "metadata": {"customer": "Alice"}},
    {"text": "Asked for gift wrapping on the second order"},
    {"text": "Refund issued after the box arrived damaged", "metadata": {"customer": "Bob"}}
]"#;

fn hashing_config(dir: &TempDir) -> SearchConfig {
    SearchConfig {
        path: Some(dir.path().join("notes.db")),
        embedder: "hashing".to_string(),
        dimensions: 256,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_seeded_notes_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let config = hashing_config(&dir);
    let batch = parse_seed(NOTES).unwrap();

    {
        let index = open_index(&config).await.unwrap();
        let stored = index
            .add_documents(&batch.texts, batch.metadatas.as_deref())
            .await
            .unwrap();
        assert_eq!(stored, 3);
    }

    let index = open_index(&config).await.unwrap();
    let result = index.search("late delivery", 1).await.unwrap();

    assert_eq!(
        result.documents(),
        vec!["Customer complained about late delivery of the parcel"]
    );
    let metadata = result.hits[0].metadata.as_ref().unwrap();
    assert_eq!(metadata.get("customer"), Some(&"Alice".to_string()));
}

#[tokio::test]
async fn test_collections_are_isolated() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.db");
    let embedder = Arc::new(HashingEmbedder::new(64));

    let orders = SqliteVectorStore::open(&path, "orders_notes", embedder.clone())
        .await
        .unwrap();
    orders
        .add_documents(&["late delivery".to_string()], None)
        .await
        .unwrap();

    let other = SqliteVectorStore::open(&path, "support", embedder)
        .await
        .unwrap();

    assert_eq!(orders.count().await.unwrap(), 1);
    assert_eq!(other.count().await.unwrap(), 0);
    assert!(other.search("late delivery", 3).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_top_k_limits_hits() {
    let dir = TempDir::new().unwrap();
    let index = open_index(&hashing_config(&dir)).await.unwrap();
    let batch = parse_seed(NOTES).unwrap();
    index
        .add_documents(&batch.texts, batch.metadatas.as_deref())
        .await
        .unwrap();

    let result = index.search("order delivery refund", 2).await.unwrap();
    assert_eq!(result.hits.len(), 2);
}

#[tokio::test]
async fn test_unknown_embedder_is_config_error() {
    let dir = TempDir::new().unwrap();
    let config = SearchConfig {
        embedder: "word2vec".to_string(),
        ..hashing_config(&dir)
    };

    let err = match open_index(&config).await {
        Ok(_) => panic!("expected an error for an unknown embedder"),
        Err(e) => e,
    };
    assert_eq!(err.category(), "Configuration Error");
}
