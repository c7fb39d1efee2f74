//! End-to-end planner tests.
//!
//! The relational backend and the oracle are mocks; the note store is the
//! real SQLite store with the hashing embedder.

use order_insight::config::Config;
use order_insight::db::{DatabaseBackend, DatabaseClient, MockDatabaseClient, Value};
use order_insight::llm::{create_client, LlmClient, MockLlmClient};
use order_insight::planner::{ClassificationStrategy, Intent, Outcome, Planner, BLOCKED_MESSAGE};
use order_insight::search::{open_index, SearchIndex};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tempfile::TempDir;

const NOTES: [&str; 3] = [
    "Customer complained about late delivery of the parcel",
    "Asked for gift wrapping on the second order",
    "Refund issued after the box arrived damaged",
];

fn test_config(dir: &TempDir, strategy: &str) -> Config {
    let toml = format!(
        r#"
[llm]
provider = "mock"

[search]
path = "{}"
embedder = "hashing"
dimensions = 256

[planner]
strategy = "{strategy}"
"#,
        dir.path().join("notes.db").display()
    );
    toml::from_str(&toml).unwrap()
}

async fn seeded_index(config: &Config) -> Arc<dyn SearchIndex> {
    let index = open_index(&config.search).await.unwrap();
    let texts: Vec<String> = NOTES.iter().map(|n| n.to_string()).collect();
    index.add_documents(&texts, None).await.unwrap();
    index
}

#[tokio::test]
async fn test_keyword_complaint_lists_notes() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, "keyword");
    let index = seeded_index(&config).await;
    let llm: Arc<dyn LlmClient> = Arc::from(create_client(&config.llm).unwrap());

    let planner = Planner::new(Arc::new(MockDatabaseClient::new()), index, llm)
        .with_strategy(config.planner.strategy)
        .with_top_k(1);

    let answer = planner.answer("any complaint about late delivery?").await;

    assert_eq!(answer.intent, Intent::Vector);
    assert_eq!(answer.outcome, Outcome::Vector);
    assert_eq!(
        answer.text,
        "Here are relevant results:\n- Customer complained about late delivery of the parcel"
    );
}

#[tokio::test]
async fn test_keyword_customer_sum() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, "keyword");
    let db = Arc::new(
        MockDatabaseClient::new()
            .with_customers(&["Alice", "Bob"])
            .with_scalar("sum(amount)", 120.5),
    );

    let planner = Planner::new(
        db.clone(),
        open_index(&config.search).await.unwrap(),
        Arc::new(MockLlmClient::new()),
    );

    let answer = planner.answer("total revenue for Bob").await;

    assert_eq!(answer.intent, Intent::SqlSum);
    assert_eq!(answer.outcome, Outcome::Sql);
    assert!(answer.text.starts_with("Bob has generated total revenue of"));
    let executed = db.executed();
    assert_eq!(executed.len(), 2);
    assert_eq!(executed[1].params, vec![Value::from("Bob")]);
}

#[tokio::test]
async fn test_model_both_merges_notes_and_rows() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, "model");
    let index = seeded_index(&config).await;
    let llm = Arc::new(MockLlmClient::new().with_responses([
        r#"{"tool": "both"}"#,
        "SELECT COUNT(*) FROM orders;",
        "Five orders; one complaint about a late parcel.",
    ]));
    let db = Arc::new(MockDatabaseClient::new().with_scalar("count(*)", 5i64));

    let planner = Planner::new(db.clone(), index, llm.clone())
        .with_strategy(ClassificationStrategy::Model);

    let answer = planner
        .answer("how many orders and what did customers complain about?")
        .await;

    assert_eq!(answer.outcome, Outcome::Both);
    assert_eq!(answer.text, "Five orders; one complaint about a late parcel.");
    assert_eq!(db.executed_sql(), vec!["SELECT COUNT(*) FROM orders;"]);

    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 3);
    assert!(prompts[2].contains("late delivery"));
}

#[tokio::test]
async fn test_model_sql_blocks_writes() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, "model");
    let llm = Arc::new(
        MockLlmClient::new().with_responses([r#"{"tool": "sql"}"#, "DELETE FROM orders;"]),
    );
    let db = Arc::new(MockDatabaseClient::new());

    let planner = Planner::new(db.clone(), open_index(&config.search).await.unwrap(), llm)
        .with_strategy(ClassificationStrategy::Model);

    let answer = planner.answer("remove the cancelled orders").await;

    assert_eq!(answer.text, BLOCKED_MESSAGE);
    assert_eq!(answer.outcome, Outcome::Blocked);
    assert!(db.executed().is_empty());
}

#[tokio::test]
async fn test_backend_dialect_reaches_sql_prompt() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, "model");
    let llm = Arc::new(MockLlmClient::new());
    let db = Arc::new(
        MockDatabaseClient::new()
            .with_backend(DatabaseBackend::Postgres)
            .with_scalar("count(*)", 9i64),
    );
    assert_eq!(db.backend().dialect_name(), "PostgreSQL");

    let planner = Planner::new(db, open_index(&config.search).await.unwrap(), llm.clone())
        .with_strategy(ClassificationStrategy::Model);

    let answer = planner.answer("how many orders shipped?").await;

    assert_eq!(answer.text, "There are 9 orders.");
    assert!(llm.prompts()[1].contains("PostgreSQL"));
}
