//! Question routing and orchestration.
//!
//! The planner classifies a question, dispatches it to the analytics
//! templates, the semantic index, oracle-generated SQL or a combination, and
//! always comes back with an [`Answer`]. Failures below this boundary are
//! turned into answer text here and never escape as errors.
//!
//! Two entry points exist, one per classification strategy:
//! [`Planner::run_query`] (keyword) and [`Planner::handle`] (model router).
//! [`Planner::answer`] picks one according to the configured strategy.

mod analytics;
mod entity;
mod intent;
mod synthesize;

pub use analytics::Analytics;
pub use entity::{extract_customer, fetch_customers, match_customer, DISTINCT_CUSTOMERS_SQL};
pub use intent::{
    classify_keyword, classify_with_model, keyword_intent, smalltalk_reply, Classification,
    ClassificationStrategy, Intent,
};
pub use synthesize::{deterministic_answer, format_numeric, synthesize};

use futures::future;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::db::{DatabaseClient, QueryResult};
use crate::error::InsightError;
use crate::llm::{extract_sql, prompt, strip_fences, LlmClient, Tool};
use crate::safety::{self, SafetyVerdict};
use crate::search::{SearchIndex, SearchResult};

/// Default number of snippets pulled from the semantic index.
pub const DEFAULT_TOP_K: usize = 3;

pub const BLOCKED_MESSAGE: &str = "Blocked unsafe query.";
pub const NOT_FOUND_MESSAGE: &str = "I could not find any matching orders.";
pub const NO_RECORDS_MESSAGE: &str = "I could not find relevant records.";
pub const NO_FINDINGS_MESSAGE: &str = "I couldn't find relevant complaints or feedback.";
pub const UNRECOGNIZED_MESSAGE: &str = "I couldn't understand the request.";

const RESULTS_HEADER: &str = "Here are relevant results:";
const FINDINGS_HEADER: &str = "Here are relevant findings:";

/// Terminal state a request ended in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Canned or conversational reply.
    Smalltalk,
    /// Snippets from the semantic index.
    Vector,
    /// Answer built from relational data.
    Sql,
    /// Answer merged from relational data and snippets.
    Both,
    /// The backend returned nothing to report.
    Empty,
    /// Generated SQL was rejected by the safety gate.
    Blocked,
    /// A backend or oracle call failed.
    Errored,
    /// The router picked a tool outside its vocabulary.
    Unrecognized,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Smalltalk => "smalltalk",
            Self::Vector => "vector",
            Self::Sql => "sql",
            Self::Both => "both",
            Self::Empty => "empty",
            Self::Blocked => "blocked",
            Self::Errored => "errored",
            Self::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The reply to one question.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    /// Text shown to the user.
    pub text: String,
    /// Intent the question resolved to.
    pub intent: Intent,
    /// State the request finished in.
    pub outcome: Outcome,
}

impl Answer {
    fn new(text: impl Into<String>, intent: Intent, outcome: Outcome) -> Self {
        Self {
            text: text.into(),
            intent,
            outcome,
        }
    }

    fn error(intent: Intent, prefix: &str, error: &InsightError) -> Self {
        warn!(intent = %intent, error = %error, "Request failed");
        Self::new(
            format!("{prefix}: {}", error.detail()),
            intent,
            Outcome::Errored,
        )
    }
}

/// Result of the generate-gate-execute pipeline for oracle SQL.
enum GeneratedSql {
    Rows(QueryResult),
    Blocked,
    GenerationFailed(InsightError),
    ExecutionFailed(InsightError),
}

/// Routes questions to the relational backend, the semantic index and the oracle.
pub struct Planner {
    db: Arc<dyn DatabaseClient>,
    index: Arc<dyn SearchIndex>,
    llm: Arc<dyn LlmClient>,
    strategy: ClassificationStrategy,
    top_k: usize,
}

impl Planner {
    /// Creates a planner using the keyword strategy and the default `top_k`.
    pub fn new(
        db: Arc<dyn DatabaseClient>,
        index: Arc<dyn SearchIndex>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        Self {
            db,
            index,
            llm,
            strategy: ClassificationStrategy::default(),
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Sets the classification strategy used by [`Planner::answer`].
    pub fn with_strategy(mut self, strategy: ClassificationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets how many snippets semantic search returns.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Classifies a question with the configured strategy.
    pub async fn classify(&self, question: &str) -> Classification {
        match self.strategy {
            ClassificationStrategy::Keyword => classify_keyword(question),
            ClassificationStrategy::Model => classify_with_model(self.llm.as_ref(), question).await,
        }
    }

    /// Answers a question with the configured strategy.
    pub async fn answer(&self, question: &str) -> Answer {
        let answer = match self.strategy {
            ClassificationStrategy::Keyword => self.run_query(question).await,
            ClassificationStrategy::Model => self.handle(question).await,
        };
        info!(
            strategy = %self.strategy,
            intent = %answer.intent,
            outcome = %answer.outcome,
            "Question answered"
        );
        answer
    }

    /// Keyword strategy: smalltalk table, keyword groups, analytics
    /// templates, then oracle SQL for anything left over.
    pub async fn run_query(&self, question: &str) -> Answer {
        let intent = match classify_keyword(question) {
            Classification::Smalltalk(reply) => {
                return Answer::new(reply, Intent::Smalltalk, Outcome::Smalltalk)
            }
            other => other.intent(),
        };

        let customer = match extract_customer(self.db.as_ref(), question).await {
            Ok(customer) => customer,
            Err(e) => return Answer::error(intent, "Error", &e),
        };
        info!(intent = %intent, customer = ?customer, "Keyword classification");

        let analytics = Analytics::new(self.db.as_ref());
        let customer = customer.as_deref();

        let templated = match (intent, customer) {
            (Intent::Vector, _) => return self.keyword_vector(question).await,
            (Intent::SqlPattern, Some(c)) => analytics.pattern(c).await,
            (Intent::SqlCount, _) => analytics.count(question, customer).await,
            (Intent::SqlTop, _) => analytics.top().await,
            (Intent::SqlLeast, _) => analytics.least().await,
            (Intent::SqlAverage, _) => analytics.average(customer).await,
            (Intent::SqlSum, _) => analytics.sum(customer).await,
            _ => return self.keyword_fallback(question).await,
        };

        match templated {
            Ok(Some(text)) => Answer::new(text, intent, Outcome::Sql),
            Ok(None) => Answer::new(NOT_FOUND_MESSAGE, intent, Outcome::Empty),
            Err(e) => Answer::error(intent, "Error", &e),
        }
    }

    async fn keyword_vector(&self, question: &str) -> Answer {
        let intent = Intent::Vector;
        match self.index.search(question, self.top_k).await {
            Ok(result) if result.is_empty() => {
                Answer::new(NO_RECORDS_MESSAGE, intent, Outcome::Empty)
            }
            Ok(result) => Answer::new(bulleted(RESULTS_HEADER, &result), intent, Outcome::Vector),
            Err(e) => Answer::error(intent, "Error", &e),
        }
    }

    async fn keyword_fallback(&self, question: &str) -> Answer {
        let intent = Intent::SqlFallback;
        match self.generated_sql(question, ClassificationStrategy::Keyword).await {
            GeneratedSql::Rows(result) => self.synthesized(question, intent, &result).await,
            GeneratedSql::Blocked => Answer::new(BLOCKED_MESSAGE, intent, Outcome::Blocked),
            GeneratedSql::GenerationFailed(e) | GeneratedSql::ExecutionFailed(e) => {
                Answer::error(intent, "Error", &e)
            }
        }
    }

    /// Model strategy: the oracle routes the question to chat, vector, sql or both.
    pub async fn handle(&self, question: &str) -> Answer {
        let classification = classify_with_model(self.llm.as_ref(), question).await;
        let intent = classification.intent();
        let Classification::Model(decision) = classification else {
            return Answer::new(UNRECOGNIZED_MESSAGE, Intent::Unknown, Outcome::Unrecognized);
        };
        info!(
            tool = %decision.tool,
            defaulted = decision.defaulted,
            "Router decision"
        );

        match decision.tool {
            Tool::Chat => match self.llm.ask(&prompt::chat_prompt(question)).await {
                Ok(reply) => Answer::new(reply, intent, Outcome::Smalltalk),
                Err(e) => Answer::error(intent, "Error", &e),
            },
            Tool::Vector => match self.index.search(question, self.top_k).await {
                Ok(result) if result.is_empty() => {
                    Answer::new(NO_FINDINGS_MESSAGE, intent, Outcome::Empty)
                }
                Ok(result) => {
                    Answer::new(bulleted(FINDINGS_HEADER, &result), intent, Outcome::Vector)
                }
                Err(e) => Answer::error(intent, "Error", &e),
            },
            Tool::Sql => match self.generated_sql(question, ClassificationStrategy::Model).await {
                GeneratedSql::Rows(result) => self.synthesized(question, intent, &result).await,
                GeneratedSql::Blocked => Answer::new(BLOCKED_MESSAGE, intent, Outcome::Blocked),
                GeneratedSql::GenerationFailed(e) => Answer::error(intent, "Error", &e),
                GeneratedSql::ExecutionFailed(e) => Answer::error(intent, "SQL error", &e),
            },
            Tool::Both => self.both(question).await,
            Tool::Unknown => Answer::new(UNRECOGNIZED_MESSAGE, intent, Outcome::Unrecognized),
        }
    }

    /// Runs semantic search and generated SQL concurrently and merges them.
    ///
    /// A side that fails is replaced by a note in the merged prompt. Only
    /// when both sides fail does the request end without the oracle: blocked
    /// SQL reports the blocked message, anything else the SQL failure.
    async fn both(&self, question: &str) -> Answer {
        let intent = Intent::Both;
        let (vector, sql) = future::join(
            self.index.search(question, self.top_k),
            self.generated_sql(question, ClassificationStrategy::Model),
        )
        .await;

        let semantic = match &vector {
            Ok(result) if result.is_empty() => Some("No relevant notes found.".to_string()),
            Ok(result) => Some(result.to_bullets()),
            Err(e) => {
                warn!(error = %e, "Semantic half of combined request failed");
                None
            }
        };

        let structured = match &sql {
            GeneratedSql::Rows(result) => Some(result.to_prompt_string()),
            _ => None,
        };

        if semantic.is_none() && structured.is_none() {
            return match sql {
                GeneratedSql::Blocked => Answer::new(BLOCKED_MESSAGE, intent, Outcome::Blocked),
                GeneratedSql::ExecutionFailed(e) => Answer::error(intent, "SQL error", &e),
                GeneratedSql::GenerationFailed(e) => Answer::error(intent, "Error", &e),
                GeneratedSql::Rows(_) => Answer::new(NOT_FOUND_MESSAGE, intent, Outcome::Empty),
            };
        }

        let structured = structured.unwrap_or_else(|| match &sql {
            GeneratedSql::Blocked => {
                "(unavailable: the generated query was blocked as unsafe)".to_string()
            }
            GeneratedSql::GenerationFailed(e) | GeneratedSql::ExecutionFailed(e) => {
                format!("(unavailable: {})", e.detail())
            }
            GeneratedSql::Rows(_) => String::new(),
        });
        let semantic = semantic.unwrap_or_else(|| match &vector {
            Err(e) => format!("(unavailable: {})", e.detail()),
            Ok(_) => String::new(),
        });

        let merged = prompt::combined_prompt(question, &structured, &semantic);
        match self.llm.ask(&merged).await {
            Ok(text) => Answer::new(text, intent, Outcome::Both),
            Err(e) => Answer::error(intent, "Error", &e),
        }
    }

    /// Asks the oracle for SQL, gates it and runs it. Never retries.
    ///
    /// The keyword strategy gates the whole reply with only the fences
    /// removed, so a stacked statement after the first `;` still blocks. The
    /// model strategy first narrows the reply to its first `select ... ;`.
    async fn generated_sql(
        &self,
        question: &str,
        strategy: ClassificationStrategy,
    ) -> GeneratedSql {
        let sql_prompt = prompt::sql_prompt(question, self.db.backend().dialect_name());
        let raw = match self.llm.ask(&sql_prompt).await {
            Ok(raw) => raw,
            Err(e) => return GeneratedSql::GenerationFailed(e),
        };

        let sql = match strategy {
            ClassificationStrategy::Keyword => strip_fences(&raw),
            ClassificationStrategy::Model => extract_sql(&raw),
        };
        let verdict = safety::check(&sql);
        info!(sql = %sql, verdict = %verdict, "Generated SQL");

        if let SafetyVerdict::Blocked(reason) = verdict {
            warn!(reason = %reason, "Refusing to execute generated SQL");
            return GeneratedSql::Blocked;
        }

        match self.db.execute_query(&sql).await {
            Ok(result) => {
                debug!(rows = result.row_count(), "Generated SQL executed");
                GeneratedSql::Rows(result)
            }
            Err(e) => GeneratedSql::ExecutionFailed(e),
        }
    }

    async fn synthesized(&self, question: &str, intent: Intent, result: &QueryResult) -> Answer {
        match synthesize(self.llm.as_ref(), question, result).await {
            Ok(text) => Answer::new(text, intent, Outcome::Sql),
            Err(e) => Answer::error(intent, "Error", &e),
        }
    }
}

fn bulleted(header: &str, result: &SearchResult) -> String {
    format!("{header}\n{}", result.to_bullets())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{FailingDatabaseClient, MockDatabaseClient, Value};
    use crate::llm::{FailingLlmClient, MockLlmClient};
    use crate::search::MockSearchIndex;
    use pretty_assertions::assert_eq;

    const ROUTER: &str = "return only json";
    const SQL: &str = "return only sql";

    struct Fixture {
        db: Arc<MockDatabaseClient>,
        index: Arc<MockSearchIndex>,
        llm: Arc<MockLlmClient>,
    }

    impl Fixture {
        fn new(db: MockDatabaseClient, index: MockSearchIndex, llm: MockLlmClient) -> Self {
            Self {
                db: Arc::new(db),
                index: Arc::new(index),
                llm: Arc::new(llm),
            }
        }

        fn planner(&self, strategy: ClassificationStrategy) -> Planner {
            Planner::new(self.db.clone(), self.index.clone(), self.llm.clone())
                .with_strategy(strategy)
        }
    }

    #[tokio::test]
    async fn test_smalltalk_touches_nothing() {
        let fx = Fixture::new(
            MockDatabaseClient::new(),
            MockSearchIndex::new(),
            MockLlmClient::new(),
        );
        let answer = fx.planner(ClassificationStrategy::Keyword).answer(" Hello ").await;

        assert_eq!(answer.text, "Hello! How can I help you?");
        assert_eq!(answer.outcome, Outcome::Smalltalk);
        assert!(fx.db.executed().is_empty());
        assert_eq!(fx.llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_keyword_count_end_to_end() {
        let fx = Fixture::new(
            MockDatabaseClient::new()
                .with_customers(&["Alice"])
                .with_scalar("count(*)", 17i64),
            MockSearchIndex::new(),
            MockLlmClient::new(),
        );
        let answer = fx.planner(ClassificationStrategy::Keyword).run_query("how many orders").await;

        assert_eq!(answer.text, "There are 17 total orders.");
        assert_eq!(answer.intent, Intent::SqlCount);
        assert_eq!(answer.outcome, Outcome::Sql);
        assert_eq!(
            fx.db.executed_sql(),
            vec![
                DISTINCT_CUSTOMERS_SQL.to_string(),
                "SELECT COUNT(*) FROM orders".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_keyword_vector_empty_skips_model() {
        let fx = Fixture::new(
            MockDatabaseClient::new(),
            MockSearchIndex::new(),
            MockLlmClient::new(),
        );
        let answer = fx
            .planner(ClassificationStrategy::Keyword)
            .run_query("any complaint about delivery?")
            .await;

        assert_eq!(answer.text, NO_RECORDS_MESSAGE);
        assert_eq!(answer.outcome, Outcome::Empty);
        assert_eq!(fx.llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_keyword_vector_lists_hits() {
        let fx = Fixture::new(
            MockDatabaseClient::new(),
            MockSearchIndex::with_documents(&["late delivery", "damaged box"]),
            MockLlmClient::new(),
        );
        let answer = fx
            .planner(ClassificationStrategy::Keyword)
            .run_query("show refund feedback")
            .await;

        assert_eq!(
            answer.text,
            "Here are relevant results:\n- late delivery\n- damaged box"
        );
        assert_eq!(answer.outcome, Outcome::Vector);
    }

    #[tokio::test]
    async fn test_pattern_without_customer_falls_back_to_generated_sql() {
        let fx = Fixture::new(
            MockDatabaseClient::new()
                .with_customers(&["Alice"])
                .with_scalar("count(*)", 3i64),
            MockSearchIndex::new(),
            MockLlmClient::new(),
        );
        let answer = fx
            .planner(ClassificationStrategy::Keyword)
            .run_query("ordering trend this month")
            .await;

        assert_eq!(answer.intent, Intent::SqlFallback);
        assert_eq!(answer.text, "There are 3 orders.");
        assert_eq!(fx.llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_generated_mutation_is_blocked_without_retry() {
        let fx = Fixture::new(
            MockDatabaseClient::new(),
            MockSearchIndex::new(),
            MockLlmClient::new().with_response(SQL, "```sql\nDELETE FROM orders;\n```"),
        );
        let answer = fx
            .planner(ClassificationStrategy::Keyword)
            .run_query("clear out old stuff")
            .await;

        assert_eq!(answer.text, BLOCKED_MESSAGE);
        assert_eq!(answer.outcome, Outcome::Blocked);
        assert_eq!(fx.llm.call_count(), 1);
        // Only the customer lookup reached the database
        assert_eq!(fx.db.executed_sql(), vec![DISTINCT_CUSTOMERS_SQL.to_string()]);
    }

    #[tokio::test]
    async fn test_keyword_stacked_statement_is_blocked_whole() {
        let fx = Fixture::new(
            MockDatabaseClient::new().with_scalar("count(*)", 9i64),
            MockSearchIndex::new(),
            MockLlmClient::new()
                .with_response(SQL, "SELECT COUNT(*) FROM orders; DROP TABLE orders;"),
        );
        let answer = fx
            .planner(ClassificationStrategy::Keyword)
            .run_query("list the orders")
            .await;

        assert_eq!(answer.intent, Intent::SqlFallback);
        assert_eq!(answer.text, BLOCKED_MESSAGE);
        assert_eq!(answer.outcome, Outcome::Blocked);
        assert_eq!(fx.db.executed_sql(), vec![DISTINCT_CUSTOMERS_SQL.to_string()]);
    }

    #[tokio::test]
    async fn test_keyword_vector_search_failure_becomes_text() {
        let fx = Fixture::new(
            MockDatabaseClient::new(),
            MockSearchIndex::failing("store offline"),
            MockLlmClient::new(),
        );
        let answer = fx
            .planner(ClassificationStrategy::Keyword)
            .run_query("any complaint about delivery?")
            .await;

        assert_eq!(answer.intent, Intent::Vector);
        assert_eq!(answer.text, "Error: store offline");
        assert_eq!(answer.outcome, Outcome::Errored);
        assert_eq!(fx.llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_keyword_fallback_execution_error_prefix() {
        let fx = Fixture::new(
            MockDatabaseClient::new().with_failure("count(*)", "Unknown column 'total'"),
            MockSearchIndex::new(),
            MockLlmClient::new(),
        );
        let answer = fx
            .planner(ClassificationStrategy::Keyword)
            .run_query("list the orders")
            .await;

        assert_eq!(answer.intent, Intent::SqlFallback);
        assert_eq!(answer.text, "Error: Unknown column 'total'");
        assert_eq!(answer.outcome, Outcome::Errored);
    }

    #[tokio::test]
    async fn test_keyword_database_failure_becomes_text() {
        let planner = Planner::new(
            Arc::new(FailingDatabaseClient::new("Unknown database 'aiorders'")),
            Arc::new(MockSearchIndex::new()),
            Arc::new(MockLlmClient::new()),
        );
        let answer = planner.run_query("total revenue").await;

        assert_eq!(answer.text, "Error: Unknown database 'aiorders'");
        assert_eq!(answer.outcome, Outcome::Errored);
    }

    #[tokio::test]
    async fn test_keyword_not_found_for_null_aggregate() {
        let fx = Fixture::new(
            MockDatabaseClient::new().with_scalar("avg(amount)", Value::Null),
            MockSearchIndex::new(),
            MockLlmClient::new(),
        );
        let answer = fx
            .planner(ClassificationStrategy::Keyword)
            .run_query("average order value")
            .await;

        assert_eq!(answer.text, NOT_FOUND_MESSAGE);
        assert_eq!(answer.outcome, Outcome::Empty);
    }

    #[tokio::test]
    async fn test_model_invalid_router_reply_defaults_to_sql() {
        let fx = Fixture::new(
            MockDatabaseClient::new().with_scalar("count(*)", 42i64),
            MockSearchIndex::new(),
            MockLlmClient::new().with_response(ROUTER, "not json at all"),
        );
        let answer = fx
            .planner(ClassificationStrategy::Model)
            .answer("how many customers are there")
            .await;

        assert_eq!(answer.intent, Intent::SqlFallback);
        assert_eq!(answer.text, "There are 42 customers.");
    }

    #[tokio::test]
    async fn test_model_chat_asks_for_natural_reply() {
        let fx = Fixture::new(
            MockDatabaseClient::new(),
            MockSearchIndex::new(),
            MockLlmClient::new()
                .with_response(ROUTER, r#"{"tool": "chat"}"#)
                .with_response("reply naturally", "Hi! Ask me about orders."),
        );
        let answer = fx.planner(ClassificationStrategy::Model).handle("yo").await;

        assert_eq!(answer.text, "Hi! Ask me about orders.");
        assert_eq!(answer.outcome, Outcome::Smalltalk);
    }

    #[tokio::test]
    async fn test_model_vector_messages() {
        let empty = Fixture::new(
            MockDatabaseClient::new(),
            MockSearchIndex::new(),
            MockLlmClient::new().with_response(ROUTER, r#"{"tool": "vector"}"#),
        );
        let answer = empty.planner(ClassificationStrategy::Model).handle("unhappy?").await;
        assert_eq!(answer.text, NO_FINDINGS_MESSAGE);

        let hits = Fixture::new(
            MockDatabaseClient::new(),
            MockSearchIndex::with_documents(&["Asked for refund"]),
            MockLlmClient::new().with_response(ROUTER, r#"{"tool": "vector"}"#),
        );
        let answer = hits.planner(ClassificationStrategy::Model).handle("unhappy?").await;
        assert_eq!(answer.text, "Here are relevant findings:\n- Asked for refund");
    }

    #[tokio::test]
    async fn test_model_unknown_tool() {
        let fx = Fixture::new(
            MockDatabaseClient::new(),
            MockSearchIndex::new(),
            MockLlmClient::new().with_response(ROUTER, r#"{"tool": "weather"}"#),
        );
        let answer = fx.planner(ClassificationStrategy::Model).handle("rain?").await;

        assert_eq!(answer.text, UNRECOGNIZED_MESSAGE);
        assert_eq!(answer.outcome, Outcome::Unrecognized);
    }

    #[tokio::test]
    async fn test_model_sql_execution_error_prefix() {
        let planner = Planner::new(
            Arc::new(FailingDatabaseClient::new("Unknown column 'total'")),
            Arc::new(MockSearchIndex::new()),
            Arc::new(MockLlmClient::new()),
        )
        .with_strategy(ClassificationStrategy::Model);
        let answer = planner.answer("sum it up").await;

        assert_eq!(answer.text, "SQL error: Unknown column 'total'");
        assert_eq!(answer.outcome, Outcome::Errored);
    }

    #[tokio::test]
    async fn test_model_oracle_down_reports_error() {
        let planner = Planner::new(
            Arc::new(MockDatabaseClient::new()),
            Arc::new(MockSearchIndex::new()),
            Arc::new(FailingLlmClient::new("Failed to connect to Ollama")),
        )
        .with_strategy(ClassificationStrategy::Model);
        let answer = planner.answer("anything").await;

        // Router failure routes to sql, whose generation then fails
        assert_eq!(answer.intent, Intent::SqlFallback);
        assert_eq!(answer.text, "Error: Failed to connect to Ollama");
    }

    #[tokio::test]
    async fn test_both_merges_sides() {
        let fx = Fixture::new(
            MockDatabaseClient::new().with_scalar("count(*)", 5i64),
            MockSearchIndex::with_documents(&["Delivery was delayed"]),
            MockLlmClient::new()
                .with_response(ROUTER, r#"{"tool": "both"}"#)
                .with_response("give a concise helpful answer", "Five orders, one delay."),
        );
        let answer = fx.planner(ClassificationStrategy::Model).handle("orders and delays").await;

        assert_eq!(answer.text, "Five orders, one delay.");
        assert_eq!(answer.outcome, Outcome::Both);
        let merged = fx.llm.prompts().last().cloned().unwrap();
        assert!(merged.contains("Structured data:\n[(5,)]"));
        assert!(merged.contains("Semantic info:\n- Delivery was delayed"));
    }

    #[tokio::test]
    async fn test_both_keeps_vector_when_sql_blocked() {
        let fx = Fixture::new(
            MockDatabaseClient::new(),
            MockSearchIndex::with_documents(&["Customer wants replacement"]),
            MockLlmClient::new()
                .with_response(ROUTER, r#"{"tool": "both"}"#)
                .with_response(SQL, "DROP TABLE orders;")
                .with_response("give a concise helpful answer", "One replacement request."),
        );
        let answer = fx.planner(ClassificationStrategy::Model).handle("q").await;

        assert_eq!(answer.outcome, Outcome::Both);
        let merged = fx.llm.prompts().last().cloned().unwrap();
        assert!(merged.contains("blocked as unsafe"));
        assert!(fx.db.executed().is_empty());
    }

    #[tokio::test]
    async fn test_both_keeps_sql_when_search_fails() {
        let fx = Fixture::new(
            MockDatabaseClient::new().with_scalar("count(*)", 5i64),
            MockSearchIndex::failing("store offline"),
            MockLlmClient::new()
                .with_response(ROUTER, r#"{"tool": "both"}"#)
                .with_response("give a concise helpful answer", "Five orders."),
        );
        let answer = fx.planner(ClassificationStrategy::Model).handle("q").await;

        assert_eq!(answer.text, "Five orders.");
        assert_eq!(answer.outcome, Outcome::Both);
        let merged = fx.llm.prompts().last().cloned().unwrap();
        assert!(merged.contains("Structured data:\n[(5,)]"));
        assert!(merged.contains("Semantic info:\n(unavailable: store offline)"));
    }

    #[tokio::test]
    async fn test_both_with_both_sides_failing() {
        let fx = Fixture::new(
            MockDatabaseClient::new(),
            MockSearchIndex::failing("store offline"),
            MockLlmClient::new()
                .with_response(ROUTER, r#"{"tool": "both"}"#)
                .with_response(SQL, "TRUNCATE orders"),
        );
        let answer = fx.planner(ClassificationStrategy::Model).handle("q").await;

        assert_eq!(answer.text, BLOCKED_MESSAGE);
        assert_eq!(answer.outcome, Outcome::Blocked);
    }

    #[tokio::test]
    async fn test_classify_follows_strategy() {
        let fx = Fixture::new(
            MockDatabaseClient::new(),
            MockSearchIndex::new(),
            MockLlmClient::new().with_response(ROUTER, r#"{"tool": "vector"}"#),
        );
        let keyword = fx.planner(ClassificationStrategy::Keyword).classify("total").await;
        let model = fx.planner(ClassificationStrategy::Model).classify("total").await;

        assert_eq!(keyword.intent(), Intent::SqlSum);
        assert_eq!(model.intent(), Intent::Vector);
    }
}
