//! Mock database clients for testing.
//!
//! `MockDatabaseClient` answers statements from a table of SQL fragments and
//! records everything it was asked to run. `FailingDatabaseClient` fails every
//! call, for exercising the error paths.

use super::{DatabaseBackend, DatabaseClient, QueryResult, Value};
use crate::error::{InsightError, Result};
use async_trait::async_trait;
use std::sync::Mutex;

/// A statement the mock was asked to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

/// A mock database client that returns predefined results.
///
/// Results are matched by case-insensitive substring of the SQL text, first
/// registered match wins. The distinct-customer query is answered from the
/// configured customer list. Anything else yields an empty result.
pub struct MockDatabaseClient {
    backend: DatabaseBackend,
    customers: Vec<String>,
    responses: Vec<(String, QueryResult)>,
    failures: Vec<(String, String)>,
    executed: Mutex<Vec<ExecutedQuery>>,
}

impl MockDatabaseClient {
    /// Creates a new mock database client with no customers and no results.
    pub fn new() -> Self {
        Self {
            backend: DatabaseBackend::MySql,
            customers: Vec::new(),
            responses: Vec::new(),
            failures: Vec::new(),
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Sets the dialect reported by the mock.
    pub fn with_backend(mut self, backend: DatabaseBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Sets the customer names returned by the distinct-customer query, in order.
    pub fn with_customers<S: AsRef<str>>(mut self, customers: &[S]) -> Self {
        self.customers = customers.iter().map(|c| c.as_ref().to_string()).collect();
        self
    }

    /// Returns `result` for any statement containing `pattern`.
    pub fn with_result(mut self, pattern: impl Into<String>, result: QueryResult) -> Self {
        self.responses.push((pattern.into().to_lowercase(), result));
        self
    }

    /// Returns a one-row, one-column result for any statement containing `pattern`.
    pub fn with_scalar(self, pattern: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with_result(pattern, QueryResult::scalar("value", value))
    }

    /// Fails with a query error for any statement containing `pattern`.
    ///
    /// The distinct-customer query is never failed.
    pub fn with_failure(mut self, pattern: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures.push((pattern.into().to_lowercase(), message.into()));
        self
    }

    /// Returns every statement executed so far.
    pub fn executed(&self) -> Vec<ExecutedQuery> {
        self.executed
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// Returns the SQL text of every statement executed so far.
    pub fn executed_sql(&self) -> Vec<String> {
        self.executed().into_iter().map(|q| q.sql).collect()
    }

    fn record(&self, sql: &str, params: &[Value]) {
        if let Ok(mut log) = self.executed.lock() {
            log.push(ExecutedQuery {
                sql: sql.to_string(),
                params: params.to_vec(),
            });
        }
    }
}

impl Default for MockDatabaseClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.record(sql, params);
        let sql_lower = sql.to_lowercase();

        if sql_lower.contains("distinct customer_name") {
            let rows = self
                .customers
                .iter()
                .map(|c| vec![Value::String(c.clone())])
                .collect();
            return Ok(QueryResult::with_data(
                vec![super::ColumnInfo::new("customer_name", "VARCHAR")],
                rows,
            ));
        }

        if let Some((_, message)) = self
            .failures
            .iter()
            .find(|(pattern, _)| sql_lower.contains(pattern.as_str()))
        {
            return Err(InsightError::query(message.clone()));
        }

        let matched = self
            .responses
            .iter()
            .find(|(pattern, _)| sql_lower.contains(pattern.as_str()))
            .map(|(_, result)| result.clone());

        Ok(matched.unwrap_or_default())
    }

    fn backend(&self) -> DatabaseBackend {
        self.backend
    }
}

/// A database client whose every call fails with a query error.
pub struct FailingDatabaseClient {
    message: String,
}

impl FailingDatabaseClient {
    /// Creates a client failing with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    async fn execute(&self, _sql: &str, _params: &[Value]) -> Result<QueryResult> {
        Err(InsightError::query(self.message.clone()))
    }

    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::MySql
    }
}
