//! Relational backend abstraction for order-insight.
//!
//! Provides a trait-based interface for running single read statements
//! against the `orders` table, allowing different database backends to be
//! used interchangeably.

mod mock;
mod mysql;
mod postgres;
mod types;

pub use mock::{ExecutedQuery, FailingDatabaseClient, MockDatabaseClient};
pub use mysql::MySqlClient;
pub use postgres::PostgresClient;
pub use types::{ColumnInfo, QueryResult, Row, Value};

use crate::config::DatabaseConfig;
use crate::error::Result;
use async_trait::async_trait;

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    MySql,
    #[serde(alias = "postgresql")]
    Postgres,
}

impl DatabaseBackend {
    /// Returns the backend as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Postgres => "postgres",
        }
    }

    /// Parses a backend from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Some(Self::MySql),
            "postgres" | "postgresql" => Some(Self::Postgres),
            _ => None,
        }
    }

    /// Returns the default port for this backend.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::MySql => 3306,
            Self::Postgres => 5432,
        }
    }

    /// Returns the URL scheme for this backend.
    pub fn url_scheme(&self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Postgres => "postgres",
        }
    }

    /// Returns the positional placeholder for the `n`-th (1-based) parameter.
    pub fn placeholder(&self, n: usize) -> String {
        match self {
            Self::MySql => "?".to_string(),
            Self::Postgres => format!("${n}"),
        }
    }

    /// Returns a predicate selecting rows whose `created_at` is within the last `days` days.
    pub fn recent_days_predicate(&self, days: u32) -> String {
        match self {
            Self::MySql => format!("created_at >= NOW() - INTERVAL {days} DAY"),
            Self::Postgres => format!("created_at >= NOW() - INTERVAL '{days} days'"),
        }
    }

    /// Wraps an aggregate expression so `ROUND(.., 2)` accepts it on this backend.
    pub fn round2(&self, expr: &str) -> String {
        match self {
            Self::MySql => format!("ROUND({expr}, 2)"),
            Self::Postgres => format!("ROUND(({expr})::numeric, 2)"),
        }
    }

    /// Name of the SQL dialect, used in generation prompts.
    pub fn dialect_name(&self) -> &'static str {
        match self {
            Self::MySql => "MySQL",
            Self::Postgres => "PostgreSQL",
        }
    }
}

/// Creates a database client for the configured backend.
///
/// No connection is opened here; every `execute` call opens its own.
pub fn client_for(config: &DatabaseConfig) -> Result<Box<dyn DatabaseClient>> {
    let url = config.to_connection_string()?;
    match config.backend {
        DatabaseBackend::MySql => Ok(Box::new(MySqlClient::new(url))),
        DatabaseBackend::Postgres => Ok(Box::new(PostgresClient::new(url))),
    }
}

/// Trait defining the relational query executor.
///
/// Each call runs exactly one statement and returns every row it produced.
/// Errors propagate verbatim; there is no retry.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Executes a SQL statement with positional parameters and returns the rows.
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// The dialect this client speaks.
    fn backend(&self) -> DatabaseBackend;

    /// Executes a SQL statement with no parameters.
    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        self.execute(sql, &[]).await
    }
}
