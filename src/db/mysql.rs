//! MySQL client implementation.
//!
//! Provides the `MySqlClient` struct that implements the `DatabaseClient` trait
//! for MySQL / MariaDB using sqlx. A fresh connection is opened for every
//! statement and closed once its rows are fetched.

use crate::db::{ColumnInfo, DatabaseBackend, DatabaseClient, QueryResult, Row, Value};
use crate::error::{InsightError, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sqlx::mysql::{MySql, MySqlArguments, MySqlConnection, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column as SqlxColumn, Connection, Row as SqlxRow, TypeInfo};
use std::time::Instant;
use tracing::{debug, warn};

/// MySQL database client.
#[derive(Debug, Clone)]
pub struct MySqlClient {
    url: String,
}

impl MySqlClient {
    /// Creates a client for the given `mysql://` connection string.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl DatabaseClient for MySqlClient {
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let start = Instant::now();

        let mut conn = MySqlConnection::connect(&self.url)
            .await
            .map_err(map_connection_error)?;

        let fetched = bind_params(sqlx::query(sql), params)
            .fetch_all(&mut conn)
            .await;

        // Release the connection whether or not the statement succeeded
        if let Err(e) = conn.close().await {
            warn!("Failed to close MySQL connection cleanly: {}", e);
        }

        let rows = fetched.map_err(|e| InsightError::query(format_query_error(e)))?;
        let execution_time = start.elapsed();

        debug!(
            row_count = rows.len(),
            duration_ms = execution_time.as_millis(),
            "MySQL statement complete"
        );

        let columns: Vec<ColumnInfo> = rows
            .first()
            .map(|row| {
                row.columns()
                    .iter()
                    .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                    .collect()
            })
            .unwrap_or_default();

        let rows: Vec<Row> = rows.iter().map(convert_row).collect();

        Ok(QueryResult::with_data(columns, rows).with_execution_time(execution_time))
    }

    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::MySql
    }
}

/// Binds positional parameters in order.
fn bind_params<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &[Value],
) -> Query<'q, MySql, MySqlArguments> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Int(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            Value::Decimal(d) => query.bind(*d),
            Value::String(s) => query.bind(s.clone()),
            Value::Bytes(b) => query.bind(b.clone()),
        };
    }
    query
}

/// Converts a sqlx MySqlRow to our Row type.
fn convert_row(row: &MySqlRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a MySqlRow to our Value type.
fn convert_value(row: &MySqlRow, index: usize, type_name: &str) -> Value {
    match type_name.to_uppercase().as_str() {
        "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "TINYINT" => decode_int::<i8>(row, index),
        "SMALLINT" => decode_int::<i16>(row, index),
        "INT" | "MEDIUMINT" => decode_int::<i32>(row, index),
        "BIGINT" => decode_int::<i64>(row, index),
        "TINYINT UNSIGNED" => decode_int::<u8>(row, index),
        "SMALLINT UNSIGNED" => decode_int::<u16>(row, index),
        "INT UNSIGNED" | "MEDIUMINT UNSIGNED" => decode_int::<u32>(row, index),

        "BIGINT UNSIGNED" => row
            .try_get::<Option<u64>, _>(index)
            .ok()
            .flatten()
            .map(|v| i64::try_from(v).map(Value::Int).unwrap_or(Value::Float(v as f64)))
            .unwrap_or(Value::Null),

        "FLOAT" => row
            .try_get::<Option<f32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Float(v as f64))
            .unwrap_or(Value::Null),

        "DOUBLE" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "DECIMAL" => row
            .try_get::<Option<Decimal>, _>(index)
            .ok()
            .flatten()
            .map(Value::Decimal)
            .unwrap_or(Value::Null),

        "DATETIME" | "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),

        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),

        "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        // For all other types, try to get as string
        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

/// Decodes an integer column of width `T` into `Value::Int`.
fn decode_int<T>(row: &MySqlRow, index: usize) -> Value
where
    T: Into<i64> + for<'r> sqlx::Decode<'r, MySql> + sqlx::Type<MySql>,
{
    row.try_get::<Option<T>, _>(index)
        .ok()
        .flatten()
        .map(|v| Value::Int(v.into()))
        .unwrap_or(Value::Null)
}

/// Maps sqlx connection errors to user-friendly messages.
fn map_connection_error(error: sqlx::Error) -> InsightError {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        InsightError::connection("Cannot connect to MySQL. Check that the server is running.")
    } else if error_str.contains("access denied") {
        InsightError::connection("Access denied. Check your MySQL credentials.")
    } else if error_str.contains("unknown database") {
        InsightError::connection(error.to_string())
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        InsightError::connection("Connection to MySQL timed out.")
    } else {
        InsightError::connection(error.to_string())
    }
}

/// Formats a query error, preferring the server's own message.
fn format_query_error(error: sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => match db_error.code() {
            Some(code) => format!("{} ({})", db_error.message(), code),
            None => db_error.message().to_string(),
        },
        None => error.to_string(),
    }
}
