//! MySQL integration tests.
//!
//! Require a reachable server; set DATABASE_URL to a `mysql://` URL to run them.

use order_insight::config::DatabaseConfig;
use order_insight::db::{client_for, DatabaseBackend, DatabaseClient, Value};
use order_insight::planner::fetch_customers;

/// Helper to create a test client.
fn get_test_client() -> Option<Box<dyn DatabaseClient>> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let config = DatabaseConfig::from_connection_string(&url).ok()?;
    if config.backend != DatabaseBackend::MySql {
        return None;
    }
    client_for(&config).ok()
}

#[tokio::test]
async fn test_execute_simple_select() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: DATABASE_URL not set to a MySQL server");
        return;
    };

    let result = client
        .execute_query("SELECT 1 AS num, 'hello' AS greeting")
        .await
        .unwrap();

    assert_eq!(result.columns.len(), 2);
    assert_eq!(result.columns[0].name, "num");
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0][0], Value::Int(1));
    assert_eq!(result.rows[0][1], Value::from("hello"));
}

#[tokio::test]
async fn test_bound_parameter() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: DATABASE_URL not set to a MySQL server");
        return;
    };

    let result = client
        .execute("SELECT ? AS name", &[Value::from("Alice")])
        .await
        .unwrap();

    assert_eq!(result.rows[0][0], Value::from("Alice"));
}

#[tokio::test]
async fn test_syntax_error_is_query_error() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: DATABASE_URL not set to a MySQL server");
        return;
    };

    let err = client.execute_query("SELEC 1").await.unwrap_err();
    assert_eq!(err.category(), "Query Error");
}

#[tokio::test]
async fn test_customers_from_orders_table() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: DATABASE_URL not set to a MySQL server");
        return;
    };

    // Only meaningful when the orders table exists in the target database.
    if let Ok(customers) = fetch_customers(client.as_ref()).await {
        assert!(customers.iter().all(|c| !c.trim().is_empty()));
    }
}
