//! Customer name extraction.
//!
//! The known names are fetched fresh from the `orders` table on every call
//! and matched as case-insensitive substrings of the question. The first
//! name in backend order wins, so with overlapping names ("Al", "Alice") the
//! answer depends on the order the database happens to return.
//!
//! Substring false positives are kept, with one exception: NULL and blank
//! names are dropped before matching, so a blank `customer_name` never
//! matches a question.

use tracing::debug;

use crate::db::{DatabaseClient, Value};
use crate::error::Result;

/// Query listing every customer name.
pub const DISTINCT_CUSTOMERS_SQL: &str = "SELECT DISTINCT customer_name FROM orders";

/// Fetches the distinct customer names, in backend order. NULL and blank names are skipped.
pub async fn fetch_customers(db: &dyn DatabaseClient) -> Result<Vec<String>> {
    let result = db.execute_query(DISTINCT_CUSTOMERS_SQL).await?;

    Ok(result
        .rows
        .into_iter()
        .filter_map(|row| row.into_iter().next())
        .filter_map(|value| match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_display_string()),
        })
        .filter(|name| !name.trim().is_empty())
        .collect())
}

/// Returns the first known name contained in the question, ignoring case.
pub fn match_customer(question: &str, known: &[String]) -> Option<String> {
    let q = question.to_lowercase();
    known
        .iter()
        .find(|name| q.contains(&name.to_lowercase()))
        .cloned()
}

/// Fetches the known customers and matches them against the question.
pub async fn extract_customer(db: &dyn DatabaseClient, question: &str) -> Result<Option<String>> {
    let known = fetch_customers(db).await?;
    let customer = match_customer(question, &known);
    debug!(known = known.len(), customer = ?customer, "Customer extraction");
    Ok(customer)
}
