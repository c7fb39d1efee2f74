//! Templated analytics over the `orders` table.
//!
//! Every statement here is fixed text with bound parameters, rendered for the
//! backend's dialect. None of them comes from the model, so they skip the
//! safety gate. A handler returns `Ok(None)` when the aggregate it needs is
//! missing (no rows, or NULL), which the planner reports as "not found".

use tracing::debug;

use crate::db::{DatabaseBackend, DatabaseClient, QueryResult, Value};
use crate::error::Result;

/// Window used by the "last 7 days" count and the pattern summary.
const RECENT_DAYS: u32 = 7;

/// Runs the templated analytics queries against one backend.
pub struct Analytics<'a> {
    db: &'a dyn DatabaseClient,
}

impl<'a> Analytics<'a> {
    /// Creates handlers over `db`.
    pub fn new(db: &'a dyn DatabaseClient) -> Self {
        Self { db }
    }

    fn backend(&self) -> DatabaseBackend {
        self.db.backend()
    }

    /// Number of orders, optionally for one customer and optionally only the
    /// last seven days. The window applies only when the question says
    /// "last 7" and a customer was found.
    pub async fn count(&self, question: &str, customer: Option<&str>) -> Result<Option<String>> {
        let recent = question.to_lowercase().contains("last 7");

        match customer {
            Some(c) if recent => {
                let n = self.scalar(&self.recent_count_sql(), &[Value::from(c)]).await?;
                Ok(n.map(|n| format!("{c} placed {n} orders in the last {RECENT_DAYS} days.")))
            }
            Some(c) => {
                let n = self.scalar(&self.customer_count_sql(), &[Value::from(c)]).await?;
                Ok(n.map(|n| format!("{c} has placed {n} orders.")))
            }
            None => {
                let n = self.scalar("SELECT COUNT(*) FROM orders", &[]).await?;
                Ok(n.map(|n| format!("There are {n} total orders.")))
            }
        }
    }

    /// Total revenue, rounded to cents.
    pub async fn sum(&self, customer: Option<&str>) -> Result<Option<String>> {
        let total_expr = self.backend().round2("SUM(amount)");
        match customer {
            Some(c) => {
                let sql = format!(
                    "SELECT {total_expr} FROM orders WHERE customer_name = {}",
                    self.backend().placeholder(1)
                );
                let total = self.scalar(&sql, &[Value::from(c)]).await?;
                Ok(total.map(|t| format!("{c} has generated total revenue of {t}.")))
            }
            None => {
                let total = self
                    .scalar(&format!("SELECT {total_expr} FROM orders"), &[])
                    .await?;
                Ok(total.map(|t| format!("The total revenue is {t}.")))
            }
        }
    }

    /// Average order value, rounded to cents.
    pub async fn average(&self, customer: Option<&str>) -> Result<Option<String>> {
        match customer {
            Some(c) => {
                let avg = self
                    .scalar(&self.customer_average_sql(), &[Value::from(c)])
                    .await?;
                Ok(avg.map(|a| format!("The average order value for {c} is {a}.")))
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM orders",
                    self.backend().round2("AVG(amount)")
                );
                let avg = self.scalar(&sql, &[]).await?;
                Ok(avg.map(|a| format!("The average order value across all orders is {a}.")))
            }
        }
    }

    /// Customer with the most orders. Ties resolve however the backend orders them.
    pub async fn top(&self) -> Result<Option<String>> {
        self.ranked("DESC", "most").await
    }

    /// Customer with the fewest orders.
    pub async fn least(&self) -> Result<Option<String>> {
        self.ranked("ASC", "least").await
    }

    async fn ranked(&self, direction: &str, label: &str) -> Result<Option<String>> {
        let sql = format!(
            "SELECT customer_name, COUNT(*) AS c FROM orders \
             GROUP BY customer_name ORDER BY c {direction} LIMIT 1"
        );
        let result = self.db.execute_query(&sql).await?;

        let Some([name, count]) = result.rows.first().map(Vec::as_slice) else {
            return Ok(None);
        };
        if name.is_null() {
            return Ok(None);
        }
        Ok(Some(format!(
            "{name} is the {label} active customer with {count} orders."
        )))
    }

    /// Three-part summary of one customer's ordering.
    pub async fn pattern(&self, customer: &str) -> Result<Option<String>> {
        let params = [Value::from(customer)];

        let total = self.scalar(&self.customer_count_sql(), &params).await?;
        let average = self.scalar(&self.customer_average_sql(), &params).await?;
        let recent = self.scalar(&self.recent_count_sql(), &params).await?;

        let (Some(total), Some(average), Some(recent)) = (total, average, recent) else {
            return Ok(None);
        };

        Ok(Some(format!(
            "{customer} has placed {total} orders in total. \
             Their average order value is {average}. \
             They placed {recent} orders in the last {RECENT_DAYS} days."
        )))
    }

    fn customer_count_sql(&self) -> String {
        format!(
            "SELECT COUNT(*) FROM orders WHERE customer_name = {}",
            self.backend().placeholder(1)
        )
    }

    fn recent_count_sql(&self) -> String {
        format!(
            "SELECT COUNT(*) FROM orders WHERE customer_name = {} AND {}",
            self.backend().placeholder(1),
            self.backend().recent_days_predicate(RECENT_DAYS)
        )
    }

    fn customer_average_sql(&self) -> String {
        format!(
            "SELECT {} FROM orders WHERE customer_name = {}",
            self.backend().round2("AVG(amount)"),
            self.backend().placeholder(1)
        )
    }

    /// Runs a single-aggregate statement. Empty results and NULL yield `None`.
    async fn scalar(&self, sql: &str, params: &[Value]) -> Result<Option<Value>> {
        let result: QueryResult = self.db.execute(sql, params).await?;
        debug!(sql = %sql, rows = result.row_count(), "Analytics query");
        Ok(result.first_value().filter(|v| !v.is_null()).cloned())
    }
}
