//! Integration tests for order-insight.
//!
//! Tests in `mysql_test` skip themselves unless DATABASE_URL is set.

pub mod mysql_test;
pub mod planner_test;
pub mod search_test;
