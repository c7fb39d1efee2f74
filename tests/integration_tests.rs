//! Integration tests for order-insight.
//!
//! Most tests run against the mock relational backend and a real SQLite note
//! store. The MySQL tests need a live server; set DATABASE_URL to run them.
//!
//! Run with: `cargo test --test integration_tests`

mod integration;
