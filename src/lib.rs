//! order-insight: natural-language questions over order data.
//!
//! A question is routed to templated analytics, semantic search over order
//! notes, model-generated SQL behind a safety gate, or a mix of these, and
//! comes back as a short answer. This library exposes the core modules for
//! the `insight` binary and for integration tests.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod logging;
pub mod planner;
pub mod safety;
pub mod search;
