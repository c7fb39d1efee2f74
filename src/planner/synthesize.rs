//! Answer synthesis.
//!
//! A result that is exactly one numeric cell is phrased from a template
//! picked by keywords in the question. Any other shape is handed to the
//! oracle together with the question.

use tracing::debug;

use crate::db::{QueryResult, Value};
use crate::error::Result;
use crate::llm::{prompt, LlmClient};

/// Phrases a single numeric value. Keywords are checked in order: customer,
/// order, revenue/amount. Only the revenue phrasing rounds.
pub fn format_numeric(question: &str, value: &Value) -> String {
    let q = question.to_lowercase();

    if q.contains("customer") {
        return format!("There are {value} customers.");
    }
    if q.contains("order") {
        return format!("There are {value} orders.");
    }
    if q.contains("revenue") || q.contains("amount") {
        return format!("The total revenue is {}.", value.rounded(2));
    }
    value.to_display_string()
}

/// Returns the templated answer when the result is one row holding one numeric column.
pub fn deterministic_answer(question: &str, result: &QueryResult) -> Option<String> {
    result
        .single_scalar()
        .filter(|v| v.is_numeric())
        .map(|v| format_numeric(question, v))
}

/// Turns a relational result into an answer, asking the oracle only when no
/// template applies.
pub async fn synthesize(llm: &dyn LlmClient, question: &str, result: &QueryResult) -> Result<String> {
    if let Some(answer) = deterministic_answer(question, result) {
        debug!("Answered from single numeric result");
        return Ok(answer);
    }

    let rendered = result.to_prompt_string();
    debug!(rows = result.row_count(), "Summarising result with the model");
    llm.ask(&prompt::answer_prompt(question, &rendered)).await
}
