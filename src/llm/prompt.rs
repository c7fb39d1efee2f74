//! Prompt construction for LLM requests.
//!
//! Every oracle call is a single user prompt built by one of the functions
//! below. Inputs are interpolated once, so braces in questions or rows stay
//! literal. The `orders` schema is fixed, so it is inlined rather than
//! introspected.

/// Schema line shown to the model whenever it has to write SQL.
pub const ORDERS_SCHEMA: &str = "orders(id, customer_name, amount, created_at)";

/// Builds the router prompt for a question. The model picks one tool and
/// answers in JSON.
pub fn router_prompt(question: &str) -> String {
    format!(
        r#"You are a router for an AI system.

User question:
"{question}"

Choose tool:
- chat → greetings, small talk
- vector → complaints, feedback, issues, refund, delay, unhappy
- sql → counts, totals, averages, rankings, analytics
- both → only when clearly both are needed

Return ONLY JSON:
{{ "tool": "sql" | "vector" | "both" | "chat" }}"#
    )
}

/// Builds the SQL generation prompt for the given dialect ("MySQL", "PostgreSQL").
pub fn sql_prompt(question: &str, dialect: &str) -> String {
    format!(
        "You are an expert {dialect} assistant.

Schema:
{schema}

Rules:
- Use only this table
- Return ONLY SQL
- Do NOT explain

Question:
{question}",
        schema = ORDERS_SCHEMA
    )
}

/// Builds the prompt asking for a short factual answer over a raw result.
pub fn answer_prompt(question: &str, result: &str) -> String {
    format!(
        "Question: {question}\nResult: {result}\n\nGive a short factual answer. Do not hallucinate."
    )
}

/// Builds the "both" prompt from the rendered relational and semantic parts.
pub fn combined_prompt(question: &str, structured: &str, semantic: &str) -> String {
    format!(
        "User question: {question}

Structured data:
{structured}

Semantic info:
{semantic}

Give a concise helpful answer."
    )
}

/// Builds the conversational reply prompt.
pub fn chat_prompt(question: &str) -> String {
    format!("Reply naturally:\n{}", question)
}
