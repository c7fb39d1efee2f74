//! Response parsing for LLM outputs.
//!
//! Two shapes come back from the oracle: SQL (usually wrapped in a markdown
//! code block, sometimes with chatter around it) and the router's JSON tool
//! decision. Neither parser returns an error.

use regex::Regex;
use serde_json::Value as JsonValue;
use std::sync::LazyLock;

/// First `select ... ;` span, case-insensitive, across lines.
static SELECT_STATEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)(select\b.*?;)").expect("valid select pattern")
});

/// Extracts the SQL statement from an LLM response.
///
/// Prefers the content of the first ```sql block, then the first bare ```
/// block. Any stray fences are removed, and if a `select ... ;` statement is
/// present only that statement is kept. Otherwise the trimmed text is
/// returned as-is and left for the safety gate to judge.
pub fn extract_sql(response: &str) -> String {
    let body = extract_code_block(response, "sql")
        .or_else(|| extract_code_block(response, ""))
        .unwrap_or_else(|| response.to_string());

    let body = body.replace("```sql", "").replace("```", "");
    let body = body.trim();

    match SELECT_STATEMENT.captures(body).and_then(|c| c.get(1)) {
        Some(statement) => statement.as_str().trim().to_string(),
        None => body.to_string(),
    }
}

/// Removes markdown fences and surrounding whitespace. Every statement in the
/// reply is kept, so the safety gate sees exactly what would run.
pub fn strip_fences(response: &str) -> String {
    response
        .replace("```sql", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Extracts content from a markdown code block with the specified language.
///
/// Pass an empty string for `lang` to match blocks without a language specifier.
fn extract_code_block(text: &str, lang: &str) -> Option<String> {
    let start_pattern = format!("```{}", lang);

    let start_idx = text.find(&start_pattern)?;

    // Find the newline after the opening fence
    let content_start = text[start_idx + start_pattern.len()..]
        .find('\n')
        .map(|i| start_idx + start_pattern.len() + i + 1)?;

    // For generic blocks, make sure it's not actually a language-specific block
    if lang.is_empty() {
        let after_fence = &text[start_idx + 3..content_start - 1];
        if !after_fence.trim().is_empty() {
            return None;
        }
    }

    let end_idx = text[content_start..].find("```")?;

    Some(text[content_start..content_start + end_idx].to_string())
}

/// Tool selected by the model router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    /// Conversational reply.
    Chat,
    /// Semantic search over notes.
    Vector,
    /// Generated SQL over the orders table.
    Sql,
    /// Vector and SQL combined.
    Both,
    /// A label outside the router vocabulary.
    Unknown,
}

impl Tool {
    /// Maps a router label to a tool. Unrecognised labels become `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "chat" => Self::Chat,
            "vector" => Self::Vector,
            "sql" => Self::Sql,
            "both" => Self::Both,
            _ => Self::Unknown,
        }
    }

    /// Returns the router label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Vector => "vector",
            Self::Sql => "sql",
            Self::Both => "both",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of decoding the router's reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDecision {
    /// Selected tool.
    pub tool: Tool,
    /// True when the reply could not be decoded and `sql` was substituted.
    pub defaulted: bool,
}

impl RouteDecision {
    fn chosen(tool: Tool) -> Self {
        Self {
            tool,
            defaulted: false,
        }
    }

    /// The fallback decision used whenever the reply is unusable.
    pub fn default_sql() -> Self {
        Self {
            tool: Tool::Sql,
            defaulted: true,
        }
    }
}

/// Decodes the router reply `{"tool": "..."}`.
///
/// A reply wrapped in a ```json block is unwrapped first. Invalid JSON, a
/// non-object value, or a missing `tool` key all yield the `sql` default.
/// A `tool` that is present but not a known label yields `Tool::Unknown`.
pub fn parse_route_decision(response: &str) -> RouteDecision {
    let body = extract_code_block(response, "json")
        .or_else(|| extract_code_block(response, ""))
        .unwrap_or_else(|| response.to_string());

    let Ok(JsonValue::Object(map)) = serde_json::from_str::<JsonValue>(body.trim()) else {
        return RouteDecision::default_sql();
    };

    match map.get("tool") {
        None => RouteDecision::default_sql(),
        Some(JsonValue::String(label)) => RouteDecision::chosen(Tool::from_label(label)),
        Some(_) => RouteDecision::chosen(Tool::Unknown),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences_keeps_every_statement() {
        let response = "```sql\nSELECT COUNT(*) FROM orders; DROP TABLE orders;\n```";
        assert_eq!(
            strip_fences(response),
            "SELECT COUNT(*) FROM orders; DROP TABLE orders;"
        );
    }

    #[test]
    fn test_extract_sql_code_block() {
        let response = r#"Here's the query:

```sql
SELECT * FROM orders;
```

This will return all orders."#;

        assert_eq!(extract_sql(response), "SELECT * FROM orders;");
    }

    #[test]
    fn test_extract_generic_code_block() {
        let response = "```\nSELECT COUNT(*) FROM orders;\n```";
        assert_eq!(extract_sql(response), "SELECT COUNT(*) FROM orders;");
    }

    #[test]
    fn test_extract_sql_without_fences() {
        let response = "Sure! select customer_name\nfrom orders; -- done";
        assert_eq!(extract_sql(response), "select customer_name\nfrom orders;");
    }

    #[test]
    fn test_extract_sql_keeps_first_statement() {
        let response = "SELECT 1; DROP TABLE orders;";
        assert_eq!(extract_sql(response), "SELECT 1;");
    }

    #[test]
    fn test_extract_sql_no_semicolon_returns_trimmed_text() {
        assert_eq!(
            extract_sql("  SELECT COUNT(*) FROM orders  "),
            "SELECT COUNT(*) FROM orders"
        );
    }

    #[test]
    fn test_extract_sql_unclosed_fence() {
        assert_eq!(
            extract_sql("```sql\nSELECT id FROM orders;"),
            "SELECT id FROM orders;"
        );
    }

    #[test]
    fn test_extract_sql_non_select_passes_through() {
        assert_eq!(
            extract_sql("```sql\nDELETE FROM orders\n```"),
            "DELETE FROM orders"
        );
    }

    #[test]
    fn test_multiple_code_blocks_uses_first() {
        let response = "```sql\nSELECT * FROM orders;\n```\n\n```sql\nSELECT id FROM orders;\n```";
        assert_eq!(extract_sql(response), "SELECT * FROM orders;");
    }

    #[test]
    fn test_route_decision_each_tool() {
        assert_eq!(parse_route_decision(r#"{"tool": "chat"}"#).tool, Tool::Chat);
        assert_eq!(parse_route_decision(r#"{"tool": "vector"}"#).tool, Tool::Vector);
        assert_eq!(parse_route_decision(r#"{"tool": "sql"}"#).tool, Tool::Sql);
        assert_eq!(parse_route_decision(r#"{"tool": "both"}"#).tool, Tool::Both);
    }

    #[test]
    fn test_route_decision_is_case_insensitive() {
        let decision = parse_route_decision(r#"{ "tool": "Vector" }"#);
        assert_eq!(decision.tool, Tool::Vector);
        assert!(!decision.defaulted);
    }

    #[test]
    fn test_route_decision_invalid_json_defaults_to_sql() {
        let decision = parse_route_decision("I think you want SQL here.");
        assert_eq!(decision, RouteDecision::default_sql());
    }

    #[test]
    fn test_route_decision_non_object_defaults_to_sql() {
        assert_eq!(parse_route_decision(r#""vector""#), RouteDecision::default_sql());
        assert_eq!(parse_route_decision("[1, 2]"), RouteDecision::default_sql());
    }

    #[test]
    fn test_route_decision_missing_tool_defaults_to_sql() {
        let decision = parse_route_decision(r#"{"choice": "vector"}"#);
        assert_eq!(decision.tool, Tool::Sql);
        assert!(decision.defaulted);
    }

    #[test]
    fn test_route_decision_unknown_label() {
        let decision = parse_route_decision(r#"{"tool": "calculator"}"#);
        assert_eq!(decision.tool, Tool::Unknown);
        assert!(!decision.defaulted);
    }

    #[test]
    fn test_route_decision_fenced_json() {
        let decision = parse_route_decision("```json\n{\"tool\": \"both\"}\n```");
        assert_eq!(decision.tool, Tool::Both);
    }
}
