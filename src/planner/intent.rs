//! Intent classification.
//!
//! Two strategies produce two separate vocabularies. The keyword strategy
//! answers smalltalk from a fixed phrase table and otherwise scans the
//! lower-cased question for keyword groups in priority order. The model
//! strategy asks the oracle to pick a tool and decodes its JSON reply.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::llm::{parse_route_decision, prompt, LlmClient, RouteDecision, Tool};

/// Closed set of intents a question can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    Smalltalk,
    Vector,
    SqlCount,
    SqlSum,
    SqlAverage,
    SqlTop,
    SqlLeast,
    SqlPattern,
    SqlFallback,
    Both,
    Unknown,
}

impl Intent {
    /// Returns the intent label used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Smalltalk => "smalltalk",
            Self::Vector => "vector",
            Self::SqlCount => "sql-count",
            Self::SqlSum => "sql-sum",
            Self::SqlAverage => "sql-average",
            Self::SqlTop => "sql-top",
            Self::SqlLeast => "sql-least",
            Self::SqlPattern => "sql-pattern",
            Self::SqlFallback => "sql-fallback",
            Self::Both => "both",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which classifier the planner runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationStrategy {
    /// Smalltalk table, keyword groups, templated analytics.
    #[default]
    Keyword,
    /// Oracle-chosen tool: chat, vector, sql or both.
    Model,
}

impl ClassificationStrategy {
    /// Returns the strategy name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Model => "model",
        }
    }
}

impl FromStr for ClassificationStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keyword" | "keywords" | "rules" => Ok(Self::Keyword),
            "model" | "llm" | "router" => Ok(Self::Model),
            _ => Err(format!(
                "Unknown classification strategy '{}'. Expected 'keyword' or 'model'",
                s
            )),
        }
    }
}

impl fmt::Display for ClassificationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Output of a classifier. Each strategy keeps its own vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Matched the smalltalk table; carries the canned reply.
    Smalltalk(&'static str),
    /// Keyword-tier intent (never `Smalltalk`, `Both` or `Unknown`).
    Keyword(Intent),
    /// Tool picked by the model router.
    Model(RouteDecision),
}

impl Classification {
    /// Coarse intent for reporting. Router `sql` maps to `SqlFallback`.
    pub fn intent(&self) -> Intent {
        match self {
            Self::Smalltalk(_) => Intent::Smalltalk,
            Self::Keyword(intent) => *intent,
            Self::Model(decision) => match decision.tool {
                Tool::Chat => Intent::Smalltalk,
                Tool::Vector => Intent::Vector,
                Tool::Sql => Intent::SqlFallback,
                Tool::Both => Intent::Both,
                Tool::Unknown => Intent::Unknown,
            },
        }
    }
}

/// Canned smalltalk replies.
pub const GREETING_REPLY: &str = "Hello! How can I help you?";
pub const WELLBEING_REPLY: &str = "I'm doing well. How can I assist you?";
pub const IDENTITY_REPLY: &str = "I am your AI assistant for analyzing your order data.";
pub const THANKS_REPLY: &str = "You're welcome!";
pub const FAREWELL_REPLY: &str = "Goodbye! Have a great day.";

const GREETINGS: [&str; 4] = ["hi", "hello", "hey", "hii"];

/// Keyword groups in priority order. First group with a hit wins.
const KEYWORD_GROUPS: [(Intent, &[&str]); 7] = [
    (
        Intent::Vector,
        &[
            "complaint",
            "issue",
            "problem",
            "feedback",
            "refund",
            "experience",
            "late",
            "delay",
        ],
    ),
    (
        Intent::SqlPattern,
        &["pattern", "behavior", "behaviour", "activity", "trend"],
    ),
    (Intent::SqlTop, &["top", "most", "highest"]),
    (Intent::SqlLeast, &["least", "lowest"]),
    (Intent::SqlAverage, &["average", "avg"]),
    (Intent::SqlSum, &["total", "sum", "revenue"]),
    (Intent::SqlCount, &["how many", "count", "number of"]),
];

/// Returns the canned reply if the question is smalltalk.
///
/// Greetings must match the whole trimmed question; the other phrases match
/// anywhere in it.
pub fn smalltalk_reply(question: &str) -> Option<&'static str> {
    let q = question.trim().to_lowercase();

    if GREETINGS.contains(&q.as_str()) {
        return Some(GREETING_REPLY);
    }
    if q.contains("how are you") {
        return Some(WELLBEING_REPLY);
    }
    if q.contains("who are you") {
        return Some(IDENTITY_REPLY);
    }
    if q.contains("thanks") || q.contains("thank you") {
        return Some(THANKS_REPLY);
    }
    if q.contains("bye") {
        return Some(FAREWELL_REPLY);
    }
    None
}

/// Scans keyword groups in priority order. No match yields `SqlFallback`.
///
/// Matching is plain substring search, so "late" also fires on "latest".
pub fn keyword_intent(question: &str) -> Intent {
    let q = question.to_lowercase();

    KEYWORD_GROUPS
        .iter()
        .find(|(_, words)| words.iter().any(|w| q.contains(w)))
        .map(|(intent, _)| *intent)
        .unwrap_or(Intent::SqlFallback)
}

/// Keyword strategy: smalltalk table first, then keyword groups.
pub fn classify_keyword(question: &str) -> Classification {
    match smalltalk_reply(question) {
        Some(reply) => Classification::Smalltalk(reply),
        None => Classification::Keyword(keyword_intent(question)),
    }
}

/// Model strategy: asks the oracle to route the question.
///
/// A failed oracle call is treated like an unparsable reply and routes to
/// `sql`.
pub async fn classify_with_model(llm: &dyn LlmClient, question: &str) -> Classification {
    let decision = match llm.ask(&prompt::router_prompt(question)).await {
        Ok(raw) => {
            let decision = parse_route_decision(&raw);
            if decision.defaulted {
                warn!(reply = %raw.trim(), "Router reply was not a tool decision; using sql");
            }
            decision
        }
        Err(e) => {
            warn!(error = %e, "Router call failed; using sql");
            RouteDecision::default_sql()
        }
    };
    Classification::Model(decision)
}
