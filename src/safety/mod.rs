//! SQL safety gate.
//!
//! Decides whether model-generated SQL may reach the database. The policy is
//! a plain keyword filter over the lower-cased text, not a parse: any blocked
//! keyword anywhere rejects the statement, including inside literals and
//! identifiers, and only statements starting with `select` are accepted.
//! Template queries from the analytics handlers never pass through here.

use std::fmt;

/// Substrings that reject a statement wherever they appear.
pub const BLOCKED_KEYWORDS: [&str; 6] = ["delete", "drop", "update", "insert", "alter", "truncate"];

/// Why a statement was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// Contains a blocked keyword.
    Keyword(&'static str),
    /// Does not start with `select`.
    NotSelect,
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keyword(word) => write!(f, "contains blocked keyword '{}'", word),
            Self::NotSelect => write!(f, "not a SELECT statement"),
        }
    }
}

/// Verdict of the safety gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyVerdict {
    /// The statement may be executed.
    Allowed,
    /// The statement must not be executed.
    Blocked(BlockReason),
}

impl SafetyVerdict {
    /// Returns true if the statement may be executed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

impl fmt::Display for SafetyVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allowed => write!(f, "allowed"),
            Self::Blocked(reason) => write!(f, "blocked: {}", reason),
        }
    }
}

/// Classifies a statement against the keyword policy.
pub fn check(sql: &str) -> SafetyVerdict {
    let lower = sql.to_lowercase();

    if let Some(word) = BLOCKED_KEYWORDS
        .iter()
        .copied()
        .find(|w| lower.contains(w))
    {
        return SafetyVerdict::Blocked(BlockReason::Keyword(word));
    }

    if lower.trim().starts_with("select") {
        SafetyVerdict::Allowed
    } else {
        SafetyVerdict::Blocked(BlockReason::NotSelect)
    }
}

/// Returns true if the statement may be executed.
pub fn is_safe(sql: &str) -> bool {
    check(sql).is_allowed()
}
