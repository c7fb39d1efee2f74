//! Mock LLM clients for testing.
//!
//! Provides deterministic responses based on input patterns.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{InsightError, Result};
use crate::llm::types::{Message, Role};
use crate::llm::LlmClient;

/// Mock LLM client that returns canned responses based on input patterns.
///
/// Resolution order for each call:
/// 1. the next scripted response, if any remain;
/// 2. the first custom mapping whose pattern appears in the prompt;
/// 3. a default keyed on the kind of prompt (router, SQL generation, other).
///
/// Every prompt is recorded so tests can assert on what was asked.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    /// Custom response mappings (pattern -> response).
    custom_responses: Vec<(String, String)>,
    /// Responses handed out in order before any pattern matching.
    scripted: Mutex<VecDeque<String>>,
    /// Prompts received, oldest first.
    prompts: Mutex<Vec<String>>,
}

impl MockLlmClient {
    /// Creates a new mock client with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a custom response mapping.
    ///
    /// When the input contains `pattern` (case-insensitive), the mock will
    /// return `response`.
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.custom_responses
            .push((pattern.into().to_lowercase(), response.into()));
        self
    }

    /// Queues responses returned one per call, in order.
    pub fn with_responses<I, S>(self, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Ok(mut queue) = self.scripted.lock() {
            queue.extend(responses.into_iter().map(Into::into));
        }
        self
    }

    /// Returns every prompt received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    /// Returns how many times the client was called.
    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or_default()
    }

    /// Generates a mock response based on the input.
    fn mock_response(&self, input: &str) -> String {
        if let Some(next) = self.scripted.lock().ok().and_then(|mut q| q.pop_front()) {
            return next;
        }

        let input_lower = input.to_lowercase();

        for (pattern, response) in &self.custom_responses {
            if input_lower.contains(pattern.as_str()) {
                return response.clone();
            }
        }

        if input_lower.contains("return only json") {
            return r#"{"tool": "sql"}"#.to_string();
        }

        if input_lower.contains("return only sql") {
            return "```sql\nSELECT COUNT(*) FROM orders;\n```".to_string();
        }

        "Mock answer".to_string()
    }

    /// Extracts the last user message content from a message list.
    fn extract_user_input(messages: &[Message]) -> String {
        messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let input = Self::extract_user_input(messages);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(input.clone());
        }
        Ok(self.mock_response(&input))
    }
}

/// LLM client whose every call fails.
#[derive(Debug, Clone)]
pub struct FailingLlmClient {
    message: String,
}

impl FailingLlmClient {
    /// Creates a client failing with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl LlmClient for FailingLlmClient {
    async fn complete(&self, _messages: &[Message]) -> Result<String> {
        Err(InsightError::llm(self.message.clone()))
    }
}
