//! LLM client factory.
//!
//! Centralizes provider-specific logic for creating LLM clients.

use crate::config::LlmConfig;
use crate::error::{InsightError, Result};
use crate::llm::{
    LlmClient, LlmProvider, MockLlmClient, OllamaClient, OllamaConfig, OpenAiClient, OpenAiConfig,
};

/// Creates an LLM client from the LLM configuration section.
///
/// The OpenAI key is read from `OPENAI_API_KEY`; it is never stored in the
/// config file. `OLLAMA_URL` overrides the Ollama base URL when no `url` is
/// configured.
pub fn create_client(config: &LlmConfig) -> Result<Box<dyn LlmClient>> {
    match config.provider()? {
        LlmProvider::OpenAi => {
            let key = std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.is_empty())
                .ok_or_else(|| InsightError::llm("No API key configured. Set OPENAI_API_KEY."))?;
            let mut openai = OpenAiConfig::new(key, &config.model).with_timeout(config.timeout_secs);
            if let Some(url) = &config.url {
                openai = openai.with_url(url);
            }
            Ok(Box::new(OpenAiClient::new(openai)?))
        }
        LlmProvider::Ollama => {
            let mut ollama = OllamaConfig::new(&config.model).with_timeout(config.timeout_secs);
            if let Some(url) = config
                .url
                .clone()
                .or_else(|| std::env::var("OLLAMA_URL").ok())
            {
                ollama = ollama.with_url(url);
            }
            Ok(Box::new(OllamaClient::new(ollama)?))
        }
        LlmProvider::Mock => Ok(Box::new(MockLlmClient::new())),
    }
}
