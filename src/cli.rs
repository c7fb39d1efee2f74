//! Command-line interface for order-insight.

use crate::config::{Config, DatabaseConfig};
use crate::error::{InsightError, Result};
use crate::llm::LlmProvider;
use crate::planner::{ClassificationStrategy, Planner};
use crate::search::Metadata;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Ask questions about orders in plain language.
#[derive(Parser, Debug)]
#[command(name = "insight", version, about)]
pub struct Cli {
    /// Path to configuration file.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Classification strategy: keyword or model.
    #[arg(short, long, env = "INSIGHT_STRATEGY", value_name = "STRATEGY")]
    pub strategy: Option<String>,

    /// LLM provider: ollama, openai or mock.
    #[arg(long, value_name = "PROVIDER")]
    pub llm: Option<String>,

    /// Database connection string (mysql://... or postgres://...).
    #[arg(long, value_name = "URL")]
    pub database_url: Option<String>,

    /// Log at debug level.
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Answer a single question and exit.
    Ask {
        /// The question, in words.
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Read questions from stdin, one per line.
    Chat,
    /// Load order notes from a JSON file into the semantic store.
    Seed {
        /// JSON array of `{"text": ..., "metadata": {...}}` objects.
        file: PathBuf,
    },
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the configuration file path, falling back to the platform default.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Returns the question of an `ask` invocation, words joined by spaces.
    pub fn question(&self) -> Option<String> {
        match &self.command {
            Command::Ask { question } => Some(question.join(" ")),
            _ => None,
        }
    }

    /// Applies command-line overrides, which win over file and environment values.
    pub fn apply_overrides(&self, config: &mut Config) -> Result<()> {
        if let Some(url) = &self.database_url {
            let from_cli = DatabaseConfig::from_connection_string(url)?;
            config.database.merge(&from_cli);
        }
        if let Some(strategy) = &self.strategy {
            config.planner.strategy = strategy
                .parse::<ClassificationStrategy>()
                .map_err(InsightError::config)?;
        }
        if let Some(provider) = &self.llm {
            provider
                .parse::<LlmProvider>()
                .map_err(InsightError::config)?;
            config.llm.provider = provider.to_lowercase();
        }
        if self.verbose {
            config.logging.level = "debug".to_string();
        }
        Ok(())
    }
}

/// One note in a seed file.
#[derive(Debug, Deserialize)]
struct SeedDocument {
    text: String,
    #[serde(default)]
    metadata: Option<Metadata>,
}

/// Documents ready for `SearchIndex::add_documents`.
#[derive(Debug, Default, PartialEq)]
pub struct SeedBatch {
    pub texts: Vec<String>,
    pub metadatas: Option<Vec<Metadata>>,
}

/// Parses a seed file body.
///
/// Metadata is passed along only when at least one note carries some; notes
/// without it then get an empty map so the lengths line up.
pub fn parse_seed(json: &str) -> Result<SeedBatch> {
    let documents: Vec<SeedDocument> = serde_json::from_str(json)
        .map_err(|e| InsightError::config(format!("Invalid seed file: {e}")))?;

    let any_metadata = documents.iter().any(|d| d.metadata.is_some());
    let mut texts = Vec::with_capacity(documents.len());
    let mut metadatas = Vec::with_capacity(documents.len());

    for doc in documents {
        texts.push(doc.text);
        metadatas.push(doc.metadata.unwrap_or_default());
    }

    Ok(SeedBatch {
        texts,
        metadatas: any_metadata.then_some(metadatas),
    })
}

/// Reads and parses a seed file.
pub fn read_seed_file(path: &Path) -> Result<SeedBatch> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        InsightError::config(format!("Failed to read {}: {e}", path.display()))
    })?;
    parse_seed(&content)
}

/// Answers questions read line by line until end of input, `exit` or `quit`.
///
/// A read or write failure ends the session with an error.
pub async fn chat_loop<R, W>(planner: &Planner, input: R, mut output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();

    loop {
        write!(output, "> ").and_then(|_| output.flush()).map_err(write_error)?;

        let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| InsightError::internal(format!("Failed to read question: {e}")))?
        else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }

        let answer = planner.answer(question).await;
        writeln!(output, "{}", answer.text).map_err(write_error)?;
    }

    Ok(())
}

fn write_error(e: std::io::Error) -> InsightError {
    InsightError::internal(format!("Failed to write answer: {e}"))
}
