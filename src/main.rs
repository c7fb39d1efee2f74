//! insight - ask questions about orders in plain language.

use anyhow::{Context, Result};
use order_insight::cli::{chat_loop, read_seed_file, Cli, Command};
use order_insight::config::Config;
use order_insight::db::{client_for, DatabaseClient};
use order_insight::error::InsightError;
use order_insight::llm::{create_client, LlmClient};
use order_insight::logging::init_stderr_logging;
use order_insight::planner::Planner;
use order_insight::search::open_index;
use std::path::Path;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    if let Err(e) = run().await {
        let category = e
            .downcast_ref::<InsightError>()
            .map(InsightError::category)
            .unwrap_or("Error");
        error!("{}: {:#}", category, e);
        eprintln!("{}: {:#}", category, e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let config_path = cli.config_path();
    let mut config = Config::load_from_file(&config_path)
        .with_context(|| format!("Loading {}", config_path.display()))?;
    config.apply_env_overrides()?;
    cli.apply_overrides(&mut config)?;

    init_stderr_logging(&config.logging.level);
    info!("Loaded config from: {}", config_path.display());

    match &cli.command {
        Command::Seed { file } => seed(&config, file).await,
        Command::Ask { .. } => {
            let planner = build_planner(&config).await?;
            let question = cli.question().unwrap_or_default();
            println!("{}", planner.answer(&question).await.text);
            Ok(())
        }
        Command::Chat => {
            let planner = build_planner(&config).await?;
            let stdin = BufReader::new(tokio::io::stdin());
            chat_loop(&planner, stdin, std::io::stdout())
                .await
                .context("Chat session ended")
        }
    }
}

/// Wires the relational backend, the semantic store and the model together.
async fn build_planner(config: &Config) -> Result<Planner> {
    info!(
        database = %config.database.display_string(),
        provider = %config.llm.provider,
        strategy = %config.planner.strategy,
        "Starting planner"
    );

    let db: Arc<dyn DatabaseClient> =
        Arc::from(client_for(&config.database).context("Configuring the database")?);
    let index = open_index(&config.search)
        .await
        .context("Opening the note store")?;
    let llm: Arc<dyn LlmClient> =
        Arc::from(create_client(&config.llm).context("Configuring the LLM provider")?);

    Ok(Planner::new(db, index, llm)
        .with_strategy(config.planner.strategy)
        .with_top_k(config.search.top_k))
}

async fn seed(config: &Config, file: &Path) -> Result<()> {
    let batch = read_seed_file(file)?;
    let index = open_index(&config.search)
        .await
        .context("Opening the note store")?;
    let stored = index
        .add_documents(&batch.texts, batch.metadatas.as_deref())
        .await?;

    info!(stored, collection = %config.search.collection, "Seeded semantic store");
    println!(
        "Stored {} notes in {}",
        stored,
        config.search.store_path().display()
    );
    Ok(())
}
