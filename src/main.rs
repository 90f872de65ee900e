//! # juris CLI
//!
//! ```bash
//! juris --config ./config/juris.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `juris index` | Scan the corpus and report what was indexed |
//! | `juris search "<query>"` | Ranked documents for a query |
//! | `juris context "<query>"` | The context block the model would receive |
//! | `juris detect "<text>"` | Detected language of a text |
//! | `juris chat <id> "<message>"` | One chat turn against the configured backend |
//! | `juris serve` | Start the HTTP server |
//!
//! The index lives in memory, so every retrieval command indexes the corpus
//! first. The API key for `chat` and `serve` is read from the environment
//! variable named in `[backend].api_key_env`; a `.env` file is honoured.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use juris_context::assistant::{build_detector, Assistant};
use juris_context::backend::OpenAiCompatibleBackend;
use juris_context::config::{self, Config};
use juris_context::engine::ContextEngine;
use juris_context::{server, telemetry};
use juris_context_core::language::DetectionStrategy;

/// juris: a retrieval-augmented legal assistant.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/juris.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "juris",
    about = "juris: a retrieval-augmented legal assistant over a local document corpus",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/juris.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the corpus directory and build the index.
    ///
    /// Reports how many documents were indexed. Files that cannot be
    /// extracted are skipped with a warning.
    Index,

    /// Search the corpus.
    Search {
        query: String,

        /// Maximum number of results (defaults to `[retrieval].top_k`).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print the assembled context for a query.
    Context {
        query: String,

        /// Character budget (defaults to `[retrieval].max_context_chars`).
        #[arg(long)]
        max_chars: Option<usize>,
    },

    /// Detect the language of a text.
    Detect {
        text: String,

        /// Detection strategy: `script` or `markers` (defaults to `[language].strategy`).
        #[arg(long)]
        strategy: Option<String>,
    },

    /// Send one message and print the reply.
    Chat {
        conversation_id: String,
        message: String,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init("info");

    let cli = Cli::parse();

    // `detect` works without a config file; every other command needs one.
    let loaded = config::load_config(&cli.config);

    match cli.command {
        Commands::Detect { text, strategy } => {
            run_detect(&loaded.unwrap_or_default(), &text, strategy.as_deref())?
        }
        Commands::Index => run_index(&loaded?)?,
        Commands::Search { query, limit } => run_search(&loaded?, &query, limit)?,
        Commands::Context { query, max_chars } => run_context(&loaded?, &query, max_chars)?,
        Commands::Chat {
            conversation_id,
            message,
        } => run_chat(&loaded?, &conversation_id, &message).await?,
        Commands::Serve => {
            let cfg = loaded?;
            let backend = Arc::new(OpenAiCompatibleBackend::from_env(&cfg.backend)?);
            let assistant = Arc::new(Assistant::new(&cfg, backend)?);
            server::run_server(&cfg, assistant).await?;
        }
    }

    Ok(())
}

fn indexed_engine(cfg: &Config) -> Result<ContextEngine> {
    let engine = ContextEngine::new(cfg);
    engine.reindex()?;
    Ok(engine)
}

fn run_index(cfg: &Config) -> Result<()> {
    let engine = ContextEngine::new(cfg);
    let count = engine.reindex()?;
    println!("index {}", cfg.corpus.root.display());
    println!("  documents indexed: {}", count);
    if let Some(snapshot) = engine.index().snapshot() {
        println!("  vocabulary terms: {}", snapshot.vocabulary_len());
        for doc in snapshot.documents() {
            println!("  - {} ({} chars)", doc.id, doc.char_len);
        }
    }
    println!("ok");
    Ok(())
}

fn run_search(cfg: &Config, query: &str, limit: Option<usize>) -> Result<()> {
    if limit == Some(0) {
        bail!("--limit must be >= 1");
    }
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let engine = indexed_engine(cfg)?;
    let results = engine.search(query, limit);
    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        let excerpt: String = result.excerpt.chars().take(200).collect();
        println!("{}. [{:.2}] {}", i + 1, result.score, result.label);
        println!("    source: {}", result.source);
        println!("    excerpt: \"{}\"", excerpt.replace('\n', " ").trim());
        println!();
    }
    Ok(())
}

fn run_context(cfg: &Config, query: &str, max_chars: Option<usize>) -> Result<()> {
    let engine = indexed_engine(cfg)?;
    let budget = max_chars.unwrap_or_else(|| engine.max_context_chars());
    let context = engine.retrieve_context(query, budget);
    if context.is_empty() {
        println!("No context.");
    } else {
        println!("{}", context);
    }
    Ok(())
}

fn run_detect(cfg: &Config, text: &str, strategy: Option<&str>) -> Result<()> {
    let mut language = cfg.language.clone();
    if let Some(strategy) = strategy {
        let parsed: DetectionStrategy = strategy.parse().map_err(anyhow::Error::msg)?;
        language.strategy = parsed.to_string();
    }
    let detector = build_detector(&language)?;
    println!("{}", detector.detect(text));
    Ok(())
}

async fn run_chat(cfg: &Config, conversation_id: &str, message: &str) -> Result<()> {
    let backend = Arc::new(OpenAiCompatibleBackend::from_env(&cfg.backend)?);
    let assistant = Assistant::new(cfg, backend)?;
    assistant.reindex()?;

    let reply = assistant.chat(conversation_id, message).await?;
    println!("{}", reply.response);
    if !reply.sources.is_empty() {
        println!();
        println!("sources: {}", reply.sources.join(", "));
    }
    Ok(())
}
