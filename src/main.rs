//! sitesage CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use sitesage::{
    answer::{stream_answer, ChatCompletionsGenerator},
    config::Config,
    embed::create_embedder,
    error::{Error, Result},
    ingest::Ingestor,
    meta::MetadataStore,
    retrieve::{user_message, Retrieved, Retriever},
    store::QdrantIndex,
};
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "sitesage")]
#[command(version, about = "Ingest a website into a vector index and ask questions about it", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the vector index from the site's sitemap
    Ingest {
        /// Sitemap URL (overrides the configured one)
        #[arg(long)]
        sitemap: Option<String>,
    },

    /// Retrieve the most relevant passages for a query
    Query {
        /// The search query
        query: String,

        /// Number of passages to retrieve
        #[arg(short = 'k', long)]
        limit: Option<usize>,
    },

    /// Ask a question and stream the generated answer
    Ask {
        /// The question
        question: String,

        /// Number of passages to ground the answer on
        #[arg(short = 'k', long)]
        limit: Option<usize>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Ingest { sitemap } => {
            let mut config = Config::load(cli.config.as_deref())?;
            if let Some(sitemap) = sitemap {
                config.sitemap_url = sitemap;
            }
            cmd_ingest(&config).await
        }
        Commands::Query { query, limit } => {
            let config = Config::load(cli.config.as_deref())?;
            cmd_query(&config, &query, limit).await
        }
        Commands::Ask { question, limit } => {
            let config = Config::load(cli.config.as_deref())?;
            cmd_ask(&config, &question, limit).await
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
    }
}

async fn cmd_ingest(config: &Config) -> Result<()> {
    if config.sitemap_url.trim().is_empty() {
        return Err(Error::Config(
            "No sitemap URL: set sitemap_url in the config or pass --sitemap".to_string(),
        ));
    }

    let embedder = create_embedder(&config.embedding.document, &config.embedding)?;
    let index = QdrantIndex::connect(config)?;

    let metadata = MetadataStore::from_config(&config.metadata);
    if let Some(meta) = &metadata {
        if let Err(e) = meta.ensure_schema().await {
            warn!("Metadata store unavailable, continuing without it: {}", e);
        }
    }

    let ingestor = Ingestor::new(config, embedder.as_ref(), &index, metadata.as_ref());
    let summary = ingestor.run().await?;

    let elapsed = summary.finished_at - summary.started_at;
    println!(
        "Ingestion complete: {} chunks stored across {} pages in {:.1}s ({} pages skipped, {} chunks failed)",
        summary.chunks_stored(),
        summary.pages_ingested(),
        elapsed.num_milliseconds() as f64 / 1000.0,
        summary.pages_skipped(),
        summary.chunks_failed(),
    );
    Ok(())
}

async fn cmd_query(config: &Config, query: &str, limit: Option<usize>) -> Result<()> {
    if query.trim().is_empty() {
        println!("Please enter a non-empty query.");
        return Ok(());
    }

    let embedder = create_embedder(&config.embedding.query, &config.embedding)?;
    let index = QdrantIndex::connect(config)?;
    let retriever = Retriever::new(embedder.as_ref(), &index, config.query.default_k);

    match retriever.retrieve(query, limit).await {
        Ok(retrieved) => print_passages(query, &retrieved),
        Err(e) => println!("{}", user_message(&e)),
    }
    Ok(())
}

async fn cmd_ask(config: &Config, question: &str, limit: Option<usize>) -> Result<()> {
    if question.trim().is_empty() {
        println!("Please ask a question about the site!");
        return Ok(());
    }

    let embedder = create_embedder(&config.embedding.query, &config.embedding)?;
    let index = QdrantIndex::connect(config)?;
    let retriever = Retriever::new(embedder.as_ref(), &index, config.query.default_k);

    let retrieved = match retriever.retrieve(question, limit).await {
        Ok(retrieved) => retrieved,
        Err(e) => {
            println!("{}", user_message(&e));
            return Ok(());
        }
    };

    let generator = Arc::new(ChatCompletionsGenerator::new(&config.answer)?);
    let mut rx = stream_answer(generator, retrieved, question.to_string());

    let mut stdout = std::io::stdout();
    while let Some(fragment) = rx.recv().await {
        print!("{}", fragment);
        stdout.flush()?;
    }
    println!();
    Ok(())
}

fn print_passages(query: &str, retrieved: &Retrieved) {
    println!("\nQuery: {}\n", query);
    println!("Found {} passages:\n", retrieved.passages.len());

    for (i, passage) in retrieved.passages.iter().enumerate() {
        println!("{}. [score: {:.3}] {}", i + 1, passage.score, passage.url);

        let preview: String = passage.text.chars().take(200).collect();
        let suffix = if passage.text.chars().count() > 200 {
            "..."
        } else {
            ""
        };
        println!("   {}{}\n", preview.replace('\n', " "), suffix);
    }
}
