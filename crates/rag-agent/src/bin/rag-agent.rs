//! rag-agent command line
//!
//! Usage:
//!   rag-agent build                      # Index ./rag_data into ./vector_store
//!   rag-agent serve --port 8000          # Serve /query over HTTP
//!   rag-agent ask "How many vacation days?"

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rag_agent::{
    config::RagConfig, handler::AgentHandler, ingestion::IndexBuilder, providers::build_providers,
    server::RagServer,
};

#[derive(Parser)]
#[command(name = "rag-agent", version, about = "Retrieval-augmented Q&A over internal documents")]
struct Cli {
    /// TOML configuration file; environment variables override it
    #[arg(short, long, env = "RAG_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the vector index from the data directory (full rebuild)
    Build {
        /// Source documents directory
        #[arg(long)]
        data_path: Option<PathBuf>,
        /// Output index directory
        #[arg(long)]
        index_path: Option<PathBuf>,
        /// Chunk size in characters
        #[arg(long)]
        chunk_size: Option<usize>,
        /// Chunk overlap in characters
        #[arg(long)]
        chunk_overlap: Option<usize>,
    },
    /// Serve the query API over HTTP
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Answer one question, or read questions from stdin when none is given
    Ask {
        question: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "rag_agent=debug,tower_http=debug"
    } else {
        "rag_agent=info,tower_http=debug"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = RagConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Build {
            data_path,
            index_path,
            chunk_size,
            chunk_overlap,
        } => {
            if let Some(path) = data_path {
                config.paths.data_path = path;
            }
            if let Some(path) = index_path {
                config.paths.index_path = path;
            }
            if let Some(size) = chunk_size {
                config.chunking.chunk_size = size;
            }
            if let Some(overlap) = chunk_overlap {
                config.chunking.chunk_overlap = overlap;
            }
            config.validate()?;
            build(&config).await
        }
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config).await
        }
        Command::Ask { question } => ask(config, question).await,
    }
}

async fn build(config: &RagConfig) -> Result<()> {
    let providers = build_providers(config)?;
    let builder = IndexBuilder::from_config(config)?;

    let (_, summary) = builder
        .build_and_persist(providers.embedder.as_ref())
        .await
        .with_context(|| format!("Failed to build index from {}", config.paths.data_path.display()))?;

    println!("{}", summary);
    Ok(())
}

async fn serve(config: RagConfig) -> Result<()> {
    tracing::info!("Provider: {}", config.provider.as_str());
    tracing::info!("  - Data path: {}", config.paths.data_path.display());
    tracing::info!("  - Index path: {}", config.paths.index_path.display());
    tracing::info!("  - top_k: {}", config.retrieval.top_k);

    let handler = Arc::new(AgentHandler::from_config(config)?);

    // Refuse to serve without an index
    handler
        .warmup()
        .await
        .context("Vector index unavailable; run `rag-agent build` or set AUTO_BUILD_VECTOR_STORE=true")?;

    let server = RagServer::new(handler);
    println!("\nServer starting...");
    println!("  Query:  http://{}/query", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;
    Ok(())
}

async fn ask(config: RagConfig, question: Option<String>) -> Result<()> {
    let handler = AgentHandler::from_config(config)?;
    handler
        .warmup()
        .await
        .context("Vector index unavailable; run `rag-agent build` first")?;

    if let Some(question) = question {
        print_answer(&handler, &question).await?;
        return Ok(());
    }

    let stdin = std::io::stdin();
    loop {
        print!("Question: ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        print_answer(&handler, question).await?;
    }
    Ok(())
}

async fn print_answer(handler: &AgentHandler, question: &str) -> Result<()> {
    let envelope = handler.ask(question).await;
    let body = envelope.body_json()?;

    if !envelope.is_success() {
        println!("\nError: {}", body["error"].as_str().unwrap_or("unknown"));
        if let Some(details) = body["details"].as_str() {
            println!("Details: {}", details);
        }
        return Ok(());
    }

    println!("\nAnswer:\n{}", body["answer"].as_str().unwrap_or_default());
    if let Some(sources) = body["sources"].as_array().filter(|s| !s.is_empty()) {
        println!("\nSources:");
        for source in sources {
            println!("- {}", source["source"].as_str().unwrap_or_default());
        }
    }
    println!();
    Ok(())
}
