use casegen_retriever::{
    config::CasegenConfig,
    retrieval::{IngestReport, Retriever},
    storage::collection::CollectionStats,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// Ingest documents into an in-memory index and query it.
///
/// The index lives for one invocation only, so each command first ingests
/// the documents given with `--doc`.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Owner of the ingested documents and of the query
    #[arg(short, long, default_value = "cli")]
    user: String,

    /// Documents to ingest, as COLLECTION=PATH (repeatable)
    #[arg(short, long = "doc", value_parser = parse_document)]
    docs: Vec<(String, PathBuf)>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find stored chunks similar to a query
    Query {
        /// Collection to search
        #[arg(long, default_value = "specification")]
        collection: String,
        /// Query text
        query: String,
        /// Override the configured distance threshold
        #[arg(short, long)]
        threshold: Option<f32>,
        /// Override the configured result cap
        #[arg(short, long)]
        max_results: Option<usize>,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Show per-collection statistics after ingestion
    Stats {
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum OutputFormat {
    Summary,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" => Ok(OutputFormat::Summary),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {s}")),
        }
    }
}

fn parse_document(s: &str) -> Result<(String, PathBuf), String> {
    match s.split_once('=') {
        Some((collection, path)) if !collection.is_empty() && !path.is_empty() => {
            Ok((collection.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected COLLECTION=PATH, got '{s}'")),
    }
}

#[derive(Serialize)]
struct QueryOutput<'a> {
    collection: &'a str,
    query: &'a str,
    distance_threshold: f32,
    results: Vec<casegen_retriever::retrieval::ScoredChunk>,
}

#[derive(Serialize)]
struct StatsOutput {
    ingested: Vec<IngestReport>,
    collections: Vec<CollectionStats>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => CasegenConfig::load(path)?,
        None => CasegenConfig::default(),
    };
    if let Commands::Query {
        threshold,
        max_results,
        ..
    } = &args.command
    {
        if let Some(threshold) = threshold {
            config.retrieval.distance_threshold = *threshold;
        }
        if max_results.is_some() {
            config.retrieval.max_results = *max_results;
        }
        config.validate()?;
    }

    let retriever = Retriever::from_config(&config)?;
    let mut reports = Vec::new();
    for (collection, path) in &args.docs {
        let document = tokio::fs::read_to_string(path).await?;
        reports.push(
            retriever
                .ingestion
                .ingest(&args.user, collection, &document)
                .await?,
        );
    }

    match args.command {
        Commands::Query {
            collection,
            query,
            format,
            ..
        } => {
            let results = retriever
                .engine
                .find_similar_scored(&query, &collection, &args.user)
                .await?;

            match format {
                OutputFormat::Json => {
                    let output = QueryOutput {
                        collection: &collection,
                        query: &query,
                        distance_threshold: config.retrieval.distance_threshold,
                        results,
                    };
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Summary => {
                    println!("Found {} matching chunks:", results.len());
                    for result in results {
                        println!("Distance: {:.4}", result.distance);
                        println!("Chunk ID: {}", result.chunk_id);
                        println!("Content:\n{}", result.text);
                        println!("---");
                    }
                }
            }
        }
        Commands::Stats { format } => {
            let output = StatsOutput {
                ingested: reports,
                collections: retriever.db.all_stats().await,
            };

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
                OutputFormat::Summary => {
                    println!("Ingested documents:");
                    for report in &output.ingested {
                        println!(
                            "  {} -> {} chunks (blake3 {})",
                            report.collection,
                            report.chunk_count(),
                            &report.fingerprint[..12]
                        );
                    }
                    println!("Collections:");
                    for stats in &output.collections {
                        println!(
                            "  {}: {} vectors ({} live), {} chunks, dimension {}",
                            stats.name,
                            stats.vectors,
                            stats.live_vectors,
                            stats.chunks,
                            stats
                                .dimension
                                .map(|d| d.to_string())
                                .unwrap_or_else(|| "-".to_string())
                        );
                    }
                }
            }
        }
    }

    Ok(())
}
