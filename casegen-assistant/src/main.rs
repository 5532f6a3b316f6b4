use casegen_assistant::{AssistantConfig, run_stdio};
use casegen_context::ChunkingKind;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Test case generation assistant speaking line-delimited JSON on stdio.
///
/// Each input line is a command such as
/// `{"command": "load_specification", "user_id": "u1", "doc_link": "spec.txt"}`.
#[derive(Parser, Debug)]
#[command(name = "casegen-assistant", version, about, long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory relative document links are resolved against
    #[arg(short, long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// How documents are split before indexing
    #[arg(long, value_enum)]
    chunking: Option<ChunkingKind>,

    /// Idle seconds before a session is dropped
    #[arg(long)]
    ttl_secs: Option<u64>,
}

impl Args {
    fn into_config(self) -> anyhow::Result<AssistantConfig> {
        let mut config = match &self.config {
            Some(path) => AssistantConfig::load(path)?,
            None => AssistantConfig::default(),
        };
        if let Some(root) = self.root {
            config.documents_root = Some(root);
        }
        if let Some(chunking) = self.chunking {
            config.retriever.ingestion.chunking = chunking;
        }
        if let Some(ttl_secs) = self.ttl_secs {
            config.session.ttl_secs = ttl_secs;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = Args::parse().into_config()?;
    run_stdio(config).await
}
