use casegen_context::{
    ChunkingKind, ChunkingPolicy, DEFAULT_MAX_CHUNK_LENGTH, RecursiveSplitter, policy_for,
};
use clap::Parser;
use serde::Serialize;
use std::fs;
use std::io::{self, Read};

/// Split a document into retrieval chunks and print them as JSON.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input text file. If not provided, reads from stdin.
    #[arg(short, long)]
    input: Option<String>,

    /// Chunking policy to apply.
    #[arg(short, long, value_enum, default_value_t = ChunkingKind::FeatureBlocks)]
    kind: ChunkingKind,

    /// Maximum length for each chunk (recursive policy only).
    #[arg(short, long, default_value_t = DEFAULT_MAX_CHUNK_LENGTH)]
    max_chunk_length: usize,

    /// Comma-separated regex delimiters for the recursive policy.
    #[arg(short, long, value_delimiter = ',')]
    delimiters: Option<Vec<String>>,
}

#[derive(Serialize)]
struct ChunkOutput<'a> {
    policy: &'a str,
    sequence: usize,
    length: usize,
    text: &'a str,
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    let document = match &args.input {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let policy: Box<dyn ChunkingPolicy> = match (&args.kind, &args.delimiters) {
        (ChunkingKind::Recursive, Some(patterns)) => {
            let refs: Vec<&str> = patterns.iter().map(String::as_str).collect();
            Box::new(RecursiveSplitter::new(&refs, args.max_chunk_length).map_err(io::Error::other)?)
        }
        (kind, _) => policy_for(*kind, args.max_chunk_length).map_err(io::Error::other)?,
    };

    let chunks = policy.split(&document);
    let output: Vec<ChunkOutput> = chunks
        .iter()
        .map(|c| ChunkOutput {
            policy: policy.name(),
            sequence: c.sequence,
            length: c.text.len(),
            text: &c.text,
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
