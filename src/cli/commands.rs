//! CLI command definitions and argument parsing

use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

use crate::models::Persona;
use crate::models::RagStrategy;

#[derive(Parser)]
#[command(name = "indorag")]
#[command(about = "Retrieval-augmented travel assistant for Indonesia with a batch evaluation harness")]
#[command(version)]
pub struct Cli {
    /// Enable verbose debug logging (default: info level)
    #[arg(short, long)]
    pub verbose: bool,

    /// Path to a configuration file (default: config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Embed the knowledge base and persist the embedded corpus
    Ingest {
        /// Re-embed even if an embedded corpus already exists
        #[arg(short, long)]
        force: bool,
    },
    /// Ask a single question through the full pipeline
    Ask {
        /// The question to answer
        question: String,
        /// Reranking strategy, overriding the configured one
        #[arg(short, long, value_enum)]
        strategy: Option<RagStrategy>,
        /// Assistant persona, overriding the configured one
        #[arg(short, long, value_enum)]
        persona: Option<Persona>,
        /// Show the retrieved and reranked candidates
        #[arg(short, long)]
        detailed: bool,
    },
    /// Replay scripted test dialogues and persist the batch results
    Replay {
        /// Dialogues file, overriding the configured one
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Reranking strategy, overriding the configured one
        #[arg(short, long, value_enum)]
        strategy: Option<RagStrategy>,
        /// Assistant persona, overriding the configured one
        #[arg(short, long, value_enum)]
        persona: Option<Persona>,
        /// Number of dialogues replayed in parallel
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Evaluate a batch result file (retrieval metrics + LLM judge)
    Eval {
        /// Batch result file (default: the newest one in the results dir)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Show current configuration
    Config,
}
