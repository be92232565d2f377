//! CLI command handlers module
//!
//! This module is organized by functional domains:
//! - ingest: Knowledge-base embedding and corpus persistence
//! - ask: One-shot questions through the full pipeline
//! - replay: Batch replay of scripted test dialogues
//! - eval: Retrieval metrics and LLM-as-a-judge scoring
//! - info: Configuration display

pub mod ask;
pub mod eval;
pub mod info;
pub mod ingest;
pub mod replay;

// Re-export all public handlers
pub use ask::*;
pub use eval::*;
pub use info::*;
pub use ingest::*;
pub use replay::*;
