//! IndoRAG: a retrieval-augmented travel assistant for Indonesia with a
//! batch replay and evaluation harness.
//!
//! The pipeline answers each user turn in three stages: vector retrieval
//! over an embedded knowledge base, reranking down to a short candidate
//! list, and grounded answer generation. The `replay` and `eval` modules
//! drive scripted test dialogues through the same pipeline and score the
//! results with ranking metrics and an LLM judge.

pub mod cli;
pub mod config;
pub mod embeddings;
pub mod errors;
pub mod eval;
pub mod llm;
pub mod logging;
pub mod models;
pub mod rag;
pub mod replay;
pub mod retry;
pub mod store;

#[cfg(test)]
pub mod tests;

pub use config::AppConfig;
pub use errors::*;
