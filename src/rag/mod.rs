//! RAG (Retrieval-Augmented Generation) module
//!
//! End-to-end pipeline for answering travel questions from the knowledge
//! corpus:
//! - Vector retrieval of candidate snippets
//! - Candidate reranking (identity, cross-encoder, or LLM)
//! - Context assembly from the reranked shortlist
//! - LLM-based answer generation
//!
//! # Examples
//!
//! ```rust,no_run
//! use indorag::config::AppConfig;
//! use indorag::models::Conversation;
//! use indorag::rag::RagService;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let service = RagService::new(&config)?;
//!
//!     let mut conversation = Conversation::new(config.persona, config.reranker.strategy);
//!     let turn = service.answer(&mut conversation, "Do I need a visa for Bali?").await;
//!     println!("Answer: {}", turn.answer.as_deref().unwrap_or("<failed>"));
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod pipeline;
pub mod rerank;
pub mod retriever;

pub use context::ContextAssembler;
pub use pipeline::RagService;
pub use rerank::CrossEncoderClient;
pub use rerank::LlmReranker;
pub use rerank::Reranker;
pub use retriever::Retriever;
