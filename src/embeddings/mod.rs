//! Embedding generation for corpus ingest and live queries.

pub mod client;

pub use client::EmbeddingClient;
pub use client::EmbeddingProvider;
