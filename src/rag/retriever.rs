//! Retrieval module: query embedding plus vector search.

use std::sync::Arc;

use tracing::debug;

use crate::embeddings::EmbeddingClient;
use crate::errors::Result;
use crate::models::Candidate;
use crate::store::KnowledgeStore;

/// Retriever issuing top-N vector queries against the knowledge store.
///
/// Pure with respect to the corpus: retrieval reads the store, never writes.
/// The query is embedded with the same model the corpus was ingested with;
/// the store enforces that at load time.
pub struct Retriever {
    store: Arc<KnowledgeStore>,
    embeddings: Arc<EmbeddingClient>,
    top_n: usize,
}

impl Retriever {
    /// Create a new retriever
    pub fn new(store: Arc<KnowledgeStore>, embeddings: Arc<EmbeddingClient>, top_n: usize) -> Self {
        Self {
            store,
            embeddings,
            top_n,
        }
    }

    /// Retrieve the top-N candidates for a query, in descending similarity
    /// order with ranks 1..=N.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<Candidate>> {
        debug!("Retrieving candidates for query: {}", query);
        let query_embedding = self.embeddings.generate(query).await?;
        self.store.search(&query_embedding, self.top_n)
    }

    #[must_use]
    pub fn top_n(&self) -> usize {
        self.top_n
    }
}
