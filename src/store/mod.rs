//! In-memory knowledge store with nearest-neighbor vector search.
//!
//! The corpus is small and static: every snippet is embedded once at ingest
//! time and held in memory in insertion order. The store is read-only during
//! serving, so concurrent conversations can share it behind an `Arc`.

pub mod ingest;

use std::path::Path;

use tracing::debug;
use tracing::info;

use crate::errors::IndoRagError;
use crate::errors::Result;
use crate::models::Candidate;
use crate::models::EmbeddedCorpus;
use crate::models::KnowledgeSnippet;

/// Vector store over the embedded knowledge corpus.
#[derive(Debug)]
pub struct KnowledgeStore {
    snippets: Vec<KnowledgeSnippet>,
    embedding_model: String,
    dimension: usize,
}

impl KnowledgeStore {
    /// Build a store from an embedded corpus, checking that the corpus was
    /// embedded with the configured model. A mismatch would silently degrade
    /// retrieval accuracy, so it is fatal here rather than detectable later.
    pub fn from_corpus(corpus: EmbeddedCorpus, configured_model: &str) -> Result<Self> {
        if corpus.embedding_model != configured_model {
            return Err(IndoRagError::ConfigMismatch {
                corpus: corpus.embedding_model,
                configured: configured_model.to_string(),
            });
        }

        for snippet in &corpus.snippets {
            if snippet.embedding.len() != corpus.dimension {
                return Err(IndoRagError::Embedding(format!(
                    "snippet {} has dimension {}, corpus declares {}",
                    snippet.record.id,
                    snippet.embedding.len(),
                    corpus.dimension
                )));
            }
        }

        info!(
            "Loaded knowledge store: {} snippets, model {}, dimension {}",
            corpus.snippets.len(),
            corpus.embedding_model,
            corpus.dimension
        );

        Ok(Self {
            snippets: corpus.snippets,
            embedding_model: corpus.embedding_model,
            dimension: corpus.dimension,
        })
    }

    /// Load the embedded corpus file produced by [`ingest`](crate::store::ingest).
    pub fn load<P: AsRef<Path>>(path: P, configured_model: &str) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            IndoRagError::RetrievalUnavailable(format!(
                "cannot read embedded corpus {}: {e}. Run `indorag ingest` first.",
                path.as_ref().display()
            ))
        })?;
        let corpus: EmbeddedCorpus = serde_json::from_str(&content)?;
        Self::from_corpus(corpus, configured_model)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    #[must_use]
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// Nearest-neighbor search by cosine similarity.
    ///
    /// Returns candidates sorted by descending similarity with 1-based ranks.
    /// Ties keep corpus insertion order (stable sort), so results are
    /// reproducible. An empty store is an error: the caller must be able to
    /// distinguish "store down" from "no relevant results".
    pub fn search(&self, query_vector: &[f32], top_n: usize) -> Result<Vec<Candidate>> {
        if self.snippets.is_empty() {
            return Err(IndoRagError::RetrievalUnavailable(
                "knowledge store is empty".to_string(),
            ));
        }
        if query_vector.len() != self.dimension {
            return Err(IndoRagError::Embedding(format!(
                "query vector has dimension {}, corpus expects {}",
                query_vector.len(),
                self.dimension
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .snippets
            .iter()
            .enumerate()
            .map(|(idx, snippet)| (idx, cosine_similarity(query_vector, &snippet.embedding)))
            .collect();

        // Stable sort keeps insertion order on ties
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_n);

        debug!("Vector search returned {} candidates", scored.len());

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(pos, (idx, score))| {
                Candidate::from_snippet(&self.snippets[idx], score, pos as u32 + 1)
            })
            .collect())
    }
}

/// Cosine similarity between two equal-length vectors.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::KnowledgeRecord;

    fn snippet(id: u32, embedding: Vec<f32>) -> KnowledgeSnippet {
        KnowledgeSnippet {
            record: KnowledgeRecord {
                id,
                topic: "Transport".to_string(),
                title: format!("Snippet {id}"),
                content: "content".to_string(),
                source: "test".to_string(),
            },
            embedding,
        }
    }

    fn store(snippets: Vec<KnowledgeSnippet>) -> KnowledgeStore {
        KnowledgeStore::from_corpus(
            EmbeddedCorpus {
                embedding_model: "test-model".to_string(),
                dimension: 3,
                snippets,
            },
            "test-model",
        )
        .unwrap()
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_search_orders_by_descending_similarity() {
        let store = store(vec![
            snippet(1, vec![0.0, 1.0, 0.0]),
            snippet(2, vec![1.0, 0.0, 0.0]),
            snippet(3, vec![0.7, 0.7, 0.0]),
        ]);

        let results = store.search(&[1.0, 0.0, 0.0], 10).unwrap();
        let ids: Vec<u32> = results.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert_eq!(
            results.iter().map(|c| c.rank).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn test_search_ties_keep_insertion_order() {
        let store = store(vec![
            snippet(10, vec![1.0, 0.0, 0.0]),
            snippet(11, vec![2.0, 0.0, 0.0]), // same direction, same cosine
            snippet(12, vec![0.0, 1.0, 0.0]),
        ]);

        let results = store.search(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(results[0].id, 10);
        assert_eq!(results[1].id, 11);
    }

    #[test]
    fn test_search_truncates_to_top_n() {
        let store = store(vec![
            snippet(1, vec![1.0, 0.0, 0.0]),
            snippet(2, vec![0.9, 0.1, 0.0]),
            snippet(3, vec![0.8, 0.2, 0.0]),
        ]);
        let results = store.search(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_empty_store_is_unavailable() {
        let store = store(vec![]);
        let err = store.search(&[1.0, 0.0, 0.0], 10).unwrap_err();
        assert!(matches!(err, IndoRagError::RetrievalUnavailable(_)));
    }

    #[test]
    fn test_model_mismatch_is_fatal() {
        let corpus = EmbeddedCorpus {
            embedding_model: "model-a".to_string(),
            dimension: 3,
            snippets: vec![snippet(1, vec![1.0, 0.0, 0.0])],
        };
        let err = KnowledgeStore::from_corpus(corpus, "model-b").unwrap_err();
        assert!(matches!(err, IndoRagError::ConfigMismatch { .. }));
    }

    #[test]
    fn test_dimension_mismatch_rejected_at_query_time() {
        let store = store(vec![snippet(1, vec![1.0, 0.0, 0.0])]);
        let err = store.search(&[1.0, 0.0], 10).unwrap_err();
        assert!(matches!(err, IndoRagError::Embedding(_)));
    }
}
