//! Integration-style tests that exercise several modules together without
//! any network access.


use crate::models::EmbeddedCorpus;
use crate::models::KnowledgeRecord;
use crate::models::KnowledgeSnippet;
use crate::store::KnowledgeStore;

/// Test helper: a small embedded corpus with hand-placed unit vectors so
/// cosine ordering is obvious by construction.
pub fn sample_corpus() -> EmbeddedCorpus {
    let records = [
        (1, "Visas", "Visa on arrival", vec![1.0, 0.0, 0.0]),
        (2, "Food", "Nasi goreng", vec![0.0, 1.0, 0.0]),
        (3, "Transport", "Trains on Java", vec![0.0, 0.0, 1.0]),
        (4, "Visas", "Visa extension", vec![0.9, 0.1, 0.0]),
    ];

    EmbeddedCorpus {
        embedding_model: "test-model".to_string(),
        dimension: 3,
        snippets: records
            .into_iter()
            .map(|(id, topic, title, embedding)| KnowledgeSnippet {
                record: KnowledgeRecord {
                    id,
                    topic: topic.to_string(),
                    title: title.to_string(),
                    content: format!("Details about {}.", title.to_lowercase()),
                    source: "test".to_string(),
                },
                embedding,
            })
            .collect(),
    }
}

/// Test helper: a store over [`sample_corpus`].
pub fn sample_store() -> KnowledgeStore {
    KnowledgeStore::from_corpus(sample_corpus(), "test-model")
        .unwrap_or_else(|e| panic!("sample corpus must load: {e}"))
}
