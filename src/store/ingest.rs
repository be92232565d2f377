//! Corpus ingest: embed the raw knowledge base and persist it with its
//! embedding-model identifier.

use std::path::Path;

use tracing::info;

use crate::embeddings::EmbeddingClient;
use crate::errors::IndoRagError;
use crate::errors::Result;
use crate::models::EmbeddedCorpus;
use crate::models::KnowledgeRecord;
use crate::models::KnowledgeSnippet;

/// Load the raw knowledge-base file (an ordered JSON array of records).
pub fn load_records<P: AsRef<Path>>(path: P) -> Result<Vec<KnowledgeRecord>> {
    let content = std::fs::read_to_string(path)?;
    let records: Vec<KnowledgeRecord> = serde_json::from_str(&content)?;
    Ok(records)
}

/// Embed every record in one batch call and assemble the corpus artifact.
///
/// The client's model identifier is stored alongside the vectors so the
/// store can refuse to serve queries embedded with a different model.
pub async fn embed_corpus(
    records: Vec<KnowledgeRecord>,
    client: &EmbeddingClient,
    expected_dimension: usize,
) -> Result<EmbeddedCorpus> {
    if records.is_empty() {
        return Err(IndoRagError::Config(
            "knowledge base file contains no records".to_string(),
        ));
    }

    info!("Embedding {} knowledge records...", records.len());

    let texts: Vec<String> = records.iter().map(KnowledgeRecord::embedding_text).collect();
    let embeddings = client
        .generate_batch(texts.iter().map(String::as_str).collect())
        .await?;

    if embeddings.len() != records.len() {
        return Err(IndoRagError::Embedding(format!(
            "provider returned {} embeddings for {} records",
            embeddings.len(),
            records.len()
        )));
    }

    let snippets: Vec<KnowledgeSnippet> = records
        .into_iter()
        .zip(embeddings)
        .map(|(record, embedding)| KnowledgeSnippet { record, embedding })
        .collect();

    for snippet in &snippets {
        if snippet.embedding.len() != expected_dimension {
            return Err(IndoRagError::Embedding(format!(
                "record {} embedded with dimension {}, expected {}",
                snippet.record.id,
                snippet.embedding.len(),
                expected_dimension
            )));
        }
    }

    Ok(EmbeddedCorpus {
        embedding_model: client.model().to_string(),
        dimension: expected_dimension,
        snippets,
    })
}

/// Write the embedded corpus next to the raw knowledge base.
pub fn save_corpus<P: AsRef<Path>>(corpus: &EmbeddedCorpus, path: P) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string(corpus)?;
    std::fs::write(&path, json)?;
    info!(
        "Saved embedded corpus ({} snippets) to {}",
        corpus.snippets.len(),
        path.as_ref().display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_records_parses_corpus_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kb.json");
        std::fs::write(
            &path,
            r#"[
                {"id": 1, "topic": "Food", "title": "Nasi goreng",
                 "content": "Fried rice, found everywhere.", "source": "guidebook"},
                {"id": 2, "topic": "Visas", "title": "Visa on arrival",
                 "content": "Available at major airports.", "source": "imigrasi.go.id"}
            ]"#,
        )
        .unwrap();

        let records = load_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 1);
        assert_eq!(records[1].topic, "Visas");
    }

    #[test]
    fn test_save_corpus_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kb.embedded.json");

        let corpus = EmbeddedCorpus {
            embedding_model: "test-model".to_string(),
            dimension: 2,
            snippets: vec![KnowledgeSnippet {
                record: KnowledgeRecord {
                    id: 1,
                    topic: "Food".to_string(),
                    title: "Nasi goreng".to_string(),
                    content: "Fried rice.".to_string(),
                    source: "guidebook".to_string(),
                },
                embedding: vec![0.5, 0.5],
            }],
        };

        save_corpus(&corpus, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let back: EmbeddedCorpus = serde_json::from_str(&content).unwrap();
        assert_eq!(back.embedding_model, "test-model");
        assert_eq!(back.snippets.len(), 1);
        assert_eq!(back.snippets[0].record.title, "Nasi goreng");
    }
}
