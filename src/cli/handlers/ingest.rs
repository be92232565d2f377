//! Corpus ingest handler

use crate::cli::output::print_info;
use crate::cli::output::print_success;
use crate::embeddings::EmbeddingClient;
use crate::store::ingest;
use crate::AppConfig;
use crate::Result;

/// Handle the ingest command: embed the raw knowledge base and persist the
/// embedded corpus together with the embedding-model identifier.
pub async fn handle_ingest_command(config: &AppConfig, force: bool) -> Result<()> {
    let target = &config.paths.embedded_corpus_file;
    if target.exists() && !force {
        print_info(&format!(
            "Embedded corpus already exists at {}. Use --force to re-embed.",
            target.display()
        ));
        return Ok(());
    }

    let records = ingest::load_records(&config.paths.corpus_file)?;
    print_info(&format!(
        "Embedding {} records with {}...",
        records.len(),
        config.embedding_model()
    ));

    let client = EmbeddingClient::from_config(config)?;
    let corpus = ingest::embed_corpus(records, &client, config.embedding_dimension()).await?;
    ingest::save_corpus(&corpus, target)?;

    print_success(&format!(
        "Embedded {} snippets into {}",
        corpus.snippets.len(),
        target.display()
    ));
    Ok(())
}
