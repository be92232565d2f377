//! CLI output formatting utilities
//!
//! This module provides consistent output formatting for the `indorag` CLI

use crate::models::BatchResult;
use crate::models::Candidate;
use crate::models::DialogueTurn;
use crate::models::EvalSummary;
use crate::AppConfig;

/// Safely truncate a string at character boundary (not byte boundary)
///
/// This prevents panics when truncating strings with multi-byte UTF-8
/// characters (emojis, etc.)
#[must_use]
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        s.to_string()
    }
}

/// Print a candidate list with scores and ranks
pub fn print_candidates(label: &str, candidates: &[Candidate]) {
    println!("{label} ({} candidates):", candidates.len());
    for candidate in candidates {
        println!(
            "  {}. [{}] {} - {} (score: {:.4})",
            candidate.rank,
            candidate.id,
            candidate.topic,
            truncate_str(&candidate.title, 60),
            candidate.score
        );
    }
}

/// Print a completed dialogue turn
pub fn print_turn(turn: &DialogueTurn, detailed: bool) {
    if detailed {
        print_candidates("🔍 Retrieved", &turn.retrieved);
        println!();
        print_candidates("🎯 Reranked", &turn.reranked);
        if turn.rerank_fallback {
            print_warning("Reranker fell back to identity ordering for this turn");
        }
        println!();
    }

    match &turn.answer {
        Some(answer) => {
            println!("💬 Answer:");
            println!("{answer}");
        }
        None => {
            print_error(&format!(
                "Turn failed: {}",
                turn.error.as_deref().unwrap_or("unknown error")
            ));
        }
    }
}

/// Print a batch replay summary
pub fn print_batch_summary(batch: &BatchResult) {
    println!("📋 Batch Replay Summary");
    println!("=======================");
    println!("  Strategy: {}", batch.metadata.strategy.display_name());
    println!("  Persona: {}", batch.metadata.persona.display_name());
    println!("  Model: {}", batch.metadata.model);
    println!("  Dialogues: {}/{} succeeded", batch.succeeded, batch.attempted);

    let turns: usize = batch.dialogues.iter().map(|d| d.turns.len()).sum();
    let fallbacks: usize = batch
        .dialogues
        .iter()
        .flat_map(|d| &d.turns)
        .filter(|t| t.rerank_fallback)
        .count();
    println!("  Turns replayed: {turns}");
    if fallbacks > 0 {
        println!("  ⚠️  Rerank fallbacks: {fallbacks}");
    }
}

/// Print an evaluation summary
pub fn print_eval_summary(summary: &EvalSummary) {
    println!("📊 Evaluation Summary");
    println!("=====================");
    println!("  Source: {}", summary.metadata.source_file);
    println!("  Strategy: {}", summary.metadata.batch.strategy.display_name());
    println!("  Judge model: {}", summary.metadata.eval_model);

    println!();
    println!("🔍 Retrieval (k = {}):", summary.retrieval.k);
    println!("  Recall@{}: {:.4}", summary.retrieval.k, summary.retrieval.mean_recall_at_k);
    println!("  MRR: {:.4}", summary.retrieval.mean_mrr);
    println!("  NDCG@{}: {:.4}", summary.retrieval.k, summary.retrieval.mean_ndcg_at_k);
    println!(
        "  Turns: {} scored, {} excluded (no ground truth)",
        summary.retrieval.scored_turns, summary.retrieval.excluded_turns
    );

    println!();
    println!("💬 Generation quality (1-5 scale):");
    for (metric, aggregate) in &summary.generation_quality {
        let exclusions = if aggregate.excluded > 0 {
            format!(", {} excluded", aggregate.excluded)
        } else {
            String::new()
        };
        println!(
            "  {metric}: {:.2} ({} rated{exclusions})",
            aggregate.mean, aggregate.rated
        );
    }
}

/// Print configuration
pub fn print_config(config: &AppConfig) {
    println!("📋 IndoRAG Configuration:");
    println!();

    println!("📝 Logging:");
    println!("  Level: {}", config.logging.level);
    println!("  File output: {}", config.logging.file_output);
    println!();

    println!("🧠 Embeddings:");
    println!("  Endpoint: {}", config.embeddings.endpoint);
    println!("  Model: {}", config.embedding_model());
    println!("  Dimension: {}", config.embedding_dimension());
    println!();

    println!("🤖 LLM:");
    println!("  Endpoint: {}", config.llm_endpoint());
    println!("  Model: {}", config.llm_model());
    println!();

    println!("🎯 Retrieval:");
    println!("  Top-N (vector search): {}", config.retrieval.top_n);
    println!("  Top-K (after rerank): {}", config.retrieval.top_k);
    println!("  Strategy: {}", config.reranker.strategy.display_name());
    if config.reranker.strategy == crate::models::RagStrategy::CrossEncoder {
        println!("  Cross-encoder endpoint: {}", config.reranker.cross_encoder_endpoint);
        println!("  Cross-encoder model: {}", config.reranker.cross_encoder_model);
    }
    if config.reranker.strategy == crate::models::RagStrategy::Llm {
        println!("  Reranker model: {}", config.reranker.llm_model);
    }
    println!();

    println!("⚖️  Judge:");
    println!("  Model: {}", config.judge.model);
    println!();

    println!("🔁 Replay:");
    println!("  Concurrency: {}", config.replay.concurrency);
    println!("  Dialogues file: {}", config.paths.dialogues_file.display());
    println!();

    println!("👤 Persona: {}", config.persona.display_name());
}

/// Print colored output functions
pub fn print_info(msg: &str) {
    println!("ℹ️  {msg}");
}

pub fn print_success(msg: &str) {
    println!("✅ {msg}");
}

pub fn print_warning(msg: &str) {
    println!("⚠️  {msg}");
}

pub fn print_error(msg: &str) {
    println!("❌ {msg}");
}
