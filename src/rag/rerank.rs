//! Candidate reranking strategies.
//!
//! One capability, three interchangeable strategies: identity passthrough,
//! cross-encoder pairwise scoring, and LLM-based ordering. The set is closed
//! and selected once per conversation via configuration, so the strategies
//! live in one enum rather than behind a plugin registry.

use std::collections::HashMap;

use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::cli::output::truncate_str;
use crate::config::AppConfig;
use crate::errors::IndoRagError;
use crate::errors::Result;
use crate::llm::LlmService;
use crate::llm::PromptLibrary;
use crate::llm::PromptTemplate;
use crate::models::Candidate;
use crate::models::RagStrategy;
use crate::retry::send_with_retry;

/// Re-assign 1-based rank positions after any reordering, keeping the
/// permutation invariant: ranks are always exactly 1..=len.
fn assign_ranks(candidates: &mut [Candidate]) {
    for (idx, candidate) in candidates.iter_mut().enumerate() {
        candidate.rank = idx as u32 + 1;
    }
}

/// Identity reranking: the first `top_k` candidates in retrieval order.
#[must_use]
pub fn identity_rerank(mut candidates: Vec<Candidate>, top_k: usize) -> Vec<Candidate> {
    candidates.truncate(top_k);
    assign_ranks(&mut candidates);
    candidates
}

/// Attach per-candidate relevance scores, sort by descending score and keep
/// the best `top_k` with ranks re-assigned. Ties keep the original retrieval
/// order (stable sort), so output is always a subset of the input.
fn apply_scores(mut candidates: Vec<Candidate>, scores: &[f32], top_k: usize) -> Vec<Candidate> {
    for (candidate, score) in candidates.iter_mut().zip(scores) {
        candidate.score = *score;
    }
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    candidates.truncate(top_k);
    assign_ranks(&mut candidates);
    candidates
}

/// The active reranking strategy for a conversation.
pub enum Reranker {
    /// Passthrough of retrieval order.
    Identity,
    /// Pairwise (query, document) scoring via a cross-encoder endpoint.
    CrossEncoder(CrossEncoderClient),
    /// LLM-ordered relevance ranking.
    Llm(LlmReranker),
}

impl Reranker {
    /// Build the configured strategy.
    pub fn from_config(config: &AppConfig, prompts: &PromptLibrary) -> Result<Self> {
        match config.reranker.strategy {
            RagStrategy::Identity => Ok(Self::Identity),
            RagStrategy::CrossEncoder => Ok(Self::CrossEncoder(CrossEncoderClient::new(
                config.reranker.cross_encoder_endpoint.clone(),
                config.reranker.cross_encoder_model.clone(),
            )?)),
            RagStrategy::Llm => {
                let llm = LlmService::from_config_with_model(config, &config.reranker.llm_model)?;
                Ok(Self::Llm(LlmReranker::new(llm, prompts)))
            }
        }
    }

    #[must_use]
    pub fn strategy(&self) -> RagStrategy {
        match self {
            Self::Identity => RagStrategy::Identity,
            Self::CrossEncoder(_) => RagStrategy::CrossEncoder,
            Self::Llm(_) => RagStrategy::Llm,
        }
    }

    /// Rank `candidates` by relevance to `query` and keep the best `top_k`.
    ///
    /// Output is always a subset of the input with ranks re-assigned 1..=len.
    /// Errors are recoverable at the call site: the orchestrator degrades to
    /// identity ranking rather than failing the turn.
    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<Candidate>,
        top_k: usize,
    ) -> Result<Vec<Candidate>> {
        match self {
            Self::Identity => Ok(identity_rerank(candidates, top_k)),
            Self::CrossEncoder(client) => client.rerank(query, candidates, top_k).await,
            Self::Llm(reranker) => reranker.rerank(query, candidates, top_k).await,
        }
    }
}

/// Client for a cross-encoder rerank endpoint (text-embeddings-inference
/// style `POST /rerank`).
pub struct CrossEncoderClient {
    client: Client,
    endpoint: String,
    model: String,
}

impl CrossEncoderClient {
    pub fn new(endpoint: String, model: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| IndoRagError::Http(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            model,
        })
    }

    /// Score every (query, text) pair. Scores come back in input order.
    ///
    /// All candidates are scored on every call: cross-encoder scores are not
    /// comparable across queries, so there is nothing to cache or shortcut.
    async fn score_pairs(&self, query: &str, texts: &[String]) -> Result<Vec<f32>> {
        #[derive(Serialize)]
        struct RerankRequest<'a> {
            query: &'a str,
            texts: &'a [String],
            raw_scores: bool,
        }

        #[derive(Deserialize)]
        struct RerankScore {
            index: usize,
            score: f32,
        }

        let url = format!("{}/rerank", self.endpoint);
        debug!(
            "Calling cross-encoder rerank: model={}, {} pairs",
            self.model,
            texts.len()
        );

        let request = RerankRequest {
            query,
            texts,
            raw_scores: true,
        };

        let response = send_with_retry("cross-encoder rerank", || {
            self.client
                .post(&url)
                .header("Content-Type", "application/json")
                .json(&request)
                .send()
        })
        .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(IndoRagError::Http(format!(
                "cross-encoder error ({status}): {error_text}"
            )));
        }

        let ranked: Vec<RerankScore> = response
            .json()
            .await
            .map_err(|e| IndoRagError::RerankParse(format!("invalid rerank response: {e}")))?;

        let mut scores = vec![None; texts.len()];
        for entry in ranked {
            match scores.get_mut(entry.index) {
                Some(slot) => *slot = Some(entry.score),
                None => {
                    return Err(IndoRagError::RerankParse(format!(
                        "rerank response references pair index {} out of {}",
                        entry.index,
                        texts.len()
                    )))
                }
            }
        }

        scores
            .into_iter()
            .enumerate()
            .map(|(idx, score)| {
                score.ok_or_else(|| {
                    IndoRagError::RerankParse(format!("rerank response missing score for pair {idx}"))
                })
            })
            .collect()
    }

    /// Score all candidates, sort by descending cross-encoder score and keep
    /// the top-k.
    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<Candidate>,
        top_k: usize,
    ) -> Result<Vec<Candidate>> {
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let texts: Vec<String> = candidates.iter().map(Candidate::text).collect();
        let scores = self.score_pairs(query, &texts).await?;
        Ok(apply_scores(candidates, &scores, top_k))
    }
}

/// LLM-based reranker: one prompt listing all candidates, the model answers
/// with the most relevant candidate ids in order.
///
/// This is the most failure-prone strategy, so parsing is strict: ids must
/// exist in the candidate set and duplicates are collapsed. Any parse
/// failure surfaces as `RerankParse` so the caller can fall back to identity
/// ranking and audit the fallback.
pub struct LlmReranker {
    llm: LlmService,
    system_prompt: String,
    user_template: PromptTemplate,
}

impl LlmReranker {
    pub fn new(llm: LlmService, prompts: &PromptLibrary) -> Self {
        Self {
            llm,
            system_prompt: prompts.get("llm_reranker_system"),
            user_template: prompts.template("llm_reranker_user"),
        }
    }

    /// Numbered document block for the rerank prompt. Content is truncated:
    /// the model only needs enough text to judge relevance.
    fn format_documents(candidates: &[Candidate]) -> String {
        let mut documents = String::new();
        for candidate in candidates {
            documents.push_str(&format!(
                "ID {}: {} - {}: {}\n\n",
                candidate.id,
                candidate.topic,
                candidate.title,
                truncate_str(&candidate.content, 200)
            ));
        }
        documents
    }

    /// Parse the model's output into an ordered list of candidate ids.
    ///
    /// Extracts every integer token, deduplicates preserving order, and
    /// validates each id against the candidate set. Unknown ids and empty
    /// output are `RerankParse` errors; fewer ids than requested is not (the
    /// caller keeps what was returned rather than padding with guesses).
    pub fn parse_ranked_ids(response: &str, candidates: &[Candidate]) -> Result<Vec<u32>> {
        let known: HashMap<u32, ()> = candidates.iter().map(|c| (c.id, ())).collect();

        let mut ids: Vec<u32> = Vec::new();
        let mut current = String::new();
        for ch in response.chars().chain(std::iter::once(' ')) {
            if ch.is_ascii_digit() {
                current.push(ch);
            } else if !current.is_empty() {
                let id: u32 = current.parse().map_err(|_| {
                    IndoRagError::RerankParse(format!("id token '{current}' out of range"))
                })?;
                current.clear();
                if ids.contains(&id) {
                    continue;
                }
                if !known.contains_key(&id) {
                    return Err(IndoRagError::RerankParse(format!(
                        "id {id} is not in the candidate set"
                    )));
                }
                ids.push(id);
            }
        }

        if ids.is_empty() {
            return Err(IndoRagError::RerankParse(
                "no candidate ids in reranker output".to_string(),
            ));
        }

        Ok(ids)
    }

    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<Candidate>,
        top_k: usize,
    ) -> Result<Vec<Candidate>> {
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let mut values = HashMap::new();
        values.insert("query".to_string(), query.to_string());
        values.insert(
            "documents".to_string(),
            Self::format_documents(&candidates),
        );
        values.insert("top_k".to_string(), top_k.to_string());
        let user_prompt = self.user_template.render(&values);

        let response = self
            .llm
            .chat(Some(&self.system_prompt), &[], &user_prompt)
            .await?;

        let ranked_ids = Self::parse_ranked_ids(&response, &candidates)?;

        let by_id: HashMap<u32, &Candidate> = candidates.iter().map(|c| (c.id, c)).collect();
        let mut reranked: Vec<Candidate> = ranked_ids
            .into_iter()
            .take(top_k)
            .filter_map(|id| by_id.get(&id).map(|c| (*c).clone()))
            .collect();
        assign_ranks(&mut reranked);
        Ok(reranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: u32, score: f32, rank: u32) -> Candidate {
        Candidate {
            id,
            topic: "Safety".to_string(),
            title: format!("Title {id}"),
            content: "content".to_string(),
            source: "test".to_string(),
            score,
            rank,
        }
    }

    fn candidates(n: u32) -> Vec<Candidate> {
        (1..=n)
            .map(|id| candidate(id, 1.0 - id as f32 * 0.05, id))
            .collect()
    }

    #[test]
    fn test_identity_is_prefix_of_input() {
        let input = candidates(10);
        let output = identity_rerank(input.clone(), 4);

        assert_eq!(output.len(), 4);
        for (out, original) in output.iter().zip(&input) {
            assert_eq!(out.id, original.id);
        }
        assert_eq!(output.iter().map(|c| c.rank).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_identity_with_short_input() {
        let output = identity_rerank(candidates(2), 4);
        assert_eq!(output.len(), 2);
        assert_eq!(output.iter().map(|c| c.rank).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_apply_scores_sorts_truncates_and_reranks() {
        let input = candidates(6);
        let scores = [0.2, 0.9, 0.1, 0.8, 0.5, 0.3];

        let output = apply_scores(input.clone(), &scores, 4);

        // Descending by cross-encoder score, capped at top_k
        assert_eq!(output.iter().map(|c| c.id).collect::<Vec<_>>(), vec![2, 4, 5, 6]);
        assert_eq!(output.iter().map(|c| c.rank).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        // Output is a subset of the input candidate set
        for out in &output {
            assert!(input.iter().any(|c| c.id == out.id));
        }
    }

    #[test]
    fn test_apply_scores_ties_keep_retrieval_order() {
        let input = candidates(4);
        let scores = [0.5, 0.5, 0.9, 0.5];

        let output = apply_scores(input, &scores, 4);

        // Candidate 3 wins; the tied rest stay in retrieval order
        assert_eq!(output.iter().map(|c| c.id).collect::<Vec<_>>(), vec![3, 1, 2, 4]);
    }

    #[test]
    fn test_apply_scores_with_short_input() {
        let output = apply_scores(candidates(2), &[0.1, 0.7], 4);
        assert_eq!(output.len(), 2);
        assert_eq!(output.iter().map(|c| c.id).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(output.iter().map(|c| c.rank).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_parse_ranked_ids_happy_path() {
        let pool = candidates(10);
        let ids = LlmReranker::parse_ranked_ids("3, 1, 7, 2", &pool).unwrap();
        assert_eq!(ids, vec![3, 1, 7, 2]);
    }

    #[test]
    fn test_parse_ranked_ids_with_surrounding_prose() {
        let pool = candidates(10);
        let ids =
            LlmReranker::parse_ranked_ids("The most relevant are: ID 4, then ID 9.", &pool).unwrap();
        assert_eq!(ids, vec![4, 9]);
    }

    #[test]
    fn test_parse_ranked_ids_deduplicates_in_order() {
        let pool = candidates(10);
        let ids = LlmReranker::parse_ranked_ids("5, 5, 2, 5, 2", &pool).unwrap();
        assert_eq!(ids, vec![5, 2]);
    }

    #[test]
    fn test_parse_ranked_ids_rejects_unknown_id() {
        let pool = candidates(10);
        let err = LlmReranker::parse_ranked_ids("3, 42, 1", &pool).unwrap_err();
        assert!(matches!(err, IndoRagError::RerankParse(_)));
    }

    #[test]
    fn test_parse_ranked_ids_rejects_empty_output() {
        let pool = candidates(10);
        let err = LlmReranker::parse_ranked_ids("none of these look relevant", &pool).unwrap_err();
        assert!(matches!(err, IndoRagError::RerankParse(_)));
    }

    #[test]
    fn test_parse_ranked_ids_fewer_than_top_k_is_not_an_error() {
        let pool = candidates(10);
        let ids = LlmReranker::parse_ranked_ids("8", &pool).unwrap();
        assert_eq!(ids, vec![8]);
    }
}
