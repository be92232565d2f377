//! Complete RAG pipeline: Retrieve -> Rerank -> Generate

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::AppConfig;
use crate::embeddings::EmbeddingClient;
use crate::errors::Result;
use crate::llm::ChatMessage;
use crate::llm::LlmService;
use crate::llm::PromptLibrary;
use crate::models::Candidate;
use crate::models::Conversation;
use crate::models::DialogueTurn;
use crate::rag::rerank::identity_rerank;
use crate::rag::ContextAssembler;
use crate::rag::Reranker;
use crate::rag::Retriever;
use crate::store::KnowledgeStore;

/// RAG orchestrator: wires retriever, reranker and generation into one
/// `answer` call per user turn.
pub struct RagService {
    retriever: Retriever,
    reranker: Reranker,
    context_assembler: ContextAssembler,
    llm: LlmService,
    prompts: PromptLibrary,
    top_k: usize,
}

impl RagService {
    /// Build the full pipeline from configuration: load the embedded corpus,
    /// construct the embedding/generation clients and the configured
    /// reranker. Fails fast on a corpus/model mismatch.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let store = Arc::new(KnowledgeStore::load(
            &config.paths.embedded_corpus_file,
            config.embedding_model(),
        )?);
        let embeddings = Arc::new(EmbeddingClient::from_config(config)?);
        let retriever = Retriever::new(store, embeddings, config.retrieval.top_n);
        let prompts = PromptLibrary::from_config(config.paths.prompts_file.as_deref())?;
        let reranker = Reranker::from_config(config, &prompts)?;
        let llm = LlmService::from_config(config)?;

        Ok(Self {
            retriever,
            reranker,
            context_assembler: ContextAssembler::default(),
            llm,
            prompts,
            top_k: config.retrieval.top_k,
        })
    }

    /// Create from existing components
    #[must_use]
    pub fn from_parts(
        retriever: Retriever,
        reranker: Reranker,
        llm: LlmService,
        prompts: PromptLibrary,
        top_k: usize,
    ) -> Self {
        Self {
            retriever,
            reranker,
            context_assembler: ContextAssembler::default(),
            llm,
            prompts,
            top_k,
        }
    }

    #[must_use]
    pub fn generation_model(&self) -> &str {
        self.llm.model()
    }

    /// Process one user turn: retrieve, rerank, generate, and append the
    /// resulting turn to the conversation.
    ///
    /// A component failure never aborts the conversation. The turn is
    /// appended marked as failed with the error kind recorded, and prior
    /// history stays untouched. A reranker failure degrades to identity
    /// ranking with the fallback flagged on the turn for auditing.
    pub async fn answer(&self, conversation: &mut Conversation, user_utterance: &str) -> DialogueTurn {
        info!("Processing turn for conversation {}", conversation.id);
        let timestamp = Utc::now();

        // Step 1: retrieve top-N candidates
        let retrieved = match self.retriever.retrieve(user_utterance).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("Retrieval failed: {e}");
                let turn = DialogueTurn {
                    user_input: user_utterance.to_string(),
                    retrieved: Vec::new(),
                    reranked: Vec::new(),
                    answer: None,
                    persona: conversation.persona,
                    strategy: conversation.strategy,
                    timestamp,
                    rerank_fallback: false,
                    error: Some(e.kind().to_string()),
                };
                conversation.turns.push(turn.clone());
                return turn;
            }
        };
        debug!("Retrieved {} candidates", retrieved.len());

        // Step 2: rerank down to top-K, degrading to identity order if the
        // configured reranker cannot produce a usable ranking
        let (reranked, rerank_fallback) = self.rerank_or_fallback(user_utterance, &retrieved).await;
        debug!("Kept {} candidates after reranking", reranked.len());

        // Step 3: generate the answer from the assembled context
        let system_prompt = self.build_system_prompt(conversation, &reranked);
        let history = Self::build_history(conversation);

        match self.llm.chat(Some(&system_prompt), &history, user_utterance).await {
            Ok(answer) => {
                info!("Turn completed successfully");
                let turn = DialogueTurn {
                    user_input: user_utterance.to_string(),
                    retrieved,
                    reranked,
                    answer: Some(answer),
                    persona: conversation.persona,
                    strategy: conversation.strategy,
                    timestamp,
                    rerank_fallback,
                    error: None,
                };
                conversation.turns.push(turn.clone());
                turn
            }
            Err(e) => {
                warn!("Generation failed: {e}");
                let turn = DialogueTurn {
                    user_input: user_utterance.to_string(),
                    retrieved,
                    reranked,
                    answer: None,
                    persona: conversation.persona,
                    strategy: conversation.strategy,
                    timestamp,
                    rerank_fallback,
                    error: Some(e.kind().to_string()),
                };
                conversation.turns.push(turn.clone());
                turn
            }
        }
    }

    /// Rerank step with the degrade-to-identity policy. A reranker failure
    /// of any kind keeps the turn alive: the first `top_k` candidates in
    /// retrieval order are used and the fallback is flagged for auditing.
    async fn rerank_or_fallback(&self, query: &str, retrieved: &[Candidate]) -> (Vec<Candidate>, bool) {
        match self
            .reranker
            .rerank(query, retrieved.to_vec(), self.top_k)
            .await
        {
            Ok(reranked) => (reranked, false),
            Err(e) => {
                warn!("Reranker failed ({e}), falling back to identity ranking");
                (identity_rerank(retrieved.to_vec(), self.top_k), true)
            }
        }
    }

    /// Context block plus the persona's system prompt.
    fn build_system_prompt(&self, conversation: &Conversation, reranked: &[Candidate]) -> String {
        let context = self.context_assembler.assemble(reranked);
        let persona_prompt = self.prompts.get(conversation.persona.prompt_key());
        if context.is_empty() {
            persona_prompt
        } else {
            format!("{context}\n{persona_prompt}")
        }
    }

    /// Chat history from prior successful turns. Failed turns contribute
    /// nothing: the user saw an error, not an answer.
    fn build_history(conversation: &Conversation) -> Vec<ChatMessage> {
        let mut history = Vec::new();
        for turn in &conversation.turns {
            if let Some(answer) = &turn.answer {
                history.push(ChatMessage::user(&turn.user_input));
                history.push(ChatMessage::assistant(answer));
            }
        }
        history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::EmbeddingProvider;
    use crate::models::EmbeddedCorpus;
    use crate::models::KnowledgeRecord;
    use crate::models::KnowledgeSnippet;
    use crate::models::Persona;
    use crate::models::RagStrategy;
    use crate::rag::rerank::LlmReranker;

    fn snippet(id: u32) -> KnowledgeSnippet {
        KnowledgeSnippet {
            record: KnowledgeRecord {
                id,
                topic: "Transport".to_string(),
                title: format!("Snippet {id}"),
                content: "content".to_string(),
                source: "test".to_string(),
            },
            embedding: vec![1.0, 0.0, 0.0],
        }
    }

    /// A pipeline whose LLM reranker points at a closed local port, so every
    /// rerank call fails at the provider.
    fn service_with_unreachable_reranker(top_k: usize) -> RagService {
        let dead_endpoint = "http://127.0.0.1:9".to_string();

        let store = Arc::new(
            KnowledgeStore::from_corpus(
                EmbeddedCorpus {
                    embedding_model: "test-model".to_string(),
                    dimension: 3,
                    snippets: vec![snippet(1)],
                },
                "test-model",
            )
            .unwrap(),
        );
        let embeddings = Arc::new(
            EmbeddingClient::new(
                EmbeddingProvider::OpenAI,
                "test-model".to_string(),
                dead_endpoint.clone(),
                None,
            )
            .unwrap(),
        );
        let retriever = Retriever::new(store, embeddings, 10);

        let prompts = PromptLibrary::builtin();
        let reranker_llm =
            LlmService::new(dead_endpoint.clone(), None, "test-model".to_string()).unwrap();
        let reranker = Reranker::Llm(LlmReranker::new(reranker_llm, &prompts));
        let llm = LlmService::new(dead_endpoint, None, "test-model".to_string()).unwrap();

        RagService::from_parts(retriever, reranker, llm, prompts, top_k)
    }

    fn candidate(id: u32, rank: u32) -> Candidate {
        Candidate {
            id,
            topic: "Visas".to_string(),
            title: format!("Title {id}"),
            content: "content".to_string(),
            source: "test".to_string(),
            score: 1.0 - rank as f32 * 0.1,
            rank,
        }
    }

    #[tokio::test]
    async fn test_reranker_failure_degrades_to_identity_with_audit_flag() {
        let service = service_with_unreachable_reranker(4);
        let retrieved: Vec<Candidate> = (1..=10).map(|id| candidate(id, id)).collect();

        let (reranked, fallback) = service.rerank_or_fallback("visa rules", &retrieved).await;

        assert!(fallback);
        // Identity fallback: the first top_k retrieved candidates, in order
        assert_eq!(reranked.len(), 4);
        for (out, original) in reranked.iter().zip(&retrieved) {
            assert_eq!(out.id, original.id);
        }
        assert_eq!(
            reranked.iter().map(|c| c.rank).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
    }

    #[test]
    fn test_history_skips_failed_turns() {
        let mut conversation = Conversation::new(Persona::Neutral, RagStrategy::Identity);
        conversation.turns.push(DialogueTurn {
            user_input: "first".to_string(),
            retrieved: vec![],
            reranked: vec![],
            answer: Some("answer one".to_string()),
            persona: Persona::Neutral,
            strategy: RagStrategy::Identity,
            timestamp: Utc::now(),
            rerank_fallback: false,
            error: None,
        });
        conversation.turns.push(DialogueTurn {
            user_input: "second".to_string(),
            retrieved: vec![],
            reranked: vec![],
            answer: None,
            persona: Persona::Neutral,
            strategy: RagStrategy::Identity,
            timestamp: Utc::now(),
            rerank_fallback: false,
            error: Some("generation_unavailable".to_string()),
        });

        let history = RagService::build_history(&conversation);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "first");
        assert_eq!(history[1].content, "answer one");
    }
}
