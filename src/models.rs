//! Core data model for the IndoRAG pipeline and evaluation harness.

use std::collections::BTreeMap;

use chrono::DateTime;
use chrono::Utc;
use clap::ValueEnum;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// Raw knowledge-base entry, before embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KnowledgeRecord {
    pub id: u32,
    pub topic: String,
    pub title: String,
    pub content: String,
    pub source: String,
}

impl KnowledgeRecord {
    /// Text fed to the embedding model. The source field is metadata only and
    /// is deliberately excluded so citations do not skew similarity.
    #[must_use]
    pub fn embedding_text(&self) -> String {
        format!("{} - {}: {}", self.topic, self.title, self.content)
    }
}

/// Knowledge record plus its embedding vector. Immutable once ingested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeSnippet {
    #[serde(flatten)]
    pub record: KnowledgeRecord,
    pub embedding: Vec<f32>,
}

/// Persisted ingest artifact. Stores the embedding model identifier so a
/// model mismatch between corpus and live queries fails loudly at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedCorpus {
    pub embedding_model: String,
    pub dimension: usize,
    pub snippets: Vec<KnowledgeSnippet>,
}

/// A retrieved snippet with its relevance score and 1-based rank position.
///
/// Created fresh per query by the retriever; rerankers may change score and
/// rank but never the underlying snippet fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub id: u32,
    pub topic: String,
    pub title: String,
    pub content: String,
    pub source: String,
    pub score: f32,
    pub rank: u32,
}

impl Candidate {
    #[must_use]
    pub fn from_snippet(snippet: &KnowledgeSnippet, score: f32, rank: u32) -> Self {
        Self {
            id: snippet.record.id,
            topic: snippet.record.topic.clone(),
            title: snippet.record.title.clone(),
            content: snippet.record.content.clone(),
            source: snippet.record.source.clone(),
            score,
            rank,
        }
    }

    /// Text presented to rerankers, same shape as the embedded text.
    #[must_use]
    pub fn text(&self) -> String {
        format!("{} - {}: {}", self.topic, self.title, self.content)
    }
}

/// Assistant persona, selected once per conversation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    #[default]
    Neutral,
    Friendly,
    Professional,
}

impl Persona {
    /// Key of this persona's system prompt in the prompt library.
    #[must_use]
    pub fn prompt_key(self) -> &'static str {
        match self {
            Self::Neutral => "indoguide_neutral",
            Self::Friendly => "indoguide_friendly",
            Self::Professional => "indoguide_professional",
        }
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Neutral => "Neutral (Baseline)",
            Self::Friendly => "Friendly",
            Self::Professional => "Professional",
        }
    }
}

/// Reranking strategy. A closed set: the pipeline supports exactly these
/// three, selected once at conversation start via configuration.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum RagStrategy {
    /// Passthrough of the vector-retrieval order (no reranking).
    #[default]
    Identity,
    /// Pairwise (query, document) scoring through a cross-encoder model.
    CrossEncoder,
    /// A language model orders the candidates by relevance.
    Llm,
}

impl RagStrategy {
    /// Short key used in CLI flags and result file names.
    #[must_use]
    pub fn cli_key(self) -> &'static str {
        match self {
            Self::Identity => "baseline",
            Self::CrossEncoder => "crossencoder",
            Self::Llm => "llm",
        }
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Identity => "Baseline (No Reranking)",
            Self::CrossEncoder => "Cross-Encoder Reranking",
            Self::Llm => "LLM Reranking",
        }
    }
}

/// One completed exchange. Immutable after creation; appended to the
/// conversation's ordered turn sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueTurn {
    pub user_input: String,
    /// Top-N candidates from vector retrieval, in retrieval order.
    pub retrieved: Vec<Candidate>,
    /// Top-K candidates after reranking, ranks re-assigned 1..=K.
    pub reranked: Vec<Candidate>,
    /// Generated answer; `None` when the turn failed.
    pub answer: Option<String>,
    pub persona: Persona,
    pub strategy: RagStrategy,
    pub timestamp: DateTime<Utc>,
    /// Set when the LLM reranker output could not be used and the turn fell
    /// back to identity ranking. Kept for later auditing.
    #[serde(default)]
    pub rerank_fallback: bool,
    /// Error kind when the turn failed; prior history is always preserved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DialogueTurn {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Ordered sequence of dialogue turns with a fixed persona and strategy.
/// Changing configuration starts a new conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub persona: Persona,
    pub strategy: RagStrategy,
    pub turns: Vec<DialogueTurn>,
}

impl Conversation {
    #[must_use]
    pub fn new(persona: Persona, strategy: RagStrategy) -> Self {
        Self {
            id: Uuid::new_v4(),
            persona,
            strategy,
            turns: Vec::new(),
        }
    }
}

/// Speaker of a scripted dialogue turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// One scripted turn in a test dialogue. User turns carry the utterance to
/// replay; the assistant turn that follows supplies the ground truth for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptedTurn {
    pub speaker: Speaker,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utterance: Option<String>,
    /// Reference answer on assistant turns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utterance_ref: Option<String>,
    /// Ids of the snippets a correct answer should be grounded on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grounding_snippets: Option<Vec<u32>>,
}

/// A scripted test dialogue with ground-truth relevance judgments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestDialogue {
    pub dialog_id: u32,
    pub turns: Vec<ScriptedTurn>,
}

/// Metadata block persisted at the head of every batch result file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchMetadata {
    pub timestamp: String,
    pub strategy: RagStrategy,
    pub persona: Persona,
    pub model: String,
    pub input_file: String,
}

/// One replayed user turn with every intermediate artifact the evaluator
/// needs. Raw candidate lists are persisted on purpose: retrieval metrics
/// cannot be recomputed from the final answer alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRecord {
    pub turn_index: usize,
    pub user_input: String,
    pub system_response: String,
    pub retrieved_snippets: Vec<Candidate>,
    pub reranked_snippets: Vec<Candidate>,
    #[serde(default)]
    pub rerank_fallback: bool,
    pub latency_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ground_truth_response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ground_truth_snippets: Option<Vec<u32>>,
}

/// Replay result for one dialogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueResult {
    pub dialog_id: u32,
    pub turns: Vec<TurnRecord>,
    pub total_seconds: f64,
}

/// Full batch replay output, persisted as one JSON file whose name encodes
/// strategy, model and timestamp for traceability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub metadata: BatchMetadata,
    /// Dialogues the replayer attempted, including ones that failed.
    pub attempted: usize,
    /// Dialogues that completed; only these appear in `dialogues`.
    pub succeeded: usize,
    pub dialogues: Vec<DialogueResult>,
}

/// One parsed judge verdict on the fixed 1..=5 scale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JudgeVerdict {
    pub rating: u8,
    #[serde(default)]
    pub reason: String,
}

/// Per-turn judge ratings, keyed by rubric metric name. Metrics whose judge
/// output failed to parse are absent, never zero-filled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaajTurn {
    pub dialog_id: u32,
    pub turn_index: usize,
    pub metrics: BTreeMap<String, JudgeVerdict>,
}

/// Metadata for evaluation artifacts: batch metadata plus provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalMetadata {
    #[serde(flatten)]
    pub batch: BatchMetadata,
    pub eval_model: String,
    /// Batch result file this evaluation was computed from.
    pub source_file: String,
}

/// Detailed LLM-as-a-judge ratings, persisted alongside the summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaajReport {
    pub metadata: EvalMetadata,
    pub results: Vec<LaajTurn>,
}

/// Aggregated retrieval quality over all scored turns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalSummary {
    pub mean_recall_at_k: f64,
    pub mean_mrr: f64,
    pub mean_ndcg_at_k: f64,
    pub k: usize,
    /// Turns with at least one relevant snippet in the ground truth.
    pub scored_turns: usize,
    /// Turns excluded because their ground truth had no relevant snippets.
    pub excluded_turns: usize,
}

/// Mean of one judge metric over the turns that produced a parseable rating.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricAggregate {
    pub mean: f64,
    pub rated: usize,
    pub excluded: usize,
}

/// Per-configuration evaluation summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalSummary {
    pub metadata: EvalMetadata,
    pub retrieval: RetrievalSummary,
    pub generation_quality: BTreeMap<String, MetricAggregate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_text_excludes_source() {
        let record = KnowledgeRecord {
            id: 7,
            topic: "Visas".to_string(),
            title: "Visa on arrival".to_string(),
            content: "Available at major airports for many nationalities.".to_string(),
            source: "imigrasi.go.id".to_string(),
        };
        let text = record.embedding_text();
        assert_eq!(
            text,
            "Visas - Visa on arrival: Available at major airports for many nationalities."
        );
        assert!(!text.contains("imigrasi.go.id"));
    }

    #[test]
    fn test_strategy_cli_keys() {
        assert_eq!(RagStrategy::Identity.cli_key(), "baseline");
        assert_eq!(RagStrategy::CrossEncoder.cli_key(), "crossencoder");
        assert_eq!(RagStrategy::Llm.cli_key(), "llm");
    }

    #[test]
    fn test_strategy_serde_kebab_case() {
        let json = serde_json::to_string(&RagStrategy::CrossEncoder).unwrap();
        assert_eq!(json, "\"cross-encoder\"");
        let back: RagStrategy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, RagStrategy::CrossEncoder);
    }

    #[test]
    fn test_conversation_config_is_fixed_at_creation() {
        let conversation = Conversation::new(Persona::Friendly, RagStrategy::Llm);
        assert_eq!(conversation.persona, Persona::Friendly);
        assert_eq!(conversation.strategy, RagStrategy::Llm);
        assert!(conversation.turns.is_empty());
    }

    #[test]
    fn test_turn_record_round_trip() {
        let record = TurnRecord {
            turn_index: 0,
            user_input: "Do I need a visa for Bali?".to_string(),
            system_response: "Many nationalities can use visa on arrival.".to_string(),
            retrieved_snippets: vec![],
            reranked_snippets: vec![],
            rerank_fallback: true,
            latency_seconds: 1.25,
            ground_truth_response: None,
            ground_truth_snippets: Some(vec![7, 9]),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("ground_truth_response"));
        let back: TurnRecord = serde_json::from_str(&json).unwrap();
        assert!(back.rerank_fallback);
        assert_eq!(back.ground_truth_snippets, Some(vec![7, 9]));
    }
}
