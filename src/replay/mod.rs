//! Batch replay: drive scripted test dialogues through the live pipeline
//! and persist every intermediate artifact for offline evaluation.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use futures::stream;
use futures::StreamExt;
use tracing::info;
use tracing::warn;

use crate::config::AppConfig;
use crate::errors::IndoRagError;
use crate::errors::Result;
use crate::models::BatchMetadata;
use crate::models::BatchResult;
use crate::models::Conversation;
use crate::models::DialogueResult;
use crate::models::Persona;
use crate::models::RagStrategy;
use crate::models::ScriptedTurn;
use crate::models::Speaker;
use crate::models::TestDialogue;
use crate::models::TurnRecord;
use crate::rag::RagService;

/// Load scripted test dialogues from a JSON file.
pub fn load_dialogues<P: AsRef<Path>>(path: P) -> Result<Vec<TestDialogue>> {
    let content = std::fs::read_to_string(&path).map_err(|e| {
        IndoRagError::Config(format!(
            "cannot read dialogues file {}: {e}",
            path.as_ref().display()
        ))
    })?;
    let dialogues: Vec<TestDialogue> = serde_json::from_str(&content)?;
    Ok(dialogues)
}

/// File names may not contain path separators or model-tag punctuation.
fn sanitize_model_name(model: &str) -> String {
    model
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Ground truth for a replayed user turn: the scripted assistant turn that
/// immediately follows it, if any.
fn ground_truth_after(turns: &[ScriptedTurn], user_index: usize) -> Option<&ScriptedTurn> {
    turns
        .get(user_index + 1)
        .filter(|t| t.speaker == Speaker::Assistant)
}

/// Replays scripted dialogues through a shared pipeline with a bounded
/// worker pool. Dialogues are independent; each gets a fresh conversation.
pub struct BatchReplayer {
    rag: Arc<RagService>,
    persona: Persona,
    strategy: RagStrategy,
    concurrency: usize,
    results_dir: PathBuf,
}

impl BatchReplayer {
    pub fn from_config(config: &AppConfig, rag: Arc<RagService>) -> Self {
        Self {
            rag,
            persona: config.persona,
            strategy: config.reranker.strategy,
            concurrency: config.replay.concurrency,
            results_dir: config.paths.batch_results_dir.clone(),
        }
    }

    /// Replay one dialogue in a fresh conversation. Any failed turn fails
    /// the whole dialogue; partial dialogues are useless to the evaluator.
    async fn replay_dialogue(&self, dialogue: &TestDialogue) -> Result<DialogueResult> {
        let mut conversation = Conversation::new(self.persona, self.strategy);
        let mut records = Vec::new();
        let dialogue_start = Instant::now();

        for (idx, scripted) in dialogue.turns.iter().enumerate() {
            if scripted.speaker != Speaker::User {
                continue;
            }
            let utterance = scripted.utterance.as_deref().ok_or_else(|| {
                IndoRagError::Config(format!(
                    "dialogue {}: user turn {idx} has no utterance",
                    dialogue.dialog_id
                ))
            })?;

            let turn_start = Instant::now();
            let turn = self.rag.answer(&mut conversation, utterance).await;
            let latency_seconds = turn_start.elapsed().as_secs_f64();

            let answer = match turn.answer {
                Some(answer) => answer,
                None => {
                    return Err(IndoRagError::Config(format!(
                        "dialogue {}: turn {idx} failed ({})",
                        dialogue.dialog_id,
                        turn.error.as_deref().unwrap_or("unknown error")
                    )));
                }
            };

            let ground_truth = ground_truth_after(&dialogue.turns, idx);
            records.push(TurnRecord {
                turn_index: records.len(),
                user_input: utterance.to_string(),
                system_response: answer,
                retrieved_snippets: turn.retrieved,
                reranked_snippets: turn.reranked,
                rerank_fallback: turn.rerank_fallback,
                latency_seconds,
                ground_truth_response: ground_truth.and_then(|t| t.utterance_ref.clone()),
                ground_truth_snippets: ground_truth.and_then(|t| t.grounding_snippets.clone()),
            });
        }

        Ok(DialogueResult {
            dialog_id: dialogue.dialog_id,
            turns: records,
            total_seconds: dialogue_start.elapsed().as_secs_f64(),
        })
    }

    /// Replay a set of dialogues. Up to `concurrency` dialogues run at once;
    /// results come back in input order regardless of completion order. A
    /// failed dialogue is logged and skipped, never aborting the batch.
    pub async fn replay_all(&self, dialogues: &[TestDialogue], input_file: &str) -> BatchResult {
        let attempted = dialogues.len();
        info!(
            "Replaying {attempted} dialogues ({} strategy, {} persona, concurrency {})",
            self.strategy.cli_key(),
            self.persona.prompt_key(),
            self.concurrency
        );

        let results: Vec<(u32, Result<DialogueResult>)> = stream::iter(dialogues)
            .map(|dialogue| async move {
                (dialogue.dialog_id, self.replay_dialogue(dialogue).await)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut completed = Vec::new();
        for (dialog_id, result) in results {
            match result {
                Ok(dialogue_result) => completed.push(dialogue_result),
                Err(e) => warn!("Skipping dialogue {dialog_id}: {e}"),
            }
        }

        let succeeded = completed.len();
        info!("Batch replay finished: {succeeded}/{attempted} dialogues succeeded");

        BatchResult {
            metadata: BatchMetadata {
                timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
                strategy: self.strategy,
                persona: self.persona,
                model: self.rag.generation_model().to_string(),
                input_file: input_file.to_string(),
            },
            attempted,
            succeeded,
            dialogues: completed,
        }
    }

    /// Persist a batch result under the configured results directory. The
    /// file name encodes strategy, model and timestamp so evaluation output
    /// can be traced back to the run that produced it.
    pub fn save(&self, batch: &BatchResult) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.results_dir)?;

        let filename = format!(
            "batchreplay_{}_{}_{}.json",
            batch.metadata.strategy.cli_key(),
            sanitize_model_name(&batch.metadata.model),
            Local::now().format("%Y%m%d_%H%M%S"),
        );
        let path = self.results_dir.join(filename);
        std::fs::write(&path, serde_json::to_string_pretty(batch)?)?;

        info!("Saved batch results to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(utterance: &str) -> ScriptedTurn {
        ScriptedTurn {
            speaker: Speaker::User,
            utterance: Some(utterance.to_string()),
            utterance_ref: None,
            grounding_snippets: None,
        }
    }

    fn assistant(reference: &str, snippets: &[u32]) -> ScriptedTurn {
        ScriptedTurn {
            speaker: Speaker::Assistant,
            utterance: None,
            utterance_ref: Some(reference.to_string()),
            grounding_snippets: Some(snippets.to_vec()),
        }
    }

    #[test]
    fn test_ground_truth_is_the_following_assistant_turn() {
        let turns = vec![
            user("Do I need a visa?"),
            assistant("Visa on arrival works for most visitors.", &[3, 7]),
            user("How long can I stay?"),
        ];
        let gt = ground_truth_after(&turns, 0).unwrap();
        assert_eq!(gt.grounding_snippets, Some(vec![3, 7]));
        // A user turn with no assistant turn after it has no ground truth
        assert!(ground_truth_after(&turns, 2).is_none());
        // Two consecutive user turns: the next turn is not an assistant turn
        let back_to_back = vec![user("one"), user("two")];
        assert!(ground_truth_after(&back_to_back, 0).is_none());
    }

    #[test]
    fn test_sanitize_model_name() {
        assert_eq!(sanitize_model_name("gpt-4o-mini"), "gpt-4o-mini");
        assert_eq!(sanitize_model_name("gemma3:27b"), "gemma3-27b");
        assert_eq!(
            sanitize_model_name("org/model:latest"),
            "org-model-latest"
        );
    }

    #[test]
    fn test_load_dialogues_parses_script_format() {
        let json = r#"[
            {
                "dialog_id": 1,
                "turns": [
                    {"speaker": "user", "utterance": "Best time to visit Bali?"},
                    {
                        "speaker": "assistant",
                        "utterance_ref": "The dry season, May to September.",
                        "grounding_snippets": [12]
                    }
                ]
            }
        ]"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dialogues.json");
        std::fs::write(&path, json).unwrap();

        let dialogues = load_dialogues(&path).unwrap();
        assert_eq!(dialogues.len(), 1);
        assert_eq!(dialogues[0].dialog_id, 1);
        assert_eq!(dialogues[0].turns.len(), 2);
        assert_eq!(dialogues[0].turns[0].speaker, Speaker::User);
    }
}
