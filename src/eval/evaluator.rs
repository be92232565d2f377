//! Batch evaluation: retrieval metrics plus judge scoring over a persisted
//! batch replay file, aggregated per configuration.

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use tracing::info;
use tracing::warn;

use crate::config::AppConfig;
use crate::errors::IndoRagError;
use crate::errors::Result;
use crate::eval::judge::Judge;
use crate::eval::judge::JudgeMetric;
use crate::eval::metrics;
use crate::llm::LlmService;
use crate::llm::PromptLibrary;
use crate::models::BatchResult;
use crate::models::EvalMetadata;
use crate::models::EvalSummary;
use crate::models::LaajReport;
use crate::models::LaajTurn;
use crate::models::MetricAggregate;
use crate::models::RetrievalSummary;
use crate::models::TurnRecord;

/// Retrieval metrics for one turn. `None` when the turn carries no ground
/// truth or the ground truth has no relevant snippets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnRetrieval {
    pub recall: f64,
    pub mrr: f64,
    pub ndcg: f64,
}

/// Compute retrieval metrics for a replayed turn against its ground truth,
/// over the reranked shortlist the generator actually saw.
#[must_use]
pub fn retrieval_metrics(turn: &TurnRecord, k: usize) -> Option<TurnRetrieval> {
    let relevant: std::collections::HashSet<u32> = turn
        .ground_truth_snippets
        .as_ref()?
        .iter()
        .copied()
        .collect();
    let ranked: Vec<u32> = turn.reranked_snippets.iter().map(|c| c.id).collect();

    Some(TurnRetrieval {
        recall: metrics::recall_at_k(&ranked, &relevant, k)?,
        mrr: metrics::mrr(&ranked, &relevant)?,
        ndcg: metrics::ndcg_at_k(&ranked, &relevant, k)?,
    })
}

/// Aggregate retrieval metrics over every turn in a batch. Turns without
/// usable ground truth are excluded from the means, not counted as zero.
#[must_use]
pub fn summarize_retrieval(batch: &BatchResult, k: usize) -> RetrievalSummary {
    let mut recalls = Vec::new();
    let mut mrrs = Vec::new();
    let mut ndcgs = Vec::new();
    let mut excluded = 0;

    for dialogue in &batch.dialogues {
        for turn in &dialogue.turns {
            match retrieval_metrics(turn, k) {
                Some(turn_metrics) => {
                    recalls.push(turn_metrics.recall);
                    mrrs.push(turn_metrics.mrr);
                    ndcgs.push(turn_metrics.ndcg);
                }
                None => excluded += 1,
            }
        }
    }

    RetrievalSummary {
        mean_recall_at_k: mean(&recalls),
        mean_mrr: mean(&mrrs),
        mean_ndcg_at_k: mean(&ndcgs),
        k,
        scored_turns: recalls.len(),
        excluded_turns: excluded,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Load a persisted batch result file.
pub fn load_batch<P: AsRef<Path>>(path: P) -> Result<BatchResult> {
    let content = std::fs::read_to_string(path)?;
    let batch: BatchResult = serde_json::from_str(&content)?;
    Ok(batch)
}

/// Most recently modified `batchreplay_*.json` file in a directory. Other
/// files are ignored, so the results directory may hold unrelated artifacts.
pub fn latest_batch_file<P: AsRef<Path>>(dir: P) -> Result<PathBuf> {
    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
    for entry in std::fs::read_dir(&dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if !path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.starts_with("batchreplay_"))
        {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if newest.as_ref().is_none_or(|(ts, _)| modified > *ts) {
            newest = Some((modified, path));
        }
    }
    newest.map(|(_, path)| path).ok_or_else(|| {
        IndoRagError::Config(format!(
            "no batch result files found in {}",
            dir.as_ref().display()
        ))
    })
}

/// Output file stem: the batch file name with its `batchreplay_` prefix
/// removed, so `laaj_*` and `eval_*` files point back at their source.
fn output_stem(batch_path: &Path) -> String {
    let base = batch_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("batch.json");
    base.strip_prefix("batchreplay_").unwrap_or(base).to_string()
}

/// Batch evaluator: retrieval metrics plus the LLM judge pass.
pub struct Evaluator {
    judge: Judge,
    top_k: usize,
    laaj_dir: PathBuf,
    eval_dir: PathBuf,
}

impl Evaluator {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let llm = LlmService::from_config_with_model(config, &config.judge.model)?;
        let prompts = PromptLibrary::from_config(config.paths.prompts_file.as_deref())?;
        Ok(Self {
            judge: Judge::new(llm, prompts),
            top_k: config.retrieval.top_k,
            laaj_dir: config.paths.laaj_results_dir.clone(),
            eval_dir: config.paths.eval_results_dir.clone(),
        })
    }

    #[must_use]
    pub fn new(judge: Judge, top_k: usize, laaj_dir: PathBuf, eval_dir: PathBuf) -> Self {
        Self {
            judge,
            top_k,
            laaj_dir,
            eval_dir,
        }
    }

    /// Evaluate a loaded batch: deterministic retrieval metrics, then one
    /// judge call per (turn, rubric metric). Judge failures exclude that
    /// rating from the aggregate and are logged, never zero-filled.
    pub async fn evaluate(&self, batch: &BatchResult, source_file: &str) -> (LaajReport, EvalSummary) {
        let retrieval = summarize_retrieval(batch, self.top_k);

        let mut laaj_turns: Vec<LaajTurn> = Vec::new();
        let mut ratings: BTreeMap<&'static str, Vec<f64>> = BTreeMap::new();
        let mut exclusions: BTreeMap<&'static str, usize> = BTreeMap::new();
        for metric in JudgeMetric::ALL {
            ratings.insert(metric.as_str(), Vec::new());
            exclusions.insert(metric.as_str(), 0);
        }

        for dialogue in &batch.dialogues {
            for turn in &dialogue.turns {
                info!(
                    "Judging dialogue {}, turn {}",
                    dialogue.dialog_id, turn.turn_index
                );
                let mut turn_metrics = BTreeMap::new();

                for metric in JudgeMetric::ALL {
                    match self.judge.score(metric, turn).await {
                        Ok(verdict) => {
                            ratings
                                .entry(metric.as_str())
                                .or_default()
                                .push(f64::from(verdict.rating));
                            turn_metrics.insert(metric.as_str().to_string(), verdict);
                        }
                        Err(e) => {
                            warn!(
                                "Excluding {} rating for dialogue {} turn {}: {e}",
                                metric.as_str(),
                                dialogue.dialog_id,
                                turn.turn_index
                            );
                            *exclusions.entry(metric.as_str()).or_default() += 1;
                        }
                    }
                }

                laaj_turns.push(LaajTurn {
                    dialog_id: dialogue.dialog_id,
                    turn_index: turn.turn_index,
                    metrics: turn_metrics,
                });
            }
        }

        let generation_quality: BTreeMap<String, MetricAggregate> = JudgeMetric::ALL
            .iter()
            .map(|metric| {
                let values = &ratings[metric.as_str()];
                (
                    metric.as_str().to_string(),
                    MetricAggregate {
                        mean: mean(values),
                        rated: values.len(),
                        excluded: exclusions[metric.as_str()],
                    },
                )
            })
            .collect();

        let metadata = EvalMetadata {
            batch: batch.metadata.clone(),
            eval_model: self.judge.model().to_string(),
            source_file: source_file.to_string(),
        };

        let report = LaajReport {
            metadata: metadata.clone(),
            results: laaj_turns,
        };
        let summary = EvalSummary {
            metadata,
            retrieval,
            generation_quality,
        };

        (report, summary)
    }

    /// Evaluate a batch result file end to end, persisting the LAAJ detail
    /// and the summary next to the configured result directories.
    pub async fn evaluate_file<P: AsRef<Path>>(&self, path: P) -> Result<EvalSummary> {
        let path = path.as_ref();
        info!("Evaluating batch result file {}", path.display());

        let batch = load_batch(path)?;
        let source_file = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let (report, summary) = self.evaluate(&batch, &source_file).await;

        std::fs::create_dir_all(&self.laaj_dir)?;
        std::fs::create_dir_all(&self.eval_dir)?;

        let stem = output_stem(path);
        let laaj_path = self.laaj_dir.join(format!("laaj_{stem}"));
        let eval_path = self.eval_dir.join(format!("eval_{stem}"));

        std::fs::write(&laaj_path, serde_json::to_string_pretty(&report)?)?;
        std::fs::write(&eval_path, serde_json::to_string_pretty(&summary)?)?;

        info!("Saved LAAJ details to {}", laaj_path.display());
        info!("Saved evaluation summary to {}", eval_path.display());

        Ok(summary)
    }
}
