//! LLM-as-a-judge rubric scoring.
//!
//! Each rubric metric is scored by a separate judge call that must answer
//! with a strict JSON object. Unparseable output is a `JudgeParse` error;
//! the evaluator excludes that rating from the aggregate instead of
//! zero-filling it.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::debug;

use crate::errors::IndoRagError;
use crate::errors::Result;
use crate::llm::LlmService;
use crate::llm::PromptLibrary;
use crate::models::JudgeVerdict;
use crate::models::TurnRecord;

/// The fixed generation-quality rubric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JudgeMetric {
    Factuality,
    Faithfulness,
    Helpfulness,
    Overall,
}

impl JudgeMetric {
    pub const ALL: [Self; 4] = [
        Self::Factuality,
        Self::Faithfulness,
        Self::Helpfulness,
        Self::Overall,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Factuality => "factuality",
            Self::Faithfulness => "faithfulness",
            Self::Helpfulness => "helpfulness",
            Self::Overall => "overall",
        }
    }

    /// Prompt-library key for this metric's rubric prompt.
    #[must_use]
    pub fn prompt_key(self) -> String {
        format!("laaj_{}", self.as_str())
    }
}

const MIN_RATING: i64 = 1;
const MAX_RATING: i64 = 5;

/// Strip a markdown code fence, if the judge wrapped its JSON in one.
fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

/// Parse a judge response into a verdict on the fixed 1..=5 scale.
pub fn parse_verdict(response: &str) -> Result<JudgeVerdict> {
    #[derive(Deserialize)]
    struct RawVerdict {
        rating: i64,
        #[serde(default)]
        reason: String,
    }

    let cleaned = strip_code_fence(response);
    let raw: RawVerdict = serde_json::from_str(cleaned)
        .map_err(|e| IndoRagError::JudgeParse(format!("invalid judge JSON: {e}")))?;

    if !(MIN_RATING..=MAX_RATING).contains(&raw.rating) {
        return Err(IndoRagError::JudgeParse(format!(
            "rating {} outside the {MIN_RATING}..={MAX_RATING} scale",
            raw.rating
        )));
    }

    Ok(JudgeVerdict {
        rating: raw.rating as u8,
        reason: raw.reason,
    })
}

/// Judge client: renders the rubric prompt for a turn and parses the score.
pub struct Judge {
    llm: LlmService,
    prompts: PromptLibrary,
}

impl Judge {
    pub fn new(llm: LlmService, prompts: PromptLibrary) -> Self {
        Self { llm, prompts }
    }

    #[must_use]
    pub fn model(&self) -> &str {
        self.llm.model()
    }

    /// Context snippets as presented to the judge.
    fn format_snippets(turn: &TurnRecord) -> String {
        turn.reranked_snippets
            .iter()
            .map(|c| format!("[{}] {}", c.id, c.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Score one rubric metric for one replayed turn.
    pub async fn score(&self, metric: JudgeMetric, turn: &TurnRecord) -> Result<JudgeVerdict> {
        let template = self.prompts.template(&metric.prompt_key());

        let mut values = HashMap::new();
        values.insert("user_input".to_string(), turn.user_input.clone());
        values.insert("system_response".to_string(), turn.system_response.clone());
        values.insert(
            "retrieved_snippets".to_string(),
            Self::format_snippets(turn),
        );
        let prompt = template.render(&values);

        debug!("Judging {} for turn {}", metric.as_str(), turn.turn_index);
        let response = self.llm.chat(None, &[], &prompt).await?;
        parse_verdict(&response)
    }
}
