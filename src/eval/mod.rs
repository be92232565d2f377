//! Evaluation harness: ranking metrics against ground-truth judgments and
//! LLM-as-a-judge rubric scoring over batch replay results.

pub mod evaluator;
pub mod judge;
pub mod metrics;

pub use evaluator::Evaluator;
pub use judge::Judge;
pub use judge::JudgeMetric;
