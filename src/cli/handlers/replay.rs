//! Batch replay handler

use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::output::print_batch_summary;
use crate::cli::output::print_success;
use crate::rag::RagService;
use crate::replay;
use crate::replay::BatchReplayer;
use crate::AppConfig;
use crate::Result;

/// Handle the replay command: run every scripted dialogue through the live
/// pipeline and persist the batch result file for later evaluation.
pub async fn handle_replay_command(config: &AppConfig, input: Option<PathBuf>) -> Result<()> {
    let input_path = input.unwrap_or_else(|| config.paths.dialogues_file.clone());
    let dialogues = replay::load_dialogues(&input_path)?;

    let rag = Arc::new(RagService::new(config)?);
    let replayer = BatchReplayer::from_config(config, rag);

    let input_name = input_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let batch = replayer.replay_all(&dialogues, input_name).await;
    let path = replayer.save(&batch)?;

    print_batch_summary(&batch);
    print_success(&format!("Batch results saved to {}", path.display()));
    Ok(())
}
