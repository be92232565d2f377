//! Batch evaluation handler

use std::path::PathBuf;

use crate::cli::output::print_eval_summary;
use crate::cli::output::print_info;
use crate::eval::evaluator;
use crate::eval::Evaluator;
use crate::AppConfig;
use crate::Result;

/// Handle the eval command: score a batch result file with retrieval
/// metrics and the LLM judge, defaulting to the newest batch file.
pub async fn handle_eval_command(config: &AppConfig, file: Option<PathBuf>) -> Result<()> {
    let path = match file {
        Some(path) => path,
        None => {
            let latest = evaluator::latest_batch_file(&config.paths.batch_results_dir)?;
            print_info(&format!("Evaluating latest batch file: {}", latest.display()));
            latest
        }
    };

    let eval = Evaluator::from_config(config)?;
    let summary = eval.evaluate_file(&path).await?;
    print_eval_summary(&summary);
    Ok(())
}
