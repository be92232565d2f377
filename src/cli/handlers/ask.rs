//! One-shot question handler

use crate::cli::output::print_turn;
use crate::models::Conversation;
use crate::rag::RagService;
use crate::AppConfig;
use crate::Result;

/// Handle the ask command: run one question through retrieve, rerank and
/// generate, then print the answer (and the candidate lists when asked).
pub async fn handle_ask_command(config: &AppConfig, question: &str, detailed: bool) -> Result<()> {
    let rag = RagService::new(config)?;
    let mut conversation = Conversation::new(config.persona, config.reranker.strategy);

    let turn = rag.answer(&mut conversation, question).await;
    print_turn(&turn, detailed);

    if let Some(kind) = &turn.error {
        return Err(crate::IndoRagError::Config(format!(
            "turn failed with {kind}"
        )));
    }
    Ok(())
}
