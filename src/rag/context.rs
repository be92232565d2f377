//! Context assembly from reranked snippets.

use crate::models::Candidate;

/// Assembler for building the prompt context block from the final shortlist.
pub struct ContextAssembler {
    max_context_length: usize,
}

impl ContextAssembler {
    /// Create a new context assembler
    #[must_use]
    pub const fn new(max_context_length: usize) -> Self {
        Self { max_context_length }
    }

    /// Assemble the delimited context block injected ahead of the persona
    /// prompt. Sources are included for citations. Entries that would push
    /// the block over the length budget are dropped from the tail.
    #[must_use]
    pub fn assemble(&self, candidates: &[Candidate]) -> String {
        if candidates.is_empty() {
            return String::new();
        }

        let mut context = String::from("=== RETRIEVED KNOWLEDGE BASE CONTEXT ===\n\n");

        for (idx, candidate) in candidates.iter().enumerate() {
            let entry = format!(
                "[{}] Topic: {}\n    Title: {}\n    Content: {}\n    Source: {}\n\n",
                idx + 1,
                candidate.topic,
                candidate.title,
                candidate.content,
                candidate.source
            );

            if context.len() + entry.len() > self.max_context_length {
                break;
            }

            context.push_str(&entry);
        }

        context.push_str("=== END OF CONTEXT ===\n\n");
        context.push_str("Use the above context to answer the user's question.\n");

        context
    }
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(8000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: u32) -> Candidate {
        Candidate {
            id,
            topic: "Etiquette".to_string(),
            title: format!("Rule {id}"),
            content: "Use your right hand when giving or receiving.".to_string(),
            source: "guidebook".to_string(),
            score: 0.9,
            rank: id,
        }
    }

    #[test]
    fn test_empty_candidates_give_empty_context() {
        let assembler = ContextAssembler::default();
        assert_eq!(assembler.assemble(&[]), "");
    }

    #[test]
    fn test_context_contains_numbered_entries_and_sources() {
        let assembler = ContextAssembler::default();
        let context = assembler.assemble(&[candidate(1), candidate(2)]);

        assert!(context.starts_with("=== RETRIEVED KNOWLEDGE BASE CONTEXT ==="));
        assert!(context.contains("[1] Topic: Etiquette"));
        assert!(context.contains("[2] Topic: Etiquette"));
        assert!(context.contains("Source: guidebook"));
        assert!(context.contains("=== END OF CONTEXT ==="));
    }

    #[test]
    fn test_length_budget_drops_tail_entries() {
        let assembler = ContextAssembler::new(200);
        let context = assembler.assemble(&[candidate(1), candidate(2), candidate(3)]);
        assert!(context.contains("[1]"));
        assert!(!context.contains("[3]"));
    }
}
