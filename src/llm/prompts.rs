//! Prompt templates and the persona/rubric prompt library.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::errors::Result;
use crate::models::Persona;

/// Template for generating prompts
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
    variables: Vec<String>,
}

impl PromptTemplate {
    /// Create a new prompt template
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        let variables = extract_variables(&template);
        Self {
            template,
            variables,
        }
    }

    /// Fill in the template with variables
    #[must_use]
    pub fn render(&self, values: &HashMap<String, String>) -> String {
        let mut result = self.template.clone();
        for var in &self.variables {
            if let Some(value) = values.get(var) {
                result = result.replace(&format!("{{{{{var}}}}}"), value);
            }
        }
        result
    }

    /// Get required variables
    #[must_use]
    pub fn variables(&self) -> &[String] {
        &self.variables
    }
}

/// Extract variable names from template
fn extract_variables(template: &str) -> Vec<String> {
    let mut variables = Vec::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '{' && chars.peek() == Some(&'{') {
            chars.next(); // skip second '{'
            let mut var_name = String::new();
            while let Some(&ch) = chars.peek() {
                if ch == '}' {
                    chars.next();
                    if chars.peek() == Some(&'}') {
                        chars.next();
                        break;
                    }
                } else {
                    var_name.push(ch);
                    chars.next();
                }
            }
            if !var_name.is_empty() && !variables.contains(&var_name) {
                variables.push(var_name);
            }
        }
    }

    variables
}

const FALLBACK_PROMPT: &str = "You are a helpful assistant.";

const DEFAULT_NEUTRAL: &str = "You are IndoGuide, a travel assistant for Indonesia. Answer the \
user's questions using the retrieved context above. Cite the snippet source when you rely on it. \
If the context does not cover the question, say so instead of guessing.";

const DEFAULT_FRIENDLY: &str = "You are IndoGuide, a warm and enthusiastic travel companion for \
Indonesia. Answer using the retrieved context above in an upbeat, conversational tone. Cite the \
snippet source when you rely on it. If the context does not cover the question, say so honestly.";

const DEFAULT_PROFESSIONAL: &str = "You are IndoGuide, a concise professional travel consultant \
for Indonesia. Answer precisely using the retrieved context above, citing snippet sources. State \
clearly when the context does not cover the question.";

const DEFAULT_RERANKER_SYSTEM: &str = "You rank knowledge-base documents by their relevance to a \
traveler's question. Respond with document IDs only, most relevant first, separated by commas. \
Do not explain.";

const DEFAULT_RERANKER_USER: &str = "Question: {{query}}\n\nDocuments:\n{{documents}}\nReturn the \
IDs of the {{top_k}} most relevant documents, most relevant first, as a comma-separated list.";

const DEFAULT_JUDGE_PREAMBLE: &str = "You are grading a travel assistant's answer. Respond with \
a JSON object {\"rating\": <integer 1-5>, \"reason\": \"<one sentence>\"} and nothing else.\n\n\
User question: {{user_input}}\n\nAssistant answer: {{system_response}}\n\nRetrieved context:\n\
{{retrieved_snippets}}\n\n";

/// JSON shape of the on-disk prompt file: a list of named prompts whose text
/// is either a string or a list of lines.
#[derive(Deserialize)]
struct PromptEntry {
    name: String,
    prompt: PromptText,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PromptText {
    Single(String),
    Lines(Vec<String>),
}

/// Named prompt repository with built-in defaults.
///
/// Prompts loaded from the optional prompts file override the defaults; a
/// missing key falls back to a generic assistant prompt with a warning, so a
/// typo in a prompt name never takes the pipeline down.
pub struct PromptLibrary {
    entries: HashMap<String, String>,
}

impl PromptLibrary {
    /// Library with only the built-in prompts.
    #[must_use]
    pub fn builtin() -> Self {
        let mut entries = HashMap::new();
        entries.insert(Persona::Neutral.prompt_key().to_string(), DEFAULT_NEUTRAL.to_string());
        entries.insert(
            Persona::Friendly.prompt_key().to_string(),
            DEFAULT_FRIENDLY.to_string(),
        );
        entries.insert(
            Persona::Professional.prompt_key().to_string(),
            DEFAULT_PROFESSIONAL.to_string(),
        );
        entries.insert(
            "llm_reranker_system".to_string(),
            DEFAULT_RERANKER_SYSTEM.to_string(),
        );
        entries.insert(
            "llm_reranker_user".to_string(),
            DEFAULT_RERANKER_USER.to_string(),
        );
        for metric in ["factuality", "faithfulness", "helpfulness", "overall"] {
            entries.insert(
                format!("laaj_{metric}"),
                format!("{DEFAULT_JUDGE_PREAMBLE}Grade the answer's {metric}."),
            );
        }
        Self { entries }
    }

    /// Built-in prompts overlaid with the entries of a prompt file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut library = Self::builtin();
        let content = std::fs::read_to_string(path)?;
        let parsed: Vec<PromptEntry> = serde_json::from_str(&content)?;
        for entry in parsed {
            let text = match entry.prompt {
                PromptText::Single(text) => text,
                PromptText::Lines(lines) => lines.join("\n"),
            };
            library.entries.insert(entry.name, text);
        }
        Ok(library)
    }

    /// Load from the configured prompts file, or just the defaults when no
    /// file is configured.
    pub fn from_config(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::builtin()),
        }
    }

    /// Get a prompt by name, falling back to a generic assistant prompt.
    #[must_use]
    pub fn get(&self, name: &str) -> String {
        self.entries.get(name).cloned().unwrap_or_else(|| {
            warn!("Prompt '{name}' not found, using fallback prompt");
            FALLBACK_PROMPT.to_string()
        })
    }

    /// Get a prompt by name as a renderable template.
    #[must_use]
    pub fn template(&self, name: &str) -> PromptTemplate {
        PromptTemplate::new(self.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_render() {
        let template = PromptTemplate::new("Question: {{query}}\nDocs: {{documents}}");
        assert_eq!(template.variables(), &["query", "documents"]);

        let mut values = HashMap::new();
        values.insert("query".to_string(), "visa rules".to_string());
        values.insert("documents".to_string(), "ID 1: ...".to_string());
        let rendered = template.render(&values);
        assert_eq!(rendered, "Question: visa rules\nDocs: ID 1: ...");
    }

    #[test]
    fn test_builtin_library_has_all_personas() {
        let library = PromptLibrary::builtin();
        for persona in [Persona::Neutral, Persona::Friendly, Persona::Professional] {
            let prompt = library.get(persona.prompt_key());
            assert_ne!(prompt, FALLBACK_PROMPT);
        }
    }

    #[test]
    fn test_missing_prompt_falls_back() {
        let library = PromptLibrary::builtin();
        assert_eq!(library.get("no_such_prompt"), FALLBACK_PROMPT);
    }

    #[test]
    fn test_load_overrides_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompts.json");
        std::fs::write(
            &path,
            r#"[
                {"name": "indoguide_neutral", "prompt": "Custom neutral prompt."},
                {"name": "laaj_factuality", "prompt": ["Line one.", "Line two."]}
            ]"#,
        )
        .unwrap();

        let library = PromptLibrary::load(&path).unwrap();
        assert_eq!(library.get("indoguide_neutral"), "Custom neutral prompt.");
        assert_eq!(library.get("laaj_factuality"), "Line one.\nLine two.");
        // Untouched defaults survive
        assert_ne!(library.get("llm_reranker_user"), FALLBACK_PROMPT);
    }
}
