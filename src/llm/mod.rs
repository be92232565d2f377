//! Chat-completion client for answer generation, LLM reranking and judging.

pub mod prompts;

pub use prompts::PromptLibrary;
pub use prompts::PromptTemplate;

use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::config::AppConfig;
use crate::errors::IndoRagError;
use crate::errors::Result;
use crate::retry::send_with_retry;

/// One message in a chat exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Client for an OpenAI-compatible chat-completions endpoint.
///
/// One instance per model: the generator, the LLM reranker and the judge
/// each get their own service so models can differ per concern.
pub struct LlmService {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl LlmService {
    pub fn new(endpoint: String, api_key: Option<String>, model: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| IndoRagError::Http(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            model,
        })
    }

    /// Build the generation client from the application configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = AppConfig::read_api_key(config.llm.api_key_file.as_deref())?;
        Self::new(
            config.llm.endpoint.clone(),
            api_key,
            config.llm.model.clone(),
        )
    }

    /// Same endpoint and credentials, different model. Used for the LLM
    /// reranker and the judge.
    pub fn from_config_with_model(config: &AppConfig, model: &str) -> Result<Self> {
        let api_key = AppConfig::read_api_key(config.llm.api_key_file.as_deref())?;
        Self::new(config.llm.endpoint.clone(), api_key, model.to_string())
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one chat request and return the assistant's reply.
    ///
    /// Provider or network failure maps to `GenerationUnavailable`; the
    /// caller decides whether that is fatal (generation) or degradable
    /// (reranking).
    pub async fn chat(
        &self,
        system_prompt: Option<&str>,
        history: &[ChatMessage],
        user_message: &str,
    ) -> Result<String> {
        #[derive(Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: Vec<&'a ChatMessage>,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: ResponseMessage,
        }

        #[derive(Deserialize)]
        struct ResponseMessage {
            content: Option<String>,
        }

        let system = system_prompt.map(ChatMessage::system);
        let user = ChatMessage::user(user_message);

        let mut messages: Vec<&ChatMessage> = Vec::with_capacity(history.len() + 2);
        if let Some(system) = &system {
            messages.push(system);
        }
        messages.extend(history);
        messages.push(&user);

        let url = format!("{}/chat/completions", self.endpoint);
        debug!(
            "Calling chat completions: model={}, {} messages",
            self.model,
            messages.len()
        );

        let request = ChatRequest {
            model: &self.model,
            messages,
        };

        let response = send_with_retry("chat completion", || {
            let mut builder = self
                .client
                .post(&url)
                .header("Content-Type", "application/json")
                .json(&request);
            if let Some(api_key) = &self.api_key {
                builder = builder.header("Authorization", format!("Bearer {api_key}"));
            }
            builder.send()
        })
        .await
        .map_err(|e| IndoRagError::GenerationUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(IndoRagError::GenerationUnavailable(format!(
                "provider error ({status}): {error_text}"
            )));
        }

        let result: ChatResponse = response.json().await.map_err(|e| {
            IndoRagError::GenerationUnavailable(format!("Failed to parse response: {e}"))
        })?;

        result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.is_empty())
            .ok_or_else(|| {
                IndoRagError::GenerationUnavailable("empty completion from provider".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_roles() {
        assert_eq!(ChatMessage::system("s").role, "system");
        assert_eq!(ChatMessage::user("u").role, "user");
        assert_eq!(ChatMessage::assistant("a").role, "assistant");
    }

    #[tokio::test]
    #[ignore = "Requires API key"]
    async fn test_chat_completion() {
        let service = LlmService::new(
            "https://api.openai.com/v1".to_string(),
            std::env::var("OPENAI_API_KEY").ok(),
            "gpt-4o-mini".to_string(),
        )
        .unwrap();

        let answer = service
            .chat(Some("Answer in one word."), &[], "What is the capital of Indonesia?")
            .await
            .unwrap();
        assert!(!answer.is_empty());
    }
}
