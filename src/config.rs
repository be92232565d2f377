use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::models::Persona;
use crate::models::RagStrategy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub file_output: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    pub endpoint: String,
    pub model: String,
    pub dimension: usize,
    #[serde(default)]
    pub api_key_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub endpoint: String,
    #[serde(default)]
    pub api_key_file: Option<PathBuf>,
    #[serde(default = "default_llm_model")]
    pub model: String,
}

fn default_llm_model() -> String {
    "gpt-5-nano".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankerConfig {
    /// Active strategy, fixed for the lifetime of a conversation.
    #[serde(default)]
    pub strategy: RagStrategy,
    /// HTTP rerank endpoint scoring (query, document) pairs.
    #[serde(default = "default_cross_encoder_endpoint")]
    pub cross_encoder_endpoint: String,
    #[serde(default = "default_cross_encoder_model")]
    pub cross_encoder_model: String,
    /// Model used when the strategy is LLM reranking.
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
}

fn default_cross_encoder_endpoint() -> String {
    "http://localhost:8080".to_string()
}

fn default_cross_encoder_model() -> String {
    "cross-encoder/ms-marco-MiniLM-L-6-v2".to_string()
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            strategy: RagStrategy::default(),
            cross_encoder_endpoint: default_cross_encoder_endpoint(),
            cross_encoder_model: default_cross_encoder_model(),
            llm_model: default_llm_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of vector-search candidates fetched per query.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Number of snippets kept after reranking. Must be <= `top_n`.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_n() -> usize {
    10
}

fn default_top_k() -> usize {
    4
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            top_k: default_top_k(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeConfig {
    #[serde(default = "default_judge_model")]
    pub model: String,
}

fn default_judge_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            model: default_judge_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub corpus_file: PathBuf,
    pub embedded_corpus_file: PathBuf,
    #[serde(default)]
    pub prompts_file: Option<PathBuf>,
    pub dialogues_file: PathBuf,
    pub batch_results_dir: PathBuf,
    pub laaj_results_dir: PathBuf,
    pub eval_results_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            corpus_file: PathBuf::from("data/knowledge_base.json"),
            embedded_corpus_file: PathBuf::from("data/knowledge_base.embedded.json"),
            prompts_file: None,
            dialogues_file: PathBuf::from("data/dialogues/test_dialogues.json"),
            batch_results_dir: PathBuf::from("results/batch"),
            laaj_results_dir: PathBuf::from("results/laaj"),
            eval_results_dir: PathBuf::from("results/eval"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Worker-pool bound for replaying independent dialogues in parallel.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    4
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub embeddings: EmbeddingsConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub reranker: RerankerConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub judge: JudgeConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
    /// Default persona for new conversations.
    #[serde(default)]
    pub persona: Persona,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default config file path
    pub fn load() -> crate::Result<Self> {
        // Try to load from config.toml first, then fall back to config.example.toml
        if Path::new("config.toml").exists() {
            Self::from_file("config.toml")
        } else if Path::new("config.example.toml").exists() {
            tracing::warn!(
                "Using config.example.toml. Please create config.toml for production use."
            );
            Self::from_file("config.example.toml")
        } else {
            Err(crate::IndoRagError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No config file found. Please create config.toml or config.example.toml",
            )))
        }
    }

    /// Check cross-field invariants that serde cannot express.
    pub fn validate(&self) -> crate::Result<()> {
        if self.retrieval.top_k > self.retrieval.top_n {
            return Err(crate::IndoRagError::Config(format!(
                "retrieval.top_k ({}) must not exceed retrieval.top_n ({})",
                self.retrieval.top_k, self.retrieval.top_n
            )));
        }
        if self.replay.concurrency == 0 {
            return Err(crate::IndoRagError::Config(
                "replay.concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Get embedding model name
    pub fn embedding_model(&self) -> &str {
        &self.embeddings.model
    }

    /// Get embedding dimension
    pub fn embedding_dimension(&self) -> usize {
        self.embeddings.dimension
    }

    /// Get LLM endpoint
    pub fn llm_endpoint(&self) -> &str {
        &self.llm.endpoint
    }

    /// Get generation model
    pub fn llm_model(&self) -> &str {
        &self.llm.model
    }

    /// Read the API key for the given key file, if one is configured.
    pub fn read_api_key(path: Option<&Path>) -> crate::Result<Option<String>> {
        match path {
            Some(path) => {
                let key = std::fs::read_to_string(path)?;
                Ok(Some(key.trim().to_string()))
            }
            None => Ok(None),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "info".to_string(),
                file_output: false,
            },
            embeddings: EmbeddingsConfig {
                endpoint: "https://api.openai.com/v1".to_string(),
                model: "text-embedding-3-small".to_string(),
                dimension: 1536,
                api_key_file: Some(PathBuf::from("openai.key")),
            },
            llm: LlmConfig {
                endpoint: "https://api.openai.com/v1".to_string(),
                api_key_file: Some(PathBuf::from("openai.key")),
                model: default_llm_model(),
            },
            reranker: RerankerConfig::default(),
            retrieval: RetrievalConfig::default(),
            judge: JudgeConfig::default(),
            paths: PathsConfig::default(),
            replay: ReplayConfig::default(),
            persona: Persona::default(),
        }
    }
}
