use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndoRagError {
    #[error("knowledge store unavailable: {0}")]
    RetrievalUnavailable(String),

    #[error("reranker output could not be parsed: {0}")]
    RerankParse(String),

    #[error("generation provider unavailable: {0}")]
    GenerationUnavailable(String),

    #[error("judge output could not be parsed: {0}")]
    JudgeParse(String),

    #[error("embedding model mismatch: corpus was built with '{corpus}', configured model is '{configured}'")]
    ConfigMismatch { corpus: String, configured: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IndoRagError {
    /// Short machine-readable kind, recorded on failed dialogue turns.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RetrievalUnavailable(_) => "retrieval_unavailable",
            Self::RerankParse(_) => "rerank_parse_error",
            Self::GenerationUnavailable(_) => "generation_unavailable",
            Self::JudgeParse(_) => "judge_parse_error",
            Self::ConfigMismatch { .. } => "config_mismatch",
            Self::Config(_) => "config_error",
            Self::Embedding(_) => "embedding_error",
            Self::Http(_) => "http_error",
            Self::Serialization(_) => "serialization_error",
            Self::TomlParsing(_) => "toml_error",
            Self::Io(_) => "io_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, IndoRagError>;
