//! Error types for command-index

use thiserror::Error;

/// Errors raised while loading the corpus or searching it.
#[derive(Error, Debug)]
pub enum IndexError {
    /// Corpus file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Corpus file is not valid JSON for the expected shape
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Corpus declares a format version we do not read
    #[error("unsupported corpus version: {found} (expected {expected})")]
    UnsupportedVersion { found: String, expected: String },

    /// Corpus has no entries
    #[error("corpus contains no commands")]
    EmptyCorpus,

    /// An entry is unusable
    #[error("corpus entry {index} is invalid: {reason}")]
    InvalidEntry { index: usize, reason: String },

    /// Vector length differs from the index dimension
    #[error("embedding dimension mismatch: expected {expected}, got {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// Embedding backend returned something unusable
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// HTTP error (for the Ollama API)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for IndexError {
    fn from(err: reqwest::Error) -> Self {
        IndexError::Http(err.to_string())
    }
}

impl From<IndexError> for ciq_core::CiqError {
    fn from(err: IndexError) -> Self {
        ciq_core::CiqError::retrieval(err.to_string())
    }
}

/// Result type for command-index operations
pub type IndexResult<T> = std::result::Result<T, IndexError>;
