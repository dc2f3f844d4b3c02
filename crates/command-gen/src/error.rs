//! Error types for command-gen

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenError {
    /// Server could not be reached or the request failed in transit
    #[error("HTTP error: {0}")]
    Http(String),

    /// Server answered with a non-success status
    #[error("ollama returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body was not the expected JSON
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for GenError {
    fn from(err: reqwest::Error) -> Self {
        GenError::Http(err.to_string())
    }
}

impl From<GenError> for ciq_core::CiqError {
    fn from(err: GenError) -> Self {
        ciq_core::CiqError::generation(err.to_string())
    }
}

/// Result type for command-gen operations
pub type GenResult<T> = std::result::Result<T, GenError>;
