//! Error taxonomy for the CIQ orchestration layer.

use crate::candidate::CandidateSource;

/// Errors produced while turning a query into a command and running it.
#[derive(Debug, thiserror::Error)]
pub enum CiqError {
    #[error("query is empty")]
    EmptyQuery,

    #[error("no command could be generated for the query")]
    EmptyPrediction,

    #[error("failed to launch `{shell}`: {reason}")]
    LaunchFailure { shell: String, reason: String },

    #[error("{source_kind} source failed: {message}")]
    Source {
        source_kind: CandidateSource,
        message: String,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CiqError {
    /// Shorthand for a retrieval-side failure.
    pub fn retrieval(message: impl Into<String>) -> Self {
        CiqError::Source {
            source_kind: CandidateSource::Retrieval,
            message: message.into(),
        }
    }

    /// Shorthand for a generation-side failure.
    pub fn generation(message: impl Into<String>) -> Self {
        CiqError::Source {
            source_kind: CandidateSource::Generation,
            message: message.into(),
        }
    }
}

/// Result type for CIQ core operations.
pub type CiqResult<T> = std::result::Result<T, CiqError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ciq_error_display() {
        assert_eq!(CiqError::EmptyQuery.to_string(), "query is empty");
        assert!(CiqError::EmptyPrediction
            .to_string()
            .contains("no command could be generated"));

        let err = CiqError::LaunchFailure {
            shell: "/bin/nosuchshell".to_string(),
            reason: "No such file or directory".to_string(),
        };
        assert!(err.to_string().contains("failed to launch `/bin/nosuchshell`"));
    }

    #[test]
    fn test_source_error_names_the_side() {
        let err = CiqError::retrieval("corpus unavailable");
        assert_eq!(err.to_string(), "retrieval source failed: corpus unavailable");

        let err = CiqError::generation("connection refused");
        assert_eq!(err.to_string(), "generation source failed: connection refused");
    }

    #[test]
    fn test_serialization_error_converts() {
        let bad = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: CiqError = bad.into();
        assert!(err.to_string().starts_with("serialization error"));
    }
}
