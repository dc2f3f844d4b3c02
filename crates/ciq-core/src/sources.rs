//! Prediction source traits.
//!
//! The two predictors are opaque collaborators:
//! - `RetrievalSource`: nearest-neighbour lookup over a corpus of known commands
//! - `GenerationSource`: a sequence-to-sequence model synthesizing a command
//!
//! Implementations are loaded once and shared read-only behind `Arc`.
//! In-memory fakes live in the `fakes` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CiqResult;

/// One ranked corpus match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub command: String,
    pub score: f32,
}

impl RetrievalHit {
    pub fn new(command: impl Into<String>, score: f32) -> Self {
        Self {
            command: command.into(),
            score,
        }
    }
}

/// Nearest-neighbour search over known commands.
///
/// Guarantees:
/// - at most `top_k` hits are returned
/// - hits are ordered by descending score
#[async_trait]
pub trait RetrievalSource: Send + Sync {
    async fn search(&self, query: &str, top_k: usize) -> CiqResult<Vec<RetrievalHit>>;

    /// Short label for logs and reports.
    fn describe(&self) -> String {
        "retrieval".to_string()
    }
}

/// Synthesizes one raw, uncleaned command from a prefixed prompt.
#[async_trait]
pub trait GenerationSource: Send + Sync {
    async fn generate(&self, prompt: &str) -> CiqResult<String>;

    fn describe(&self) -> String {
        "generation".to_string()
    }
}
