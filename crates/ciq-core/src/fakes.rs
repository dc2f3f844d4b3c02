//! In-memory fakes for the source traits (testing only)
//!
//! `StaticRetrieval` and `StaticGeneration` answer every call with fixed
//! data and remember what they were asked. `FailingRetrieval` and
//! `FailingGeneration` always error.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::{CiqError, CiqResult};
use crate::sources::{GenerationSource, RetrievalHit, RetrievalSource};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// StaticRetrieval
// ---------------------------------------------------------------------------

/// Returns the same ranked hits for every query, truncated to `top_k`.
#[derive(Debug, Default)]
pub struct StaticRetrieval {
    hits: Vec<RetrievalHit>,
    queries: Mutex<Vec<String>>,
}

impl StaticRetrieval {
    /// Hits must already be ordered best first.
    pub fn new(hits: Vec<RetrievalHit>) -> Self {
        Self {
            hits,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Commands ranked best first with descending synthetic scores.
    pub fn from_commands<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let hits = commands
            .into_iter()
            .enumerate()
            .map(|(rank, cmd)| RetrievalHit::new(cmd, 1.0 - rank as f32 * 0.01))
            .collect();
        Self::new(hits)
    }

    /// A source whose corpus has no match for anything.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Queries received so far, in call order.
    pub fn queries(&self) -> Vec<String> {
        lock(&self.queries).clone()
    }
}

#[async_trait]
impl RetrievalSource for StaticRetrieval {
    async fn search(&self, query: &str, top_k: usize) -> CiqResult<Vec<RetrievalHit>> {
        lock(&self.queries).push(query.to_string());
        Ok(self.hits.iter().take(top_k).cloned().collect())
    }

    fn describe(&self) -> String {
        format!("static retrieval ({} hits)", self.hits.len())
    }
}

// ---------------------------------------------------------------------------
// StaticGeneration
// ---------------------------------------------------------------------------

/// Returns the same raw output for every prompt.
#[derive(Debug)]
pub struct StaticGeneration {
    output: String,
    prompts: Mutex<Vec<String>>,
}

impl StaticGeneration {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }
}

#[async_trait]
impl GenerationSource for StaticGeneration {
    async fn generate(&self, prompt: &str) -> CiqResult<String> {
        lock(&self.prompts).push(prompt.to_string());
        Ok(self.output.clone())
    }

    fn describe(&self) -> String {
        "static generation".to_string()
    }
}

// ---------------------------------------------------------------------------
// Failing sources
// ---------------------------------------------------------------------------

/// Retrieval that always fails with the given message.
#[derive(Debug, Clone)]
pub struct FailingRetrieval {
    message: String,
}

impl FailingRetrieval {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl RetrievalSource for FailingRetrieval {
    async fn search(&self, _query: &str, _top_k: usize) -> CiqResult<Vec<RetrievalHit>> {
        Err(CiqError::retrieval(self.message.clone()))
    }
}

/// Generation that always fails with the given message.
#[derive(Debug, Clone)]
pub struct FailingGeneration {
    message: String,
}

impl FailingGeneration {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl GenerationSource for FailingGeneration {
    async fn generate(&self, _prompt: &str) -> CiqResult<String> {
        Err(CiqError::generation(self.message.clone()))
    }
}
