//! Retrieval-side configuration and index bootstrap.

use std::path::PathBuf;
use std::sync::Arc;

use ciq_core::{normalize_ollama_host, DEFAULT_OLLAMA_HOST};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::corpus::Corpus;
use crate::embed::{
    Embedder, EmbedderKind, HashEmbedder, OllamaEmbedConfig, OllamaEmbedder,
    DEFAULT_EMBED_MODEL, DEFAULT_HASH_DIM,
};
use crate::error::{IndexError, IndexResult};
use crate::index::CommandIndex;

pub const DEFAULT_CORPUS_PATH: &str = "./corpus/commands.json";

/// Where the corpus lives and how to embed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub corpus_path: PathBuf,
    pub embedder: EmbedderKind,
    pub embed_model: String,
    pub ollama_host: String,
    pub hash_dim: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            corpus_path: PathBuf::from(DEFAULT_CORPUS_PATH),
            embedder: EmbedderKind::Ollama,
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
            hash_dim: DEFAULT_HASH_DIM,
        }
    }
}

impl IndexConfig {
    /// Create from environment variables.
    ///
    /// Reads CIQ_CORPUS, CIQ_EMBEDDER, CIQ_EMBED_MODEL, OLLAMA_HOST and
    /// CIQ_HASH_DIM; unset ones keep their defaults.
    pub fn from_env() -> IndexResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> IndexResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(path) = lookup("CIQ_CORPUS") {
            config.corpus_path = PathBuf::from(path);
        }
        if let Some(kind) = lookup("CIQ_EMBEDDER") {
            config.embedder = kind.parse()?;
        }
        if let Some(model) = lookup("CIQ_EMBED_MODEL") {
            config.embed_model = model;
        }
        if let Some(host) = lookup("OLLAMA_HOST") {
            config.ollama_host = normalize_ollama_host(&host);
        }
        if let Some(raw) = lookup("CIQ_HASH_DIM") {
            config.hash_dim = raw
                .trim()
                .parse()
                .map_err(|e| IndexError::Config(format!("CIQ_HASH_DIM={raw:?}: {e}")))?;
        }
        Ok(config)
    }

    /// Build the configured embedder.
    pub fn embedder(&self) -> IndexResult<Arc<dyn Embedder>> {
        Ok(match self.embedder {
            EmbedderKind::Hash => Arc::new(HashEmbedder::new(self.hash_dim)?),
            EmbedderKind::Ollama => Arc::new(OllamaEmbedder::new(OllamaEmbedConfig::new(
                &self.ollama_host,
                &self.embed_model,
            ))?),
        })
    }

    /// Load the corpus and build the index.
    pub async fn open(&self) -> IndexResult<CommandIndex> {
        let corpus = Corpus::load(&self.corpus_path).await?;
        info!(
            path = %self.corpus_path.display(),
            entries = corpus.len(),
            digest = %corpus.digest.short(),
            "loaded command corpus"
        );
        CommandIndex::build(corpus, self.embedder()?).await
    }
}
