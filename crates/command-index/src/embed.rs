//! Text embedders.
//!
//! - `OllamaEmbedder`: model embeddings from a local Ollama server. Tries the
//!   batched `/api/embed` endpoint first and falls back to per-item
//!   `/api/embeddings` for older servers.
//! - `HashEmbedder`: deterministic signed token hashing. Needs no model and is
//!   what tests and offline setups use.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use ciq_core::{normalize_ollama_host, DEFAULT_OLLAMA_HOST};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{IndexError, IndexResult};

/// Default vector width for [`HashEmbedder`].
pub const DEFAULT_HASH_DIM: usize = 256;

pub const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";

/// Turns texts into vectors of one fixed width.
///
/// Guarantees:
/// - returns exactly one vector per input, in input order
/// - every vector from one embedder has the same length
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> IndexResult<Vec<Vec<f32>>>;

    /// Label for logs.
    fn name(&self) -> String;
}

/// Which embedder backs the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    Ollama,
    Hash,
}

impl FromStr for EmbedderKind {
    type Err = IndexError;

    fn from_str(s: &str) -> IndexResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(EmbedderKind::Ollama),
            "hash" => Ok(EmbedderKind::Hash),
            other => Err(IndexError::Config(format!(
                "unknown embedder {other:?} (expected \"ollama\" or \"hash\")"
            ))),
        }
    }
}

impl std::fmt::Display for EmbedderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbedderKind::Ollama => write!(f, "ollama"),
            EmbedderKind::Hash => write!(f, "hash"),
        }
    }
}

/// Scale `v` to unit length in place. Returns `false` (leaving `v` untouched)
/// for the zero vector.
pub fn l2_normalize(v: &mut [f32]) -> bool {
    let norm2: f32 = v.iter().map(|x| x * x).sum();
    if norm2 <= 0.0 || !norm2.is_finite() {
        return false;
    }
    let inv = 1.0 / norm2.sqrt();
    for x in v.iter_mut() {
        *x *= inv;
    }
    true
}

// ---------------------------------------------------------------------------
// HashEmbedder
// ---------------------------------------------------------------------------

/// Signed feature hashing over lowercase word tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashEmbedder {
    dim: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self {
            dim: DEFAULT_HASH_DIM,
        }
    }
}

impl HashEmbedder {
    pub fn new(dim: usize) -> IndexResult<Self> {
        if dim == 0 {
            return Err(IndexError::Config("hash dimension must be positive".into()));
        }
        Ok(Self { dim })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Embed one text. Unit length unless the text has no tokens.
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dim];
        for token in tokenize(text) {
            let h = fnv1a64(&token);
            let idx = (h % self.dim as u64) as usize;
            let sign = if (h >> 32) & 1 == 0 { 1.0 } else { -1.0 };
            v[idx] += sign;
        }
        l2_normalize(&mut v);
        v
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, texts: &[String]) -> IndexResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn name(&self) -> String {
        format!("hash/{}", self.dim)
    }
}

/// Lowercase runs of alphanumerics, `-` and `_`, so flags like `-la` survive.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn fnv1a64(s: &str) -> u64 {
    let mut h: u64 = 14695981039346656037;
    for b in s.as_bytes() {
        h ^= *b as u64;
        h = h.wrapping_mul(1099511628211);
    }
    h
}

// ---------------------------------------------------------------------------
// OllamaEmbedder
// ---------------------------------------------------------------------------

/// Ollama embedding configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaEmbedConfig {
    pub host: String,
    pub model: String,
    /// Per-request timeout; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for OllamaEmbedConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_OLLAMA_HOST.to_string(),
            model: DEFAULT_EMBED_MODEL.to_string(),
            timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl OllamaEmbedConfig {
    pub fn new(host: &str, model: &str) -> Self {
        Self {
            host: normalize_ollama_host(host),
            model: model.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
    truncate: bool,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct LegacyEmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct LegacyEmbeddingsResponse {
    embedding: Vec<f32>,
}

/// Embeddings from a local Ollama server.
pub struct OllamaEmbedder {
    config: OllamaEmbedConfig,
    http_client: reqwest::Client,
}

impl OllamaEmbedder {
    pub fn new(config: OllamaEmbedConfig) -> IndexResult<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("ciq-command-index/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            config,
            http_client: builder.build()?,
        })
    }

    pub fn config(&self) -> &OllamaEmbedConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", normalize_ollama_host(&self.config.host), path)
    }

    async fn embed_legacy(&self, texts: &[String]) -> IndexResult<Vec<Vec<f32>>> {
        let url = self.url("/api/embeddings");
        let mut out = Vec::with_capacity(texts.len());

        for text in texts {
            let body = LegacyEmbeddingsRequest {
                model: &self.config.model,
                prompt: text,
            };
            let resp = self
                .http_client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| unreachable_host(&url, e))?;

            let status = resp.status();
            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                return Err(IndexError::Http(format!("ollama {status}: {text}")));
            }

            let parsed: LegacyEmbeddingsResponse = resp.json().await.map_err(|e| {
                IndexError::Embedding(format!("/api/embeddings returned invalid JSON: {e}"))
            })?;
            out.push(parsed.embedding);
        }

        Ok(out)
    }
}

fn unreachable_host(url: &str, err: reqwest::Error) -> IndexError {
    IndexError::Http(format!(
        "failed to reach ollama at {url} ({err}); is `ollama serve` running? set OLLAMA_HOST otherwise"
    ))
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, texts: &[String]) -> IndexResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.url("/api/embed");
        let body = EmbedRequest {
            model: &self.config.model,
            input: texts,
            truncate: true,
        };

        let resp = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| unreachable_host(&url, e))?;

        if !resp.status().is_success() {
            debug!(status = %resp.status(), "/api/embed unsupported, using /api/embeddings");
            return self.embed_legacy(texts).await;
        }

        let parsed: EmbedResponse = resp
            .json()
            .await
            .map_err(|e| IndexError::Embedding(format!("/api/embed returned invalid JSON: {e}")))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(IndexError::Embedding(format!(
                "/api/embed returned {} embeddings for {} inputs",
                parsed.embeddings.len(),
                texts.len()
            )));
        }
        Ok(parsed.embeddings)
    }

    fn name(&self) -> String {
        format!("ollama/{}", self.config.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_hash_embedding_is_deterministic_and_unit_length() {
        let e = HashEmbedder::default();
        let a = e.embed_one("List all files");
        let b = e.embed_one("list   ALL files");
        assert_eq!(a, b);
        assert_eq!(a.len(), DEFAULT_HASH_DIM);
        assert!((dot(&a, &a) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_hash_embedding_ranks_overlap_higher() {
        let e = HashEmbedder::default();
        let q = e.embed_one("show disk space");
        let near = e.embed_one("show free disk space");
        let far = e.embed_one("list running processes");
        assert!(dot(&q, &near) > dot(&q, &far));
    }

    #[test]
    fn test_hash_embedding_of_blank_text_is_zero() {
        let v = HashEmbedder::new(8).unwrap().embed_one("  ... ");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_hash_dim_must_be_positive() {
        assert!(matches!(HashEmbedder::new(0), Err(IndexError::Config(_))));
    }

    #[test]
    fn test_tokenize_keeps_flags() {
        let tokens: Vec<String> = tokenize("ls -la /tmp/My_Dir").collect();
        assert_eq!(tokens, vec!["ls", "-la", "tmp", "my_dir"]);
    }

    #[test]
    fn test_embedder_kind_parse() {
        assert_eq!("ollama".parse::<EmbedderKind>().unwrap(), EmbedderKind::Ollama);
        assert_eq!(" HASH ".parse::<EmbedderKind>().unwrap(), EmbedderKind::Hash);
        assert!("faiss".parse::<EmbedderKind>().is_err());
        assert_eq!(EmbedderKind::Hash.to_string(), "hash");
    }

    #[test]
    fn test_embed_request_shape() {
        let input = vec!["ls -la".to_string(), "df -h".to_string()];
        let body = serde_json::to_value(EmbedRequest {
            model: "nomic-embed-text",
            input: &input,
            truncate: true,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "model": "nomic-embed-text",
                "input": ["ls -la", "df -h"],
                "truncate": true
            })
        );
    }

    #[tokio::test]
    async fn test_unreachable_ollama_is_http_error() {
        let config = OllamaEmbedConfig {
            timeout: Some(Duration::from_secs(2)),
            ..OllamaEmbedConfig::new("127.0.0.1:1", "nomic-embed-text")
        };
        let embedder = OllamaEmbedder::new(config).unwrap();
        let err = embedder.embed(&["ls".to_string()]).await.unwrap_err();
        assert!(matches!(err, IndexError::Http(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_ollama_empty_batch_skips_network() {
        let embedder = OllamaEmbedder::new(OllamaEmbedConfig::new("127.0.0.1:1", "m")).unwrap();
        assert!(embedder.embed(&[]).await.unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn prop_l2_normalize_yields_unit_or_zero(v in proptest::collection::vec(-100.0f32..100.0, 1..32)) {
            let mut v = v;
            if l2_normalize(&mut v) {
                let n: f32 = v.iter().map(|x| x * x).sum();
                prop_assert!((n - 1.0).abs() < 1e-3);
            } else {
                prop_assert!(v.iter().all(|x| *x == 0.0));
            }
        }
    }
}
