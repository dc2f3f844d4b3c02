//! Command corpus file format.
//!
//! ```json
//! {
//!   "version": "ciq_corpus_v1",
//!   "entries": [
//!     { "cmd": "ls -la", "description": "List all files", "embedding": [0.1, ...] },
//!     { "cmd": "df -h", "description": "Show disk space" }
//!   ]
//! }
//! ```
//!
//! Entries without an `embedding` are embedded when the index is built.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{IndexError, IndexResult};

pub const CORPUS_VERSION: &str = "ciq_corpus_v1";

/// SHA-256 digest of the corpus file bytes, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorpusDigest(String);

impl CorpusDigest {
    pub fn from_bytes(data: &[u8]) -> Self {
        use sha2::Digest;
        let mut hasher = Sha256::new();
        hasher.update(data);
        CorpusDigest(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex chars.
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl std::fmt::Display for CorpusDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusEntry {
    pub cmd: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl CorpusEntry {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            description: None,
            embedding: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Text embedded for this entry: the description, else the command.
    pub fn embedding_text(&self) -> &str {
        match self.description.as_deref() {
            Some(d) if !d.trim().is_empty() => d,
            _ => &self.cmd,
        }
    }
}

/// A validated corpus plus the digest of the bytes it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    pub entries: Vec<CorpusEntry>,
    pub digest: CorpusDigest,
}

#[derive(Debug, Deserialize, Serialize)]
struct CorpusFile {
    version: String,
    entries: Vec<CorpusEntry>,
}

impl Corpus {
    /// Parse and validate corpus JSON.
    pub fn from_json(bytes: &[u8]) -> IndexResult<Self> {
        let file: CorpusFile = serde_json::from_slice(bytes)?;

        if file.version != CORPUS_VERSION {
            return Err(IndexError::UnsupportedVersion {
                found: file.version,
                expected: CORPUS_VERSION.to_string(),
            });
        }
        if file.entries.is_empty() {
            return Err(IndexError::EmptyCorpus);
        }
        for (index, entry) in file.entries.iter().enumerate() {
            if entry.cmd.trim().is_empty() {
                return Err(IndexError::InvalidEntry {
                    index,
                    reason: "cmd is blank".into(),
                });
            }
            if matches!(&entry.embedding, Some(v) if v.is_empty()) {
                return Err(IndexError::InvalidEntry {
                    index,
                    reason: "embedding is empty".into(),
                });
            }
        }

        Ok(Self {
            entries: file.entries,
            digest: CorpusDigest::from_bytes(bytes),
        })
    }

    /// Read and validate a corpus file.
    pub async fn load(path: &Path) -> IndexResult<Self> {
        let bytes = tokio::fs::read(path).await?;
        Self::from_json(&bytes)
    }

    /// Serialize entries in the current file format.
    pub fn to_json_pretty(entries: &[CorpusEntry]) -> IndexResult<String> {
        Ok(serde_json::to_string_pretty(&CorpusFile {
            version: CORPUS_VERSION.to_string(),
            entries: entries.to_vec(),
        })?)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_entries_with_and_without_embeddings() {
        let json = br#"{
            "version": "ciq_corpus_v1",
            "entries": [
                {"cmd": "ls -la", "description": "List all files", "embedding": [1.0, 0.0]},
                {"cmd": "df -h"}
            ]
        }"#;
        let corpus = Corpus::from_json(json).unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.entries[0].embedding_text(), "List all files");
        assert_eq!(corpus.entries[1].embedding_text(), "df -h");
        assert!(corpus.entries[1].embedding.is_none());
        assert_eq!(corpus.digest.as_str().len(), 64);
        assert_eq!(corpus.digest.short().len(), 12);
    }

    #[test]
    fn test_digest_tracks_bytes() {
        let a = CorpusDigest::from_bytes(b"one");
        assert_eq!(a, CorpusDigest::from_bytes(b"one"));
        assert_ne!(a, CorpusDigest::from_bytes(b"two"));
    }

    #[test]
    fn test_rejects_wrong_version() {
        let err = Corpus::from_json(br#"{"version":"v0","entries":[{"cmd":"ls"}]}"#).unwrap_err();
        assert!(matches!(err, IndexError::UnsupportedVersion { .. }));
    }

    #[test]
    fn test_rejects_empty_and_blank() {
        let err = Corpus::from_json(br#"{"version":"ciq_corpus_v1","entries":[]}"#).unwrap_err();
        assert!(matches!(err, IndexError::EmptyCorpus));

        let err = Corpus::from_json(
            br#"{"version":"ciq_corpus_v1","entries":[{"cmd":"ls"},{"cmd":"  "}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, IndexError::InvalidEntry { index: 1, .. }));

        let err = Corpus::from_json(
            br#"{"version":"ciq_corpus_v1","entries":[{"cmd":"ls","embedding":[]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, IndexError::InvalidEntry { index: 0, .. }));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            Corpus::from_json(b"[1, 2").unwrap_err(),
            IndexError::Json(_)
        ));
    }

    #[test]
    fn test_to_json_round_trips_through_loader() {
        let entries = vec![CorpusEntry::new("pwd").with_description("Print working directory")];
        let json = Corpus::to_json_pretty(&entries).unwrap();
        let corpus = Corpus::from_json(json.as_bytes()).unwrap();
        assert_eq!(corpus.entries, entries);
    }
}
