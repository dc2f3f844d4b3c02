//! Flat inner-product index over unit-length command embeddings.

use std::sync::Arc;

use async_trait::async_trait;
use ciq_core::{CiqResult, RetrievalHit, RetrievalSource};
use tracing::{debug, info};

use crate::corpus::{Corpus, CorpusDigest};
use crate::embed::{l2_normalize, Embedder};
use crate::error::{IndexError, IndexResult};

/// Exhaustive nearest-neighbour search over a loaded corpus.
///
/// Built once, then shared read-only.
pub struct CommandIndex {
    commands: Vec<String>,
    vectors: Vec<Vec<f32>>,
    dim: usize,
    digest: CorpusDigest,
    embedder: Arc<dyn Embedder>,
}

impl std::fmt::Debug for CommandIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandIndex")
            .field("len", &self.commands.len())
            .field("dim", &self.dim)
            .field("digest", &self.digest.short())
            .field("embedder", &self.embedder.name())
            .finish()
    }
}

impl CommandIndex {
    /// Build the index, embedding entries that carry no vector.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if vectors disagree on width, `Embedding` if the
    /// embedder returns the wrong number of vectors, plus embedder failures.
    pub async fn build(corpus: Corpus, embedder: Arc<dyn Embedder>) -> IndexResult<Self> {
        let missing: Vec<usize> = corpus
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.embedding.is_none())
            .map(|(i, _)| i)
            .collect();

        let texts: Vec<String> = missing
            .iter()
            .map(|&i| corpus.entries[i].embedding_text().to_string())
            .collect();
        let computed = embedder.embed(&texts).await?;
        if computed.len() != texts.len() {
            return Err(IndexError::Embedding(format!(
                "{} returned {} vectors for {} texts",
                embedder.name(),
                computed.len(),
                texts.len()
            )));
        }
        debug!(embedded = texts.len(), embedder = %embedder.name(), "embedded corpus entries");

        let mut computed = computed.into_iter();
        let mut commands = Vec::with_capacity(corpus.entries.len());
        let mut vectors = Vec::with_capacity(corpus.entries.len());
        for entry in corpus.entries {
            let vector = match entry.embedding {
                Some(v) => v,
                None => computed.next().ok_or_else(|| {
                    IndexError::Embedding("embedder returned too few vectors".into())
                })?,
            };
            commands.push(entry.cmd);
            vectors.push(vector);
        }

        Self::from_parts(commands, vectors, corpus.digest, embedder)
    }

    fn from_parts(
        commands: Vec<String>,
        mut vectors: Vec<Vec<f32>>,
        digest: CorpusDigest,
        embedder: Arc<dyn Embedder>,
    ) -> IndexResult<Self> {
        let dim = vectors.first().map(Vec::len).ok_or(IndexError::EmptyCorpus)?;
        if dim == 0 {
            return Err(IndexError::Embedding("embedder produced empty vectors".into()));
        }
        for v in vectors.iter_mut() {
            if v.len() != dim {
                return Err(IndexError::DimensionMismatch {
                    expected: dim,
                    found: v.len(),
                });
            }
            l2_normalize(v);
        }

        info!(
            event = "index.loaded",
            commands = commands.len(),
            dim = dim,
            digest = %digest.short(),
            embedder = %embedder.name(),
        );

        Ok(Self {
            commands,
            vectors,
            dim,
            digest,
            embedder,
        })
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn digest(&self) -> &CorpusDigest {
        &self.digest
    }

    /// Rank every command by inner product with `query` (normalized here).
    ///
    /// Ties keep corpus order. At most `top_k` hits.
    pub fn search_vector(&self, query: &[f32], top_k: usize) -> IndexResult<Vec<RetrievalHit>> {
        if query.len() != self.dim {
            return Err(IndexError::DimensionMismatch {
                expected: self.dim,
                found: query.len(),
            });
        }
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let mut q = query.to_vec();
        l2_normalize(&mut q);

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, dot(&q, v)))
            .collect();
        // stable: equal scores stay in corpus order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| RetrievalHit::new(self.commands[i].clone(), score))
            .collect())
    }

    /// Embed `query` and search.
    pub async fn search_text(&self, query: &str, top_k: usize) -> IndexResult<Vec<RetrievalHit>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let embedded = self.embedder.embed(&[query.to_string()]).await?;
        let vector = embedded
            .into_iter()
            .next()
            .ok_or_else(|| IndexError::Embedding("no vector for query".into()))?;
        self.search_vector(&vector, top_k)
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[async_trait]
impl RetrievalSource for CommandIndex {
    async fn search(&self, query: &str, top_k: usize) -> CiqResult<Vec<RetrievalHit>> {
        Ok(self.search_text(query, top_k).await?)
    }

    fn describe(&self) -> String {
        format!(
            "command index ({} commands, {}, corpus {})",
            self.len(),
            self.embedder.name(),
            self.digest.short()
        )
    }
}
