//! Command Index: the retrieval source for CIQ
//!
//! Loads a JSON corpus of known shell commands, embeds them and answers
//! nearest-neighbour queries with an exhaustive inner-product scan.
//!
//! ## Key Components
//!
//! - `Corpus`: file format, validation and `CorpusDigest`
//! - `Embedder`: `OllamaEmbedder` (model) or `HashEmbedder` (deterministic)
//! - `CommandIndex`: the searchable index, implements `ciq_core::RetrievalSource`

mod config;
pub mod corpus;
pub mod embed;
mod error;
mod index;

pub use config::{IndexConfig, DEFAULT_CORPUS_PATH};
pub use corpus::{Corpus, CorpusDigest, CorpusEntry, CORPUS_VERSION};
pub use embed::{
    l2_normalize, Embedder, EmbedderKind, HashEmbedder, OllamaEmbedConfig, OllamaEmbedder,
};
pub use error::{IndexError, IndexResult};
pub use index::CommandIndex;
