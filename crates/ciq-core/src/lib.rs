//! CIQ Core Library
//!
//! Turns a natural-language query into one shell command by fusing a
//! corpus lookup with a generated guess, then runs it once confirmed.
//!
//! ## Key Components
//!
//! - `normalize` / `clean`: pure text fix-ups for queries and generated commands
//! - `fusion`: decides between the retrieval and generation candidates
//! - `CommandPredictor`: runs both sources concurrently and fuses their output
//! - `ShellExecutor`: runs a `ConfirmedCommand` through `sh -c`
//! - `RetrievalSource` / `GenerationSource`: seams for the two predictors

pub mod candidate;
pub mod clean;
pub mod config;
pub mod error;
pub mod executor;
pub mod explain;
pub mod fakes;
pub mod fusion;
pub mod normalize;
pub mod obs;
pub mod predictor;
pub mod sources;
pub mod telemetry;

pub use candidate::{CandidateCommand, CandidateSource, ConfirmedCommand, FinalCommand};
pub use clean::clean;
pub use config::{
    normalize_ollama_host, CiqConfig, DEFAULT_OLLAMA_HOST, DEFAULT_PROMPT_PREFIX, DEFAULT_TOP_K,
};
pub use error::{CiqError, CiqResult};
pub use executor::{ExecutionOutcome, ShellExecutor, DEFAULT_SHELL};
pub use explain::explain;
pub use fusion::{
    decide, fuse, select, word_set_similarity, FusionPolicy, FusionVerdict,
    DEFAULT_SIMILARITY_THRESHOLD,
};
pub use normalize::normalize;
pub use predictor::{CommandPredictor, PredictionReport};
pub use sources::{GenerationSource, RetrievalHit, RetrievalSource};
pub use telemetry::init_tracing;
