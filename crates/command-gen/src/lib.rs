//! Command Gen: the generation source for CIQ
//!
//! Prompts a sequence-to-sequence model served by a local Ollama instance
//! and returns its raw completion. Cleaning happens in `ciq-core`.

mod error;
mod ollama;

pub use error::{GenError, GenResult};
pub use ciq_core::DEFAULT_OLLAMA_HOST;
pub use ollama::{GenConfig, OllamaGenerator, DEFAULT_GEN_MODEL, DEFAULT_MAX_TOKENS};
