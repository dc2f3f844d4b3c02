//! Orchestration settings.

use serde::{Deserialize, Serialize};

use crate::error::{CiqError, CiqResult};
use crate::executor::DEFAULT_SHELL;
use crate::fusion::{FusionPolicy, DEFAULT_SIMILARITY_THRESHOLD};

/// Number of corpus matches requested per query.
pub const DEFAULT_TOP_K: usize = 5;

/// Prompt prefix the generation model was trained with.
pub const DEFAULT_PROMPT_PREFIX: &str = "translate: ";

/// Ollama server both sources talk to unless `OLLAMA_HOST` says otherwise.
pub const DEFAULT_OLLAMA_HOST: &str = "http://127.0.0.1:11434";

/// Add a scheme when missing and drop trailing slashes. Blank means the
/// IPv4 loopback default.
pub fn normalize_ollama_host(host: &str) -> String {
    let host = host.trim();
    if host.is_empty() {
        return DEFAULT_OLLAMA_HOST.to_string();
    }
    let host = if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    };
    host.trim_end_matches('/').to_string()
}

/// Settings for [`crate::CommandPredictor`] and the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CiqConfig {
    pub top_k: usize,
    pub prompt_prefix: String,
    pub shell: String,
    pub fusion: FusionPolicy,
}

impl Default for CiqConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            prompt_prefix: DEFAULT_PROMPT_PREFIX.to_string(),
            shell: DEFAULT_SHELL.to_string(),
            fusion: FusionPolicy::default(),
        }
    }
}

impl CiqConfig {
    /// Create from environment variables.
    ///
    /// Reads (all optional):
    /// - CIQ_TOP_K (default: 5, must be at least 1)
    /// - CIQ_PROMPT_PREFIX (default: "translate: ")
    /// - CIQ_SHELL (default: "sh")
    /// - CIQ_SIMILARITY_THRESHOLD (default: 0.6, within [0, 1])
    pub fn from_env() -> CiqResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`CiqConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> CiqResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("CIQ_TOP_K") {
            config = config.with_top_k(parse_var("CIQ_TOP_K", &raw)?)?;
        }
        if let Some(prefix) = lookup("CIQ_PROMPT_PREFIX") {
            config.prompt_prefix = prefix;
        }
        if let Some(shell) = lookup("CIQ_SHELL") {
            if shell.trim().is_empty() {
                return Err(CiqError::Config("CIQ_SHELL must not be empty".into()));
            }
            config.shell = shell;
        }
        let threshold = match lookup("CIQ_SIMILARITY_THRESHOLD") {
            Some(raw) => parse_var("CIQ_SIMILARITY_THRESHOLD", &raw)?,
            None => DEFAULT_SIMILARITY_THRESHOLD,
        };
        config.fusion = FusionPolicy::new(threshold)?;

        Ok(config)
    }

    pub fn with_top_k(mut self, top_k: usize) -> CiqResult<Self> {
        if top_k == 0 {
            return Err(CiqError::Config("top_k must be at least 1".into()));
        }
        self.top_k = top_k;
        Ok(self)
    }

    pub fn with_prompt_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prompt_prefix = prefix.into();
        self
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn with_fusion(mut self, fusion: FusionPolicy) -> Self {
        self.fusion = fusion;
        self
    }
}

fn parse_var<T>(key: &str, raw: &str) -> CiqResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| CiqError::Config(format!("{key}={raw:?}: {e}")))
}
