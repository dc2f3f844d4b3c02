//! Ollama `/api/generate` client used as the generation source.

use std::time::Duration;

use async_trait::async_trait;
use ciq_core::{normalize_ollama_host, CiqResult, GenerationSource, DEFAULT_OLLAMA_HOST};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GenError, GenResult};

pub const DEFAULT_GEN_MODEL: &str = "ciq-t5";
pub const DEFAULT_MAX_TOKENS: u32 = 64;

/// Generation model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenConfig {
    /// Ollama base URL
    pub host: String,
    /// Model tag served by Ollama
    pub model: String,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
    /// Per-request timeout
    pub timeout: Option<Duration>,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_OLLAMA_HOST.to_string(),
            model: DEFAULT_GEN_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: Some(Duration::from_secs(60)),
        }
    }
}

impl GenConfig {
    /// Create from environment variables.
    ///
    /// Reads OLLAMA_HOST, CIQ_GEN_MODEL and CIQ_GEN_MAX_TOKENS.
    pub fn from_env() -> GenResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> GenResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(host) = lookup("OLLAMA_HOST") {
            config.host = host;
        }
        if let Some(model) = lookup("CIQ_GEN_MODEL") {
            config.model = model;
        }
        if let Some(raw) = lookup("CIQ_GEN_MAX_TOKENS") {
            let max_tokens = raw
                .trim()
                .parse()
                .map_err(|e| GenError::Config(format!("CIQ_GEN_MAX_TOKENS={raw:?}: {e}")))?;
            config = config.with_max_tokens(max_tokens)?;
        }
        Ok(config)
    }

    pub fn new(host: &str, model: &str) -> Self {
        Self {
            host: host.to_string(),
            model: model.to_string(),
            ..Self::default()
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> GenResult<Self> {
        if max_tokens == 0 {
            return Err(GenError::Config("max_tokens must be at least 1".into()));
        }
        self.max_tokens = max_tokens;
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// `host` with a scheme and without trailing slashes.
    pub fn base_url(&self) -> String {
        normalize_ollama_host(&self.host)
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Generates commands with a model served by Ollama.
///
/// Decoding is greedy (temperature 0) so the same prompt yields the same
/// command.
pub struct OllamaGenerator {
    config: GenConfig,
    http_client: reqwest::Client,
}

impl OllamaGenerator {
    pub fn new(config: GenConfig) -> GenResult<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("ciq-command-gen/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            config,
            http_client: builder.build()?,
        })
    }

    pub fn from_env() -> GenResult<Self> {
        Self::new(GenConfig::from_env()?)
    }

    pub fn config(&self) -> &GenConfig {
        &self.config
    }

    fn request<'a>(&'a self, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: 0.0,
                num_predict: self.config.max_tokens,
            },
        }
    }

    /// Send one prompt and return the raw completion.
    pub async fn complete(&self, prompt: &str) -> GenResult<String> {
        let url = format!("{}/api/generate", self.config.base_url());
        debug!(url = %url, model = %self.config.model, "generating command");

        let resp = self
            .http_client
            .post(&url)
            .json(&self.request(prompt))
            .send()
            .await
            .map_err(|e| {
                GenError::Http(format!(
                    "failed to reach ollama at {url} ({e}); is `ollama serve` running? set OLLAMA_HOST otherwise"
                ))
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GenError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = resp.text().await?;
        let parsed: GenerateResponse = serde_json::from_str(&text)?;
        Ok(parsed.response)
    }
}

#[async_trait]
impl GenerationSource for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> CiqResult<String> {
        Ok(self.complete(prompt).await?)
    }

    fn describe(&self) -> String {
        format!("ollama/{}", self.config.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_and_overrides() {
        assert_eq!(GenConfig::from_lookup(|_| None).unwrap(), GenConfig::default());

        let config = GenConfig::from_lookup(|key| match key {
            "OLLAMA_HOST" => Some("localhost:9999/".into()),
            "CIQ_GEN_MODEL" => Some("codet5-bash".into()),
            "CIQ_GEN_MAX_TOKENS" => Some("128".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.base_url(), "http://localhost:9999");
        assert_eq!(config.model, "codet5-bash");
        assert_eq!(config.max_tokens, 128);
    }

    #[test]
    fn test_base_url_matches_retrieval_side_host() {
        for host in ["", "gpu-box:11434/", "https://ollama.internal//"] {
            let config = GenConfig::new(host, DEFAULT_GEN_MODEL);
            assert_eq!(config.base_url(), normalize_ollama_host(host), "{host:?}");
        }
        assert_eq!(GenConfig::new("", "m").base_url(), DEFAULT_OLLAMA_HOST);
    }

    #[test]
    fn test_config_rejects_bad_max_tokens() {
        for raw in ["0", "-1", "many"] {
            let err = GenConfig::from_lookup(|k| (k == "CIQ_GEN_MAX_TOKENS").then(|| raw.into()))
                .unwrap_err();
            assert!(matches!(err, GenError::Config(_)), "{raw}: {err:?}");
        }
    }

    #[test]
    fn test_request_shape() {
        let generator = OllamaGenerator::new(GenConfig::default()).unwrap();
        let body = serde_json::to_value(generator.request("translate: List files")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "model": "ciq-t5",
                "prompt": "translate: List files",
                "stream": false,
                "options": { "temperature": 0.0, "num_predict": 64 }
            })
        );
    }

    #[test]
    fn test_response_parses_and_keeps_raw_text() {
        let parsed: GenerateResponse =
            serde_json::from_str(r#"{"model":"ciq-t5","response":"find. -name x\n","done":true}"#)
                .unwrap();
        assert_eq!(parsed.response, "find. -name x\n");
    }

    #[test]
    fn test_error_converts_to_generation_source_error() {
        let err: ciq_core::CiqError = GenError::Status {
            status: 404,
            body: "model not found".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "generation source failed: ollama returned 404: model not found"
        );
    }
}
