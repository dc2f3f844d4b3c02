//! Query orchestration.
//!
//! `CommandPredictor` runs one query through both sources concurrently, cleans
//! the generated output and fuses the two candidates. A source that fails is
//! logged and treated as having produced nothing; only when both come up empty
//! does prediction fail.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use crate::candidate::{CandidateCommand, CandidateSource, FinalCommand};
use crate::config::CiqConfig;
use crate::error::{CiqError, CiqResult};
use crate::fusion::{self, FusionVerdict};
use crate::normalize::normalize;
use crate::obs;
use crate::sources::{GenerationSource, RetrievalHit, RetrievalSource};

/// Everything observed while answering one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionReport {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub query: String,
    pub normalized_query: String,
    pub retrieval_hits: Vec<RetrievalHit>,
    pub retrieval_error: Option<String>,
    pub generated_raw: Option<String>,
    pub generated_clean: Option<String>,
    pub generation_error: Option<String>,
    pub verdict: FusionVerdict,
    pub final_command: Option<FinalCommand>,
}

impl PredictionReport {
    /// Best corpus command, if retrieval found any.
    pub fn retrieval_top(&self) -> Option<&str> {
        self.retrieval_hits.first().map(|hit| hit.command.as_str())
    }

    /// The fused command.
    ///
    /// # Errors
    ///
    /// `CiqError::EmptyPrediction` when neither source produced a command.
    pub fn final_command(&self) -> CiqResult<&FinalCommand> {
        self.final_command.as_ref().ok_or(CiqError::EmptyPrediction)
    }

    pub fn into_final_command(self) -> CiqResult<FinalCommand> {
        self.final_command.ok_or(CiqError::EmptyPrediction)
    }

    pub fn to_json_pretty(&self) -> CiqResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Turns natural-language queries into a single shell command.
///
/// Both sources are loaded once by the caller and shared read-only.
#[derive(Clone)]
pub struct CommandPredictor {
    retrieval: Arc<dyn RetrievalSource>,
    generation: Arc<dyn GenerationSource>,
    config: CiqConfig,
}

impl std::fmt::Debug for CommandPredictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandPredictor")
            .field("retrieval", &self.retrieval.describe())
            .field("generation", &self.generation.describe())
            .field("config", &self.config)
            .finish()
    }
}

impl CommandPredictor {
    pub fn new(
        retrieval: Arc<dyn RetrievalSource>,
        generation: Arc<dyn GenerationSource>,
        config: CiqConfig,
    ) -> Self {
        Self {
            retrieval,
            generation,
            config,
        }
    }

    pub fn config(&self) -> &CiqConfig {
        &self.config
    }

    /// Predict the command for `query`.
    ///
    /// # Errors
    ///
    /// `EmptyQuery` for a blank query, `EmptyPrediction` when neither source
    /// produced a usable command.
    pub async fn predict(&self, query: &str) -> CiqResult<FinalCommand> {
        self.report(query).await?.into_final_command()
    }

    /// Run the full pipeline and return the report, even when fusion found
    /// nothing.
    ///
    /// # Errors
    ///
    /// `EmptyQuery` for a blank query. Source failures are recorded in the
    /// report instead of being returned.
    pub async fn report(&self, query: &str) -> CiqResult<PredictionReport> {
        if query.trim().is_empty() {
            return Err(CiqError::EmptyQuery);
        }

        let id = Uuid::new_v4();
        let span = obs::prediction_span(&id.to_string());
        self.run(id, query).instrument(span).await
    }

    async fn run(&self, id: Uuid, query: &str) -> CiqResult<PredictionReport> {
        let id_str = id.to_string();
        let normalized = normalize(query);
        obs::emit_prediction_started(&id_str, &normalized);

        let prompt = format!("{}{}", self.config.prompt_prefix, normalized);

        let (retrieval, generation) = tokio::join!(
            timed(self.retrieval.search(&normalized, self.config.top_k)),
            timed(self.generation.generate(&prompt)),
        );

        let (retrieval_hits, retrieval_error) = match retrieval {
            (Ok(hits), elapsed) => {
                let top = hits.first().map(|h| h.command.as_str()).unwrap_or("");
                obs::emit_source_completed(CandidateSource::Retrieval, top, elapsed);
                (hits, None)
            }
            (Err(e), _) => {
                obs::emit_source_failed(CandidateSource::Retrieval, &e);
                (Vec::new(), Some(e.to_string()))
            }
        };

        let (generated_raw, generated_clean, generation_error) = match generation {
            (Ok(raw), elapsed) => {
                let clean = CandidateCommand::generation(raw.as_str()).cleaned().text;
                obs::emit_source_completed(CandidateSource::Generation, &clean, elapsed);
                (Some(raw), Some(clean), None)
            }
            (Err(e), _) => {
                obs::emit_source_failed(CandidateSource::Generation, &e);
                (None, None, Some(e.to_string()))
            }
        };

        let retrieval_top = retrieval_hits
            .first()
            .map(|h| h.command.as_str())
            .unwrap_or("");
        let generated = generated_clean.as_deref().unwrap_or("");

        let verdict = fusion::decide(&self.config.fusion, retrieval_top, generated);
        let final_command = fusion::fuse(&self.config.fusion, retrieval_top, generated);
        obs::emit_fusion_decided(
            &verdict,
            final_command.as_ref().map(|f| f.as_str()).unwrap_or(""),
        );

        Ok(PredictionReport {
            id,
            created_at: Utc::now(),
            query: query.to_string(),
            normalized_query: normalized,
            retrieval_hits,
            retrieval_error,
            generated_raw,
            generated_clean,
            generation_error,
            verdict,
            final_command,
        })
    }
}

async fn timed<F, T>(fut: F) -> (T, u64)
where
    F: std::future::Future<Output = T>,
{
    let start = Instant::now();
    let out = fut.await;
    (out, start.elapsed().as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{FailingGeneration, FailingRetrieval, StaticGeneration, StaticRetrieval};

    fn predictor(
        retrieval: impl RetrievalSource + 'static,
        generation: impl GenerationSource + 'static,
    ) -> CommandPredictor {
        CommandPredictor::new(
            Arc::new(retrieval),
            Arc::new(generation),
            CiqConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_blank_query_is_rejected() {
        let p = predictor(StaticRetrieval::empty(), StaticGeneration::new("ls"));
        assert!(matches!(p.predict("   ").await, Err(CiqError::EmptyQuery)));
        assert!(matches!(p.report("").await, Err(CiqError::EmptyQuery)));
    }

    #[tokio::test]
    async fn test_sources_receive_normalized_query_and_prefixed_prompt() {
        let retrieval = Arc::new(StaticRetrieval::from_commands(["ls -la"]));
        let generation = Arc::new(StaticGeneration::new("ls -la"));
        let p = CommandPredictor::new(retrieval.clone(), generation.clone(), CiqConfig::default());

        p.predict("  list   all files ").await.unwrap();

        assert_eq!(retrieval.queries(), vec!["List all files".to_string()]);
        assert_eq!(
            generation.prompts(),
            vec!["translate: List all files".to_string()]
        );
    }

    #[tokio::test]
    async fn test_generated_output_is_cleaned_before_fusion() {
        let p = predictor(
            StaticRetrieval::from_commands(["ls -la"]),
            StaticGeneration::new("ls  -la"),
        );
        let report = p.report("list files").await.unwrap();
        assert_eq!(report.generated_raw.as_deref(), Some("ls  -la"));
        assert_eq!(report.generated_clean.as_deref(), Some("ls -la"));
        assert_eq!(report.verdict, FusionVerdict::Agreement);
        assert_eq!(report.final_command().unwrap().as_str(), "ls -la");
    }

    #[tokio::test]
    async fn test_failing_source_degrades_to_other_side() {
        let p = predictor(
            FailingRetrieval::new("index missing"),
            StaticGeneration::new("du -sh ."),
        );
        let report = p.report("folder size").await.unwrap();
        assert!(report.retrieval_hits.is_empty());
        assert!(report
            .retrieval_error
            .as_deref()
            .unwrap()
            .contains("index missing"));
        assert_eq!(report.verdict, FusionVerdict::GenerationOnly);
        assert_eq!(report.final_command().unwrap().as_str(), "du -sh .");
    }

    #[tokio::test]
    async fn test_both_empty_is_empty_prediction() {
        let p = predictor(StaticRetrieval::empty(), FailingGeneration::new("offline"));
        let report = p.report("do something").await.unwrap();
        assert_eq!(report.verdict, FusionVerdict::Empty);
        assert!(report.final_command.is_none());
        assert!(report.generation_error.is_some());

        let err = p.predict("do something").await.unwrap_err();
        assert!(matches!(err, CiqError::EmptyPrediction));
    }

    #[tokio::test]
    async fn test_report_serializes() {
        let p = predictor(
            StaticRetrieval::from_commands(["df -h"]),
            StaticGeneration::new("du -sh ."),
        );
        let report = p.report("disk usage").await.unwrap();
        assert_eq!(report.retrieval_top(), Some("df -h"));

        let json = report.to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["normalized_query"], "Disk usage");
        assert_eq!(value["verdict"]["kind"], "divergent");
        assert_eq!(value["final_command"]["candidate"]["source"], "generation");
    }
}
