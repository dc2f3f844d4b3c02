//! Structured observability hooks for the prediction lifecycle.
//!
//! Events are emitted at `info!` level (failures at `warn!`) and carry an
//! `event` field so JSON log lines can be filtered without parsing messages.

use tracing::{info, warn, Span};

use crate::candidate::CandidateSource;
use crate::fusion::FusionVerdict;

/// Span scoping one prediction.
///
/// Futures are instrumented with it rather than entering it, so the guard is
/// never held across an `.await`:
///
/// ```ignore
/// run(query).instrument(prediction_span(&id)).await
/// ```
pub fn prediction_span(prediction_id: &str) -> Span {
    tracing::info_span!("ciq.prediction", prediction_id = %prediction_id)
}

/// Emit event: a query entered the pipeline.
pub fn emit_prediction_started(prediction_id: &str, normalized_query: &str) {
    info!(
        event = "prediction.started",
        prediction_id = %prediction_id,
        query = %normalized_query,
    );
}

/// Emit event: a source returned a candidate (possibly empty).
pub fn emit_source_completed(source: CandidateSource, candidate: &str, duration_ms: u64) {
    info!(
        event = "source.completed",
        source = %source,
        candidate = %candidate,
        duration_ms = duration_ms,
    );
}

/// Emit event: a source failed and is treated as producing nothing.
pub fn emit_source_failed(source: CandidateSource, error: &dyn std::fmt::Display) {
    warn!(event = "source.failed", source = %source, error = %error);
}

/// Emit event: fusion picked a winner (or found nothing).
pub fn emit_fusion_decided(verdict: &FusionVerdict, final_command: &str) {
    info!(
        event = "fusion.decided",
        winner = %verdict.winner().map(|s| s.to_string()).unwrap_or_else(|| "none".into()),
        similarity = verdict.similarity().unwrap_or(-1.0),
        command = %final_command,
    );
}

/// Emit event: an executed command exited.
pub fn emit_execution_finished(exit_code: Option<i32>, duration_ms: u64, wrote_stderr: bool) {
    info!(
        event = "execution.finished",
        exit_code = exit_code.unwrap_or(-1),
        duration_ms = duration_ms,
        wrote_stderr = wrote_stderr,
    );
}
