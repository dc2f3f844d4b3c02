//! Candidate commands and the confirmation gate in front of the executor.

use serde::{Deserialize, Serialize};

use crate::fusion::FusionVerdict;

/// Which predictor produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    Retrieval,
    Generation,
}

impl std::fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CandidateSource::Retrieval => write!(f, "retrieval"),
            CandidateSource::Generation => write!(f, "generation"),
        }
    }
}

/// One predicted shell command, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCommand {
    pub text: String,
    pub source: CandidateSource,
}

impl CandidateCommand {
    pub fn new(text: impl Into<String>, source: CandidateSource) -> Self {
        Self {
            text: text.into(),
            source,
        }
    }

    pub fn retrieval(text: impl Into<String>) -> Self {
        Self::new(text, CandidateSource::Retrieval)
    }

    pub fn generation(text: impl Into<String>) -> Self {
        Self::new(text, CandidateSource::Generation)
    }

    /// `true` when the command is blank after trimming.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Run the command cleaner, yielding a new candidate from the same source.
    pub fn cleaned(&self) -> Self {
        Self::new(crate::clean::clean(&self.text), self.source)
    }
}

impl std::fmt::Display for CandidateCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// The candidate chosen by fusion. The only value that can be confirmed for
/// execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalCommand {
    pub candidate: CandidateCommand,
    pub verdict: FusionVerdict,
}

impl FinalCommand {
    pub fn as_str(&self) -> &str {
        &self.candidate.text
    }

    pub fn source(&self) -> CandidateSource {
        self.candidate.source
    }

    /// Record the caller's affirmative confirmation. Prompting is the
    /// caller's job; the executor only accepts the returned value.
    pub fn confirm(self) -> ConfirmedCommand {
        ConfirmedCommand { inner: self }
    }
}

impl std::fmt::Display for FinalCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.candidate.text)
    }
}

/// A [`FinalCommand`] the user agreed to run.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmedCommand {
    inner: FinalCommand,
}

impl ConfirmedCommand {
    pub fn as_str(&self) -> &str {
        self.inner.as_str()
    }

    pub fn into_inner(self) -> FinalCommand {
        self.inner
    }
}
