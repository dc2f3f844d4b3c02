//! Fusion engine: reconciles the top retrieval candidate with the cleaned
//! generated candidate.
//!
//! Decision order:
//! 1. both blank → [`FusionVerdict::Empty`]
//! 2. one side blank → the other side wins
//! 3. equal after trimming → [`FusionVerdict::Agreement`] (retrieval text)
//! 4. word-set similarity above the threshold → retrieval wins, since it comes
//!    from a curated corpus
//! 5. otherwise → generation wins, since it covers queries the corpus does not

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::candidate::{CandidateCommand, CandidateSource, FinalCommand};
use crate::error::{CiqError, CiqResult};

/// Similarity above which the retrieval candidate is preferred.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.6;

/// Tunables for the fusion decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionPolicy {
    /// Strict lower bound: similarity must be `>` this for retrieval to win.
    pub similarity_threshold: f64,
}

impl Default for FusionPolicy {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

impl FusionPolicy {
    /// Build a policy, rejecting thresholds outside `[0, 1]`.
    pub fn new(similarity_threshold: f64) -> CiqResult<Self> {
        if !(0.0..=1.0).contains(&similarity_threshold) {
            return Err(CiqError::Config(format!(
                "similarity threshold must be within [0, 1], got {similarity_threshold}"
            )));
        }
        Ok(Self {
            similarity_threshold,
        })
    }
}

/// Why fusion picked what it picked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FusionVerdict {
    /// Both candidates are identical after trimming.
    Agreement,
    /// Candidates share enough words; retrieval preferred.
    Similar { similarity: f64 },
    /// Candidates disagree; generation preferred.
    Divergent { similarity: f64 },
    /// Generation produced nothing.
    RetrievalOnly,
    /// Retrieval produced nothing.
    GenerationOnly,
    /// Neither source produced a command.
    Empty,
}

impl FusionVerdict {
    /// The side whose text becomes the final command, if any.
    pub fn winner(&self) -> Option<CandidateSource> {
        match self {
            FusionVerdict::Agreement
            | FusionVerdict::Similar { .. }
            | FusionVerdict::RetrievalOnly => Some(CandidateSource::Retrieval),
            FusionVerdict::Divergent { .. } | FusionVerdict::GenerationOnly => {
                Some(CandidateSource::Generation)
            }
            FusionVerdict::Empty => None,
        }
    }

    /// Word-set similarity when it was computed.
    pub fn similarity(&self) -> Option<f64> {
        match self {
            FusionVerdict::Similar { similarity } | FusionVerdict::Divergent { similarity } => {
                Some(*similarity)
            }
            _ => None,
        }
    }

    /// One-line human explanation.
    pub fn describe(&self) -> String {
        match self {
            FusionVerdict::Agreement => "retrieval and generation agree".to_string(),
            FusionVerdict::Similar { similarity } => {
                format!("candidates are similar ({similarity:.2}); kept the corpus command")
            }
            FusionVerdict::Divergent { similarity } => {
                format!("candidates diverge ({similarity:.2}); kept the generated command")
            }
            FusionVerdict::RetrievalOnly => "generation was empty; kept the corpus command".into(),
            FusionVerdict::GenerationOnly => "no corpus match; kept the generated command".into(),
            FusionVerdict::Empty => "neither source produced a command".to_string(),
        }
    }
}

/// Ratio of shared whitespace-delimited words over the larger word set.
///
/// Symmetric. Returns `None` when both sets are empty.
pub fn word_set_similarity(a: &str, b: &str) -> Option<f64> {
    let words_a: HashSet<&str> = a.split_whitespace().collect();
    let words_b: HashSet<&str> = b.split_whitespace().collect();

    let larger = words_a.len().max(words_b.len());
    if larger == 0 {
        return None;
    }

    let shared = words_a.intersection(&words_b).count();
    Some(shared as f64 / larger as f64)
}

/// Decide between the two candidates without materializing the result.
pub fn decide(policy: &FusionPolicy, retrieval_top: &str, generated: &str) -> FusionVerdict {
    let retrieval_top = retrieval_top.trim();
    let generated = generated.trim();

    match (retrieval_top.is_empty(), generated.is_empty()) {
        (true, true) => return FusionVerdict::Empty,
        (true, false) => return FusionVerdict::GenerationOnly,
        (false, true) => return FusionVerdict::RetrievalOnly,
        (false, false) => {}
    }

    if retrieval_top == generated {
        return FusionVerdict::Agreement;
    }

    let similarity = word_set_similarity(retrieval_top, generated).unwrap_or(0.0);
    if similarity > policy.similarity_threshold {
        FusionVerdict::Similar { similarity }
    } else {
        FusionVerdict::Divergent { similarity }
    }
}

/// Fuse the candidates into a [`FinalCommand`]. `None` means neither source
/// produced anything usable.
pub fn fuse(policy: &FusionPolicy, retrieval_top: &str, generated: &str) -> Option<FinalCommand> {
    let verdict = decide(policy, retrieval_top, generated);
    let candidate = match verdict.winner()? {
        CandidateSource::Retrieval => CandidateCommand::retrieval(retrieval_top.trim()),
        CandidateSource::Generation => CandidateCommand::generation(generated.trim()),
    };
    Some(FinalCommand { candidate, verdict })
}

/// Plain-string fusion with the default policy. `""` signals that no command
/// could be produced.
pub fn select(retrieval_top: &str, generated: &str) -> String {
    fuse(&FusionPolicy::default(), retrieval_top, generated)
        .map(|fin| fin.candidate.text)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_agreement_returns_value() {
        assert_eq!(select("ls -la", "ls -la"), "ls -la");
        assert_eq!(select(" ls -la ", "ls -la"), "ls -la");
        assert_eq!(
            decide(&FusionPolicy::default(), "pwd", " pwd"),
            FusionVerdict::Agreement
        );
    }

    #[test]
    fn test_both_empty_yields_empty() {
        assert_eq!(select("", ""), "");
        assert_eq!(select("  ", "\t"), "");
        assert!(fuse(&FusionPolicy::default(), "", "").is_none());
        assert_eq!(decide(&FusionPolicy::default(), "", ""), FusionVerdict::Empty);
    }

    #[test]
    fn test_empty_generation_falls_back_to_retrieval() {
        assert_eq!(select("ls -la", ""), "ls -la");
        assert_eq!(
            decide(&FusionPolicy::default(), "ls -la", ""),
            FusionVerdict::RetrievalOnly
        );
    }

    #[test]
    fn test_empty_retrieval_falls_back_to_generation() {
        assert_eq!(select("", "du -sh ."), "du -sh .");
        assert_eq!(
            decide(&FusionPolicy::default(), "", "du -sh ."),
            FusionVerdict::GenerationOnly
        );
    }

    #[test]
    fn test_disjoint_commands_prefer_generation() {
        let fin = fuse(&FusionPolicy::default(), "df -h", "du -sh .").unwrap();
        assert_eq!(fin.as_str(), "du -sh .");
        assert_eq!(fin.source(), CandidateSource::Generation);
        assert_eq!(fin.verdict, FusionVerdict::Divergent { similarity: 0.0 });
    }

    #[test]
    fn test_similar_commands_prefer_retrieval() {
        // 4 shared of 5 → 0.8
        let fin = fuse(
            &FusionPolicy::default(),
            "find . -name '*.log' -delete",
            "find . -name '*.log' -print",
        )
        .unwrap();
        assert_eq!(fin.as_str(), "find . -name '*.log' -delete");
        assert_eq!(fin.source(), CandidateSource::Retrieval);
        assert_eq!(fin.verdict.similarity(), Some(0.8));
    }

    #[test]
    fn test_threshold_is_strict() {
        // 3 shared of 5 → exactly 0.6, not similar
        let verdict = decide(
            &FusionPolicy::default(),
            "grep -r foo src lib",
            "grep -r foo . -n",
        );
        assert_eq!(verdict, FusionVerdict::Divergent { similarity: 0.6 });
    }

    #[test]
    fn test_similarity_uses_larger_set() {
        assert_eq!(word_set_similarity("ls", "ls -la /tmp"), Some(1.0 / 3.0));
        assert_eq!(word_set_similarity("", ""), None);
        assert_eq!(word_set_similarity("ls", ""), Some(0.0));
        // duplicates collapse into the set
        assert_eq!(word_set_similarity("echo echo hi", "echo hi"), Some(1.0));
    }

    #[test]
    fn test_policy_validation() {
        assert!(FusionPolicy::new(0.0).is_ok());
        assert!(FusionPolicy::new(1.0).is_ok());
        assert!(matches!(FusionPolicy::new(1.5), Err(CiqError::Config(_))));
        assert!(FusionPolicy::new(f64::NAN).is_err());
    }

    #[test]
    fn test_custom_threshold_changes_winner() {
        let strict = FusionPolicy::new(0.9).unwrap();
        let fin = fuse(
            &strict,
            "find . -name '*.log' -delete",
            "find . -name '*.log' -print",
        )
        .unwrap();
        assert_eq!(fin.source(), CandidateSource::Generation);
    }

    #[test]
    fn test_verdict_serializes_with_kind_tag() {
        let json = serde_json::to_value(FusionVerdict::Similar { similarity: 0.75 }).unwrap();
        assert_eq!(json["kind"], "similar");
        assert_eq!(json["similarity"], 0.75);
    }

    proptest! {
        #[test]
        fn prop_similarity_is_symmetric(a in "[a-z .-]{0,30}", b in "[a-z .-]{0,30}") {
            prop_assert_eq!(word_set_similarity(&a, &b), word_set_similarity(&b, &a));
        }

        #[test]
        fn prop_equal_inputs_select_that_value(a in "[a-z0-9 ./-]{1,30}") {
            prop_assert_eq!(select(&a, &a), a.trim().to_string());
        }
    }
}
