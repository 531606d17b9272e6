//! Teachloop Checkpoint Evaluator
//!
//! Scores a user's answer against a checkpoint's expected-answer
//! representation. Evaluation is deterministic-first:
//!
//! 1. exact/near match against the canonical key for multiple-choice
//! 2. keyword-overlap scoring against the expected keyword set
//! 3. only when both are inconclusive, an external semantic judge
//!
//! The semantic judge is the single non-deterministic path and is always
//! invoked under a bounded timeout; on timeout the evaluator degrades to a
//! deterministic verdict instead of stalling the caller. The teaching
//! engine never bypasses this ordering and never calls the judge itself.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use teachloop_graph::Checkpoint;
use tracing::{debug, warn};

/// Maximum number of expected keywords echoed back in feedback text.
const FEEDBACK_KEYWORD_LIMIT: usize = 5;

// ============================================================================
// Verdicts
// ============================================================================

/// Outcome of evaluating a checkpoint answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The answer matches the expectation.
    Correct,
    /// The answer covers part of the expectation.
    Partial,
    /// The answer does not match the expectation.
    Incorrect,
}

impl Verdict {
    /// Returns `true` if this verdict allows the session to progress.
    ///
    /// Both `Correct` and `Partial` are acceptable; only `Incorrect`
    /// consumes a retry.
    #[must_use]
    pub const fn is_acceptable(&self) -> bool {
        matches!(self, Self::Correct | Self::Partial)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Correct => write!(f, "correct"),
            Self::Partial => write!(f, "partial"),
            Self::Incorrect => write!(f, "incorrect"),
        }
    }
}

/// Full evaluation result returned to the teaching engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    /// The verdict.
    pub verdict: Verdict,

    /// Expected keywords found in the answer (free-text path only).
    pub matched_keywords: Vec<String>,

    /// Feedback text suitable for showing to the user.
    pub feedback: String,

    /// Set when the semantic judge was needed but timed out, and the
    /// verdict was produced by the deterministic fallback instead.
    pub judge_timed_out: bool,
}

impl Evaluation {
    fn deterministic(verdict: Verdict, feedback: impl Into<String>) -> Self {
        Self {
            verdict,
            matched_keywords: Vec::new(),
            feedback: feedback.into(),
            judge_timed_out: false,
        }
    }
}

// ============================================================================
// Semantic judge boundary
// ============================================================================

/// External semantic judge used only as the evaluation fallback.
///
/// Implementations typically wrap an LLM call. The evaluator owns the
/// policy of when the judge runs; implementors just answer.
#[async_trait]
pub trait SemanticJudge: Send + Sync {
    /// Judges a free-form answer against a checkpoint.
    async fn judge(&self, checkpoint: &Checkpoint, user_answer: &str) -> Verdict;
}

// ============================================================================
// Evaluator
// ============================================================================

/// Default keyword-overlap ratio for a `Correct` verdict.
const fn default_pass_threshold() -> f64 {
    0.33
}

/// Default keyword-overlap ratio for a `Partial` verdict.
const fn default_partial_threshold() -> f64 {
    0.15
}

/// Default bound on a single semantic-judge call, in seconds.
const fn default_judge_timeout() -> u64 {
    10
}

/// Tuning knobs for deterministic scoring and the judge fallback.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluatorConfig {
    /// Keyword-overlap ratio at or above which the verdict is `Correct`.
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: f64,

    /// Keyword-overlap ratio at or above which the verdict is `Partial`.
    #[serde(default = "default_partial_threshold")]
    pub partial_threshold: f64,

    /// Bound on a single semantic-judge call, in seconds.
    #[serde(default = "default_judge_timeout")]
    pub judge_timeout_secs: u64,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            pass_threshold: default_pass_threshold(),
            partial_threshold: default_partial_threshold(),
            judge_timeout_secs: default_judge_timeout(),
        }
    }
}

/// Deterministic-first checkpoint evaluator with an optional judge fallback.
pub struct CheckpointEvaluator {
    config: EvaluatorConfig,
    judge: Option<Arc<dyn SemanticJudge>>,
}

impl std::fmt::Debug for CheckpointEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckpointEvaluator")
            .field("config", &self.config)
            .field("judge", &self.judge.is_some())
            .finish()
    }
}

impl CheckpointEvaluator {
    /// Creates an evaluator without a semantic judge.
    #[must_use]
    pub const fn new(config: EvaluatorConfig) -> Self {
        Self {
            config,
            judge: None,
        }
    }

    /// Attaches a semantic judge for the fallback path.
    #[must_use]
    pub fn with_judge(mut self, judge: Arc<dyn SemanticJudge>) -> Self {
        self.judge = Some(judge);
        self
    }

    /// Evaluates `user_answer` against `checkpoint`.
    ///
    /// Never fails: inconclusive inputs degrade to a deterministic
    /// `Incorrect` verdict with explanatory feedback.
    pub async fn evaluate(&self, checkpoint: &Checkpoint, user_answer: &str) -> Evaluation {
        // (a) canonical answer for multiple-choice
        if let Some(correct_key) = checkpoint.answer.correct_key.as_deref() {
            return Self::evaluate_choice(checkpoint, correct_key, user_answer);
        }

        // (b) keyword overlap for free text
        if checkpoint.answer.has_keywords() {
            return self.evaluate_keywords(checkpoint, user_answer);
        }

        // (c) semantic judge, only when (a) and (b) are inconclusive
        self.evaluate_with_judge(checkpoint, user_answer).await
    }

    /// Exact/near match against the canonical option key.
    ///
    /// Accepts the key itself (case-insensitively) or the full text of the
    /// correct option.
    fn evaluate_choice(checkpoint: &Checkpoint, correct_key: &str, user_answer: &str) -> Evaluation {
        let given = user_answer.trim();
        let key_match = given.eq_ignore_ascii_case(correct_key);
        let text_match = checkpoint
            .answer
            .options
            .iter()
            .find(|o| o.key.eq_ignore_ascii_case(correct_key))
            .is_some_and(|o| given.eq_ignore_ascii_case(o.text.trim()));

        if key_match || text_match {
            Evaluation::deterministic(Verdict::Correct, "Correct!")
        } else {
            Evaluation::deterministic(
                Verdict::Incorrect,
                format!("Incorrect. Correct answer: {correct_key}"),
            )
        }
    }

    /// Keyword-overlap scoring with word-boundary matching.
    fn evaluate_keywords(&self, checkpoint: &Checkpoint, user_answer: &str) -> Evaluation {
        let answer_text = user_answer.to_lowercase();
        let keywords = &checkpoint.answer.keywords;

        let matched: Vec<String> = keywords
            .iter()
            .filter(|kw| keyword_present(&answer_text, &kw.to_lowercase()))
            .cloned()
            .collect();

        #[allow(clippy::cast_precision_loss)]
        let score = matched.len() as f64 / keywords.len().max(1) as f64;
        debug!(
            checkpoint = %checkpoint.id,
            matched = matched.len(),
            expected = keywords.len(),
            score,
            "Keyword evaluation"
        );

        let expected_list = keywords
            .iter()
            .take(FEEDBACK_KEYWORD_LIMIT)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");

        let (verdict, feedback) = if score >= self.config.pass_threshold {
            (Verdict::Correct, "Correct".to_string())
        } else if score >= self.config.partial_threshold {
            (
                Verdict::Partial,
                format!("Partially correct. Expected keywords: {expected_list}"),
            )
        } else {
            (
                Verdict::Incorrect,
                format!("Incorrect. Expected keywords: {expected_list}"),
            )
        };

        Evaluation {
            verdict,
            matched_keywords: matched,
            feedback,
            judge_timed_out: false,
        }
    }

    /// Delegates to the semantic judge under a bounded timeout.
    async fn evaluate_with_judge(&self, checkpoint: &Checkpoint, user_answer: &str) -> Evaluation {
        let Some(judge) = self.judge.as_ref() else {
            return Evaluation::deterministic(
                Verdict::Incorrect,
                "No answer key available for evaluation.",
            );
        };

        let timeout = Duration::from_secs(self.config.judge_timeout_secs);
        match tokio::time::timeout(timeout, judge.judge(checkpoint, user_answer)).await {
            Ok(verdict) => {
                let feedback = match verdict {
                    Verdict::Correct => "Correct",
                    Verdict::Partial => "Partially correct",
                    Verdict::Incorrect => "Incorrect",
                };
                Evaluation::deterministic(verdict, feedback)
            }
            Err(_) => {
                warn!(
                    checkpoint = %checkpoint.id,
                    timeout_secs = self.config.judge_timeout_secs,
                    "Semantic judge timed out; degrading to deterministic verdict"
                );
                Evaluation {
                    verdict: Verdict::Incorrect,
                    matched_keywords: Vec::new(),
                    feedback: "Your answer could not be fully evaluated; it was not counted as correct.".to_string(),
                    judge_timed_out: true,
                }
            }
        }
    }
}

/// Whole-word keyword search.
///
/// Multi-word keywords fall back to substring containment; single words
/// must match on word boundaries so "cat" does not match "concatenate".
fn keyword_present(answer: &str, keyword: &str) -> bool {
    if keyword.contains(char::is_whitespace) {
        return answer.contains(keyword);
    }
    let pattern = format!(r"\b{}\b", regex::escape(keyword));
    let Ok(re) = regex::Regex::new(&pattern) else {
        return answer.contains(keyword);
    };
    re.is_match(answer)
}
