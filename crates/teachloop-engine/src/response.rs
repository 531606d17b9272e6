//! Response envelope and interaction audit records.
//!
//! Every engine response carries the same envelope: a kind, content text,
//! ordered options, citations, the recomputed progress pair, and zero or
//! more annotations for degraded collaborators or policy outcomes. The
//! envelope carries no timestamps, so a cached idempotent replay serializes
//! byte-identically to the original response.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use teachloop_graph::{Citation, ChoiceOption};
use uuid::Uuid;

use crate::progress::Progress;

/// Kind of interaction response presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    /// A selection menu (module choices).
    Options,
    /// Concept content.
    Content,
    /// A checkpoint question.
    Checkpoint,
    /// Evaluation feedback leading into the next item.
    Feedback,
    /// A module summary.
    Summary,
    /// The terminal whole-graph summary.
    Complete,
}

impl std::fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Options => write!(f, "options"),
            Self::Content => write!(f, "content"),
            Self::Checkpoint => write!(f, "checkpoint"),
            Self::Feedback => write!(f, "feedback"),
            Self::Summary => write!(f, "summary"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// Degraded-collaborator and policy annotations attached to a response.
///
/// Annotations are how recoverable conditions surface: the response itself
/// is always well-formed and the session is never stuck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Annotation {
    /// The submitted input did not match any presented option key.
    InvalidChoice {
        /// The input that failed to match.
        given: String,
    },
    /// The content generator failed or timed out; static content was
    /// returned instead.
    ElaborationUnavailable,
    /// The semantic judge timed out; a keyword-only verdict was used.
    EvaluatorTimeout,
    /// The checkpoint retry limit was reached and the engine moved on.
    RetryLimitExceeded,
}

/// The response envelope returned by every accepted interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionResponse {
    /// What kind of presentation this is.
    pub kind: ResponseKind,

    /// Main text: content, prompt, feedback, or summary.
    pub content: String,

    /// Ordered options the user may submit next (possibly empty).
    #[serde(default)]
    pub options: Vec<ChoiceOption>,

    /// Source citations (possibly empty).
    #[serde(default)]
    pub citations: Vec<Citation>,

    /// Module and overall progress, recomputed for every response.
    pub progress: Progress,

    /// Annotations for degraded collaborators or policy outcomes.
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl InteractionResponse {
    /// Creates a response with empty options, citations, and annotations.
    #[must_use]
    pub fn new(kind: ResponseKind, content: impl Into<String>, progress: Progress) -> Self {
        Self {
            kind,
            content: content.into(),
            options: Vec::new(),
            citations: Vec::new(),
            progress,
            annotations: Vec::new(),
        }
    }

    /// Sets the ordered option list.
    #[must_use]
    pub fn with_options(mut self, options: Vec<ChoiceOption>) -> Self {
        self.options = options;
        self
    }

    /// Sets the citation list.
    #[must_use]
    pub fn with_citations(mut self, citations: Vec<Citation>) -> Self {
        self.citations = citations;
        self
    }

    /// Appends an annotation.
    #[must_use]
    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Prefixes the content with a feedback paragraph and re-kinds the
    /// response as feedback.
    ///
    /// Used when an evaluated answer leads straight into the next item.
    #[must_use]
    pub fn with_feedback(mut self, feedback: &str) -> Self {
        self.content = format!("{feedback}\n\n{}", self.content);
        self.kind = ResponseKind::Feedback;
        self
    }
}

/// Append-only audit record, one per processed interaction.
///
/// Never mutated after creation; idempotent replays do not append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRecord {
    /// The session this interaction belongs to.
    pub session_id: Uuid,

    /// The sequence number the interaction consumed.
    pub sequence: u64,

    /// The raw user input.
    pub user_input: String,

    /// The kind of response the interaction produced.
    pub response_kind: ResponseKind,

    /// When the interaction was processed.
    pub timestamp: DateTime<Utc>,
}

impl InteractionRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(
        session_id: Uuid,
        sequence: u64,
        user_input: impl Into<String>,
        response_kind: ResponseKind,
    ) -> Self {
        Self {
            session_id,
            sequence,
            user_input: user_input.into(),
            response_kind,
            timestamp: Utc::now(),
        }
    }
}
