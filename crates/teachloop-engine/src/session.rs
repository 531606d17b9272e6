//! Session state types for the teachloop engine.
//!
//! A [`Session`] is the single source of truth for "where the user is" in a
//! knowledge base's module graph. It is read and mutated only by the
//! engine, never by clients directly.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use teachloop_graph::AdaptiveMode;
use uuid::Uuid;

// ============================================================================
// Phase
// ============================================================================

/// State-machine state of a teaching session.
///
/// Phases transition as:
/// - `AwaitingOptionChoice` -> `PresentingContent` (module chosen)
/// - `PresentingContent` -> `AwaitingCheckpointAnswer` (checkpoint reached)
///   or `PresentingSummary` (module exhausted)
/// - `AwaitingCheckpointAnswer` -> `PresentingContent` /
///   `AwaitingCheckpointAnswer` / `PresentingSummary`
/// - `PresentingSummary` -> `AwaitingOptionChoice` (modules remain) or
///   `Complete` (none remain)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// A module selection menu is presented.
    #[default]
    AwaitingOptionChoice,
    /// Concept content is presented; control inputs are expected.
    PresentingContent,
    /// A checkpoint question is presented; an answer is expected.
    AwaitingCheckpointAnswer,
    /// A module summary is presented; any input acknowledges it.
    PresentingSummary,
    /// The reachable graph is exhausted; the session is terminal.
    Complete,
}

impl Phase {
    /// Returns `true` if this phase is terminal.
    ///
    /// # Examples
    ///
    /// ```
    /// use teachloop_engine::Phase;
    ///
    /// assert!(Phase::Complete.is_terminal());
    /// assert!(!Phase::PresentingContent.is_terminal());
    /// ```
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AwaitingOptionChoice => write!(f, "awaiting_option_choice"),
            Self::PresentingContent => write!(f, "presenting_content"),
            Self::AwaitingCheckpointAnswer => write!(f, "awaiting_checkpoint_answer"),
            Self::PresentingSummary => write!(f, "presenting_summary"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

// ============================================================================
// Position
// ============================================================================

/// A location in the module graph: the pair must always reference existing
/// nodes of the session's knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Current module id.
    pub module_id: String,
    /// Current concept id within the module.
    pub concept_id: String,
}

impl Position {
    /// Creates a new position.
    #[must_use]
    pub fn new(module_id: impl Into<String>, concept_id: impl Into<String>) -> Self {
        Self {
            module_id: module_id.into(),
            concept_id: concept_id.into(),
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// Stateful record of one user's traversal through a knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session identifier.
    pub id: Uuid,

    /// Owning user.
    pub user_id: String,

    /// Knowledge base being studied.
    pub kb_id: String,

    /// Current state-machine phase.
    pub phase: Phase,

    /// Current position, absent while the module menu is open on a fresh
    /// session.
    pub position: Option<Position>,

    /// Prior positions for back-navigation, bounded by configuration.
    pub nav_stack: Vec<Position>,

    /// Content-variant selector driven by checkpoint performance.
    pub adaptive_mode: AdaptiveMode,

    /// Concepts completed so far. Only ever grows.
    pub completed_concepts: BTreeSet<String>,

    /// Checkpoints answered (or exhausted) so far. Only ever grows.
    pub answered_checkpoints: BTreeSet<String>,

    /// Checkpoint currently awaiting an answer.
    pub active_checkpoint: Option<String>,

    /// Wrong answers given in the current module; reset on module entry.
    pub wrong_checkpoints: u32,

    /// Whether every answer in the current module was first-attempt correct.
    pub module_clean: bool,

    /// Checkpoints resolved in the current module.
    pub module_answered: u32,

    /// Incorrect attempts per checkpoint; cleared on a correct answer.
    pub retries: HashMap<String, u32>,

    /// Checkpoints that hit the retry limit, kept for later review.
    pub unresolved_checkpoints: Vec<String>,

    /// Next expected interaction sequence number. Starts at 0 and advances
    /// by exactly 1 per accepted interaction.
    pub next_sequence: u64,

    /// When the session was created.
    pub started_at: DateTime<Utc>,

    /// When the session was last mutated.
    pub updated_at: DateTime<Utc>,

    /// When the session reached the terminal phase, if it has.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Creates a new session at sequence 0, with the module menu open.
    #[must_use]
    pub fn new(kb_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            kb_id: kb_id.into(),
            phase: Phase::AwaitingOptionChoice,
            position: None,
            nav_stack: Vec::new(),
            adaptive_mode: AdaptiveMode::default(),
            completed_concepts: BTreeSet::new(),
            answered_checkpoints: BTreeSet::new(),
            active_checkpoint: None,
            wrong_checkpoints: 0,
            module_clean: true,
            module_answered: 0,
            retries: HashMap::new(),
            unresolved_checkpoints: Vec::new(),
            next_sequence: 0,
            started_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Returns `true` if the session is terminal.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Updates the `updated_at` timestamp to the current time.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Moves the session to the first concept of a module, resetting the
    /// per-module counters.
    pub fn enter_module(&mut self, module_id: impl Into<String>, concept_id: impl Into<String>) {
        self.position = Some(Position::new(module_id, concept_id));
        self.active_checkpoint = None;
        self.reset_module_counters();
    }

    /// Resets the per-module adaptive bookkeeping.
    ///
    /// Called on module entry and again when the user leaves a module
    /// through its summary.
    pub fn reset_module_counters(&mut self) {
        self.wrong_checkpoints = 0;
        self.module_clean = true;
        self.module_answered = 0;
    }

    /// Pushes a prior position onto the navigation stack.
    ///
    /// The stack is bounded: when `max_depth` is reached the oldest entry
    /// is dropped.
    pub fn push_position(&mut self, position: Position, max_depth: usize) {
        if max_depth == 0 {
            return;
        }
        if self.nav_stack.len() >= max_depth {
            self.nav_stack.remove(0);
        }
        self.nav_stack.push(position);
    }

    /// Pops the most recent prior position, if any.
    pub fn pop_position(&mut self) -> Option<Position> {
        self.nav_stack.pop()
    }

    /// Marks a concept complete. Completion is monotone: a concept is never
    /// un-marked.
    ///
    /// Returns `true` if the concept was newly completed.
    pub fn mark_concept_complete(&mut self, concept_id: impl Into<String>) -> bool {
        self.completed_concepts.insert(concept_id.into())
    }

    /// Records an incorrect checkpoint answer against the current module.
    pub fn record_wrong(&mut self) {
        self.wrong_checkpoints += 1;
        self.module_clean = false;
    }

    /// Increments the retry counter for a checkpoint, returning the new
    /// count of incorrect attempts.
    pub fn bump_retry(&mut self, checkpoint_id: &str) -> u32 {
        let count = self.retries.entry(checkpoint_id.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Clears the retry counter for a checkpoint after a correct answer.
    pub fn clear_retry(&mut self, checkpoint_id: &str) {
        self.retries.remove(checkpoint_id);
    }

    /// Records that a checkpoint reached the retry limit, keeping it for
    /// later review.
    pub fn record_unresolved(&mut self, checkpoint_id: impl Into<String>) {
        self.unresolved_checkpoints.push(checkpoint_id.into());
    }
}
