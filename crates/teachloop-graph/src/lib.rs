//! Teachloop Module Graph
//!
//! Content model for a knowledge base's learning path: modules, concepts,
//! and checkpoints, plus the validated graph index used for traversal.
//!
//! A graph is built once by an external extraction process and is read-only
//! from the engine's perspective. Modules form a DAG via prerequisite ids;
//! traversal order within a module is the fixed concept sequence.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod graph;

pub use graph::{GraphProvider, InMemoryGraphProvider, ModuleGraph, MAX_GRAPH_SIZE};

/// Errors that can occur while loading or validating a module graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Graph file was not found at the specified path.
    #[error("Module graph not found: '{path}'\n\nSuggestion: Check the graph path or run the module builder first")]
    GraphNotFound {
        /// Path where the graph was expected.
        path: PathBuf,
    },

    /// Graph file exceeds the size limit.
    #[error("Module graph exceeds size limit (1MB): '{path}' is {size_kb}KB\n\nSuggestion: Split the knowledge base into smaller graphs")]
    GraphTooLarge {
        /// Path to the oversized graph file.
        path: PathBuf,
        /// Actual size in kilobytes.
        size_kb: u64,
    },

    /// Graph file contains invalid JSON.
    #[error("Invalid JSON in module graph '{path}': {message}")]
    GraphParseError {
        /// Path to the graph file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Two modules share the same identifier.
    #[error("duplicate module id '{module_id}' in graph")]
    DuplicateModule {
        /// The repeated module identifier.
        module_id: String,
    },

    /// Two concepts share the same identifier.
    #[error("duplicate concept id '{concept_id}' in graph")]
    DuplicateConcept {
        /// The repeated concept identifier.
        concept_id: String,
    },

    /// A module lists a prerequisite that does not exist in the graph.
    #[error("module '{module_id}' requires unknown prerequisite '{prerequisite}'")]
    UnknownPrerequisite {
        /// The module declaring the prerequisite.
        module_id: String,
        /// The missing prerequisite id.
        prerequisite: String,
    },

    /// The prerequisite relation contains a cycle.
    #[error("prerequisite cycle detected through module '{module_id}'")]
    PrerequisiteCycle {
        /// A module on the cycle.
        module_id: String,
    },

    /// General I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized `Result` type for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;

// ============================================================================
// Difficulty and adaptive mode
// ============================================================================

/// Difficulty tier assigned to a module by the graph builder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// Entry-level material.
    Beginner,
    /// Assumes the beginner tier.
    #[default]
    Intermediate,
    /// Assumes broad familiarity with the knowledge base.
    Advanced,
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Beginner => write!(f, "beginner"),
            Self::Intermediate => write!(f, "intermediate"),
            Self::Advanced => write!(f, "advanced"),
        }
    }
}

/// Content-variant selector driven by checkpoint performance.
///
/// Transitions are ordered: `Simplified <-> Standard <-> Advanced`. A single
/// module outcome moves the mode at most one step toward `Advanced`
/// (see [`AdaptiveMode::relaxed`]); a struggling module sets it directly to
/// `Simplified`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptiveMode {
    /// Present simplified content variants.
    Simplified,
    /// Present standard content variants (initial mode).
    #[default]
    Standard,
    /// Present advanced content variants.
    Advanced,
}

impl AdaptiveMode {
    /// Returns the mode one step closer to `Advanced`.
    ///
    /// `Simplified` relaxes to `Standard`, `Standard` to `Advanced`, and
    /// `Advanced` stays put. The mode never skips `Standard`.
    ///
    /// # Examples
    ///
    /// ```
    /// use teachloop_graph::AdaptiveMode;
    ///
    /// assert_eq!(AdaptiveMode::Simplified.relaxed(), AdaptiveMode::Standard);
    /// assert_eq!(AdaptiveMode::Standard.relaxed(), AdaptiveMode::Advanced);
    /// assert_eq!(AdaptiveMode::Advanced.relaxed(), AdaptiveMode::Advanced);
    /// ```
    #[must_use]
    pub const fn relaxed(self) -> Self {
        match self {
            Self::Simplified => Self::Standard,
            Self::Standard | Self::Advanced => Self::Advanced,
        }
    }
}

impl std::fmt::Display for AdaptiveMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simplified => write!(f, "simplified"),
            Self::Standard => write!(f, "standard"),
            Self::Advanced => write!(f, "advanced"),
        }
    }
}

// ============================================================================
// Concept content
// ============================================================================

/// Explanatory content for a concept, with optional per-mode variants.
///
/// The builder always produces a standard explanation; simplified and
/// advanced variants are optional and fall back to standard when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentVariants {
    /// Standard explanation shown in `AdaptiveMode::Standard`.
    pub standard: String,

    /// Simplified rewording, if the builder produced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simplified: Option<String>,

    /// Advanced deep-dive, if the builder produced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advanced: Option<String>,
}

impl ContentVariants {
    /// Creates variants with only a standard explanation.
    #[must_use]
    pub fn standard_only(text: impl Into<String>) -> Self {
        Self {
            standard: text.into(),
            simplified: None,
            advanced: None,
        }
    }

    /// Selects the variant for the given adaptive mode.
    ///
    /// Missing variants fall back to the standard explanation.
    #[must_use]
    pub fn for_mode(&self, mode: AdaptiveMode) -> &str {
        match mode {
            AdaptiveMode::Standard => &self.standard,
            AdaptiveMode::Simplified => self.simplified.as_deref().unwrap_or(&self.standard),
            AdaptiveMode::Advanced => self.advanced.as_deref().unwrap_or(&self.standard),
        }
    }
}

// ============================================================================
// Checkpoints
// ============================================================================

/// A selectable option presented to the user.
///
/// Used both for multiple-choice checkpoint answers and for the control
/// menus the engine renders (module choices, continue/example/simplify).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    /// Short key the user submits (e.g. "A", "continue").
    pub key: String,
    /// Human-readable label.
    pub text: String,
}

impl ChoiceOption {
    /// Creates a new option.
    #[must_use]
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
        }
    }
}

/// Expected-answer representation for a checkpoint.
///
/// A checkpoint may carry a canonical multiple-choice key, a keyword set
/// for free-text scoring, or both. The evaluator tries them in that order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnswerKey {
    /// Distractor options for multiple-choice presentation.
    #[serde(default)]
    pub options: Vec<ChoiceOption>,

    /// Canonical correct option key, when the checkpoint is multiple-choice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_key: Option<String>,

    /// Expected keywords for free-text answers.
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl AnswerKey {
    /// Returns `true` if a canonical multiple-choice key is present.
    #[must_use]
    pub const fn is_multiple_choice(&self) -> bool {
        self.correct_key.is_some()
    }

    /// Returns `true` if free-text keyword scoring is possible.
    #[must_use]
    pub fn has_keywords(&self) -> bool {
        !self.keywords.is_empty()
    }
}

/// Reference back into the source material a checkpoint was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Source chunk or document reference.
    pub source: String,

    /// Location within the source (page, section), if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Highlighted span supporting the checkpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<String>,
}

/// A question used to verify understanding before progressing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Checkpoint identifier, unique within the graph.
    pub id: String,

    /// Prompt text shown to the user.
    pub prompt: String,

    /// Expected-answer representation.
    pub answer: AnswerKey,

    /// Source citations supporting this checkpoint.
    #[serde(default)]
    pub citations: Vec<Citation>,
}

// ============================================================================
// Concepts and modules
// ============================================================================

/// Smallest teachable unit within a module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    /// Concept identifier, unique within the graph.
    pub id: String,

    /// Short concept name.
    pub name: String,

    /// Explanatory content with optional per-mode variants.
    pub content: ContentVariants,

    /// Zero or more checkpoint questions, presented in order.
    #[serde(default)]
    pub checkpoints: Vec<Checkpoint>,
}

impl Concept {
    /// Returns the checkpoint with the given id, if present.
    #[must_use]
    pub fn checkpoint(&self, checkpoint_id: &str) -> Option<&Checkpoint> {
        self.checkpoints.iter().find(|c| c.id == checkpoint_id)
    }
}

/// A topic-level unit of the learning path containing ordered concepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    /// Module identifier, unique within the graph.
    pub id: String,

    /// Module title shown in selection menus.
    pub title: String,

    /// Optional longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Presentation order among the graph's modules.
    pub sequence: u32,

    /// Difficulty tier assigned by the builder.
    #[serde(default)]
    pub difficulty: Difficulty,

    /// Ids of modules that must be completed first.
    #[serde(default)]
    pub prerequisites: Vec<String>,

    /// Ordered concept sequence.
    pub concepts: Vec<Concept>,
}

impl Module {
    /// Returns the concept with the given id, if present.
    #[must_use]
    pub fn concept(&self, concept_id: &str) -> Option<&Concept> {
        self.concepts.iter().find(|c| c.id == concept_id)
    }

    /// Returns the index of the concept with the given id, if present.
    #[must_use]
    pub fn concept_index(&self, concept_id: &str) -> Option<usize> {
        self.concepts.iter().position(|c| c.id == concept_id)
    }

    /// Returns the first concept in module order, if any.
    #[must_use]
    pub fn first_concept(&self) -> Option<&Concept> {
        self.concepts.first()
    }

    /// Returns the concept following `concept_id` in module order.
    #[must_use]
    pub fn concept_after(&self, concept_id: &str) -> Option<&Concept> {
        let idx = self.concept_index(concept_id)?;
        self.concepts.get(idx + 1)
    }
}
