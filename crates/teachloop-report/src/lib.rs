//! Teachloop Report Generation
//!
//! This crate provides types and utilities for generating progress reports
//! from teaching sessions. Reports can be serialized to JSON for
//! programmatic access or rendered to Markdown for human consumption.
//!
//! # Types
//!
//! - [`ProgressReport`] - The complete report structure for one session
//! - [`ModuleRow`] - Per-module completion breakdown
//! - [`SessionStatus`] - The session's state-machine phase
//!
//! # Generators
//!
//! - [`json::JsonGenerator`] - Generate JSON reports with compact or pretty formatting
//! - [`MarkdownGenerator`] - Generate human-readable Markdown reports

pub mod json;
mod markdown;

pub use markdown::MarkdownGenerator;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Failed to serialize the report to JSON.
    #[error("failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failed to read or write report files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid report data.
    #[error("invalid report data: {0}")]
    InvalidData(String),
}

/// Result type for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;

// ============================================================================
// Session status (local copy to avoid cross-crate dependency)
// ============================================================================

/// State-machine phase of the reported session.
///
/// This is a local copy of the engine's `Phase` to avoid a cross-crate
/// dependency; the wire forms are identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// A module selection menu is presented.
    #[default]
    AwaitingOptionChoice,
    /// Concept content is presented.
    PresentingContent,
    /// A checkpoint question is presented.
    AwaitingCheckpointAnswer,
    /// A module summary is presented.
    PresentingSummary,
    /// The session is terminal.
    Complete,
}

impl SessionStatus {
    /// Returns `true` if this status is terminal.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AwaitingOptionChoice => write!(f, "awaiting option choice"),
            Self::PresentingContent => write!(f, "presenting content"),
            Self::AwaitingCheckpointAnswer => write!(f, "awaiting checkpoint answer"),
            Self::PresentingSummary => write!(f, "presenting summary"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// Content-variant mode of the reported session.
///
/// Local copy of the graph crate's `AdaptiveMode`; wire forms identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentMode {
    /// Simplified content variants.
    Simplified,
    /// Standard content variants.
    #[default]
    Standard,
    /// Advanced content variants.
    Advanced,
}

impl std::fmt::Display for ContentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simplified => write!(f, "simplified"),
            Self::Standard => write!(f, "standard"),
            Self::Advanced => write!(f, "advanced"),
        }
    }
}

// ============================================================================
// Report structure
// ============================================================================

/// Per-module completion breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleRow {
    /// Module id.
    pub module_id: String,
    /// Module title.
    pub title: String,
    /// Concepts completed in this module.
    pub completed_concepts: usize,
    /// Total concepts in this module.
    pub total_concepts: usize,
    /// Completion percentage.
    pub percent: f64,
    /// Whether the module is fully complete.
    pub complete: bool,
}

/// The complete progress report for one teaching session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    /// The reported session's id.
    pub session_id: String,
    /// Knowledge base the session studies.
    pub kb_id: String,
    /// Owning user.
    pub user_id: String,
    /// Session phase at report time.
    pub status: SessionStatus,
    /// Adaptive content mode at report time.
    pub adaptive_mode: ContentMode,
    /// Overall completion percentage.
    pub overall_percent: f64,
    /// Per-module breakdown, in sequence order.
    pub modules: Vec<ModuleRow>,
    /// Checkpoints that hit the retry limit, saved for review.
    #[serde(default)]
    pub unresolved_checkpoints: Vec<String>,
    /// Number of accepted interactions.
    pub interactions: u64,
    /// When the session started.
    pub started_at: DateTime<Utc>,
    /// When the session was last active.
    pub updated_at: DateTime<Utc>,
}

impl ProgressReport {
    /// Validates internal consistency of the report data.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::InvalidData` if the overall percentage is out
    /// of range or a module row's counts are inconsistent.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.overall_percent) {
            return Err(ReportError::InvalidData(format!(
                "overall percent out of range: {}",
                self.overall_percent
            )));
        }
        for module in &self.modules {
            if module.completed_concepts > module.total_concepts {
                return Err(ReportError::InvalidData(format!(
                    "module '{}' reports {} completed of {} concepts",
                    module.module_id, module.completed_concepts, module.total_concepts
                )));
            }
        }
        Ok(())
    }
}
