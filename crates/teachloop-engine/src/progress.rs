//! Progress arithmetic and the progress summary surface.
//!
//! Progress is always recomputed from completed concepts against the module
//! graph; it is never stored as a separately-drifting field.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use teachloop_graph::{AdaptiveMode, Module, ModuleGraph};
use uuid::Uuid;

use crate::session::Phase;

/// Module/overall progress pair carried by every response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// Percentage of the current module's concepts completed.
    pub module: f64,
    /// Percentage of all reachable concepts completed.
    pub overall: f64,
}

/// Percentage of `done` out of `total`, bounded to `0..=100`.
///
/// An empty denominator counts as fully complete: there is nothing left to
/// do.
#[must_use]
pub fn percent(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = 100.0 * done.min(total) as f64 / total as f64;
    ratio.clamp(0.0, 100.0)
}

/// Number of a module's concepts present in the completed set.
#[must_use]
pub fn completed_in_module(module: &Module, completed: &BTreeSet<String>) -> usize {
    module
        .concepts
        .iter()
        .filter(|c| completed.contains(&c.id))
        .count()
}

/// Overall progress across the whole graph.
#[must_use]
pub fn overall_percent(graph: &ModuleGraph, completed: &BTreeSet<String>) -> f64 {
    percent(completed.len(), graph.total_concepts())
}

/// Progress restricted to one module.
#[must_use]
pub fn module_percent(module: &Module, completed: &BTreeSet<String>) -> f64 {
    percent(completed_in_module(module, completed), module.concepts.len())
}

// ============================================================================
// Progress summary
// ============================================================================

/// Per-module progress row in a [`SessionProgress`] summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleProgressRow {
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
    /// Whether every concept of the module is complete.
    pub complete: bool,
}

/// Progress summary returned by `get_session_progress`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProgress {
    /// Session identifier.
    pub session_id: Uuid,
    /// Knowledge base being studied.
    pub kb_id: String,
    /// Owning user.
    pub user_id: String,
    /// Current phase.
    pub phase: Phase,
    /// Current adaptive mode.
    pub adaptive_mode: AdaptiveMode,
    /// Overall completion percentage.
    pub overall_percent: f64,
    /// Per-module breakdown, in module sequence order.
    pub modules: Vec<ModuleProgressRow>,
    /// Checkpoints that hit the retry limit, for later review.
    pub unresolved_checkpoints: Vec<String>,
    /// Number of accepted interactions.
    pub interactions: u64,
    /// When the session was created.
    pub started_at: DateTime<Utc>,
    /// When the session was last mutated.
    pub updated_at: DateTime<Utc>,
}
