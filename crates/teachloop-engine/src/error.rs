//! Error types for the teachloop engine.
//!
//! Hard failures are limited to client-input errors and the usual
//! infrastructure passthroughs. Recoverable conditions (elaboration
//! unavailable, evaluator timeout, retry limit) are response annotations,
//! never errors, so a session can never get stuck on a failed collaborator.

use std::path::PathBuf;

use uuid::Uuid;

/// A specialized `Result` type for engine operations.
pub type Result<T> = std::result::Result<T, TeachError>;

/// Errors that can occur while driving a teaching session.
#[derive(Debug, thiserror::Error)]
pub enum TeachError {
    // ========================================================================
    // Client-input errors (no state mutation occurs)
    // ========================================================================
    /// The requested module does not exist in the knowledge base's graph.
    #[error("Module '{module_id}' not found in knowledge base '{kb_id}'\n\nSuggestion: List the knowledge base's modules and pick an existing id")]
    InvalidModuleReference {
        /// The knowledge base that was searched.
        kb_id: String,
        /// The module id that was not found.
        module_id: String,
    },

    /// No module graph is registered for the knowledge base.
    #[error("No module graph registered for knowledge base '{kb_id}'\n\nSuggestion: Build and register the knowledge base's module graph first")]
    UnknownKnowledgeBase {
        /// The knowledge base id.
        kb_id: String,
    },

    /// The session id does not name a known session.
    #[error("Unknown session: {session_id}")]
    UnknownSession {
        /// The session id that was not found.
        session_id: Uuid,
    },

    /// The supplied sequence number is stale or out of order.
    ///
    /// Replays of the immediately preceding sequence number are served from
    /// the response cache and never reach this error.
    #[error("Sequence conflict: expected {expected}, got {got}")]
    SequenceConflict {
        /// The session's next expected sequence number.
        expected: u64,
        /// The sequence number the caller supplied.
        got: u64,
    },

    // ========================================================================
    // Configuration errors
    // ========================================================================
    /// Invalid JSON syntax in the engine configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your teachloop.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // General I/O errors
    // ========================================================================
    /// General I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TeachError {
    /// Creates a new `InvalidModuleReference` error.
    #[must_use]
    pub fn invalid_module(kb_id: impl Into<String>, module_id: impl Into<String>) -> Self {
        Self::InvalidModuleReference {
            kb_id: kb_id.into(),
            module_id: module_id.into(),
        }
    }

    /// Creates a new `UnknownKnowledgeBase` error.
    #[must_use]
    pub fn unknown_kb(kb_id: impl Into<String>) -> Self {
        Self::UnknownKnowledgeBase { kb_id: kb_id.into() }
    }

    /// Creates a new `UnknownSession` error.
    #[must_use]
    pub const fn unknown_session(session_id: Uuid) -> Self {
        Self::UnknownSession { session_id }
    }

    /// Creates a new `SequenceConflict` error.
    #[must_use]
    pub const fn sequence_conflict(expected: u64, got: u64) -> Self {
        Self::SequenceConflict { expected, got }
    }

    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Returns `true` if this error was caused by the caller's input.
    ///
    /// Client-input errors leave all session state untouched; the caller
    /// must correct the request rather than retry it.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidModuleReference { .. }
                | Self::UnknownKnowledgeBase { .. }
                | Self::UnknownSession { .. }
                | Self::SequenceConflict { .. }
        )
    }
}
