//! Session event broadcasting.
//!
//! The engine publishes coarse-grained session events over a
//! `tokio::sync::broadcast` channel so observers (dashboards, analytics)
//! can follow sessions without touching the store. Sending never blocks;
//! events published with no subscribers are dropped.

use serde::{Deserialize, Serialize};
use teachloop_evaluator::Verdict;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::response::ResponseKind;

/// Default broadcast channel capacity.
const DEFAULT_CAPACITY: usize = 100;

// ============================================================================
// Event payloads
// ============================================================================

/// Payload for the `session_started` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStartedPayload {
    /// The new session's id.
    pub session_id: Uuid,
    /// Knowledge base the session studies.
    pub kb_id: String,
    /// Owning user.
    pub user_id: String,
}

/// Payload for the `interaction_processed` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionProcessedPayload {
    /// The session the interaction belongs to.
    pub session_id: Uuid,
    /// The sequence number the interaction consumed.
    pub sequence: u64,
    /// The kind of response produced.
    pub response_kind: ResponseKind,
}

/// Payload for the `checkpoint_evaluated` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointEvaluatedPayload {
    /// The session the evaluation belongs to.
    pub session_id: Uuid,
    /// The evaluated checkpoint.
    pub checkpoint_id: String,
    /// The verdict.
    pub verdict: Verdict,
}

/// Payload for the `module_completed` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleCompletedPayload {
    /// The session that completed the module.
    pub session_id: Uuid,
    /// The completed module.
    pub module_id: String,
}

/// Payload for the `session_completed` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCompletedPayload {
    /// The terminal session.
    pub session_id: Uuid,
}

// ============================================================================
// Event enum
// ============================================================================

/// Session lifecycle events published by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A session was created.
    SessionStarted(SessionStartedPayload),
    /// An interaction was accepted and committed.
    InteractionProcessed(InteractionProcessedPayload),
    /// A checkpoint answer was evaluated.
    CheckpointEvaluated(CheckpointEvaluatedPayload),
    /// Every concept of a module was completed.
    ModuleCompleted(ModuleCompletedPayload),
    /// The session reached the terminal phase.
    SessionCompleted(SessionCompletedPayload),
}

impl SessionEvent {
    /// Creates a `SessionStarted` event.
    #[must_use]
    pub fn session_started(
        session_id: Uuid,
        kb_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self::SessionStarted(SessionStartedPayload {
            session_id,
            kb_id: kb_id.into(),
            user_id: user_id.into(),
        })
    }

    /// Creates an `InteractionProcessed` event.
    #[must_use]
    pub const fn interaction_processed(
        session_id: Uuid,
        sequence: u64,
        response_kind: ResponseKind,
    ) -> Self {
        Self::InteractionProcessed(InteractionProcessedPayload {
            session_id,
            sequence,
            response_kind,
        })
    }

    /// Creates a `CheckpointEvaluated` event.
    #[must_use]
    pub fn checkpoint_evaluated(
        session_id: Uuid,
        checkpoint_id: impl Into<String>,
        verdict: Verdict,
    ) -> Self {
        Self::CheckpointEvaluated(CheckpointEvaluatedPayload {
            session_id,
            checkpoint_id: checkpoint_id.into(),
            verdict,
        })
    }

    /// Creates a `ModuleCompleted` event.
    #[must_use]
    pub fn module_completed(session_id: Uuid, module_id: impl Into<String>) -> Self {
        Self::ModuleCompleted(ModuleCompletedPayload {
            session_id,
            module_id: module_id.into(),
        })
    }

    /// Creates a `SessionCompleted` event.
    #[must_use]
    pub const fn session_completed(session_id: Uuid) -> Self {
        Self::SessionCompleted(SessionCompletedPayload { session_id })
    }
}

// ============================================================================
// Broadcaster
// ============================================================================

/// Broadcasts [`SessionEvent`]s to any number of subscribers.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<SessionEvent>,
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBroadcaster {
    /// Creates a broadcaster with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribes to the event stream.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Publishes an event.
    ///
    /// A send with no active subscribers is not an error; the event is
    /// simply dropped.
    pub fn send(&self, event: SessionEvent) {
        let _ = self.sender.send(event);
    }

    /// Number of active subscribers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
