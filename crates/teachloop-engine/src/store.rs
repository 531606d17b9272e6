//! In-memory session store with per-session serialization.
//!
//! Each session lives in its own slot behind a `tokio::sync::Mutex`; the
//! engine holds the slot lock for the whole of `process_interaction`, which
//! serializes concurrent calls against the same session while calls against
//! different sessions proceed in parallel. The outer map lock is only held
//! for slot lookup, never across an await point.
//!
//! Durable persistence technology is out of scope; a durable store would
//! implement this same slot surface with a compare-and-swap on the
//! session's sequence number.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::response::{InteractionRecord, InteractionResponse};
use crate::session::Session;

/// One session plus its append-only audit log and cached last response.
///
/// The cached response backs idempotent replay: a repeated sequence number
/// is answered from here without re-executing side effects.
#[derive(Debug)]
pub struct SessionSlot {
    /// The session state.
    pub session: Session,
    /// Append-only interaction records.
    pub interactions: Vec<InteractionRecord>,
    /// Response produced by the most recently accepted interaction.
    pub cached_response: Option<InteractionResponse>,
}

impl SessionSlot {
    /// Creates a slot for a freshly started session.
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self {
            session,
            interactions: Vec::new(),
            cached_response: None,
        }
    }
}

/// In-memory session store keyed by session id.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slots: RwLock<HashMap<Uuid, Arc<Mutex<SessionSlot>>>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new session, returning its slot.
    pub fn insert(&self, session: Session) -> Arc<Mutex<SessionSlot>> {
        let id = session.id;
        let slot = Arc::new(Mutex::new(SessionSlot::new(session)));
        let mut guard = match self.slots.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.insert(id, Arc::clone(&slot));
        slot
    }

    /// Returns the slot for a session, if it exists.
    #[must_use]
    pub fn slot(&self, session_id: &Uuid) -> Option<Arc<Mutex<SessionSlot>>> {
        let guard = match self.slots.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.get(session_id).cloned()
    }

    /// Number of sessions in the store, terminal ones included.
    ///
    /// Terminal sessions are retained for progress reporting, never
    /// deleted.
    #[must_use]
    pub fn len(&self) -> usize {
        let guard = match self.slots.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.len()
    }

    /// Returns `true` if the store holds no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Finds a non-terminal session for a `(kb, user)` pair, for resume.
    ///
    /// Slot references are collected before any lock is awaited so the map
    /// lock is never held across an await point.
    pub async fn find_resumable(
        &self,
        kb_id: &str,
        user_id: &str,
    ) -> Option<Arc<Mutex<SessionSlot>>> {
        let slots: Vec<Arc<Mutex<SessionSlot>>> = {
            let guard = match self.slots.read() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.values().cloned().collect()
        };

        for slot in slots {
            let matches = {
                let guard = slot.lock().await;
                guard.session.kb_id == kb_id
                    && guard.session.user_id == user_id
                    && !guard.session.is_terminal()
            };
            if matches {
                return Some(slot);
            }
        }
        None
    }
}
