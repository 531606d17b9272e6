//! Teachloop Engine
//!
//! The teach-mode interactive session engine: given a session and a user
//! input, computes the next interaction by advancing position through the
//! module graph, branching difficulty, invoking the checkpoint evaluator,
//! and producing a structured response envelope.
//!
//! The engine is the only component that reads and mutates session state.
//! Module graphs, content generation, and semantic judging are external
//! collaborators reached through narrow interfaces; each session is the
//! unit of isolation, serialized by its own lock.

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod progress;
pub mod response;
pub mod session;
pub mod store;

pub use config::EngineConfig;
pub use engine::{ContentGenerator, ElaborationMode, TeachingEngine};
pub use error::{Result, TeachError};
pub use events::{EventBroadcaster, SessionEvent};
pub use progress::{ModuleProgressRow, Progress, SessionProgress};
pub use response::{Annotation, InteractionRecord, InteractionResponse, ResponseKind};
pub use session::{Phase, Position, Session};
pub use store::{MemorySessionStore, SessionSlot};
