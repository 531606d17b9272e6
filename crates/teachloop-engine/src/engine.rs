//! The teaching engine: session traversal, checkpoint routing, adaptive
//! branching, and idempotent interaction processing.
//!
//! Every `process_interaction` call is a complete, independently
//! schedulable transaction: the session's slot lock serializes calls
//! against the same session, all mutation happens on a scratch copy, and
//! the state, audit record, and response cache commit together in one
//! synchronous write. A call cancelled at any await point leaves the
//! stored session exactly as it was.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use teachloop_evaluator::{CheckpointEvaluator, SemanticJudge};
use teachloop_graph::{
    AdaptiveMode, Checkpoint, ChoiceOption, Concept, GraphProvider, Module, ModuleGraph,
};
use tokio::sync::broadcast;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{Result, TeachError};
use crate::events::{EventBroadcaster, SessionEvent};
use crate::progress::{self, ModuleProgressRow, Progress, SessionProgress};
use crate::response::{Annotation, InteractionRecord, InteractionResponse, ResponseKind};
use crate::session::{Phase, Position, Session};
use crate::store::MemorySessionStore;

// ============================================================================
// Collaborator boundaries
// ============================================================================

/// Kind of elaboration requested for a concept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElaborationMode {
    /// A worked example of the concept.
    Example,
    /// A differently-worded, simpler explanation.
    Simplify,
}

/// External content generator consulted for `example` and `simplify`.
///
/// May be slow and non-deterministic. The engine invokes it under a bounded
/// timeout and treats `None`, like a timeout, as elaboration being
/// unavailable; it never retries or second-guesses the output.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Generates elaboration text for a concept, or `None` if unavailable.
    async fn generate_elaboration(&self, concept_id: &str, mode: ElaborationMode)
        -> Option<String>;
}

// ============================================================================
// Engine
// ============================================================================

/// The teach-mode session engine.
///
/// Holds the session store, the checkpoint evaluator, and handles to the
/// read-only graph provider and the optional content generator. All methods
/// take `&self`; the engine is shared behind an `Arc` by callers.
pub struct TeachingEngine {
    config: EngineConfig,
    graphs: Arc<dyn GraphProvider>,
    store: MemorySessionStore,
    evaluator: CheckpointEvaluator,
    generator: Option<Arc<dyn ContentGenerator>>,
    events: EventBroadcaster,
}

impl std::fmt::Debug for TeachingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeachingEngine")
            .field("config", &self.config)
            .field("sessions", &self.store.len())
            .field("generator", &self.generator.is_some())
            .finish_non_exhaustive()
    }
}

impl TeachingEngine {
    /// Creates an engine over a graph provider.
    #[must_use]
    pub fn new(config: EngineConfig, graphs: Arc<dyn GraphProvider>) -> Self {
        let evaluator = CheckpointEvaluator::new(config.evaluator);
        Self {
            config,
            graphs,
            store: MemorySessionStore::new(),
            evaluator,
            generator: None,
            events: EventBroadcaster::default(),
        }
    }

    /// Attaches a content generator for elaboration requests.
    #[must_use]
    pub fn with_generator(mut self, generator: Arc<dyn ContentGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Attaches a semantic judge as the evaluator's fallback path.
    #[must_use]
    pub fn with_judge(mut self, judge: Arc<dyn SemanticJudge>) -> Self {
        self.evaluator = CheckpointEvaluator::new(self.config.evaluator).with_judge(judge);
        self
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Subscribes to the session event stream.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn graph_for(&self, kb_id: &str) -> Result<Arc<ModuleGraph>> {
        self.graphs
            .graph(kb_id)
            .ok_or_else(|| TeachError::unknown_kb(kb_id))
    }

    // ========================================================================
    // Exposed operations
    // ========================================================================

    /// Creates (or resumes) a teaching session.
    ///
    /// With `resume` set, an existing non-terminal session for the same
    /// `(kb, user)` pair is returned instead of creating a second one.
    /// When `module_id` is given the session starts at that module's first
    /// concept; otherwise it opens the module selection menu.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKnowledgeBase` if no graph is registered for
    /// `kb_id`, and `InvalidModuleReference` if `module_id` is given but
    /// not present in the graph.
    pub async fn start_session(
        &self,
        kb_id: &str,
        user_id: &str,
        module_id: Option<&str>,
        resume: bool,
    ) -> Result<Session> {
        let graph = self.graph_for(kb_id)?;

        if resume {
            if let Some(slot) = self.store.find_resumable(kb_id, user_id).await {
                let guard = slot.lock().await;
                info!(session_id = %guard.session.id, kb_id, user_id, "Resumed existing session");
                return Ok(guard.session.clone());
            }
        }

        let mut session = Session::new(kb_id, user_id);
        if let Some(module_id) = module_id {
            let module = graph
                .module(module_id)
                .ok_or_else(|| TeachError::invalid_module(kb_id, module_id))?;
            // A module with no concepts leaves the menu open instead.
            if let Some(first) = module.first_concept() {
                session.enter_module(module.id.clone(), first.id.clone());
                session.phase = Phase::PresentingContent;
            }
        }

        info!(session_id = %session.id, kb_id, user_id, phase = %session.phase, "Session started");
        self.store.insert(session.clone());
        self.events
            .send(SessionEvent::session_started(session.id, kb_id, user_id));
        Ok(session)
    }

    /// Processes one user interaction against a session.
    ///
    /// `expected_sequence` must equal the session's next sequence number.
    /// A replay of the immediately preceding sequence number returns the
    /// cached prior response without re-executing side effects; any other
    /// mismatch fails with `SequenceConflict`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSession`, `SequenceConflict`, or
    /// `UnknownKnowledgeBase`; all of them leave session state untouched.
    pub async fn process_interaction(
        &self,
        session_id: Uuid,
        user_input: &str,
        expected_sequence: u64,
    ) -> Result<InteractionResponse> {
        let slot = self
            .store
            .slot(&session_id)
            .ok_or(TeachError::UnknownSession { session_id })?;
        let mut guard = slot.lock().await;

        let next = guard.session.next_sequence;
        if expected_sequence != next {
            if next > 0 && expected_sequence == next - 1 {
                if let Some(cached) = guard.cached_response.clone() {
                    debug!(
                        %session_id,
                        sequence = expected_sequence,
                        "Replay served from response cache"
                    );
                    return Ok(cached);
                }
            }
            return Err(TeachError::sequence_conflict(next, expected_sequence));
        }

        let graph = self.graph_for(&guard.session.kb_id)?;

        // Scratch copy: the slot is only written after the response is
        // fully constructed, so cancellation mid-call cannot leave a
        // partial write behind.
        let mut session = guard.session.clone();
        let previous_phase = session.phase;
        let mut pending = Vec::new();
        let response = self
            .dispatch(&mut session, &graph, user_input, &mut pending)
            .await?;

        session.next_sequence += 1;
        session.touch();
        if session.is_terminal() && session.completed_at.is_none() {
            session.completed_at = Some(session.updated_at);
        }

        let new_phase = session.phase;
        let summary_module = session
            .position
            .as_ref()
            .map(|p| p.module_id.clone());
        let record =
            InteractionRecord::new(session_id, expected_sequence, user_input, response.kind);
        guard.session = session;
        guard.interactions.push(record);
        guard.cached_response = Some(response.clone());
        drop(guard);

        for event in pending {
            self.events.send(event);
        }
        self.events.send(SessionEvent::interaction_processed(
            session_id,
            expected_sequence,
            response.kind,
        ));
        if new_phase == Phase::PresentingSummary && previous_phase != Phase::PresentingSummary {
            if let Some(module_id) = summary_module {
                self.events
                    .send(SessionEvent::module_completed(session_id, module_id));
            }
        }
        if new_phase.is_terminal() && !previous_phase.is_terminal() {
            self.events.send(SessionEvent::session_completed(session_id));
        }

        Ok(response)
    }

    /// Re-presents the session's current view without consuming a sequence
    /// number or mutating anything.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSession` or `UnknownKnowledgeBase`.
    pub async fn session_view(&self, session_id: Uuid) -> Result<InteractionResponse> {
        let slot = self
            .store
            .slot(&session_id)
            .ok_or(TeachError::UnknownSession { session_id })?;
        let guard = slot.lock().await;
        let graph = self.graph_for(&guard.session.kb_id)?;
        let session = &guard.session;

        match session.phase {
            Phase::AwaitingOptionChoice => Ok(Self::menu_response(session, &graph)),
            Phase::PresentingContent => {
                let (_, concept) = Self::resolve(session, &graph)?;
                Ok(Self::content_response(session, &graph, concept))
            }
            Phase::AwaitingCheckpointAnswer => {
                let (_, concept) = Self::resolve(session, &graph)?;
                session
                    .active_checkpoint
                    .as_deref()
                    .and_then(|id| concept.checkpoint(id))
                    .map_or_else(
                        || Ok(Self::content_response(session, &graph, concept)),
                        |checkpoint| Ok(Self::checkpoint_response(session, &graph, checkpoint)),
                    )
            }
            Phase::PresentingSummary => {
                let (module, _) = Self::resolve(session, &graph)?;
                Ok(Self::summary_response(session, &graph, module))
            }
            Phase::Complete => Ok(Self::terminal_response(session, &graph)),
        }
    }

    /// Returns the session's progress summary.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSession` or `UnknownKnowledgeBase`.
    pub async fn get_session_progress(&self, session_id: Uuid) -> Result<SessionProgress> {
        let slot = self
            .store
            .slot(&session_id)
            .ok_or(TeachError::UnknownSession { session_id })?;
        let guard = slot.lock().await;
        let graph = self.graph_for(&guard.session.kb_id)?;
        let session = &guard.session;

        let modules = graph
            .modules()
            .iter()
            .map(|module| {
                let done = progress::completed_in_module(module, &session.completed_concepts);
                ModuleProgressRow {
                    module_id: module.id.clone(),
                    title: module.title.clone(),
                    completed_concepts: done,
                    total_concepts: module.concepts.len(),
                    percent: progress::percent(done, module.concepts.len()),
                    complete: ModuleGraph::module_complete(module, &session.completed_concepts),
                }
            })
            .collect();

        Ok(SessionProgress {
            session_id,
            kb_id: session.kb_id.clone(),
            user_id: session.user_id.clone(),
            phase: session.phase,
            adaptive_mode: session.adaptive_mode,
            overall_percent: progress::overall_percent(&graph, &session.completed_concepts),
            modules,
            unresolved_checkpoints: session.unresolved_checkpoints.clone(),
            interactions: guard.interactions.len() as u64,
            started_at: session.started_at,
            updated_at: session.updated_at,
        })
    }

    /// Returns a copy of the session's append-only interaction log.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSession`.
    pub async fn interaction_log(&self, session_id: Uuid) -> Result<Vec<InteractionRecord>> {
        let slot = self
            .store
            .slot(&session_id)
            .ok_or(TeachError::UnknownSession { session_id })?;
        let guard = slot.lock().await;
        Ok(guard.interactions.clone())
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    async fn dispatch(
        &self,
        session: &mut Session,
        graph: &ModuleGraph,
        user_input: &str,
        pending: &mut Vec<SessionEvent>,
    ) -> Result<InteractionResponse> {
        match session.phase {
            Phase::AwaitingOptionChoice => self.handle_option_choice(session, graph, user_input),
            Phase::PresentingContent => {
                self.handle_content_input(session, graph, user_input).await
            }
            Phase::AwaitingCheckpointAnswer => {
                self.handle_checkpoint_answer(session, graph, user_input, pending)
                    .await
            }
            Phase::PresentingSummary => self.handle_summary_ack(session, graph),
            Phase::Complete => Ok(Self::terminal_response(session, graph)),
        }
    }

    /// Module menu: the input must match an available module's id.
    fn handle_option_choice(
        &self,
        session: &mut Session,
        graph: &ModuleGraph,
        user_input: &str,
    ) -> Result<InteractionResponse> {
        let key = user_input.trim();
        let chosen = graph
            .available_modules(&session.completed_concepts)
            .into_iter()
            .find(|m| m.id.eq_ignore_ascii_case(key));

        let Some(module) = chosen else {
            debug!(session_id = %session.id, given = key, "Unmatched module choice");
            return Ok(Self::menu_response(session, graph).with_annotation(
                Annotation::InvalidChoice {
                    given: user_input.to_string(),
                },
            ));
        };
        let Some(first) = module.first_concept() else {
            return Ok(Self::menu_response(session, graph).with_annotation(
                Annotation::InvalidChoice {
                    given: user_input.to_string(),
                },
            ));
        };

        if let Some(previous) = session.position.take() {
            session.push_position(previous, self.config.nav_stack_depth);
        }
        session.enter_module(module.id.clone(), first.id.clone());
        session.phase = Phase::PresentingContent;
        info!(session_id = %session.id, module_id = %module.id, "Module selected");
        Ok(Self::content_response(session, graph, first))
    }

    /// Content phase: `continue`, `example`, `simplify`, and `back`.
    async fn handle_content_input(
        &self,
        session: &mut Session,
        graph: &ModuleGraph,
        user_input: &str,
    ) -> Result<InteractionResponse> {
        match user_input.trim().to_lowercase().as_str() {
            "continue" => self.advance(session, graph),
            "example" => self.elaborate(session, graph, ElaborationMode::Example).await,
            "simplify" => {
                self.elaborate(session, graph, ElaborationMode::Simplify)
                    .await
            }
            "back" => self.go_back(session, graph),
            _ => {
                let (_, concept) = Self::resolve(session, graph)?;
                Ok(Self::content_response(session, graph, concept).with_annotation(
                    Annotation::InvalidChoice {
                        given: user_input.to_string(),
                    },
                ))
            }
        }
    }

    /// Advances to the next item: the concept's next unanswered checkpoint,
    /// the next concept in module order, or the module summary.
    fn advance(&self, session: &mut Session, graph: &ModuleGraph) -> Result<InteractionResponse> {
        let (module, concept) = Self::resolve(session, graph)?;

        if let Some(checkpoint) = concept
            .checkpoints
            .iter()
            .find(|cp| !session.answered_checkpoints.contains(&cp.id))
        {
            session.active_checkpoint = Some(checkpoint.id.clone());
            session.phase = Phase::AwaitingCheckpointAnswer;
            return Ok(Self::checkpoint_response(session, graph, checkpoint));
        }

        // The concept is exhausted; completion is monotone, so revisits
        // after back-navigation are harmless.
        session.mark_concept_complete(concept.id.clone());

        if let Some(next) = module.concept_after(&concept.id) {
            if let Some(position) = session.position.as_mut() {
                position.concept_id = next.id.clone();
            }
            session.phase = Phase::PresentingContent;
            return Ok(Self::content_response(session, graph, next));
        }

        self.finish_module(session, module);
        Ok(Self::summary_response(session, graph, module))
    }

    /// Applies the adaptive branch at the module boundary and enters the
    /// summary phase.
    fn finish_module(&self, session: &mut Session, module: &Module) {
        if session.wrong_checkpoints >= self.config.wrong_answer_threshold {
            session.adaptive_mode = AdaptiveMode::Simplified;
        } else if session.module_answered > 0 && session.module_clean {
            session.adaptive_mode = session.adaptive_mode.relaxed();
        }
        session.active_checkpoint = None;
        session.phase = Phase::PresentingSummary;
        info!(
            session_id = %session.id,
            module_id = %module.id,
            wrong = session.wrong_checkpoints,
            mode = %session.adaptive_mode,
            "Module boundary reached"
        );
    }

    /// Elaboration request: delegates to the content generator under a
    /// bounded timeout, degrading to static content when it fails.
    async fn elaborate(
        &self,
        session: &Session,
        graph: &ModuleGraph,
        mode: ElaborationMode,
    ) -> Result<InteractionResponse> {
        let (_, concept) = Self::resolve(session, graph)?;

        let generated = match self.generator.as_ref() {
            Some(generator) => {
                let bound = Duration::from_secs(self.config.elaboration_timeout_secs);
                match timeout(bound, generator.generate_elaboration(&concept.id, mode)).await {
                    Ok(text) => text,
                    Err(_) => {
                        warn!(
                            concept_id = %concept.id,
                            ?mode,
                            timeout_secs = self.config.elaboration_timeout_secs,
                            "Content generator timed out"
                        );
                        None
                    }
                }
            }
            None => None,
        };

        // Position and completion are untouched either way.
        let response = generated.map_or_else(
            || {
                Self::content_response(session, graph, concept)
                    .with_annotation(Annotation::ElaborationUnavailable)
            },
            |text| {
                InteractionResponse::new(
                    ResponseKind::Content,
                    text,
                    Self::progress_for(session, graph),
                )
                .with_options(Self::content_options(session))
            },
        );
        Ok(response)
    }

    /// Pops the navigation stack and re-presents that position.
    fn go_back(&self, session: &mut Session, graph: &ModuleGraph) -> Result<InteractionResponse> {
        let Some(previous) = session.pop_position() else {
            let (_, concept) = Self::resolve(session, graph)?;
            return Ok(Self::content_response(session, graph, concept).with_annotation(
                Annotation::InvalidChoice {
                    given: "back".to_string(),
                },
            ));
        };

        // Pushed positions referenced existing nodes and the graph is
        // immutable, so the lookup can only fail on a graph swap.
        let module = graph
            .module(&previous.module_id)
            .ok_or_else(|| TeachError::invalid_module(&session.kb_id, &previous.module_id))?;
        let concept = module
            .concept(&previous.concept_id)
            .ok_or_else(|| TeachError::invalid_module(&session.kb_id, &previous.module_id))?;

        let module_changed = session
            .position
            .as_ref()
            .is_some_and(|p| p.module_id != previous.module_id);
        if module_changed {
            // Leaving the current module resets its counters.
            session.reset_module_counters();
        }
        session.position = Some(previous);
        session.active_checkpoint = None;
        session.phase = Phase::PresentingContent;
        Ok(Self::content_response(session, graph, concept))
    }

    /// Routes a checkpoint answer through the evaluator and applies the
    /// retry policy.
    async fn handle_checkpoint_answer(
        &self,
        session: &mut Session,
        graph: &ModuleGraph,
        user_input: &str,
        pending: &mut Vec<SessionEvent>,
    ) -> Result<InteractionResponse> {
        let (_, concept) = Self::resolve(session, graph)?;
        let checkpoint = session
            .active_checkpoint
            .as_deref()
            .and_then(|id| concept.checkpoint(id));
        let Some(checkpoint) = checkpoint else {
            // No live checkpoint for this phase; fall through to the next
            // item.
            return self.advance(session, graph);
        };

        let evaluation = self.evaluator.evaluate(checkpoint, user_input).await;
        pending.push(SessionEvent::checkpoint_evaluated(
            session.id,
            checkpoint.id.clone(),
            evaluation.verdict,
        ));
        debug!(
            session_id = %session.id,
            checkpoint_id = %checkpoint.id,
            verdict = %evaluation.verdict,
            "Checkpoint evaluated"
        );

        if evaluation.verdict.is_acceptable() {
            session.answered_checkpoints.insert(checkpoint.id.clone());
            session.mark_concept_complete(concept.id.clone());
            session.clear_retry(&checkpoint.id);
            session.active_checkpoint = None;
            session.module_answered += 1;
            session.phase = Phase::PresentingContent;

            let mut response = self.advance(session, graph)?.with_feedback(&evaluation.feedback);
            if evaluation.judge_timed_out {
                response = response.with_annotation(Annotation::EvaluatorTimeout);
            }
            return Ok(response);
        }

        session.record_wrong();
        let attempts = session.bump_retry(&checkpoint.id);

        if attempts >= self.config.retry_limit {
            // Retry limit reached: record the checkpoint for later review
            // and proceed regardless.
            info!(
                session_id = %session.id,
                checkpoint_id = %checkpoint.id,
                attempts,
                "Retry limit reached; proceeding"
            );
            session.record_unresolved(checkpoint.id.clone());
            session.answered_checkpoints.insert(checkpoint.id.clone());
            session.mark_concept_complete(concept.id.clone());
            session.clear_retry(&checkpoint.id);
            session.active_checkpoint = None;
            session.module_answered += 1;
            session.phase = Phase::PresentingContent;

            let mut response = self
                .advance(session, graph)?
                .with_feedback(&evaluation.feedback)
                .with_annotation(Annotation::RetryLimitExceeded);
            if evaluation.judge_timed_out {
                response = response.with_annotation(Annotation::EvaluatorTimeout);
            }
            return Ok(response);
        }

        // Re-present the same checkpoint with the feedback attached.
        let mut response = InteractionResponse::new(
            ResponseKind::Checkpoint,
            format!("{}\n\n{}", evaluation.feedback, checkpoint.prompt),
            Self::progress_for(session, graph),
        )
        .with_options(checkpoint.answer.options.clone())
        .with_citations(checkpoint.citations.clone());
        if evaluation.judge_timed_out {
            response = response.with_annotation(Annotation::EvaluatorTimeout);
        }
        Ok(response)
    }

    /// Summary acknowledgement: open the menu or terminate.
    fn handle_summary_ack(
        &self,
        session: &mut Session,
        graph: &ModuleGraph,
    ) -> Result<InteractionResponse> {
        // Leaving the module: the wrong-checkpoint counter resets here.
        session.reset_module_counters();

        if graph.all_complete(&session.completed_concepts) {
            session.phase = Phase::Complete;
            info!(session_id = %session.id, "All reachable modules complete");
            return Ok(Self::terminal_response(session, graph));
        }

        session.phase = Phase::AwaitingOptionChoice;
        Ok(Self::menu_response(session, graph))
    }

    // ========================================================================
    // Response construction
    // ========================================================================

    fn resolve<'g>(
        session: &Session,
        graph: &'g ModuleGraph,
    ) -> Result<(&'g Module, &'g Concept)> {
        let Some(position) = session.position.as_ref() else {
            return Err(TeachError::invalid_module(&session.kb_id, "<unset>"));
        };
        let module = graph
            .module(&position.module_id)
            .ok_or_else(|| TeachError::invalid_module(&session.kb_id, &position.module_id))?;
        let concept = module
            .concept(&position.concept_id)
            .ok_or_else(|| TeachError::invalid_module(&session.kb_id, &position.module_id))?;
        Ok((module, concept))
    }

    fn progress_for(session: &Session, graph: &ModuleGraph) -> Progress {
        let overall = progress::overall_percent(graph, &session.completed_concepts);
        let module = if session.phase.is_terminal() {
            100.0
        } else {
            session.position.as_ref().map_or(0.0, |position| {
                graph.module(&position.module_id).map_or(0.0, |m| {
                    progress::module_percent(m, &session.completed_concepts)
                })
            })
        };
        Progress { module, overall }
    }

    fn content_options(session: &Session) -> Vec<ChoiceOption> {
        let mut options = vec![
            ChoiceOption::new("continue", "Continue"),
            ChoiceOption::new("example", "Show an example"),
            ChoiceOption::new("simplify", "Explain it differently"),
        ];
        if !session.nav_stack.is_empty() {
            options.push(ChoiceOption::new("back", "Go back"));
        }
        options
    }

    fn menu_response(session: &Session, graph: &ModuleGraph) -> InteractionResponse {
        let options: Vec<ChoiceOption> = graph
            .available_modules(&session.completed_concepts)
            .iter()
            .map(|m| ChoiceOption::new(m.id.clone(), format!("{} ({})", m.title, m.difficulty)))
            .collect();
        InteractionResponse::new(
            ResponseKind::Options,
            "Select a module to continue.",
            Self::progress_for(session, graph),
        )
        .with_options(options)
    }

    fn content_response(
        session: &Session,
        graph: &ModuleGraph,
        concept: &Concept,
    ) -> InteractionResponse {
        InteractionResponse::new(
            ResponseKind::Content,
            concept.content.for_mode(session.adaptive_mode),
            Self::progress_for(session, graph),
        )
        .with_options(Self::content_options(session))
    }

    fn checkpoint_response(
        session: &Session,
        graph: &ModuleGraph,
        checkpoint: &Checkpoint,
    ) -> InteractionResponse {
        InteractionResponse::new(
            ResponseKind::Checkpoint,
            checkpoint.prompt.clone(),
            Self::progress_for(session, graph),
        )
        .with_options(checkpoint.answer.options.clone())
        .with_citations(checkpoint.citations.clone())
    }

    fn summary_response(
        session: &Session,
        graph: &ModuleGraph,
        module: &Module,
    ) -> InteractionResponse {
        let done = progress::completed_in_module(module, &session.completed_concepts);
        let total = module.concepts.len();
        let unresolved = module
            .concepts
            .iter()
            .flat_map(|c| &c.checkpoints)
            .filter(|cp| session.unresolved_checkpoints.contains(&cp.id))
            .count();

        let mut content = format!(
            "Module '{}' complete: {done} of {total} concepts covered.",
            module.title
        );
        if unresolved > 0 {
            content.push_str(&format!(" {unresolved} checkpoint(s) saved for review."));
        }

        InteractionResponse::new(
            ResponseKind::Summary,
            content,
            Self::progress_for(session, graph),
        )
        .with_options(vec![ChoiceOption::new("continue", "Continue")])
    }

    fn terminal_response(session: &Session, graph: &ModuleGraph) -> InteractionResponse {
        let done = session.completed_concepts.len();
        let total = graph.total_concepts();
        let mut content = format!("All modules complete: {done} of {total} concepts covered.");
        if !session.unresolved_checkpoints.is_empty() {
            content.push_str(&format!(
                " {} checkpoint(s) saved for review.",
                session.unresolved_checkpoints.len()
            ));
        }
        InteractionResponse::new(
            ResponseKind::Complete,
            content,
            Self::progress_for(session, graph),
        )
    }
}
