//! Concurrency, idempotency, and degradation tests for the teachloop
//! engine.
//!
//! Each session is the unit of isolation: calls against the same session
//! are serialized and strictly sequence-checked, calls against different
//! sessions are independent, and slow collaborators degrade under bounded
//! timeouts instead of stalling the session.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use teachloop_engine::{
    Annotation, ContentGenerator, ElaborationMode, EngineConfig, ResponseKind, SessionEvent,
    TeachError, TeachingEngine,
};
use teachloop_graph::{
    AnswerKey, Checkpoint, ChoiceOption, Concept, ContentVariants, Difficulty,
    InMemoryGraphProvider, Module, ModuleGraph,
};

fn mc_checkpoint(id: &str) -> Checkpoint {
    Checkpoint {
        id: id.to_string(),
        prompt: format!("Question {id}?"),
        answer: AnswerKey {
            options: vec![
                ChoiceOption::new("A", "Right answer"),
                ChoiceOption::new("B", "Wrong answer"),
            ],
            correct_key: Some("A".to_string()),
            keywords: vec![],
        },
        citations: vec![],
    }
}

fn single_module_graph() -> ModuleGraph {
    ModuleGraph::new(
        "kb-conc",
        vec![Module {
            id: "m1".to_string(),
            title: "Module m1".to_string(),
            description: None,
            sequence: 1,
            difficulty: Difficulty::Beginner,
            prerequisites: vec![],
            concepts: vec![
                Concept {
                    id: "c1".to_string(),
                    name: "Concept c1".to_string(),
                    content: ContentVariants::standard_only("Standard text for c1"),
                    checkpoints: vec![mc_checkpoint("cp1")],
                },
                Concept {
                    id: "c2".to_string(),
                    name: "Concept c2".to_string(),
                    content: ContentVariants::standard_only("Standard text for c2"),
                    checkpoints: vec![],
                },
            ],
        }],
    )
    .expect("graph must validate")
}

fn engine_with(config: EngineConfig) -> TeachingEngine {
    let provider = InMemoryGraphProvider::new();
    provider.insert(single_module_graph());
    TeachingEngine::new(config, Arc::new(provider))
}

fn engine() -> TeachingEngine {
    engine_with(EngineConfig::default())
}

#[tokio::test]
async fn test_out_of_order_sequence_conflicts_until_predecessor_lands() {
    let engine = engine();
    let session = engine
        .start_session("kb-conc", "u1", Some("m1"), false)
        .await
        .expect("start_session failed");

    // N+1 before N: must fail, never be silently reordered.
    let result = engine.process_interaction(session.id, "continue", 1).await;
    assert!(matches!(
        result,
        Err(TeachError::SequenceConflict { expected: 0, got: 1 })
    ));

    // N lands: accepted.
    engine
        .process_interaction(session.id, "continue", 0)
        .await
        .expect("sequence 0 must be accepted");

    // Now N+1 is the next expected sequence and succeeds.
    let response = engine
        .process_interaction(session.id, "A", 1)
        .await
        .expect("sequence 1 must be accepted after 0");
    assert_eq!(response.kind, ResponseKind::Feedback);
}

#[tokio::test]
async fn test_concurrent_same_session_calls_serialize() {
    let engine = Arc::new(engine());
    let session = engine
        .start_session("kb-conc", "u1", Some("m1"), false)
        .await
        .expect("start_session failed");

    let (first, second) = futures::join!(
        engine.process_interaction(session.id, "continue", 0),
        engine.process_interaction(session.id, "A", 1),
    );

    // Sequence 0 always lands: a conflicting racer does not mutate state.
    let first = first.expect("sequence 0 must be accepted");
    assert_eq!(first.kind, ResponseKind::Checkpoint);

    // Sequence 1 either ran after 0 (accepted) or before it (conflict);
    // silent reordering is never allowed.
    let accepted = match second {
        Ok(response) => {
            assert_eq!(response.kind, ResponseKind::Feedback);
            true
        }
        Err(TeachError::SequenceConflict { got: 1, .. }) => false,
        Err(other) => unreachable!("unexpected error: {other}"),
    };

    let log = engine
        .interaction_log(session.id)
        .await
        .expect("log must exist");
    assert_eq!(log.len(), if accepted { 2 } else { 1 });
    // Records are strictly sequential.
    for (i, record) in log.iter().enumerate() {
        assert_eq!(record.sequence, i as u64);
    }
}

#[tokio::test]
async fn test_independent_sessions_proceed_in_parallel() {
    let engine = Arc::new(engine());
    let first = engine
        .start_session("kb-conc", "u1", Some("m1"), false)
        .await
        .expect("start failed");
    let second = engine
        .start_session("kb-conc", "u2", Some("m1"), false)
        .await
        .expect("start failed");

    let (a, b) = futures::join!(
        engine.process_interaction(first.id, "continue", 0),
        engine.process_interaction(second.id, "continue", 0),
    );

    assert_eq!(a.expect("first session failed").kind, ResponseKind::Checkpoint);
    assert_eq!(b.expect("second session failed").kind, ResponseKind::Checkpoint);
}

#[tokio::test]
async fn test_replay_is_byte_identical_with_no_side_effects() {
    let engine = engine();
    let session = engine
        .start_session("kb-conc", "u1", Some("m1"), false)
        .await
        .expect("start_session failed");

    let original = engine
        .process_interaction(session.id, "continue", 0)
        .await
        .expect("interaction failed");
    let log_after_first = engine.interaction_log(session.id).await.unwrap().len();

    // Same sequence number again: cached response, byte for byte.
    let replay = engine
        .process_interaction(session.id, "continue", 0)
        .await
        .expect("replay failed");

    let original_bytes = serde_json::to_vec(&original).expect("serialize failed");
    let replay_bytes = serde_json::to_vec(&replay).expect("serialize failed");
    assert_eq!(original_bytes, replay_bytes);

    // No additional state mutation: no new audit record, and the session
    // still expects sequence 1.
    assert_eq!(
        engine.interaction_log(session.id).await.unwrap().len(),
        log_after_first
    );
    let response = engine
        .process_interaction(session.id, "A", 1)
        .await
        .expect("sequence 1 must still be next");
    assert_eq!(response.kind, ResponseKind::Feedback);
}

/// Content generator that never completes within any reasonable bound.
struct StalledGenerator;

#[async_trait]
impl ContentGenerator for StalledGenerator {
    async fn generate_elaboration(
        &self,
        _concept_id: &str,
        _mode: ElaborationMode,
    ) -> Option<String> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Some("too late".to_string())
    }
}

#[tokio::test(start_paused = true)]
async fn test_elaboration_timeout_degrades_to_static_content() {
    let config = EngineConfig {
        elaboration_timeout_secs: 1,
        ..Default::default()
    };
    let engine = engine_with(config).with_generator(Arc::new(StalledGenerator));
    let session = engine
        .start_session("kb-conc", "u1", Some("m1"), false)
        .await
        .expect("start_session failed");

    let response = engine
        .process_interaction(session.id, "example", 0)
        .await
        .expect("interaction must not stall");

    // Still a content response, with the static explanation and the
    // degradation annotation.
    assert_eq!(response.kind, ResponseKind::Content);
    assert!(response.content.contains("Standard text for c1"));
    assert!(response
        .annotations
        .contains(&Annotation::ElaborationUnavailable));

    // The session's position is unchanged.
    let view = engine.session_view(session.id).await.expect("view failed");
    assert!(view.content.contains("Standard text for c1"));
}

#[tokio::test]
async fn test_event_stream_reports_module_and_session_completion() {
    let engine = engine();
    let mut events = engine.subscribe();

    let session = engine
        .start_session("kb-conc", "u1", Some("m1"), false)
        .await
        .expect("start_session failed");

    // Walk the single module to termination.
    let inputs = ["continue", "A", "continue", "continue"];
    for (seq, input) in inputs.iter().enumerate() {
        engine
            .process_interaction(session.id, input, seq as u64)
            .await
            .expect("interaction failed");
    }

    let mut module_completed = false;
    let mut session_completed = false;
    while let Ok(event) = events.try_recv() {
        match event {
            SessionEvent::ModuleCompleted(payload) => {
                assert_eq!(payload.module_id, "m1");
                module_completed = true;
            }
            SessionEvent::SessionCompleted(payload) => {
                assert_eq!(payload.session_id, session.id);
                session_completed = true;
            }
            _ => {}
        }
    }
    assert!(module_completed, "ModuleCompleted event not seen");
    assert!(session_completed, "SessionCompleted event not seen");
}
