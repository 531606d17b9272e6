//! End-to-end traversal tests for the teachloop engine.
//!
//! These tests validate the complete workflow from graph loading through
//! module traversal, checkpoint evaluation, adaptive branching, and report
//! generation.

use std::path::PathBuf;
use std::sync::Arc;

use teachloop_engine::{
    Annotation, EngineConfig, Phase, ResponseKind, SessionProgress, TeachingEngine,
};
use teachloop_graph::{
    AnswerKey, Checkpoint, ChoiceOption, Concept, ContentVariants, Difficulty,
    InMemoryGraphProvider, Module, ModuleGraph,
};
use teachloop_report::{
    ContentMode, MarkdownGenerator, ModuleRow, ProgressReport, SessionStatus,
};

/// Path to the sample course fixture.
fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/sample-course")
}

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

fn concept_with(id: &str, checkpoints: Vec<Checkpoint>) -> Concept {
    Concept {
        id: id.to_string(),
        name: format!("Concept {id}"),
        content: ContentVariants {
            standard: format!("Standard text for {id}"),
            simplified: Some(format!("Simplified text for {id}")),
            advanced: None,
        },
        checkpoints,
    }
}

fn module_with(id: &str, sequence: u32, prerequisites: &[&str], concepts: Vec<Concept>) -> Module {
    Module {
        id: id.to_string(),
        title: format!("Module {id}"),
        description: None,
        sequence,
        difficulty: Difficulty::Beginner,
        prerequisites: prerequisites.iter().map(ToString::to_string).collect(),
        concepts,
    }
}

fn engine_for(graph: ModuleGraph) -> TeachingEngine {
    let provider = InMemoryGraphProvider::new();
    provider.insert(graph);
    TeachingEngine::new(EngineConfig::default(), Arc::new(provider))
}

/// The spec scenario graph: one module, three concepts, one checkpoint each.
fn scenario_graph() -> ModuleGraph {
    ModuleGraph::new(
        "kb-scenario",
        vec![module_with(
            "m1",
            1,
            &[],
            vec![
                concept_with("c1", vec![mc_checkpoint("cp1")]),
                concept_with("c2", vec![mc_checkpoint("cp2")]),
                concept_with("c3", vec![mc_checkpoint("cp3")]),
            ],
        )],
    )
    .expect("scenario graph must validate")
}

#[test]
fn test_sample_graph_loads() {
    let graph_path = fixture_path().join("graph.json");
    assert!(
        graph_path.exists(),
        "Graph fixture not found at: {graph_path:?}"
    );

    let graph = ModuleGraph::load_from_file(&graph_path).expect("Failed to load graph");

    assert_eq!(graph.kb_id(), "kb-rust-intro");
    assert_eq!(graph.modules().len(), 2);
    assert_eq!(graph.total_concepts(), 3);

    let borrowing = graph.module("m-borrowing").expect("m-borrowing missing");
    assert_eq!(borrowing.prerequisites, vec!["m-ownership".to_string()]);

    let checkpoint = graph
        .concept("m-ownership", "c-moves")
        .and_then(|c| c.checkpoint("cp-moves"))
        .expect("cp-moves missing");
    assert_eq!(checkpoint.answer.correct_key.as_deref(), Some("B"));
    assert_eq!(checkpoint.citations.len(), 1);
}

#[test]
fn test_sample_config_loads() {
    let config_path = fixture_path().join("teachloop.json");
    assert!(
        config_path.exists(),
        "Config fixture not found at: {config_path:?}"
    );

    let config = EngineConfig::load_from_file(&config_path).expect("Failed to load config");

    assert_eq!(config.retry_limit, 2);
    assert_eq!(config.wrong_answer_threshold, 2);
    assert_eq!(config.elaboration_timeout_secs, 5);
    assert!((config.evaluator.pass_threshold - 0.33).abs() < f64::EPSILON);
}

/// The spec's reference scenario: checkpoint 1 correct, checkpoint 2
/// incorrect twice (hits the retry limit of 2), checkpoint 3 correct.
///
/// Expected: the wrong-checkpoint counter reaches 2, concept 2 is still
/// marked complete after exhausting retries, the adaptive mode becomes
/// simplified at the module boundary, and module progress ends at 100.
#[tokio::test]
async fn test_reference_scenario_retry_and_adaptive_branch() {
    let engine = engine_for(scenario_graph());
    let session = engine
        .start_session("kb-scenario", "u1", Some("m1"), false)
        .await
        .expect("start_session failed");

    let mut overall_seen = Vec::new();
    let inputs = [
        ("continue", ResponseKind::Checkpoint), // cp1
        ("A", ResponseKind::Feedback),          // correct -> c2
        ("continue", ResponseKind::Checkpoint), // cp2
        ("B", ResponseKind::Checkpoint),        // wrong attempt 1: re-presented
        ("B", ResponseKind::Feedback),          // wrong attempt 2: limit hit -> c3
        ("continue", ResponseKind::Checkpoint), // cp3
        ("A", ResponseKind::Feedback),          // correct -> summary
    ];

    let mut last = None;
    for (seq, (input, expected_kind)) in inputs.iter().enumerate() {
        let response = engine
            .process_interaction(session.id, input, seq as u64)
            .await
            .expect("interaction failed");
        assert_eq!(
            response.kind, *expected_kind,
            "unexpected kind at step {seq} ({input})"
        );
        // Progress is always bounded.
        assert!((0.0..=100.0).contains(&response.progress.overall));
        assert!((0.0..=100.0).contains(&response.progress.module));
        overall_seen.push(response.progress.overall);
        last = Some(response);
    }

    // Overall progress is monotonically non-decreasing.
    for pair in overall_seen.windows(2) {
        assert!(pair[1] >= pair[0], "overall progress decreased: {pair:?}");
    }

    let summary = last.expect("no responses seen");
    assert!(summary.content.contains("complete"));
    assert!(
        (summary.progress.module - 100.0).abs() < f64::EPSILON,
        "final module progress must be 100, got {}",
        summary.progress.module
    );

    let progress = engine
        .get_session_progress(session.id)
        .await
        .expect("progress failed");
    // Concept 2 was marked complete despite the exhausted checkpoint.
    assert_eq!(progress.modules[0].completed_concepts, 3);
    assert_eq!(progress.unresolved_checkpoints, vec!["cp2".to_string()]);
    // Two wrong answers reached the threshold: simplified at the boundary.
    assert_eq!(
        progress.adaptive_mode,
        teachloop_graph::AdaptiveMode::Simplified
    );
    assert_eq!(progress.phase, Phase::PresentingSummary);
}

#[tokio::test]
async fn test_retry_limit_response_carries_annotation() {
    let engine = engine_for(scenario_graph());
    let session = engine
        .start_session("kb-scenario", "u1", Some("m1"), false)
        .await
        .expect("start_session failed");

    engine.process_interaction(session.id, "continue", 0).await.unwrap();
    engine.process_interaction(session.id, "B", 1).await.unwrap();
    let exhausted = engine.process_interaction(session.id, "B", 2).await.unwrap();

    assert!(exhausted.annotations.contains(&Annotation::RetryLimitExceeded));
    assert!(exhausted.content.contains("Standard text for c2"));
}

#[tokio::test]
async fn test_free_text_partial_verdict_is_acceptable() {
    // Six keywords; matching exactly one scores ~0.17: partial band under
    // the default thresholds (pass 0.33, partial 0.15).
    let checkpoint = Checkpoint {
        id: "cp-free".to_string(),
        prompt: "Describe the lifecycle of a value.".to_string(),
        answer: AnswerKey {
            options: vec![],
            correct_key: None,
            keywords: ["owner", "move", "borrow", "scope", "drop", "lifetime"]
                .iter()
                .map(ToString::to_string)
                .collect(),
        },
        citations: vec![],
    };
    let graph = ModuleGraph::new(
        "kb-free",
        vec![module_with(
            "m1",
            1,
            &[],
            vec![concept_with("c1", vec![checkpoint])],
        )],
    )
    .expect("graph must validate");
    let engine = engine_for(graph);
    let session = engine
        .start_session("kb-free", "u1", Some("m1"), false)
        .await
        .expect("start_session failed");

    engine.process_interaction(session.id, "continue", 0).await.unwrap();
    let response = engine
        .process_interaction(session.id, "it is released when it goes out of scope", 1)
        .await
        .unwrap();

    // Partial is acceptable: the session advanced to the module summary.
    assert_eq!(response.kind, ResponseKind::Feedback);
    assert!(response.content.contains("Partially correct"));

    let progress = engine.get_session_progress(session.id).await.unwrap();
    assert_eq!(progress.modules[0].completed_concepts, 1);
}

#[tokio::test]
async fn test_prerequisite_gating_through_menu() {
    let graph_path = fixture_path().join("graph.json");
    let graph = ModuleGraph::load_from_file(&graph_path).expect("Failed to load graph");
    let engine = engine_for(graph);

    let session = engine
        .start_session("kb-rust-intro", "u1", None, false)
        .await
        .expect("start_session failed");

    let menu = engine.session_view(session.id).await.unwrap();
    assert_eq!(menu.kind, ResponseKind::Options);
    let keys: Vec<&str> = menu.options.iter().map(|o| o.key.as_str()).collect();
    assert_eq!(keys, vec!["m-ownership"], "m-borrowing must be gated");

    // Choosing the gated module is an invalid choice.
    let rejected = engine
        .process_interaction(session.id, "m-borrowing", 0)
        .await
        .unwrap();
    assert_eq!(rejected.kind, ResponseKind::Options);
    assert!(matches!(
        rejected.annotations.first(),
        Some(Annotation::InvalidChoice { given }) if given == "m-borrowing"
    ));

    // Walk m-ownership: c-moves (MC answer B), then c-drop (free text).
    engine.process_interaction(session.id, "m-ownership", 1).await.unwrap();
    engine.process_interaction(session.id, "continue", 2).await.unwrap();
    engine.process_interaction(session.id, "B", 3).await.unwrap();
    engine.process_interaction(session.id, "continue", 4).await.unwrap();
    let summary = engine
        .process_interaction(session.id, "values are dropped when the owner leaves scope", 5)
        .await
        .unwrap();
    assert!(summary.content.contains("Module 'Ownership' complete"));

    // Acknowledging the summary unlocks m-borrowing.
    let menu = engine.process_interaction(session.id, "go on", 6).await.unwrap();
    assert_eq!(menu.kind, ResponseKind::Options);
    let keys: Vec<&str> = menu.options.iter().map(|o| o.key.as_str()).collect();
    assert_eq!(keys, vec!["m-borrowing"]);
}

#[tokio::test]
async fn test_session_view_is_read_only() {
    let engine = engine_for(scenario_graph());
    let session = engine
        .start_session("kb-scenario", "u1", Some("m1"), false)
        .await
        .expect("start_session failed");

    let first = engine.session_view(session.id).await.unwrap();
    let second = engine.session_view(session.id).await.unwrap();
    assert_eq!(first, second);

    // Views consume no sequence numbers: interaction 0 still works.
    let response = engine
        .process_interaction(session.id, "continue", 0)
        .await
        .unwrap();
    assert_eq!(response.kind, ResponseKind::Checkpoint);
}

#[tokio::test]
async fn test_checkpoint_response_carries_citations() {
    let graph_path = fixture_path().join("graph.json");
    let graph = ModuleGraph::load_from_file(&graph_path).expect("Failed to load graph");
    let engine = engine_for(graph);

    let session = engine
        .start_session("kb-rust-intro", "u1", Some("m-ownership"), false)
        .await
        .expect("start_session failed");

    let checkpoint = engine
        .process_interaction(session.id, "continue", 0)
        .await
        .unwrap();
    assert_eq!(checkpoint.kind, ResponseKind::Checkpoint);
    assert_eq!(checkpoint.citations.len(), 1);
    assert_eq!(checkpoint.citations[0].source, "chunk-101");
    assert_eq!(checkpoint.citations[0].location.as_deref(), Some("ch. 4.1"));
}

#[tokio::test]
async fn test_adaptive_mode_single_step_per_module() {
    // Three single-concept modules, each with one checkpoint.
    let graph = ModuleGraph::new(
        "kb-steps",
        vec![
            module_with("m1", 1, &[], vec![concept_with("c1", vec![mc_checkpoint("cp1")])]),
            module_with("m2", 2, &[], vec![concept_with("c2", vec![mc_checkpoint("cp2")])]),
            module_with("m3", 3, &[], vec![concept_with("c3", vec![mc_checkpoint("cp3")])]),
        ],
    )
    .expect("graph must validate");
    let engine = engine_for(graph);
    let session = engine
        .start_session("kb-steps", "u1", Some("m1"), false)
        .await
        .expect("start_session failed");

    // Module 1: struggle (two wrong answers) -> simplified.
    engine.process_interaction(session.id, "continue", 0).await.unwrap();
    engine.process_interaction(session.id, "B", 1).await.unwrap();
    engine.process_interaction(session.id, "B", 2).await.unwrap(); // summary
    let progress = engine.get_session_progress(session.id).await.unwrap();
    assert_eq!(report_mode(&progress), ContentMode::Simplified);

    // Module 2: clean -> one step back to standard, never straight to
    // advanced.
    engine.process_interaction(session.id, "ok", 3).await.unwrap(); // menu
    let content = engine.process_interaction(session.id, "m2", 4).await.unwrap();
    // Simplified mode picks the simplified content variant.
    assert!(content.content.contains("Simplified text for c2"));
    engine.process_interaction(session.id, "continue", 5).await.unwrap();
    engine.process_interaction(session.id, "A", 6).await.unwrap(); // summary
    let progress = engine.get_session_progress(session.id).await.unwrap();
    assert_eq!(report_mode(&progress), ContentMode::Standard);

    // Module 3: clean again -> advanced.
    engine.process_interaction(session.id, "ok", 7).await.unwrap(); // menu
    engine.process_interaction(session.id, "m3", 8).await.unwrap();
    engine.process_interaction(session.id, "continue", 9).await.unwrap();
    engine.process_interaction(session.id, "A", 10).await.unwrap(); // summary
    let progress = engine.get_session_progress(session.id).await.unwrap();
    assert_eq!(report_mode(&progress), ContentMode::Advanced);
}

#[tokio::test]
async fn test_struggling_session_terminates_simplified() {
    let engine = engine_for(scenario_graph());
    let session = engine
        .start_session("kb-scenario", "u1", Some("m1"), false)
        .await
        .expect("start_session failed");

    // Struggle through cp1 to reach the wrong-answer threshold, finish the
    // module, and re-enter via the menu.
    let inputs = [
        "continue", "B", "B", // cp1 exhausted, wrong counter = 2
        "continue", "A", // cp2
        "continue", "A", // cp3 -> summary (simplified decided here)
    ];
    for (seq, input) in inputs.iter().enumerate() {
        engine
            .process_interaction(session.id, input, seq as u64)
            .await
            .unwrap();
    }

    // All concepts are complete, so the summary acknowledgement terminates
    // the session; simplified mode is visible in the progress summary.
    let terminal = engine.process_interaction(session.id, "ok", 7).await.unwrap();
    assert_eq!(terminal.kind, ResponseKind::Complete);
    let progress = engine.get_session_progress(session.id).await.unwrap();
    assert_eq!(report_mode(&progress), ContentMode::Simplified);
}

#[tokio::test]
async fn test_progress_report_renders_from_session() {
    let engine = engine_for(scenario_graph());
    let session = engine
        .start_session("kb-scenario", "reporter", Some("m1"), false)
        .await
        .expect("start_session failed");

    engine.process_interaction(session.id, "continue", 0).await.unwrap();
    engine.process_interaction(session.id, "A", 1).await.unwrap();

    let progress = engine.get_session_progress(session.id).await.unwrap();
    let report = to_report(&progress);
    report.validate().expect("report must be consistent");

    let markdown = MarkdownGenerator::new(&report).generate();
    assert!(markdown.contains("# Teaching Session Report"));
    assert!(markdown.contains("**Knowledge base**: kb-scenario"));
    assert!(markdown.contains("| Module m1 | 1/3 |"));

    let json = teachloop_report::json::JsonGenerator::new(&report)
        .generate()
        .expect("json generation failed");
    assert!(json.contains(r#""kbId":"kb-scenario""#));
}

/// Maps the engine progress summary onto report input types, the way the
/// CLI does.
fn to_report(progress: &SessionProgress) -> ProgressReport {
    ProgressReport {
        session_id: progress.session_id.to_string(),
        kb_id: progress.kb_id.clone(),
        user_id: progress.user_id.clone(),
        status: match progress.phase {
            Phase::AwaitingOptionChoice => SessionStatus::AwaitingOptionChoice,
            Phase::PresentingContent => SessionStatus::PresentingContent,
            Phase::AwaitingCheckpointAnswer => SessionStatus::AwaitingCheckpointAnswer,
            Phase::PresentingSummary => SessionStatus::PresentingSummary,
            Phase::Complete => SessionStatus::Complete,
        },
        adaptive_mode: report_mode(progress),
        overall_percent: progress.overall_percent,
        modules: progress
            .modules
            .iter()
            .map(|m| ModuleRow {
                module_id: m.module_id.clone(),
                title: m.title.clone(),
                completed_concepts: m.completed_concepts,
                total_concepts: m.total_concepts,
                percent: m.percent,
                complete: m.complete,
            })
            .collect(),
        unresolved_checkpoints: progress.unresolved_checkpoints.clone(),
        interactions: progress.interactions,
        started_at: progress.started_at,
        updated_at: progress.updated_at,
    }
}

fn report_mode(progress: &SessionProgress) -> ContentMode {
    match progress.adaptive_mode {
        teachloop_graph::AdaptiveMode::Simplified => ContentMode::Simplified,
        teachloop_graph::AdaptiveMode::Standard => ContentMode::Standard,
        teachloop_graph::AdaptiveMode::Advanced => ContentMode::Advanced,
    }
}
