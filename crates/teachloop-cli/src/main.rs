//! Teachloop CLI
//!
//! Interactive terminal driver for the teach-mode engine: loads a pre-built
//! module graph, runs a session on stdin/stdout, and writes a progress
//! report on exit.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use teachloop_engine::{
    EngineConfig, InteractionResponse, Phase, ResponseKind, SessionProgress, TeachingEngine,
};
use teachloop_graph::{AdaptiveMode, InMemoryGraphProvider, ModuleGraph};
use teachloop_report::{
    json::JsonGenerator, ContentMode, MarkdownGenerator, ModuleRow, ProgressReport, SessionStatus,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Teachloop - interactive teach-mode sessions over a module graph
///
/// Walks a knowledge base's pre-built module graph concept by concept,
/// asking checkpoint questions and adapting content difficulty to your
/// answers.
#[derive(Parser, Debug)]
#[command(name = "teachloop")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the module graph JSON file
    #[arg(value_name = "GRAPH")]
    graph: PathBuf,

    /// Path to configuration file (default: teachloop.json in current directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Module id to start at (default: module selection menu)
    #[arg(short, long, value_name = "MODULE")]
    module: Option<String>,

    /// User id recorded on the session
    #[arg(short, long, default_value = "local")]
    user: String,

    /// Output directory for the session report
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    report_dir: PathBuf,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Teachloop starting");
    tracing::debug!(graph = ?args.graph, config = ?args.config, "Inputs");

    match run_session(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(1)
        }
    }
}

/// Runs one interactive teaching session end to end.
async fn run_session(args: Args) -> anyhow::Result<()> {
    let config = match args.config.as_deref() {
        Some(path) => EngineConfig::load_from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => EngineConfig::load().context("failed to load config")?,
    };

    let graph = ModuleGraph::load_from_file(&args.graph)
        .with_context(|| format!("failed to load module graph from {}", args.graph.display()))?;
    let kb_id = graph.kb_id().to_string();
    tracing::info!(kb_id, modules = graph.modules().len(), "Module graph loaded");

    let provider = InMemoryGraphProvider::new();
    provider.insert(graph);
    let engine = TeachingEngine::new(config, Arc::new(provider));

    let session = engine
        .start_session(&kb_id, &args.user, args.module.as_deref(), true)
        .await
        .context("failed to start session")?;
    let session_id = session.id;
    let mut sequence = session.next_sequence;

    println!("Session {session_id} on knowledge base '{kb_id}'.");
    println!("Type an option key (or an answer) and press Enter. 'quit' exits.\n");

    let view = engine.session_view(session_id).await?;
    render(&view);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let Some(line) = lines.next_line().await? else {
            // stdin closed
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit") {
            break;
        }

        let response = engine
            .process_interaction(session_id, input, sequence)
            .await
            .context("interaction failed")?;
        sequence += 1;
        render(&response);

        if response.kind == ResponseKind::Complete {
            break;
        }
    }

    let progress = engine.get_session_progress(session_id).await?;
    write_reports(&progress, &args.report_dir)?;
    println!(
        "\nProgress: {:.1}% overall. Report written to {}",
        progress.overall_percent,
        args.report_dir.display()
    );
    Ok(())
}

/// Prints a response envelope to the terminal.
fn render(response: &InteractionResponse) {
    println!("----------------------------------------");
    println!("{}\n", response.content);

    for citation in &response.citations {
        match (&citation.location, &citation.highlight) {
            (Some(location), Some(highlight)) => {
                println!("  [source: {} @ {location}] \"{highlight}\"", citation.source);
            }
            (Some(location), None) => println!("  [source: {} @ {location}]", citation.source),
            _ => println!("  [source: {}]", citation.source),
        }
    }
    if !response.citations.is_empty() {
        println!();
    }

    for annotation in &response.annotations {
        use teachloop_engine::Annotation;
        match annotation {
            Annotation::InvalidChoice { given } => {
                println!("  (unrecognized input '{given}' - pick one of the options below)");
            }
            Annotation::ElaborationUnavailable => {
                println!("  (elaboration unavailable - showing the original explanation)");
            }
            Annotation::EvaluatorTimeout => {
                println!("  (answer judged by keywords only)");
            }
            Annotation::RetryLimitExceeded => {
                println!("  (retry limit reached - this checkpoint was saved for review)");
            }
        }
    }

    for option in &response.options {
        println!("  [{}] {}", option.key, option.text);
    }
    println!(
        "\n(module {:.0}% | overall {:.0}%)",
        response.progress.module, response.progress.overall
    );
}

/// Writes the session's progress report as Markdown and JSON.
fn write_reports(progress: &SessionProgress, dir: &Path) -> anyhow::Result<()> {
    let report = to_report(progress);
    report.validate().context("inconsistent progress report")?;

    let md_path = dir.join("teachloop-report.md");
    MarkdownGenerator::new(&report)
        .write_to_file(&md_path)
        .with_context(|| format!("failed to write {}", md_path.display()))?;

    let json_path = dir.join("teachloop-report.json");
    JsonGenerator::new(&report)
        .write_to_file(&json_path, true)
        .with_context(|| format!("failed to write {}", json_path.display()))?;

    Ok(())
}

/// Maps the engine's progress summary onto the report crate's input types.
fn to_report(progress: &SessionProgress) -> ProgressReport {
    let status = match progress.phase {
        Phase::AwaitingOptionChoice => SessionStatus::AwaitingOptionChoice,
        Phase::PresentingContent => SessionStatus::PresentingContent,
        Phase::AwaitingCheckpointAnswer => SessionStatus::AwaitingCheckpointAnswer,
        Phase::PresentingSummary => SessionStatus::PresentingSummary,
        Phase::Complete => SessionStatus::Complete,
    };
    let adaptive_mode = match progress.adaptive_mode {
        AdaptiveMode::Simplified => ContentMode::Simplified,
        AdaptiveMode::Standard => ContentMode::Standard,
        AdaptiveMode::Advanced => ContentMode::Advanced,
    };

    ProgressReport {
        session_id: progress.session_id.to_string(),
        kb_id: progress.kb_id.clone(),
        user_id: progress.user_id.clone(),
        status,
        adaptive_mode,
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
