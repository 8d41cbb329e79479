//! skillgrid CLI - formula analysis, grid diffs and offline task scoring

mod load;
mod logging;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use skillgrid::{
    analyze, ConceptualProgress, GridDiffer, OfflineEvaluator, PracticalProgress, PracticalTask,
    ReportGenerator, RetryPolicy, SkillLevel, SubmissionTrigger, TaskEvaluator, TaskResult,
    UserAction,
};

#[derive(Parser)]
#[command(name = "skillgrid")]
#[command(author, version, about = "Spreadsheet skills assessment toolkit")]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a formula and print its functions, references and complexity
    Formula {
        /// Formula text, including the leading '='
        text: String,
    },

    /// Compare two snapshots cell by cell
    Diff {
        /// Snapshot before editing (json or csv)
        initial: PathBuf,

        /// Snapshot after editing (json or csv)
        #[arg(value_name = "FINAL")]
        final_: PathBuf,

        /// Expected snapshot used to grade accuracy
        #[arg(short, long)]
        expected: Option<PathBuf>,
    },

    /// Score a task attempt
    Evaluate {
        /// Task definition (json)
        #[arg(short, long)]
        task: PathBuf,

        /// Candidate's final snapshot (json or csv)
        #[arg(short, long = "final", value_name = "FINAL")]
        final_: PathBuf,

        /// Action log recorded during the attempt (json array)
        #[arg(short, long)]
        actions: Option<PathBuf>,

        /// Time spent on the task in milliseconds
        #[arg(long, default_value = "0")]
        elapsed_ms: u64,
    },

    /// Build an analytics report from scored results
    Report {
        /// Report bundle (json)
        bundle: PathBuf,
    },
}

/// Inputs for an offline report
#[derive(Debug, Deserialize, Serialize)]
struct ReportBundle {
    #[serde(default)]
    skill_level: SkillLevel,
    #[serde(default)]
    conceptual: ConceptualProgress,
    #[serde(default)]
    task_results: Vec<TaskResult>,
    #[serde(default)]
    total_duration_ms: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose, cli.log_json)?;

    match cli.command {
        Commands::Formula { text } => print_json(&analyze(&text)),
        Commands::Diff {
            initial,
            final_,
            expected,
        } => diff(&initial, &final_, expected.as_deref()),
        Commands::Evaluate {
            task,
            final_,
            actions,
            elapsed_ms,
        } => evaluate(&task, &final_, actions.as_deref(), elapsed_ms),
        Commands::Report { bundle } => report(&bundle).await,
    }
}

fn diff(initial: &Path, final_: &Path, expected: Option<&Path>) -> Result<()> {
    let initial = load::load_snapshot(initial)?;
    let final_ = load::load_snapshot(final_)?;
    let expected = expected.map(load::load_snapshot).transpose()?;

    let report = GridDiffer::new().compare(&initial, &final_, expected.as_ref());
    eprintln!("{} cell(s) changed", report.changed_cells.len());
    print_json(&report)
}

fn evaluate(task: &Path, final_: &Path, actions: Option<&Path>, elapsed_ms: u64) -> Result<()> {
    let task: PracticalTask = load::load_json(task)?;
    let final_ = load::load_snapshot(final_)?;
    let actions: Vec<UserAction> = match actions {
        Some(path) => load::load_json(path)?,
        None => Vec::new(),
    };

    eprintln!("Scoring task '{}' ({} action(s))", task.id, actions.len());
    let result = TaskEvaluator::new().evaluate_task(
        &task,
        &final_,
        &actions,
        elapsed_ms,
        SubmissionTrigger::Manual,
    );
    print_json(&result)
}

async fn report(bundle: &Path) -> Result<()> {
    let bundle: ReportBundle = load::load_json(bundle)?;
    let practical = PracticalProgress::from_results(&bundle.task_results);

    let generator =
        ReportGenerator::new(OfflineEvaluator).with_policy(RetryPolicy::default().with_max_attempts(1));
    let report = generator
        .generate(
            bundle.skill_level,
            &bundle.conceptual,
            &practical,
            &bundle.task_results,
            bundle.total_duration_ms,
        )
        .await;
    print_json(&report)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value).context("Failed to write output")?;
    writeln!(out)?;
    Ok(())
}
