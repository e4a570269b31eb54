use crate::cli::BatchArgs;
use crate::commands::{build_config, exit_code_for};
use crate::exit_codes;
use anyhow::Context;
use eeg_core::EegError;
use eeg_processing::{Pipeline, RunReport};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info};

/// Result of one recording in a batch
struct BatchOutcome {
    input: PathBuf,
    result: Result<RunReport, BatchFailure>,
}

/// Why one recording of a batch produced no outputs
#[derive(Debug)]
enum BatchFailure {
    Recording(EegError),
    /// The worker task panicked or was cancelled
    Worker(String),
}

impl BatchFailure {
    fn exit_code(&self) -> i32 {
        match self {
            BatchFailure::Recording(e) => exit_code_for(e),
            BatchFailure::Worker(_) => exit_codes::RECORDING_FAILURE,
        }
    }
}

impl fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchFailure::Recording(e) => write!(f, "{}", e),
            BatchFailure::Worker(message) => write!(f, "worker failed: {}", message),
        }
    }
}

pub async fn execute(args: BatchArgs) -> i32 {
    let pipeline = build_config(&args.pipeline).and_then(|config| Ok(Pipeline::new(config)?));
    let pipeline = match pipeline {
        Ok(p) => Arc::new(p),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return exit_codes::USAGE_ERROR;
        }
    };

    let files = match resolve_files(&args.input_dir, &args.pattern) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return exit_codes::USAGE_ERROR;
        }
    };
    if files.is_empty() {
        eprintln!(
            "Error: No files matching '{}' found in {}",
            args.pattern,
            args.input_dir.display()
        );
        return exit_codes::USAGE_ERROR;
    }

    let output_dir = args.output_dir.clone().unwrap_or_else(|| args.input_dir.join("results"));
    let jobs = args.jobs.unwrap_or_else(default_jobs).max(1);
    let total = files.len();
    info!(total, jobs, output_dir = %output_dir.display(), "starting batch");

    let start_time = Instant::now();
    let outcomes = run_batch(pipeline, files, output_dir, jobs).await;

    let mut failed = 0usize;
    let mut exit_code = exit_codes::SUCCESS;
    for outcome in &outcomes {
        let name = outcome
            .input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match &outcome.result {
            Ok(report) => println!(
                "ok    {}  {}/{} epochs kept",
                name, report.epochs.kept_epochs, report.epochs.original_epochs
            ),
            Err(failure) => {
                failed += 1;
                exit_code = exit_code.max(failure.exit_code());
                println!("FAIL  {}: {}", name, failure);
            }
        }
    }

    println!(
        "Batch complete: {}/{} succeeded, {} failed, {:.1}s",
        total - failed,
        total,
        failed,
        start_time.elapsed().as_secs_f64()
    );

    // A configuration defect outranks per-recording data failures
    exit_code
}

fn default_jobs() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Files in `dir` matching `pattern`, sorted by path
fn resolve_files(dir: &Path, pattern: &str) -> anyhow::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("Input directory not found: {}", dir.display());
    }
    let full = dir.join(pattern);
    let full = full.to_str().context("Input directory is not valid UTF-8")?;
    let paths = glob::glob(full).with_context(|| format!("Invalid pattern '{}'", pattern))?;

    let mut files: Vec<PathBuf> = paths.filter_map(Result::ok).filter(|p| p.is_file()).collect();
    files.sort();
    Ok(files)
}

/// Process every file on the blocking pool, at most `jobs` at a time
async fn run_batch(
    pipeline: Arc<Pipeline>,
    files: Vec<PathBuf>,
    output_dir: PathBuf,
    jobs: usize,
) -> Vec<BatchOutcome> {
    let semaphore = Arc::new(Semaphore::new(jobs));
    let mut handles = Vec::with_capacity(files.len());

    for input in files {
        // Never closed, so acquiring only waits for a free slot
        let permit = Arc::clone(&semaphore).acquire_owned().await.ok();
        let pipeline = Arc::clone(&pipeline);
        let output_dir = output_dir.clone();
        let task_input = input.clone();
        debug!(input = %input.display(), "queued recording");

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            pipeline.process_file(&task_input, &output_dir).map(|(_, report)| report)
        });
        handles.push((input, handle));
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for (input, handle) in handles {
        let result = match handle.await {
            Ok(Ok(report)) => Ok(report),
            Ok(Err(e)) => Err(BatchFailure::Recording(e)),
            Err(e) => Err(BatchFailure::Worker(e.to_string())),
        };
        outcomes.push(BatchOutcome { input, result });
    }
    outcomes
}
