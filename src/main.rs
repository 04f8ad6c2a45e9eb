//! CLI entry point for doihive.

use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use doihive_core::fetch::{FetchOrchestrator, FetchTask, TargetResolver};
use doihive_core::parser::{ArchiveReport, check_archive, extract_identifiers};
use doihive_core::report::{RunSummary, format_bytes, format_duration};
use tracing::{debug, info, warn};

mod cli;
mod config;
mod logging;
mod progress;

use cli::Args;
use config::RunConfig;
use progress::ProgressObserver;

/// Missing-DOI records listed per file before the rest are summarised.
const MISSING_PREVIEW: usize = 3;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    let loaded = config::load(args.config.as_deref())?;
    let run = RunConfig::resolve(&args, loaded.as_ref().map(|(_, cfg)| cfg));

    let _log_guard = logging::init(args.verbose, args.quiet, run.log_dir.as_deref())?;

    debug!(?args, "CLI arguments parsed");
    if let Some((path, _)) = &loaded {
        info!(path = %path.display(), "loaded config file");
    }
    info!(archive = %run.archive_dir.display(), output = %run.output_dir.display(), "doihive starting");

    let report = check_archive(&run.archive_dir)?;
    log_archive_report(&report);
    if args.check_only {
        return Ok(());
    }

    let mut identifiers = extract_identifiers(&run.archive_dir)?;
    if let Some(budget) = run.budget
        && identifiers.len() > budget
    {
        info!(budget, available = identifiers.len(), "applying download budget");
        identifiers.truncate(budget);
    }
    if identifiers.is_empty() {
        info!("No valid DOIs found in archive");
        return Ok(());
    }

    let resolver = TargetResolver::new(&run.base_url)
        .with_context(|| format!("Invalid base URL '{}'", run.base_url))?;
    let mut tasks: Vec<FetchTask> = Vec::with_capacity(identifiers.len());
    let mut unresolved = 0usize;
    for identifier in &identifiers {
        match resolver.resolve(identifier) {
            Ok(task) => tasks.push(task),
            Err(e) => {
                unresolved += 1;
                warn!(doi = %identifier, error = %e, "cannot build mirror URL");
            }
        }
    }

    let show_progress = !args.quiet && std::io::stderr().is_terminal();
    let observer = Arc::new(ProgressObserver::new(show_progress));
    let orchestrator = FetchOrchestrator::build(run.fetch_settings(), run.workers, observer)?;
    let summary = orchestrator.run(tasks).await?;

    let errors = summary.errors();
    if let Some(path) = errors.write_json(&run.error_dir, summary.started_at())? {
        info!(path = %path.display(), "error log saved");
    }
    if let Some(path) = errors.write_retry_list(&run.error_dir, summary.started_at())? {
        info!(path = %path.display(), "retry list saved");
    }

    log_run_summary(&summary, unresolved);
    Ok(())
}

fn log_archive_report(report: &ArchiveReport) {
    for file in &report.files {
        info!(
            file = %file.file_name,
            records = file.total_records,
            dois = file.valid_dois,
            missing = file.missing.len(),
            "export file"
        );
        for record in file.missing.iter().take(MISSING_PREVIEW) {
            debug!(file = %file.file_name, record = record.index, content = %record.content, "record without DOI");
        }
        if file.missing.len() > MISSING_PREVIEW {
            debug!(file = %file.file_name, more = file.missing.len() - MISSING_PREVIEW, "more records without DOI");
        }
    }
    for (doi, files) in &report.duplicates {
        let total: usize = files.values().sum();
        debug!(%doi, occurrences = total, files = files.len(), "duplicate DOI");
    }
    info!(
        files = report.total_files,
        records = report.total_records,
        dois = report.total_dois,
        unique = report.unique_dois,
        missing = report.missing_dois,
        duplicates = report.duplicates.len(),
        coverage = %format!("{:.2}%", report.coverage()),
        "archive check complete"
    );
}

fn log_run_summary(summary: &RunSummary, unresolved: usize) {
    let stats = summary.statistics();
    info!(
        total = stats.total,
        success = stats.success,
        skipped = stats.skipped,
        failed = stats.failed,
        unresolved,
        success_rate = %format!("{:.1}%", stats.success_rate),
        downloaded = %format_bytes(stats.total_bytes),
        retries = stats.retries,
        "Download complete"
    );
    info!(
        wall_clock = %format_duration(stats.wall_clock),
        per_task = %format_duration(stats.wall_clock_per_task),
        average = %format_duration(stats.average_duration),
        success_avg = %format_duration(stats.average_success_duration),
        skip_avg = %format_duration(stats.average_skip_duration),
        fail_avg = %format_duration(stats.average_fail_duration),
        "Timing"
    );
    for group in summary.errors().groups() {
        warn!(
            kind = %group.kind,
            count = group.count,
            examples = %group.examples.join(", "),
            "failures by type"
        );
    }
}
