// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Blattwerk command-line entry point.
//
// Initialises logging, turns arguments into a validated Configuration, runs
// the requested command and maps its outcome onto the exit status expected by
// the launcher scripts: 0 done, 1 failed, 2 cancelled.

mod args;
mod interrupt;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use blattwerk_batch::{BatchOrchestrator, CancelFlag, Personalizer, generate_preview, scan_roster};
use blattwerk_core::error::Result;
use blattwerk_core::human_errors::humanize_error;
use blattwerk_core::{BatchOutcome, Configuration, Student, WorksheetReport};
use clap::Parser;
use tracing::{error, info, warn};

use args::{Cli, Command};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(err) => {
            error!(%err, "Blattwerk stopped");
            eprintln!("{}", humanize_error(&err));
            ExitCode::from(BatchOutcome::Failure.exit_code())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<BatchOutcome> {
    let config = cli.settings.resolve()?;
    info!("Blattwerk starting");

    let cancel = CancelFlag::new();
    if let Err(err) = interrupt::install(cancel.clone()) {
        warn!(%err, "Ctrl-C handling unavailable");
    }

    match cli.command {
        Command::Personalize {
            worksheet,
            students,
            output,
        } => personalize(&worksheet, &students, &output, config, &cancel),
        Command::Batch { base_dir, groups } => {
            let result = BatchOrchestrator::conventional(config, &base_dir, &groups)?
                .with_cancel_flag(cancel)
                .run();
            print!("{}", result.summary());
            Ok(result.outcome())
        }
        Command::Preview {
            worksheet,
            students,
            out,
        } => {
            let preview = generate_preview(&worksheet, &students, &config)?;
            let dest = out.unwrap_or_else(|| default_preview_path(preview.path()));
            let kept = preview.keep_as(&dest)?;
            println!("Preview: {}", kept.display());
            Ok(BatchOutcome::Success)
        }
    }
}

fn personalize(
    worksheet: &Path,
    students: &Path,
    output: &Path,
    config: Configuration,
    cancel: &CancelFlag,
) -> Result<BatchOutcome> {
    let personalizer = Personalizer::new(config)?;
    let roster: Vec<Student> = scan_roster(students)?.collect();
    let report = personalizer.process_all_cancellable(worksheet, &roster, output, cancel)?;
    print_worksheet_report(&report);

    Ok(if cancel.is_cancelled() {
        BatchOutcome::Cancelled
    } else if roster.is_empty() {
        BatchOutcome::NothingToDo
    } else if report.created.is_empty() {
        BatchOutcome::Failure
    } else if report.failed_count() == 0 {
        BatchOutcome::Success
    } else {
        BatchOutcome::PartialSuccess
    })
}

fn print_worksheet_report(report: &WorksheetReport) {
    if let Some(note) = &report.note {
        println!("Note: {note}");
        return;
    }
    for path in &report.created {
        println!("+ {}", path.display());
    }
    for failed in &report.failures {
        println!(
            "! {}: [{}] {}",
            failed.student, failed.failure.kind, failed.failure.hint
        );
    }
    if let Some(failure) = &report.worksheet_error {
        println!("! {}: [{}] {}", report.worksheet_name(), failure.kind, failure.hint);
    }
    println!(
        "{}: {} created, {} failed",
        report.worksheet_name(),
        report.created_count(),
        report.failed_count()
    );
}

/// `preview_<file name>` in the current directory.
fn default_preview_path(rendered: &Path) -> PathBuf {
    let name = rendered
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "worksheet".to_string());
    PathBuf::from(format!("preview_{name}"))
}
