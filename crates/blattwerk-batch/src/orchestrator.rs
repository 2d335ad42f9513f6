// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch orchestrator: runs every class group through
// Scanning -> Processing -> Relocating -> Done.
//
// Groups are independent: a missing folder fails its own group only. Inside
// a group each (worksheet, student) pair is isolated, and the cancellation
// flag is polled between pairs.

use std::fs;
use std::path::{Path, PathBuf};

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::report::Failure;
use blattwerk_core::{
    BatchResult, ClassGroup, Configuration, GroupReport, GroupState, Student, WorksheetReport,
};
use tracing::{debug, error, info, instrument, warn};

use crate::cancel::CancelFlag;
use crate::personalizer::Personalizer;
use crate::relocate::relocate;
use crate::roster::{scan_roster, scan_worksheets};

/// The three folders one class group works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupPaths {
    pub group: ClassGroup,
    /// Worksheets waiting to be personalised.
    pub input: PathBuf,
    /// Student photos.
    pub students: PathBuf,
    /// Destination; one subfolder per worksheet.
    pub output: PathBuf,
}

impl GroupPaths {
    /// `Input-<G>`, `Schüler-<G>` and `Ausgabe-<G>` under `base`.
    pub fn conventional(base: impl AsRef<Path>, group: ClassGroup) -> Self {
        let base = base.as_ref();
        Self {
            group,
            input: base.join(format!("Input-{group}")),
            students: base.join(format!("Schüler-{group}")),
            output: base.join(format!("Ausgabe-{group}")),
        }
    }
}

/// Drives a whole batch run over one or more class groups.
pub struct BatchOrchestrator {
    personalizer: Personalizer,
    groups: Vec<GroupPaths>,
    cancel: CancelFlag,
}

impl BatchOrchestrator {
    /// Validates `config` before any folder is touched.
    pub fn new(config: Configuration, groups: Vec<GroupPaths>) -> Result<Self> {
        Ok(Self {
            personalizer: Personalizer::new(config)?,
            groups,
            cancel: CancelFlag::new(),
        })
    }

    /// Orchestrator over the conventional folder layout under `base`.
    pub fn conventional(
        config: Configuration,
        base: impl AsRef<Path>,
        groups: &[ClassGroup],
    ) -> Result<Self> {
        let base = base.as_ref();
        let paths = groups
            .iter()
            .map(|group| GroupPaths::conventional(base, *group))
            .collect();
        Self::new(config, paths)
    }

    /// Poll `cancel` instead of the orchestrator's own flag.
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// A handle that cancels this orchestrator's run.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Run every group in order. Never fails: every problem ends up in the
    /// returned result.
    pub fn run(&self) -> BatchResult {
        let mut result = BatchResult::default();
        info!(groups = self.groups.len(), "Batch run started");

        for paths in &self.groups {
            if result.cancelled {
                result.groups.push(GroupReport::new(paths.group));
                continue;
            }
            let (report, completed) = self.run_group(paths);
            result.groups.push(report);
            if !completed {
                result.cancelled = true;
            }
        }

        info!(
            created = result.created_count(),
            failed = result.failed_count(),
            outcome = ?result.outcome(),
            "Batch run finished"
        );
        result
    }

    /// Returns the group report and whether the group ran to completion.
    #[instrument(skip_all, fields(group = %paths.group))]
    fn run_group(&self, paths: &GroupPaths) -> (GroupReport, bool) {
        let mut report = GroupReport::new(paths.group);
        if self.cancel.is_cancelled() {
            return (report, false);
        }

        transition(&mut report, GroupState::Scanning);
        let (worksheets, roster) = match self.scan(paths) {
            Ok(found) => found,
            Err(err) => {
                warn!(%err, "Group cannot run");
                report.failure = Some(Failure::from_error(&err));
                transition(&mut report, GroupState::Failed);
                return (report, true);
            }
        };
        report.student_count = roster.len();

        if roster.is_empty() || worksheets.is_empty() {
            let note = if roster.is_empty() {
                format!("no students found in {}", paths.students.display())
            } else {
                format!("no worksheets found in {}", paths.input.display())
            };
            warn!("{note}");
            report.note = Some(note);
            transition(&mut report, GroupState::Done);
            return (report, true);
        }
        info!(
            students = roster.len(),
            worksheets = worksheets.len(),
            "Group ready"
        );

        for worksheet in &worksheets {
            if self.cancel.is_cancelled() {
                warn!("Cancelled before {}", worksheet.display());
                return (report, false);
            }
            transition(&mut report, GroupState::Processing);
            let (sheet, completed) =
                self.run_worksheet(worksheet, &roster, &paths.output, &mut report);
            report.worksheets.push(sheet);
            if !completed {
                return (report, false);
            }
        }

        transition(&mut report, GroupState::Done);
        (report, true)
    }

    fn scan(&self, paths: &GroupPaths) -> Result<(Vec<PathBuf>, Vec<Student>)> {
        let worksheets = scan_worksheets(&paths.input)?;
        let roster: Vec<Student> = scan_roster(&paths.students)?.collect();
        fs::create_dir_all(&paths.output).map_err(|err| {
            BlattwerkError::OutputWrite(format!(
                "failed to create {}: {}",
                paths.output.display(),
                err
            ))
        })?;
        Ok((worksheets, roster))
    }

    /// Personalise one worksheet for the whole roster and relocate it.
    /// Returns `false` when cancellation interrupted the roster.
    #[instrument(skip_all, fields(path = %worksheet.display()))]
    fn run_worksheet(
        &self,
        worksheet: &Path,
        roster: &[Student],
        output_base: &Path,
        group: &mut GroupReport,
    ) -> (WorksheetReport, bool) {
        let mut sheet = WorksheetReport::new(worksheet);

        let mut job = match self.personalizer.open_worksheet(worksheet) {
            Ok(job) => job,
            Err(err) => {
                error!(kind = %err.kind(), %err, "Worksheet skipped");
                sheet.worksheet_error = Some(Failure::from_error(&err));
                return (sheet, true);
            }
        };

        let output_dir = match create_worksheet_folder(output_base, worksheet) {
            Ok(dir) => dir,
            Err(err) => {
                error!(%err, "Worksheet skipped");
                sheet.worksheet_error = Some(Failure::from_error(&err));
                return (sheet, true);
            }
        };
        sheet.output_dir = Some(output_dir.clone());

        if !job.personalize_roster(roster, &output_dir, &self.cancel, &mut sheet) {
            return (sheet, false);
        }

        if sheet.created.is_empty() || sheet.worksheet_error.is_some() {
            warn!("Worksheet not completed, it stays in the input folder");
            return (sheet, true);
        }

        transition(group, GroupState::Relocating);
        match relocate(worksheet, &output_dir) {
            Ok(path) => sheet.relocated_to = Some(path),
            Err(err) => {
                warn!(%err, "Worksheet could not be moved");
                sheet.relocation_error = Some(Failure::from_error(&err));
            }
        }
        (sheet, true)
    }
}

/// Create `<output>/<stem>`, or the first free `<stem>_2`, `<stem>_3`, ...
/// when earlier runs already used that name.
pub fn create_worksheet_folder(output_base: &Path, worksheet: &Path) -> Result<PathBuf> {
    let stem = worksheet
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "worksheet".to_string());

    let mut folder = output_base.join(&stem);
    let mut counter = 2;
    while folder.exists() {
        folder = output_base.join(format!("{stem}_{counter}"));
        counter += 1;
    }

    fs::create_dir_all(&folder).map_err(|err| {
        BlattwerkError::OutputWrite(format!("failed to create {}: {}", folder.display(), err))
    })?;
    debug!(folder = %folder.display(), "Output folder created");
    Ok(folder)
}

fn transition(report: &mut GroupReport, next: GroupState) {
    debug!(from = report.state.as_str(), to = next.as_str(), "Group state");
    report.state = next;
}
