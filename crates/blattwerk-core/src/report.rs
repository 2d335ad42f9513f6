// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch result model: per-student outcomes aggregated per worksheet and per
// class group, plus the run-level outcome and exit status.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BlattwerkError, ErrorKind};
use crate::human_errors::humanize_error;
use crate::types::ClassGroup;

/// A recorded failure, detached from the error value that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: ErrorKind,
    /// Technical detail (the error's display text).
    pub detail: String,
    /// Plain-language hint for the user.
    pub hint: String,
}

impl Failure {
    pub fn from_error(err: &BlattwerkError) -> Self {
        Self {
            kind: err.kind(),
            detail: err.to_string(),
            hint: humanize_error(err).to_string(),
        }
    }
}

/// One student that could not be processed for a worksheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentFailure {
    pub student: String,
    pub photo: PathBuf,
    pub failure: Failure,
}

/// Everything that happened to one worksheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorksheetReport {
    pub worksheet: PathBuf,
    /// Folder the personalised copies were written to.
    pub output_dir: Option<PathBuf>,
    pub created: Vec<PathBuf>,
    pub failures: Vec<StudentFailure>,
    /// Failure that stopped the whole worksheet before or during its roster.
    pub worksheet_error: Option<Failure>,
    /// Where the original worksheet was moved to.
    pub relocated_to: Option<PathBuf>,
    pub relocation_error: Option<Failure>,
    /// Informational remark, e.g. "no students found".
    pub note: Option<String>,
}

impl WorksheetReport {
    pub fn new(worksheet: impl Into<PathBuf>) -> Self {
        Self {
            worksheet: worksheet.into(),
            ..Self::default()
        }
    }

    pub fn created_count(&self) -> usize {
        self.created.len()
    }

    /// Student failures, or one for a worksheet-level failure that no
    /// student failure accounts for.
    pub fn failed_count(&self) -> usize {
        self.failures
            .len()
            .max(usize::from(self.worksheet_error.is_some()))
    }

    pub fn worksheet_name(&self) -> String {
        file_name(&self.worksheet)
    }
}

/// Lifecycle of a class group inside one batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupState {
    Idle,
    Scanning,
    Processing,
    Relocating,
    Done,
    /// Input or roster directory missing or unusable.
    Failed,
}

impl GroupState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::Processing => "processing",
            Self::Relocating => "relocating",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

/// Result of one class group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupReport {
    pub group: ClassGroup,
    pub state: GroupState,
    pub student_count: usize,
    pub worksheets: Vec<WorksheetReport>,
    /// Why the group ended in [`GroupState::Failed`].
    pub failure: Option<Failure>,
    /// Informational remark, e.g. "no students found".
    pub note: Option<String>,
}

impl GroupReport {
    pub fn new(group: ClassGroup) -> Self {
        Self {
            group,
            state: GroupState::Idle,
            student_count: 0,
            worksheets: Vec::new(),
            failure: None,
            note: None,
        }
    }

    /// A group has input when it had at least one worksheet and one student.
    pub fn had_input(&self) -> bool {
        self.student_count > 0 && !self.worksheets.is_empty()
    }

    pub fn created_count(&self) -> usize {
        self.worksheets.iter().map(WorksheetReport::created_count).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.worksheets.iter().map(WorksheetReport::failed_count).sum()
    }

    fn has_problems(&self) -> bool {
        self.failure.is_some()
            || self.failed_count() > 0
            || self.worksheets.iter().any(|w| w.relocation_error.is_some())
    }
}

/// Run-level classification of a finished batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchOutcome {
    /// Every group with input produced outputs and nothing failed.
    Success,
    /// Every group with input produced outputs, but some pairs failed.
    PartialSuccess,
    /// No group had anything to process and nothing was broken.
    NothingToDo,
    /// Some group with input produced nothing, or only broken groups existed.
    Failure,
    /// The operator interrupted the run.
    Cancelled,
}

impl BatchOutcome {
    /// Process exit status consumed by the launcher scripts.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Success | Self::PartialSuccess | Self::NothingToDo => 0,
            Self::Failure => 1,
            Self::Cancelled => 2,
        }
    }
}

/// Aggregate result of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub groups: Vec<GroupReport>,
    pub cancelled: bool,
}

impl BatchResult {
    pub fn created_count(&self) -> usize {
        self.groups.iter().map(GroupReport::created_count).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.groups.iter().map(GroupReport::failed_count).sum()
    }

    pub fn outcome(&self) -> BatchOutcome {
        if self.cancelled {
            return BatchOutcome::Cancelled;
        }

        let with_input: Vec<&GroupReport> = self.groups.iter().filter(|g| g.had_input()).collect();

        if with_input.iter().any(|g| g.created_count() == 0) {
            return BatchOutcome::Failure;
        }

        if with_input.is_empty() {
            return if self.groups.iter().any(|g| g.state == GroupState::Failed) {
                BatchOutcome::Failure
            } else {
                BatchOutcome::NothingToDo
            };
        }

        if self.groups.iter().any(GroupReport::has_problems) {
            BatchOutcome::PartialSuccess
        } else {
            BatchOutcome::Success
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.outcome().exit_code()
    }

    /// Plain-text run summary: one block per group, then every failure.
    pub fn summary(&self) -> String {
        let mut out = String::new();

        for group in &self.groups {
            let _ = writeln!(
                out,
                "Group {}: {} - {} created, {} failed ({} students, {} worksheets)",
                group.group,
                group.state.as_str(),
                group.created_count(),
                group.failed_count(),
                group.student_count,
                group.worksheets.len()
            );
            if let Some(note) = &group.note {
                let _ = writeln!(out, "  note: {note}");
            }
            if let Some(failure) = &group.failure {
                let _ = writeln!(out, "  [{}] {}", failure.kind, failure.hint);
            }
            for sheet in &group.worksheets {
                let name = sheet.worksheet_name();
                if let Some(note) = &sheet.note {
                    let _ = writeln!(out, "  note: {name}: {note}");
                }
                for path in &sheet.created {
                    let _ = writeln!(out, "  + {}", path.display());
                }
                if let Some(failure) = &sheet.worksheet_error {
                    let _ = writeln!(out, "  ! {name}: [{}] {}", failure.kind, failure.hint);
                }
                for failed in &sheet.failures {
                    let _ = writeln!(
                        out,
                        "  ! {name} / {}: [{}] {}",
                        failed.student, failed.failure.kind, failed.failure.hint
                    );
                }
                if let Some(failure) = &sheet.relocation_error {
                    let _ = writeln!(out, "  ! {name} (move): [{}] {}", failure.kind, failure.hint);
                }
            }
        }

        let outcome = match self.outcome() {
            BatchOutcome::Success => "finished",
            BatchOutcome::PartialSuccess => "finished with problems",
            BatchOutcome::NothingToDo => "nothing to do",
            BatchOutcome::Failure => "failed",
            BatchOutcome::Cancelled => "cancelled by user",
        };
        let _ = writeln!(
            out,
            "Total: {} created, {} failed - {outcome}",
            self.created_count(),
            self.failed_count()
        );
        out
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
