// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Personalizer: drives per-student composition for one worksheet.
//
// The worksheet is opened once (format detection, page inspection) and then
// rendered for every student of the roster. A failing student is recorded
// and the next one is attempted; only problems with the worksheet itself
// abort the run, and they are recorded on the worksheet's report.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::report::{Failure, StudentFailure};
use blattwerk_core::{Configuration, ErrorKind, Student, WorksheetReport};
use blattwerk_document::{
    DocumentProcessor, FontResolver, ImageProcessor, ResolvedFont, open_processor, render_student,
    write_atomic,
};
use tracing::{debug, error, info, instrument, warn};

use crate::cancel::CancelFlag;

/// Report note for a worksheet with an empty roster.
pub const NO_STUDENTS_NOTE: &str = "no students found";

/// Validated settings plus the resolved name font.
pub struct Personalizer {
    config: Configuration,
    font: Arc<ResolvedFont>,
}

impl Personalizer {
    /// Validate `config` and resolve its font. The font is resolved once per
    /// process and shared by every personalizer using the same font path.
    pub fn new(config: Configuration) -> Result<Self> {
        config.validate()?;
        let font = FontResolver::resolve(config.font_path.as_deref());
        Ok(Self { config, font })
    }

    /// Detect the worksheet format and load it. Unsupported extensions and
    /// unreadable documents fail here, before any student is attempted.
    pub fn open_worksheet(&self, worksheet: &Path) -> Result<WorksheetJob<'_>> {
        let processor = open_processor(worksheet, &self.config)?;
        debug!(format = processor.format().mime_type(), "Worksheet opened");
        Ok(WorksheetJob {
            personalizer: self,
            worksheet: worksheet.to_path_buf(),
            processor,
            taken: HashSet::new(),
        })
    }

    /// Personalise `worksheet` for every student in `roster`.
    ///
    /// Per-student failures are collected in the returned report. An `Err`
    /// means the worksheet itself could not be used.
    pub fn process_all(
        &self,
        worksheet: &Path,
        roster: &[Student],
        output_dir: &Path,
    ) -> Result<WorksheetReport> {
        self.process_all_cancellable(worksheet, roster, output_dir, &CancelFlag::new())
    }

    /// Like [`Personalizer::process_all`], stopping before the next student
    /// once `cancel` is set.
    #[instrument(skip_all, fields(path = %worksheet.display(), students = roster.len()))]
    pub fn process_all_cancellable(
        &self,
        worksheet: &Path,
        roster: &[Student],
        output_dir: &Path,
        cancel: &CancelFlag,
    ) -> Result<WorksheetReport> {
        let mut job = self.open_worksheet(worksheet)?;
        let mut report = WorksheetReport::new(worksheet);

        if roster.is_empty() {
            warn!("no students found, nothing to personalise");
            report.note = Some(NO_STUDENTS_NOTE.to_string());
            return Ok(report);
        }

        ensure_directory(output_dir)?;
        report.output_dir = Some(output_dir.to_path_buf());
        job.personalize_roster(roster, output_dir, cancel, &mut report);
        Ok(report)
    }

    /// Personalise `worksheet` for one student. An existing output with the
    /// same name is replaced.
    #[instrument(skip_all, fields(path = %worksheet.display(), student = student.name()))]
    pub fn process_single(
        &self,
        worksheet: &Path,
        student: &Student,
        output_dir: &Path,
    ) -> Result<PathBuf> {
        let job = self.open_worksheet(worksheet)?;
        ensure_directory(output_dir)?;
        let target = output_path_for(worksheet, student, output_dir);
        job.write_student(student, &target)?;
        Ok(target)
    }
}

/// One worksheet opened for personalisation.
pub struct WorksheetJob<'a> {
    personalizer: &'a Personalizer,
    worksheet: PathBuf,
    processor: Box<dyn DocumentProcessor>,
    /// Output paths already produced by this job.
    taken: HashSet<PathBuf>,
}

impl WorksheetJob<'_> {
    /// Render one student's copy in memory.
    pub fn render(&self, student: &Student) -> Result<Vec<u8>> {
        let photo = ImageProcessor::open(student.photo_path())?.into_dynamic();
        render_student(
            self.processor.as_ref(),
            &photo,
            student.name(),
            &self.personalizer.config,
            &self.personalizer.font,
        )
    }

    /// Render and write one student's copy into `output_dir`.
    ///
    /// A student whose file name was already produced by this job (two
    /// photos with the same display name) gets a `_2`, `_3`, ... suffix.
    pub fn personalize(&mut self, student: &Student, output_dir: &Path) -> Result<PathBuf> {
        let target = self.unique_path(output_path_for(&self.worksheet, student, output_dir));
        self.write_student(student, &target)?;
        self.taken.insert(target.clone());
        Ok(target)
    }

    /// Work through a roster, recording every outcome in `report`.
    /// Returns `false` when `cancel` stopped the run early.
    ///
    /// A worksheet-fatal error ends the roster and is recorded as the
    /// worksheet's error, as is a roster where no output could be written
    /// at all.
    pub fn personalize_roster(
        &mut self,
        roster: &[Student],
        output_dir: &Path,
        cancel: &CancelFlag,
        report: &mut WorksheetReport,
    ) -> bool {
        for student in roster {
            if cancel.is_cancelled() {
                warn!(
                    done = report.created_count() + report.failures.len(),
                    total = roster.len(),
                    "Cancelled, remaining students skipped"
                );
                return false;
            }
            match self.personalize(student, output_dir) {
                Ok(path) => report.created.push(path),
                Err(err) if err.is_worksheet_fatal() => {
                    error!(
                        student = student.name(),
                        kind = %err.kind(),
                        %err,
                        "Worksheet unusable, remaining students skipped"
                    );
                    report.worksheet_error = Some(Failure::from_error(&err));
                    return true;
                }
                Err(err) => {
                    error!(student = student.name(), kind = %err.kind(), %err, "Student failed");
                    report.failures.push(StudentFailure {
                        student: student.name().to_string(),
                        photo: student.photo_path().to_path_buf(),
                        failure: Failure::from_error(&err),
                    });
                }
            }
        }

        if report.created.is_empty()
            && !report.failures.is_empty()
            && report
                .failures
                .iter()
                .all(|f| f.failure.kind == ErrorKind::OutputWrite)
        {
            error!(
                worksheet = %self.worksheet.display(),
                output = %output_dir.display(),
                "No output could be written for any student"
            );
            report.worksheet_error = Some(Failure::from_error(&BlattwerkError::OutputWrite(
                format!("no copy could be written to {}", output_dir.display()),
            )));
        }
        info!(
            created = report.created_count(),
            failed = report.failed_count(),
            "Worksheet finished"
        );
        true
    }

    fn write_student(&self, student: &Student, target: &Path) -> Result<()> {
        let bytes = self.render(student)?;
        write_atomic(target, &bytes)?;
        info!(student = student.name(), output = %target.display(), "Personalised worksheet written");
        Ok(())
    }

    fn unique_path(&self, path: PathBuf) -> PathBuf {
        if !self.taken.contains(&path) {
            return path;
        }
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        let mut counter = 2;
        loop {
            let candidate = dir.join(format!("{stem}_{counter}{extension}"));
            if !self.taken.contains(&candidate) {
                debug!(output = %candidate.display(), "Duplicate student name, suffixed");
                return candidate;
            }
            counter += 1;
        }
    }
}

/// `<worksheet-stem>_<student_name>.<worksheet-extension>` inside `output_dir`.
pub fn output_path_for(worksheet: &Path, student: &Student, output_dir: &Path) -> PathBuf {
    let stem = worksheet
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut name = format!("{stem}_{}", student.file_token());
    if let Some(extension) = worksheet.extension() {
        name.push('.');
        name.push_str(&extension.to_string_lossy());
    }
    output_dir.join(name)
}

fn ensure_directory(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|err| {
        BlattwerkError::OutputWrite(format!("failed to create {}: {}", dir.display(), err))
    })
}
