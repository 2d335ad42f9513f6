// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Preview generation: one personalised copy for the first student of a
// roster, written to a temporary directory.

use std::fs;
use std::path::{Path, PathBuf};

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::{Configuration, Student};
use blattwerk_document::write_atomic;
use tempfile::TempDir;
use tracing::{info, instrument};

use crate::personalizer::Personalizer;
use crate::roster::scan_roster;

/// A rendered preview. The file lives in a temporary directory that is
/// removed when the handle is dropped.
#[derive(Debug)]
pub struct Preview {
    _dir: TempDir,
    path: PathBuf,
    student: Student,
}

impl Preview {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The student the preview was rendered for.
    pub fn student(&self) -> &Student {
        &self.student
    }

    /// Copy the preview to `dest` before the temporary copy goes away.
    pub fn keep_as(self, dest: impl AsRef<Path>) -> Result<PathBuf> {
        let dest = dest.as_ref();
        let bytes = fs::read(&self.path).map_err(|err| {
            BlattwerkError::OutputWrite(format!("failed to read {}: {}", self.path.display(), err))
        })?;
        write_atomic(dest, &bytes)?;
        info!(dest = %dest.display(), "Preview kept");
        Ok(dest.to_path_buf())
    }
}

/// Personalise `worksheet` for the first student found in `roster_dir`.
#[instrument(skip_all, fields(path = %worksheet.display(), roster = %roster_dir.display()))]
pub fn generate_preview(
    worksheet: &Path,
    roster_dir: &Path,
    config: &Configuration,
) -> Result<Preview> {
    let personalizer = Personalizer::new(config.clone())?;
    let student = scan_roster(roster_dir)?.next().ok_or_else(|| {
        BlattwerkError::MissingDirectory(format!("no students found in {}", roster_dir.display()))
    })?;

    let dir = tempfile::Builder::new()
        .prefix("blattwerk-preview-")
        .tempdir()
        .map_err(|err| {
            BlattwerkError::OutputWrite(format!("failed to create preview directory: {}", err))
        })?;
    let path = personalizer.process_single(worksheet, &student, dir.path())?;
    info!(student = student.name(), preview = %path.display(), "Preview ready");

    Ok(Preview {
        _dir: dir,
        path,
        student,
    })
}
