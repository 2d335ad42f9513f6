// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Student directory scanner and worksheet enumeration.
//
// Only the top level of a directory is looked at. Entries come back in the
// order the filesystem lists them, which is repeatable on one filesystem but
// not necessarily alphabetical.

use std::fs::{self, ReadDir};
use std::path::{Path, PathBuf};

use blattwerk_core::Student;
use blattwerk_core::error::{BlattwerkError, Result};
use tracing::{debug, instrument, warn};

/// Lazy sequence of students, one per supported photo file.
///
/// Two photos that map to the same display name yield two students.
#[derive(Debug)]
pub struct RosterScan {
    entries: ReadDir,
}

impl Iterator for RosterScan {
    type Item = Student;

    fn next(&mut self) -> Option<Student> {
        for entry in self.entries.by_ref() {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(err) => {
                    warn!(error = %err, "Skipping unreadable roster entry");
                    continue;
                }
            };
            if !path.is_file() {
                continue;
            }
            match Student::from_photo_path(&path) {
                Some(student) => {
                    debug!(student = %student, "Student found");
                    return Some(student);
                }
                None => debug!(path = %path.display(), "Not a student photo, skipped"),
            }
        }
        None
    }
}

/// Start scanning a roster directory. A directory without photos yields an
/// empty sequence; a missing directory is an error.
#[instrument(skip_all, fields(path = %dir.as_ref().display()))]
pub fn scan_roster(dir: impl AsRef<Path>) -> Result<RosterScan> {
    let entries = read_directory(dir.as_ref())?;
    Ok(RosterScan { entries })
}

/// Collect every candidate worksheet in an input directory.
///
/// Hidden files (leading `.`) are ignored. Files with other extensions are
/// returned as well so the caller can report them as unsupported instead of
/// dropping them silently.
#[instrument(skip_all, fields(path = %dir.as_ref().display()))]
pub fn scan_worksheets(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let mut worksheets = Vec::new();
    for entry in read_directory(dir.as_ref())? {
        let path = entry?.path();
        if !path.is_file() || is_hidden(&path) {
            continue;
        }
        worksheets.push(path);
    }
    debug!(count = worksheets.len(), "Worksheets found");
    Ok(worksheets)
}

fn read_directory(dir: &Path) -> Result<ReadDir> {
    if !dir.is_dir() {
        return Err(BlattwerkError::MissingDirectory(dir.display().to_string()));
    }
    fs::read_dir(dir).map_err(|err| {
        BlattwerkError::MissingDirectory(format!("{}: {}", dir.display(), err))
    })
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}
