// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Plain-language error messages for the person running a batch (usually a
// member of school staff, not a technician).
//
// Every technical error is mapped to a short statement plus a concrete next
// step. Reports keep the combined text as a failure's hint.

use crate::error::BlattwerkError;

/// A human-readable error with plain message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain summary (one sentence).
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
}

impl std::fmt::Display for HumanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.message, self.suggestion)
    }
}

/// Convert a `BlattwerkError` into a `HumanError`.
pub fn humanize_error(err: &BlattwerkError) -> HumanError {
    match err {
        // -- Document errors --
        BlattwerkError::SourceDocument(_) => HumanError {
            message: "The worksheet file could not be opened.".into(),
            suggestion: "The file may be damaged. Open it on the computer to check it, or export it again as PDF, PNG or JPG.".into(),
        },

        BlattwerkError::PhotoDecode(_) => HumanError {
            message: "A student photo could not be read.".into(),
            suggestion: "Save the photo again as a JPG or PNG file and run once more.".into(),
        },

        BlattwerkError::UnsupportedFormat(detail) => HumanError {
            message: "This type of worksheet isn't supported.".into(),
            suggestion: format!("Save the worksheet as a PDF, PNG or JPG first. (File type: {detail})"),
        },

        BlattwerkError::FontLoad(_) => HumanError {
            message: "The name font could not be loaded.".into(),
            suggestion: "A standard bold font was used instead; nothing needs to be done.".into(),
        },

        BlattwerkError::OutputWrite(_) => HumanError {
            message: "A personalised worksheet could not be saved.".into(),
            suggestion: "Check that the output folder exists, is not read-only and the disk is not full.".into(),
        },

        // -- Batch errors --
        BlattwerkError::InvalidConfig(detail) => HumanError {
            message: "One of the settings has an impossible value.".into(),
            suggestion: format!("Open the settings and correct it. ({detail})"),
        },

        BlattwerkError::MissingDirectory(detail) => HumanError {
            message: "A folder the program needs could not be found.".into(),
            suggestion: format!("Create the folder or check its name. ({detail})"),
        },

        BlattwerkError::Relocation(_) => HumanError {
            message: "The finished worksheet could not be moved into its output folder.".into(),
            suggestion: "The personalised copies were kept. Move the original worksheet by hand.".into(),
        },

        // -- Plumbing --
        BlattwerkError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError {
                message: "A file couldn't be found.".into(),
                suggestion: "It may have been moved or deleted while the program was running.".into(),
            },
            std::io::ErrorKind::PermissionDenied => HumanError {
                message: "The program isn't allowed to use that file.".into(),
                suggestion: "Check the file permissions, or copy the files to your own folder first.".into(),
            },
            _ => HumanError {
                message: "There was a problem reading or writing a file.".into(),
                suggestion: "Try again. If this keeps happening, the disk may be full.".into(),
            },
        },

        BlattwerkError::Serialization(_) => HumanError {
            message: "The settings file could not be read.".into(),
            suggestion: "Delete the settings file to go back to the defaults, or fix its contents.".into(),
        },
    }
}
