// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Blattwerk.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for all Blattwerk operations.
#[derive(Debug, Error)]
pub enum BlattwerkError {
    // -- Document errors --
    #[error("worksheet cannot be read: {0}")]
    SourceDocument(String),

    #[error("photo cannot be decoded: {0}")]
    PhotoDecode(String),

    #[error("unsupported worksheet format: {0}")]
    UnsupportedFormat(String),

    #[error("font could not be loaded: {0}")]
    FontLoad(String),

    #[error("output could not be written: {0}")]
    OutputWrite(String),

    // -- Batch errors --
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("directory missing or unusable: {0}")]
    MissingDirectory(String),

    #[error("worksheet could not be moved: {0}")]
    Relocation(String),

    // -- Plumbing --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Copyable classification of a [`BlattwerkError`], recorded in batch
/// reports so failures can be counted and rendered without keeping the
/// error value alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    SourceDocument,
    PhotoDecode,
    UnsupportedFormat,
    FontLoad,
    OutputWrite,
    InvalidConfig,
    MissingDirectory,
    Relocation,
    Io,
    Serialization,
}

impl ErrorKind {
    /// Stable name used in summaries and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SourceDocument => "SourceDocumentError",
            Self::PhotoDecode => "PhotoDecodeError",
            Self::UnsupportedFormat => "UnsupportedFormatError",
            Self::FontLoad => "FontLoadError",
            Self::OutputWrite => "OutputWriteError",
            Self::InvalidConfig => "InvalidConfigError",
            Self::MissingDirectory => "MissingDirectoryError",
            Self::Relocation => "RelocationError",
            Self::Io => "IoError",
            Self::Serialization => "SerializationError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl BlattwerkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SourceDocument(_) => ErrorKind::SourceDocument,
            Self::PhotoDecode(_) => ErrorKind::PhotoDecode,
            Self::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Self::FontLoad(_) => ErrorKind::FontLoad,
            Self::OutputWrite(_) => ErrorKind::OutputWrite,
            Self::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Self::MissingDirectory(_) => ErrorKind::MissingDirectory,
            Self::Relocation(_) => ErrorKind::Relocation,
            Self::Io(_) => ErrorKind::Io,
            Self::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// Errors that invalidate a whole worksheet rather than a single student.
    pub fn is_worksheet_fatal(&self) -> bool {
        matches!(
            self,
            Self::SourceDocument(_) | Self::UnsupportedFormat(_) | Self::InvalidConfig(_)
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BlattwerkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        let err = BlattwerkError::PhotoDecode("anna.jpg: truncated".into());
        assert_eq!(err.kind(), ErrorKind::PhotoDecode);
        assert_eq!(err.kind().to_string(), "PhotoDecodeError");
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: BlattwerkError = io.into();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn worksheet_fatal_classification() {
        assert!(BlattwerkError::SourceDocument("x".into()).is_worksheet_fatal());
        assert!(BlattwerkError::UnsupportedFormat(".docx".into()).is_worksheet_fatal());
        assert!(!BlattwerkError::PhotoDecode("x".into()).is_worksheet_fatal());
        assert!(!BlattwerkError::OutputWrite("x".into()).is_worksheet_fatal());
    }
}
