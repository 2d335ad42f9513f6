// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Blattwerk worksheet personalizer.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Raster formats accepted for student photos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhotoFormat {
    Jpeg,
    Png,
}

impl PhotoFormat {
    /// Infer the photo format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// Supported worksheet document types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorksheetFormat {
    Pdf,
    Png,
    Jpeg,
}

impl WorksheetFormat {
    /// Infer the worksheet format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Vector documents keep their page content; raster ones are re-encoded.
    pub fn is_vector(&self) -> bool {
        matches!(self, Self::Pdf)
    }

    /// MIME type string, used in log output.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

/// A student discovered from a photo file.
///
/// The display name is derived from the file name: extension stripped,
/// underscores turned into spaces, surrounding whitespace trimmed. It is never
/// empty; files whose stem reduces to nothing do not produce a `Student`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    name: String,
    photo_path: PathBuf,
    photo_format: PhotoFormat,
}

impl Student {
    /// Build a student from a photo path. Returns `None` when the extension
    /// is not a supported photo format or the derived name is empty.
    pub fn from_photo_path(photo_path: impl Into<PathBuf>) -> Option<Self> {
        let photo_path = photo_path.into();
        let photo_format = PhotoFormat::from_path(&photo_path)?;
        let stem = photo_path.file_stem()?.to_str()?;
        let name = display_name_from_stem(stem)?;
        Some(Self {
            name,
            photo_path,
            photo_format,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn photo_path(&self) -> &Path {
        &self.photo_path
    }

    pub fn photo_format(&self) -> PhotoFormat {
        self.photo_format
    }

    /// Name as used in output file names: spaces become underscores.
    pub fn file_token(&self) -> String {
        self.name.replace(' ', "_")
    }
}

impl std::fmt::Display for Student {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let file = self
            .photo_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        write!(f, "{} ({})", self.name, file)
    }
}

/// Turn a photo file stem into a display name.
pub fn display_name_from_stem(stem: &str) -> Option<String> {
    let name = stem.replace('_', " ");
    let trimmed = name.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// The unit page coordinates are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageUnit {
    /// PDF points (1/72 inch).
    Points,
    /// Raster pixels.
    Pixels,
}

/// Dimensions of one worksheet page.
///
/// `units_per_cm` is the page's native scale: how many page units one
/// physical centimetre occupies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub units_per_cm: f32,
    pub unit: PageUnit,
}

impl PageGeometry {
    /// Same page at `factor` times the size and resolution.
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            width: self.width * factor,
            height: self.height * factor,
            units_per_cm: self.units_per_cm * factor,
            unit: self.unit,
        }
    }

    pub fn cm_to_units(&self, cm: f32) -> f32 {
        cm * self.units_per_cm
    }
}

/// Absolute rectangle for one overlay element.
///
/// Origin is the top-left page corner, y grows downward. Processors that use
/// a bottom-left origin (PDF) flip it themselves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PlacementRect {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// Placement of the name text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamePlacement {
    pub rect: PlacementRect,
    /// Font size in page units.
    pub font_size: f32,
    /// Distance from the rectangle's top edge to the text baseline.
    pub baseline: f32,
    /// The exact text to draw (label prefix included).
    pub text: String,
}

/// Output of the layout engine for one student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub photo: PlacementRect,
    pub name: Option<NamePlacement>,
}

/// One of the independent class groups of a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClassGroup {
    A,
    B,
    C,
}

impl ClassGroup {
    pub const ALL: [ClassGroup; 3] = [ClassGroup::A, ClassGroup::B, ClassGroup::C];

    pub fn letter(&self) -> char {
        match self {
            Self::A => 'A',
            Self::B => 'B',
            Self::C => 'C',
        }
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'A' => Some(Self::A),
            'B' => Some(Self::B),
            'C' => Some(Self::C),
            _ => None,
        }
    }
}

impl std::fmt::Display for ClassGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.letter())
    }
}
