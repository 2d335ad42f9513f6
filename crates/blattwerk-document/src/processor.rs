// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The document processor capability and format-based selection.

use std::path::Path;

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::{Configuration, PageGeometry, Placement, WorksheetFormat};
use image::DynamicImage;
use tracing::{debug, instrument};

use crate::font::{ResolvedFont, TextExtent};
use crate::image::RasterProcessor;
use crate::layout::{NameText, compute_placement};
use crate::pdf::VectorProcessor;

/// A worksheet opened once and personalised any number of times.
///
/// Implementations never modify the source: every call to
/// [`DocumentProcessor::personalize`] renders a fresh copy.
pub trait DocumentProcessor {
    /// Format of the source, and therefore of every output.
    fn format(&self) -> WorksheetFormat;

    fn geometry(&self) -> &PageGeometry;

    /// Measure name text in the face this processor draws with. `None`
    /// means the name cannot be drawn and is left out.
    fn name_extent(&self, font: &ResolvedFont, text: &str) -> Option<TextExtent>;

    /// Render one personalised copy and return its encoded bytes.
    fn personalize(
        &self,
        photo: &DynamicImage,
        placement: &Placement,
        font: &ResolvedFont,
    ) -> Result<Vec<u8>>;
}

/// Open a worksheet with the processor matching its file extension.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn open_processor(path: &Path, config: &Configuration) -> Result<Box<dyn DocumentProcessor>> {
    let format = WorksheetFormat::from_path(path).ok_or_else(|| {
        let extension = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_else(|| "no extension".to_string());
        BlattwerkError::UnsupportedFormat(extension)
    })?;
    debug!(format = format.mime_type(), "Worksheet format detected");

    Ok(match format {
        WorksheetFormat::Pdf => Box::new(VectorProcessor::open(path, config)?),
        WorksheetFormat::Png | WorksheetFormat::Jpeg => {
            Box::new(RasterProcessor::open(path, format, config)?)
        }
    })
}

/// Lay out and render one student onto a worksheet.
pub fn render_student(
    processor: &dyn DocumentProcessor,
    photo: &DynamicImage,
    student_name: &str,
    config: &Configuration,
    font: &ResolvedFont,
) -> Result<Vec<u8>> {
    let name = if config.add_name {
        let text = config.name_text(student_name);
        processor
            .name_extent(font, &text)
            .map(|extent| NameText { text, extent })
    } else {
        None
    };
    let placement = compute_placement(
        processor.geometry(),
        (photo.width(), photo.height()),
        config,
        name,
    );
    processor.personalize(photo, &placement, font)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_extension_is_unsupported() {
        let result = open_processor(Path::new("worksheet.docx"), &Configuration::default());
        match result {
            Err(BlattwerkError::UnsupportedFormat(detail)) => assert_eq!(detail, ".docx"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("docx must be rejected"),
        }
    }

    #[test]
    fn missing_extension_is_unsupported() {
        let result = open_processor(Path::new("worksheet"), &Configuration::default());
        assert!(matches!(result, Err(BlattwerkError::UnsupportedFormat(_))));
    }

    #[test]
    fn missing_pdf_is_source_document_error() {
        let result = open_processor(
            Path::new("/nonexistent/math_test.PDF"),
            &Configuration::default(),
        );
        assert!(matches!(result, Err(BlattwerkError::SourceDocument(_))));
    }
}
