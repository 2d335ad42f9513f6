// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// blattwerk-document: Layout and compositing for worksheet personalisation.
//
// Provides the font resolver (display typeface with symbol-map correction and
// Helvetica Bold fallback), the layout engine, and two document processors:
// one stamping an overlay onto PDF pages, one compositing into PNG/JPEG
// images.

pub mod font;
pub mod image;
pub mod layout;
pub mod output;
pub mod pdf;
pub mod processor;

#[cfg(test)]
pub(crate) mod testing;

// Re-export the primary items so callers can use `blattwerk_document::FontResolver` etc.
pub use crate::font::{FontResolver, ResolvedFont, TextExtent};
pub use crate::image::{ImageProcessor, RasterProcessor};
pub use crate::layout::{NameText, compute_placement, page_geometry};
pub use crate::output::write_atomic;
pub use crate::pdf::{PdfReader, VectorProcessor};
pub use crate::processor::{DocumentProcessor, open_processor, render_student};
