// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster processor: composites the photo and name directly into a copy of a
// PNG or JPEG worksheet and re-encodes it in the source format, keeping the
// print resolution the source recorded.

use std::path::Path;

use ab_glyph::{Font, GlyphId, PxScale, ScaleFont, point};
use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::{Configuration, PageGeometry, Placement, WorksheetFormat};
use image::{DynamicImage, Rgba, RgbaImage, imageops};
use imageproc::pixelops::interpolate;
use tracing::{debug, info, instrument, warn};

use super::density::read_dpi;
use super::processor::ImageProcessor;
use crate::font::{ResolvedFont, TextExtent};
use crate::layout::image_geometry;
use crate::processor::DocumentProcessor;

const TEXT_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);
const JPEG_QUALITY: u8 = 95;

/// Personalises image worksheets pixel by pixel.
pub struct RasterProcessor {
    base: RgbaImage,
    /// Whether the source carried an alpha channel (kept for PNG output).
    had_alpha: bool,
    format: WorksheetFormat,
    /// Resolution recorded in the source file.
    dpi: Option<f32>,
    geometry: PageGeometry,
}

impl RasterProcessor {
    /// Decode a worksheet image. `format` decides the output encoding.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(
        path: impl AsRef<Path>,
        format: WorksheetFormat,
        config: &Configuration,
    ) -> Result<Self> {
        let path = path.as_ref();
        let source_error = |err: &dyn std::fmt::Display| {
            BlattwerkError::SourceDocument(format!("failed to open {}: {}", path.display(), err))
        };
        let data = std::fs::read(path).map_err(|err| source_error(&err))?;
        let image = image::load_from_memory(&data).map_err(|err| source_error(&err))?;
        let dpi = read_dpi(&data);
        debug!(?dpi, "Worksheet resolution read");
        Self::from_dynamic(image, format, dpi, config)
    }

    /// Wrap an already-decoded worksheet image. `dpi` is the resolution the
    /// source recorded, if any; it is written back on output.
    pub fn from_dynamic(
        image: DynamicImage,
        format: WorksheetFormat,
        dpi: Option<f32>,
        config: &Configuration,
    ) -> Result<Self> {
        if format.is_vector() {
            return Err(BlattwerkError::UnsupportedFormat(format!(
                "{} is not a raster format",
                format.mime_type()
            )));
        }
        if image.width() == 0 || image.height() == 0 {
            return Err(BlattwerkError::SourceDocument(
                "worksheet image is empty".to_string(),
            ));
        }

        let dpi = dpi.filter(|dpi| dpi.is_finite() && *dpi > 0.0);
        let geometry = image_geometry(image.width(), image.height(), dpi, config);
        info!(
            width_px = image.width(),
            height_px = image.height(),
            units_per_cm = geometry.units_per_cm,
            ?dpi,
            format = format.mime_type(),
            "Worksheet image ready"
        );

        Ok(Self {
            had_alpha: image.color().has_alpha(),
            base: image.to_rgba8(),
            format,
            dpi,
            geometry,
        })
    }

    /// Draw the name glyph by glyph, so symbol-encoded faces render the same
    /// glyphs the PDF path selects.
    fn draw_name(&self, canvas: &mut RgbaImage, placement: &Placement, font: &ResolvedFont) {
        let Some(name) = &placement.name else {
            return;
        };
        let Some(face) = font.raster_face() else {
            warn!("No face available for raster text, name skipped");
            return;
        };
        let Some(units_per_em) = face.units_per_em().filter(|upem| *upem > 0.0) else {
            return;
        };

        // PxScale is the pixel height of ascent minus descent, not the em size.
        let scale = PxScale::from(name.font_size * face.height_unscaled() / units_per_em);
        let scaled = face.as_scaled(scale);
        let baseline = name.rect.y + scaled.ascent();
        let (width, height) = canvas.dimensions();

        let mut caret = name.rect.x;
        let mut previous: Option<GlyphId> = None;
        for id in font.raster_glyphs(&name.text) {
            if let Some(previous) = previous {
                caret += scaled.kern(previous, id);
            }
            let glyph = id.with_scale_and_position(scale, point(caret, baseline));
            caret += scaled.h_advance(id);
            previous = Some(id);

            let Some(outlined) = face.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                let x = bounds.min.x as i64 + i64::from(gx);
                let y = bounds.min.y as i64 + i64::from(gy);
                if (0..i64::from(width)).contains(&x) && (0..i64::from(height)).contains(&y) {
                    let pixel = canvas.get_pixel_mut(x as u32, y as u32);
                    *pixel = interpolate(TEXT_COLOR, *pixel, coverage.clamp(0.0, 1.0));
                }
            });
        }
    }

    fn encode(&self, canvas: RgbaImage) -> Result<Vec<u8>> {
        let composed = DynamicImage::ImageRgba8(canvas);
        let composed = match self.format {
            WorksheetFormat::Png if self.had_alpha => composed,
            _ => DynamicImage::ImageRgb8(composed.to_rgb8()),
        };
        let encoder = ImageProcessor::from_dynamic(composed).with_dpi(self.dpi);
        match self.format {
            WorksheetFormat::Jpeg => encoder.to_jpeg_bytes(JPEG_QUALITY),
            _ => encoder.to_png_bytes(),
        }
    }
}

impl DocumentProcessor for RasterProcessor {
    fn format(&self) -> WorksheetFormat {
        self.format
    }

    fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    fn name_extent(&self, font: &ResolvedFont, text: &str) -> Option<TextExtent> {
        let extent = font.raster_extent(text);
        if extent.is_none() {
            warn!("No font can draw on image worksheets; the name will be left out");
        }
        extent
    }

    fn personalize(
        &self,
        photo: &DynamicImage,
        placement: &Placement,
        font: &ResolvedFont,
    ) -> Result<Vec<u8>> {
        let rect = &placement.photo;
        let photo_w = rect.width.round().max(1.0) as u32;
        let photo_h = rect.height.round().max(1.0) as u32;

        let resized = ImageProcessor::from_dynamic(photo.clone())
            .flatten_onto_white()
            .resize_exact(photo_w, photo_h)
            .into_dynamic()
            .to_rgba8();

        let mut canvas = self.base.clone();
        imageops::overlay(
            &mut canvas,
            &resized,
            rect.x.round() as i64,
            rect.y.round() as i64,
        );
        self.draw_name(&mut canvas, placement, font);

        let output = self.encode(canvas)?;
        debug!(photo_w, photo_h, output_bytes = output.len(), "Personalised image rendered");
        Ok(output)
    }
}
