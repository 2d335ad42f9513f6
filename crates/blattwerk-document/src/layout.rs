// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Layout engine: turns percentage-based settings and page dimensions into
// absolute rectangles for the photo and the name text.
//
// All inputs are relative to the page (percentages) or converted with the
// page's own `units_per_cm`, so scaling a page and its resolution together
// scales every output rectangle by the same factor.

use blattwerk_core::config::{A4_SHORT_SIDE_CM, POINTS_PER_CM};
use blattwerk_core::{
    Configuration, NamePlacement, NamePosition, PageGeometry, PageUnit, PhotoScale, Placement,
    PlacementRect,
};
use tracing::debug;

use crate::font::TextExtent;

/// Name font size as a fraction of page height.
pub const NAME_FONT_HEIGHT_RATIO: f32 = 0.0225;

/// Gap between name and photo as a fraction of page width.
pub const NAME_PHOTO_GAP_RATIO: f32 = 0.013;

/// Smallest name font size, in points (1/72 inch).
pub const MIN_FONT_SIZE_PT: f32 = 6.0;

/// Text to place next to the photo, already measured in the target font.
#[derive(Debug, Clone, PartialEq)]
pub struct NameText {
    pub text: String,
    pub extent: TextExtent,
}

/// Build a page geometry, deriving the native scale from the settings.
pub fn page_geometry(
    width: f32,
    height: f32,
    unit: PageUnit,
    config: &Configuration,
) -> PageGeometry {
    let units_per_cm = match (config.photo_scale, unit) {
        (PhotoScale::PageRelative, _) => width.min(height) / A4_SHORT_SIDE_CM,
        (PhotoScale::Physical, PageUnit::Points) => POINTS_PER_CM,
        (PhotoScale::Physical, PageUnit::Pixels) => config.image_dpi / 2.54,
    };
    PageGeometry {
        width,
        height,
        units_per_cm,
        unit,
    }
}

/// Geometry of an image worksheet. Under [`PhotoScale::Physical`] the
/// resolution recorded in the image wins over `config.image_dpi`.
pub fn image_geometry(
    width: u32,
    height: u32,
    dpi: Option<f32>,
    config: &Configuration,
) -> PageGeometry {
    let mut geometry = page_geometry(width as f32, height as f32, PageUnit::Pixels, config);
    if let (PhotoScale::Physical, Some(dpi)) = (config.photo_scale, dpi) {
        geometry.units_per_cm = dpi / 2.54;
    }
    geometry
}

/// Compute photo and name rectangles for one student.
///
/// `photo_px` is the decoded photo's pixel size and only contributes its
/// aspect ratio. The name is placed only when `config.add_name` is set and a
/// measured text is supplied. Rectangles that would leave the page on the
/// left or top are clamped to zero.
pub fn compute_placement(
    page: &PageGeometry,
    photo_px: (u32, u32),
    config: &Configuration,
    name: Option<NameText>,
) -> Placement {
    let long_side = page.cm_to_units(config.photo_size_cm);
    let (photo_w, photo_h) = fit_long_side(photo_px, long_side);

    let right_inset = config.photo_right_margin_percent / 100.0 * page.width;
    let top_inset = config.photo_top_margin_percent / 100.0 * page.height;

    let photo = PlacementRect {
        x: (page.width - photo_w - right_inset).max(0.0),
        y: top_inset.max(0.0),
        width: photo_w,
        height: photo_h,
    };

    let name = name
        .filter(|_| config.add_name)
        .map(|name| place_name(page, &photo, config, name));

    debug!(
        photo_x = photo.x,
        photo_y = photo.y,
        photo_w = photo.width,
        photo_h = photo.height,
        has_name = name.is_some(),
        name_position = config.name_position.as_str(),
        "Placement computed"
    );

    Placement { photo, name }
}

/// Name font size for a page. An explicit `config.font_size` in points is
/// converted with the page's own scale; otherwise it is a fixed share of
/// page height, floored at a legible minimum.
pub fn name_font_size(page: &PageGeometry, config: &Configuration) -> f32 {
    let points = |pt: f32| page.cm_to_units(pt / 72.0 * 2.54);
    match config.font_size {
        Some(size) => points(size),
        None => (page.height * NAME_FONT_HEIGHT_RATIO).max(points(MIN_FONT_SIZE_PT)),
    }
}

fn place_name(
    page: &PageGeometry,
    photo: &PlacementRect,
    config: &Configuration,
    name: NameText,
) -> NamePlacement {
    let font_size = name_font_size(page, config);
    let text_width = name.extent.width_em * font_size;
    let gap = NAME_PHOTO_GAP_RATIO * page.width;
    let top = config.name_top_margin_percent / 100.0 * page.height;
    let side_inset = config.photo_right_margin_percent / 100.0 * page.width;

    let (x, y) = match config.name_position {
        NamePosition::BesidePhoto => (photo.x - gap - text_width, top),
        NamePosition::Center => ((page.width - text_width) / 2.0, top),
        NamePosition::Left => (side_inset, top),
        NamePosition::Right => (photo.right() - text_width, photo.bottom() + gap),
    };

    NamePlacement {
        rect: PlacementRect {
            x: x.max(0.0),
            y: y.max(0.0),
            width: text_width,
            height: font_size,
        },
        font_size,
        baseline: name.extent.ascent_em * font_size,
        text: name.text,
    }
}

/// Scale a photo so its longer side equals `long_side`, keeping its aspect.
fn fit_long_side((px_w, px_h): (u32, u32), long_side: f32) -> (f32, f32) {
    if px_w == 0 || px_h == 0 {
        return (long_side, long_side);
    }
    let (w, h) = (px_w as f32, px_h as f32);
    if w >= h {
        (long_side, long_side * h / w)
    } else {
        (long_side * w / h, long_side)
    }
}
