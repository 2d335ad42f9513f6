// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print resolution recorded in raster files: the JFIF APP0 density of a JPEG
// and the pHYs chunk of a PNG. Files that only record an aspect ratio have
// no resolution.

use std::io::Cursor;

use image::ImageFormat;

/// Metres per inch, for PNG pixels-per-metre.
const METRES_PER_INCH: f32 = 0.0254;

/// Horizontal resolution in dots per inch, if `data` records one.
pub fn read_dpi(data: &[u8]) -> Option<f32> {
    let dpi = match image::guess_format(data).ok()? {
        ImageFormat::Jpeg => jfif_dpi(data),
        ImageFormat::Png => png_dpi(data),
        _ => None,
    }?;
    (dpi.is_finite() && dpi > 0.0).then_some(dpi)
}

/// Density from the JFIF APP0 segment, which precedes the first scan.
fn jfif_dpi(data: &[u8]) -> Option<f32> {
    if !data.starts_with(&[0xFF, 0xD8]) {
        return None;
    }
    let mut pos = 2;
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            return None;
        }
        let marker = data[pos + 1];
        if marker == 0xDA {
            return None;
        }
        let length = usize::from(u16::from_be_bytes([data[pos + 2], data[pos + 3]]));
        let body = data.get(pos + 4..pos + 2 + length)?;
        if marker == 0xE0 && body.len() >= 12 && body.starts_with(b"JFIF\0") {
            let density = f32::from(u16::from_be_bytes([body[8], body[9]]));
            return match body[7] {
                1 => Some(density),
                2 => Some(density * 2.54),
                _ => None,
            };
        }
        pos += 2 + length;
    }
    None
}

fn png_dpi(data: &[u8]) -> Option<f32> {
    let reader = png::Decoder::new(Cursor::new(data)).read_info().ok()?;
    let dims = reader.info().pixel_dims?;
    match dims.unit {
        png::Unit::Meter => Some(dims.xppu as f32 * METRES_PER_INCH),
        png::Unit::Unspecified => None,
    }
}

/// Pixels per metre for a PNG pHYs chunk.
pub(crate) fn dpi_to_ppm(dpi: f32) -> u32 {
    (dpi / METRES_PER_INCH).round().clamp(1.0, u32::MAX as f32) as u32
}

/// Whole dots per inch for a JFIF header.
pub(crate) fn dpi_to_jfif(dpi: f32) -> u16 {
    dpi.round().clamp(1.0, f32::from(u16::MAX)) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    /// SOI followed by a JFIF APP0 segment.
    fn jfif_header(units: u8, density: u16) -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        data.extend_from_slice(b"JFIF\0");
        data.extend_from_slice(&[1, 1, units]);
        data.extend_from_slice(&density.to_be_bytes());
        data.extend_from_slice(&density.to_be_bytes());
        data.extend_from_slice(&[0, 0, 0xFF, 0xDA]);
        data
    }

    #[test]
    fn jfif_dots_per_inch() {
        assert_eq!(jfif_dpi(&jfif_header(1, 300)), Some(300.0));
    }

    #[test]
    fn jfif_dots_per_cm_are_converted() {
        let dpi = jfif_dpi(&jfif_header(2, 118)).expect("dpi");
        assert!((dpi - 299.72).abs() < 1e-3);
    }

    #[test]
    fn jfif_aspect_only_has_no_resolution() {
        assert_eq!(jfif_dpi(&jfif_header(0, 1)), None);
    }

    #[test]
    fn truncated_jpeg_has_no_resolution() {
        assert_eq!(jfif_dpi(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]), None);
        assert_eq!(read_dpi(b"not an image"), None);
    }

    #[test]
    fn ppm_round_trip_is_stable() {
        assert_eq!(dpi_to_ppm(300.0), 11811);
        assert_eq!(dpi_to_jfif(11811.0 * METRES_PER_INCH), 300);
    }
}
