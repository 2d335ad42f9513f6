// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor: decode student photos, flatten transparency, resize and
// encode. Operates on in-memory images using the `image` crate; PNG output
// goes through `png` directly so a print resolution can be recorded.

use std::path::Path;

use blattwerk_core::error::{BlattwerkError, Result};
use image::codecs::jpeg::{JpegEncoder, PixelDensity};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageReader, Rgba, RgbaImage};
use tracing::{debug, info, instrument};

use super::density::{dpi_to_jfif, dpi_to_ppm};

/// Image processing pipeline operating on a single in-memory image.
///
/// Each method consumes `self` and returns a new `ImageProcessor` wrapping
/// the transformed image, enabling method chaining.
///
/// ```ignore
/// let jpeg = ImageProcessor::open("anna_schmidt.png")?
///     .flatten_onto_white()
///     .resize(300, 300)
///     .to_jpeg_bytes(92)?;
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
    /// Print resolution written into encoded output.
    dpi: Option<f32>,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Load a photo from a file path. The format is detected from the file
    /// content, so a PNG saved with a `.jpg` extension still decodes.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let decode_error = |err: &dyn std::fmt::Display| {
            BlattwerkError::PhotoDecode(format!("failed to open {}: {}", path.display(), err))
        };
        let img = ImageReader::open(path)
            .map_err(|err| decode_error(&err))?
            .with_guessed_format()
            .map_err(|err| decode_error(&err))?
            .decode()
            .map_err(|err| decode_error(&err))?;
        info!(width = img.width(), height = img.height(), "Photo loaded");
        Ok(Self::from_dynamic(img))
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image, dpi: None }
    }

    /// Record `dpi` in the encoded output. `None` writes no resolution.
    pub fn with_dpi(mut self, dpi: Option<f32>) -> Self {
        self.dpi = dpi.filter(|dpi| dpi.is_finite() && *dpi > 0.0);
        self
    }

    // -- Accessors ------------------------------------------------------------

    /// Current image width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Current image height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Consume the processor and return the underlying `DynamicImage`.
    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Composite a photo with transparency onto a white background. Opaque
    /// images pass through unchanged.
    pub fn flatten_onto_white(self) -> Self {
        if !self.image.color().has_alpha() {
            return self;
        }
        let mut canvas = RgbaImage::from_pixel(
            self.image.width(),
            self.image.height(),
            Rgba([255, 255, 255, 255]),
        );
        imageops::overlay(&mut canvas, &self.image.to_rgba8(), 0, 0);
        debug!("Transparent photo flattened onto white");
        Self {
            image: DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8()),
            ..self
        }
    }

    /// Resize the image to fit within `max_width` x `max_height`, preserving
    /// aspect ratio. Uses Lanczos3 filtering for high-quality downscaling.
    #[instrument(skip(self), fields(max_width, max_height))]
    pub fn resize(self, max_width: u32, max_height: u32) -> Self {
        debug!(
            from_w = self.image.width(),
            from_h = self.image.height(),
            max_width,
            max_height,
            "Resizing image"
        );
        let resized = self.image.resize(max_width, max_height, FilterType::Lanczos3);
        Self {
            image: resized,
            ..self
        }
    }

    /// Resize the image to exactly `width` x `height`, ignoring aspect ratio.
    pub fn resize_exact(self, width: u32, height: u32) -> Self {
        let resized = self
            .image
            .resize_exact(width.max(1), height.max(1), FilterType::Lanczos3);
        Self {
            image: resized,
            ..self
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as 8-bit PNG bytes, RGBA when the image has
    /// an alpha channel and RGB otherwise.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let encode_error = |err: png::EncodingError| {
            BlattwerkError::OutputWrite(format!("PNG encoding failed: {}", err))
        };
        let (color, pixels) = if self.image.color().has_alpha() {
            (png::ColorType::Rgba, self.image.to_rgba8().into_raw())
        } else {
            (png::ColorType::Rgb, self.image.to_rgb8().into_raw())
        };

        let mut buffer = Vec::new();
        let mut encoder = png::Encoder::new(&mut buffer, self.image.width(), self.image.height());
        encoder.set_color(color);
        encoder.set_depth(png::BitDepth::Eight);
        if let Some(dpi) = self.dpi {
            let ppm = dpi_to_ppm(dpi);
            encoder.set_pixel_dims(Some(png::PixelDimensions {
                xppu: ppm,
                yppu: ppm,
                unit: png::Unit::Meter,
            }));
        }
        let mut writer = encoder.write_header().map_err(encode_error)?;
        writer.write_image_data(&pixels).map_err(encode_error)?;
        writer.finish().map_err(encode_error)?;
        Ok(buffer)
    }

    /// Encode the current image as JPEG bytes with the given quality (1-100).
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let rgb = self.image.to_rgb8();
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
        if let Some(dpi) = self.dpi {
            encoder.set_pixel_density(PixelDensity::dpi(dpi_to_jfif(dpi)));
        }
        rgb.write_with_encoder(encoder).map_err(|err| {
            BlattwerkError::OutputWrite(format!("JPEG encoding failed: {}", err))
        })?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::density::read_dpi;
    use std::io::Write;

    #[test]
    fn transparent_pixels_become_white() {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 0]));
        img.put_pixel(1, 1, Rgba([10, 20, 30, 255]));
        let flat = ImageProcessor::from_dynamic(DynamicImage::ImageRgba8(img))
            .flatten_onto_white()
            .into_dynamic();

        assert!(!flat.color().has_alpha());
        let rgb = flat.to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(rgb.get_pixel(1, 1).0, [10, 20, 30]);
    }

    #[test]
    fn resize_keeps_aspect_ratio() {
        let img = DynamicImage::new_rgb8(400, 200);
        let resized = ImageProcessor::from_dynamic(img).resize(100, 100);
        assert_eq!((resized.width(), resized.height()), (100, 50));
    }

    #[test]
    fn png_keeps_size_and_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 6, Rgba([1, 2, 3, 128])));
        let bytes = ImageProcessor::from_dynamic(img).to_png_bytes().expect("encode");
        let decoded = image::load_from_memory(&bytes).expect("decode");
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
        assert!(decoded.color().has_alpha());
        assert_eq!(read_dpi(&bytes), None);
    }

    #[test]
    fn resolution_is_recorded_in_png_and_jpeg() {
        let processor =
            ImageProcessor::from_dynamic(DynamicImage::new_rgb8(8, 6)).with_dpi(Some(300.0));

        let png = processor.to_png_bytes().expect("png");
        let dpi = read_dpi(&png).expect("pHYs written");
        assert!((dpi - 300.0).abs() < 0.01);

        let jpeg = processor.to_jpeg_bytes(90).expect("jpeg");
        assert_eq!(read_dpi(&jpeg), Some(300.0));
    }

    #[test]
    fn unreadable_photo_is_photo_decode_error() {
        let mut file = tempfile::Builder::new()
            .suffix(".jpg")
            .tempfile()
            .expect("temp file");
        file.write_all(b"definitely not a jpeg").expect("write");
        let result = ImageProcessor::open(file.path());
        assert!(matches!(result, Err(BlattwerkError::PhotoDecode(_))));
    }

    #[test]
    fn missing_photo_is_photo_decode_error() {
        let result = ImageProcessor::open("/nonexistent/bob_smith.jpg");
        assert!(matches!(result, Err(BlattwerkError::PhotoDecode(_))));
    }
}
