// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared fixtures: worksheets authored with printpdf, photos drawn with image.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use image::{DynamicImage, Rgb, RgbImage};
use printpdf::{
    BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt, TextItem,
};

pub const A4_WIDTH_PT: f32 = 595.276;
pub const A4_HEIGHT_PT: f32 = 841.89;

/// A4 worksheet with a heading and one line of body text.
pub fn worksheet_pdf(title: &str) -> Vec<u8> {
    let mut doc = PdfDocument::new(title);
    let mut ops = Vec::new();
    for (y, size, line) in [(780.0, 20.0, title), (720.0, 12.0, "1) 3 + 4 = ____")] {
        ops.extend([
            Op::StartTextSection,
            Op::SetTextCursor {
                pos: Point { x: Pt(60.0), y: Pt(y) },
            },
            Op::SetFontSizeBuiltinFont {
                size: Pt(size),
                font: BuiltinFont::Helvetica,
            },
            Op::WriteTextBuiltinFont {
                items: vec![TextItem::Text(line.to_string())],
                font: BuiltinFont::Helvetica,
            },
            Op::EndTextSection,
        ]);
    }
    doc.with_pages(vec![PdfPage::new(Mm(210.0), Mm(297.0), ops)]);

    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    doc.save(&PdfSaveOptions::default(), &mut warnings)
}

pub fn write_worksheet_pdf(dir: &Path, file: &str) -> PathBuf {
    let path = dir.join(file);
    std::fs::write(&path, worksheet_pdf("Mathe-Test")).expect("write worksheet pdf");
    path
}

/// Light grey raster worksheet with a dark band across the lower half.
pub fn worksheet_image(width: u32, height: u32) -> DynamicImage {
    let mut img = RgbImage::from_pixel(width, height, Rgb([245, 245, 245]));
    for y in height * 3 / 4..height * 3 / 4 + 4 {
        for x in 0..width {
            img.put_pixel(x, y, Rgb([20, 20, 20]));
        }
    }
    DynamicImage::ImageRgb8(img)
}

pub fn write_worksheet_image(dir: &Path, file: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(file);
    worksheet_image(width, height)
        .save(&path)
        .expect("write worksheet image");
    path
}

/// Solid-colour photo; the file extension picks the encoding.
pub fn write_photo(dir: &Path, file: &str, color: [u8; 3]) -> PathBuf {
    let path = dir.join(file);
    DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 48, Rgb(color)))
        .save(&path)
        .expect("write photo");
    path
}

/// A file with a photo extension that no decoder accepts.
pub fn write_broken_photo(dir: &Path, file: &str) -> PathBuf {
    let path = dir.join(file);
    std::fs::write(&path, b"\xFF\xD8 truncated jpeg").expect("write broken photo");
    path
}

pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("list directory")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
