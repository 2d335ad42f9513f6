// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Vector processor: stamps the photo and name onto a copy of the worksheet's
// first page.
//
// The original content streams are kept byte for byte and wrapped in a
// q/Q pair; the overlay is appended as a separate stream drawn on top. Page
// resources are copied inline so the added image and font names cannot clash
// with shared resource dictionaries.

use std::path::Path;

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::{Configuration, PageGeometry, PageUnit, Placement, WorksheetFormat};
use image::DynamicImage;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::{debug, info, instrument};

use super::reader::{MediaBox, PdfReader, inherited_attribute, owned_dictionary, resolve};
use crate::font::{FALLBACK_FONT_NAME, FIRST_CODE, LAST_CODE, ResolvedFont, TextExtent};
use crate::image::ImageProcessor;
use crate::layout::page_geometry;
use crate::processor::DocumentProcessor;

/// Resource name prefixes for the overlay image and font.
const PHOTO_RESOURCE: &str = "BwPhoto";
const FONT_RESOURCE: &str = "BwName";

/// Resolution the embedded photo is downsampled to, in pixels per inch.
const PHOTO_EMBED_DPI: f32 = 300.0;
const PHOTO_JPEG_QUALITY: u8 = 92;

/// Personalises single-page PDF worksheets.
pub struct VectorProcessor {
    /// Worksheet reduced to its first page; cloned for every student.
    template: Document,
    page_id: ObjectId,
    media_box: MediaBox,
    geometry: PageGeometry,
}

impl VectorProcessor {
    /// Open a worksheet PDF.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, config: &Configuration) -> Result<Self> {
        Self::from_reader(PdfReader::open(path)?, config)
    }

    pub fn from_bytes(data: &[u8], config: &Configuration) -> Result<Self> {
        Self::from_reader(PdfReader::from_bytes(data)?, config)
    }

    fn from_reader(reader: PdfReader, config: &Configuration) -> Result<Self> {
        let media_box = reader.first_page_box()?;
        let template = reader.into_first_page()?;
        let page_id = template
            .get_pages()
            .get(&1)
            .copied()
            .ok_or_else(|| BlattwerkError::SourceDocument("document has no pages".into()))?;
        let geometry = page_geometry(
            media_box.width(),
            media_box.height(),
            PageUnit::Points,
            config,
        );

        info!(
            width_pt = geometry.width,
            height_pt = geometry.height,
            units_per_cm = geometry.units_per_cm,
            "Worksheet PDF ready"
        );

        Ok(Self {
            template,
            page_id,
            media_box,
            geometry,
        })
    }

    // -- Coordinate mapping -----------------------------------------------------

    /// Left edge in PDF user space.
    fn pdf_x(&self, x: f32) -> f32 {
        self.media_box.llx.min(self.media_box.urx) + x
    }

    /// Bottom edge in PDF user space of a box whose top-down y and height are
    /// given.
    fn pdf_y(&self, y: f32, height: f32) -> f32 {
        self.media_box.lly.min(self.media_box.ury) + self.geometry.height - y - height
    }

    // -- Resources --------------------------------------------------------------

    fn add_photo_xobject(
        &self,
        document: &mut Document,
        photo: &DynamicImage,
        width_pt: f32,
        height_pt: f32,
    ) -> Result<ObjectId> {
        let max_w = (width_pt / 72.0 * PHOTO_EMBED_DPI).ceil().max(1.0) as u32;
        let max_h = (height_pt / 72.0 * PHOTO_EMBED_DPI).ceil().max(1.0) as u32;

        let processor = ImageProcessor::from_dynamic(photo.clone()).flatten_onto_white();
        let processor = if processor.width() > max_w || processor.height() > max_h {
            processor.resize(max_w, max_h)
        } else {
            processor
        };
        let jpeg = processor.to_jpeg_bytes(PHOTO_JPEG_QUALITY)?;

        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", Object::Integer(i64::from(processor.width())));
        dict.set("Height", Object::Integer(i64::from(processor.height())));
        dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
        dict.set("BitsPerComponent", Object::Integer(8));
        dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));

        let mut stream = Stream::new(dict, jpeg);
        stream.allows_compression = false;
        Ok(document.add_object(stream))
    }

    fn add_font(&self, document: &mut Document, font: &ResolvedFont) -> ObjectId {
        let ResolvedFont::Embedded(embedded) = font else {
            let mut dict = Dictionary::new();
            dict.set("Type", Object::Name(b"Font".to_vec()));
            dict.set("Subtype", Object::Name(b"Type1".to_vec()));
            dict.set("BaseFont", Object::Name(FALLBACK_FONT_NAME.as_bytes().to_vec()));
            dict.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
            return document.add_object(dict);
        };

        let mut file_dict = Dictionary::new();
        file_dict.set("Length1", Object::Integer(embedded.data().len() as i64));
        let font_file = document.add_object(Stream::new(file_dict, embedded.data().to_vec()));

        let ascent = (embedded.ascent_em() * 1000.0).round() as i64;
        let descent = (embedded.descent_em() * 1000.0).round() as i64;
        let max_width = embedded.widths().iter().copied().max().unwrap_or(1000);

        let mut descriptor = Dictionary::new();
        descriptor.set("Type", Object::Name(b"FontDescriptor".to_vec()));
        descriptor.set("FontName", Object::Name(embedded.name().as_bytes().to_vec()));
        descriptor.set("Flags", Object::Integer(if embedded.is_symbolic() { 4 } else { 32 }));
        descriptor.set(
            "FontBBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(descent),
                Object::Integer(i64::from(max_width)),
                Object::Integer(ascent),
            ]),
        );
        descriptor.set("ItalicAngle", Object::Integer(0));
        descriptor.set("Ascent", Object::Integer(ascent));
        descriptor.set("Descent", Object::Integer(descent));
        descriptor.set("CapHeight", Object::Integer(ascent));
        descriptor.set("StemV", Object::Integer(80));
        descriptor.set("FontFile2", Object::Reference(font_file));
        let descriptor_id = document.add_object(descriptor);

        let widths = embedded
            .widths()
            .iter()
            .map(|width| Object::Integer(i64::from(*width)))
            .collect();

        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"Font".to_vec()));
        dict.set("Subtype", Object::Name(b"TrueType".to_vec()));
        dict.set("BaseFont", Object::Name(embedded.name().as_bytes().to_vec()));
        dict.set("FirstChar", Object::Integer(i64::from(FIRST_CODE)));
        dict.set("LastChar", Object::Integer(i64::from(LAST_CODE)));
        dict.set("Widths", Object::Array(widths));
        dict.set("FontDescriptor", Object::Reference(descriptor_id));
        // Symbol fonts are addressed through their (3,0) cmap.
        if !embedded.is_symbolic() {
            dict.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
        }
        document.add_object(dict)
    }

    /// Copy the page's effective resources inline and register the overlay
    /// image and font under names the page does not already use.
    fn install_resources(
        &self,
        document: &mut Document,
        photo_id: ObjectId,
        font_id: Option<ObjectId>,
    ) -> Result<(String, Option<String>)> {
        let mut resources = inherited_attribute(document, self.page_id, b"Resources")
            .and_then(|object| owned_dictionary(document, object))
            .unwrap_or_default();

        let mut xobjects = resources
            .get(b"XObject")
            .ok()
            .and_then(|object| owned_dictionary(document, object))
            .unwrap_or_default();
        let photo_name = unused_name(&xobjects, PHOTO_RESOURCE);
        xobjects.set(photo_name.as_bytes().to_vec(), Object::Reference(photo_id));
        resources.set("XObject", Object::Dictionary(xobjects));

        let font_name = match font_id {
            Some(font_id) => {
                let mut fonts = resources
                    .get(b"Font")
                    .ok()
                    .and_then(|object| owned_dictionary(document, object))
                    .unwrap_or_default();
                let name = unused_name(&fonts, FONT_RESOURCE);
                fonts.set(name.as_bytes().to_vec(), Object::Reference(font_id));
                resources.set("Font", Object::Dictionary(fonts));
                Some(name)
            }
            None => None,
        };

        let page = document.get_dictionary_mut(self.page_id).map_err(|err| {
            BlattwerkError::SourceDocument(format!("page dictionary unavailable: {}", err))
        })?;
        page.set("Resources", Object::Dictionary(resources));

        Ok((photo_name, font_name))
    }

    // -- Content ------------------------------------------------------------------

    fn overlay_operations(
        &self,
        placement: &Placement,
        photo_name: &str,
        font: &ResolvedFont,
        font_name: Option<&str>,
    ) -> Vec<Operation> {
        let photo = &placement.photo;
        let mut ops = vec![
            // Closes the q that wraps the original content.
            Operation::new("Q", vec![]),
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(photo.width),
                    Object::Real(0.0),
                    Object::Real(0.0),
                    Object::Real(photo.height),
                    Object::Real(self.pdf_x(photo.x)),
                    Object::Real(self.pdf_y(photo.y, photo.height)),
                ],
            ),
            Operation::new("Do", vec![Object::Name(photo_name.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ];

        if let (Some(name), Some(font_name)) = (&placement.name, font_name) {
            let baseline_y = self.pdf_y(name.rect.y + name.baseline, 0.0);
            ops.extend([
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![
                        Object::Name(font_name.as_bytes().to_vec()),
                        Object::Real(name.font_size),
                    ],
                ),
                Operation::new("g", vec![Object::Integer(0)]),
                Operation::new(
                    "Td",
                    vec![Object::Real(self.pdf_x(name.rect.x)), Object::Real(baseline_y)],
                ),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        font.encode_win_ansi(&name.text),
                        StringFormat::Literal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ]);
        }
        ops
    }

    fn wrap_contents(&self, document: &mut Document, overlay: Vec<Operation>) -> Result<()> {
        let encode = |operations: Vec<Operation>| {
            Content { operations }.encode().map_err(|err| {
                BlattwerkError::SourceDocument(format!("failed to encode overlay content: {}", err))
            })
        };
        let open = encode(vec![Operation::new("q", vec![])])?;
        let close = encode(overlay)?;

        let existing = document
            .get_dictionary(self.page_id)
            .ok()
            .and_then(|page| page.get(b"Contents").ok())
            .cloned();
        // An indirect array of streams is spliced in; nesting it would drop it.
        let original: Vec<Object> = match existing {
            Some(Object::Array(items)) => items,
            Some(Object::Null) | None => Vec::new(),
            Some(reference @ Object::Reference(_)) => match resolve(document, &reference) {
                Object::Array(items) => items.clone(),
                Object::Null => Vec::new(),
                _ => vec![reference.clone()],
            },
            Some(other) => vec![other],
        };

        let open_id = document.add_object(Stream::new(Dictionary::new(), open));
        let close_id = document.add_object(Stream::new(Dictionary::new(), close));

        let mut contents = Vec::with_capacity(original.len() + 2);
        contents.push(Object::Reference(open_id));
        contents.extend(original);
        contents.push(Object::Reference(close_id));

        let page = document.get_dictionary_mut(self.page_id).map_err(|err| {
            BlattwerkError::SourceDocument(format!("page dictionary unavailable: {}", err))
        })?;
        page.set("Contents", Object::Array(contents));
        Ok(())
    }
}

impl DocumentProcessor for VectorProcessor {
    fn format(&self) -> WorksheetFormat {
        WorksheetFormat::Pdf
    }

    fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    fn name_extent(&self, font: &ResolvedFont, text: &str) -> Option<TextExtent> {
        Some(font.pdf_extent(text))
    }

    fn personalize(
        &self,
        photo: &DynamicImage,
        placement: &Placement,
        font: &ResolvedFont,
    ) -> Result<Vec<u8>> {
        let mut document = self.template.clone();

        let photo_id = self.add_photo_xobject(
            &mut document,
            photo,
            placement.photo.width,
            placement.photo.height,
        )?;
        let font_id = placement
            .name
            .as_ref()
            .map(|_| self.add_font(&mut document, font));

        let (photo_name, font_name) = self.install_resources(&mut document, photo_id, font_id)?;
        let overlay = self.overlay_operations(placement, &photo_name, font, font_name.as_deref());
        self.wrap_contents(&mut document, overlay)?;

        let mut output = Vec::new();
        document.save_to(&mut output).map_err(|err| {
            BlattwerkError::OutputWrite(format!("failed to serialise personalised PDF: {}", err))
        })?;

        debug!(output_bytes = output.len(), "Personalised PDF rendered");
        Ok(output)
    }
}

/// `base`, or `base1`, `base2`, ... if a resource of that name exists.
fn unused_name(dict: &Dictionary, base: &str) -> String {
    if !dict.has(base.as_bytes()) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{base}{n}"))
        .find(|name| !dict.has(name.as_bytes()))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::{EmbeddedFont, StandardFont};
    use crate::layout::{NameText, compute_placement};
    use crate::testing::truetype_font;
    use image::{Rgb, RgbImage};
    use lopdf::dictionary;

    /// How the page refers to its single content stream.
    enum ContentsLayout {
        Direct,
        IndirectArray,
    }

    fn worksheet_pdf() -> Vec<u8> {
        worksheet_pdf_with(ContentsLayout::Direct)
    }

    /// Single A4 page with one content stream and a shared Font resource.
    fn worksheet_pdf_with(layout: ContentsLayout) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let helv = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => helv },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), Object::Integer(24)]),
                Operation::new("Td", vec![Object::Integer(72), Object::Integer(700)]),
                Operation::new("Tj", vec![Object::string_literal("Math test")]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode"),
        ));
        let contents = match layout {
            ContentsLayout::Direct => content_id,
            ContentsLayout::IndirectArray => {
                doc.add_object(Object::Array(vec![Object::Reference(content_id)]))
            }
        };
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => contents,
            "Resources" => resources,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => Object::Integer(1),
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(595.276),
                    Object::Real(841.89),
                ],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("save");
        bytes
    }

    fn photo() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 50, Rgb([200, 40, 40])))
    }

    fn render(config: &Configuration) -> Vec<u8> {
        let font = ResolvedFont::Standard(StandardFont::with_candidates(Vec::new()));
        render_with(&worksheet_pdf(), config, &font)
    }

    fn render_with(worksheet: &[u8], config: &Configuration, font: &ResolvedFont) -> Vec<u8> {
        let processor = VectorProcessor::from_bytes(worksheet, config).expect("open");
        let text = config.name_text("anna schmidt");
        let name = processor
            .name_extent(font, &text)
            .map(|extent| NameText { text, extent });
        let placement = compute_placement(processor.geometry(), (40, 50), config, name);
        processor
            .personalize(&photo(), &placement, font)
            .expect("personalise")
    }

    fn first_page_text(output: &[u8]) -> String {
        let reader = PdfReader::from_bytes(output).expect("output parses");
        let page_id = reader.first_page_id().expect("page");
        let content = reader.document().get_page_content(page_id).expect("content");
        String::from_utf8_lossy(&content).into_owned()
    }

    #[test]
    fn geometry_comes_from_media_box() {
        let processor =
            VectorProcessor::from_bytes(&worksheet_pdf(), &Configuration::default()).expect("open");
        assert!((processor.geometry().width - 595.276).abs() < 1e-3);
        assert_eq!(processor.format(), WorksheetFormat::Pdf);
    }

    #[test]
    fn output_keeps_original_stream_and_adds_overlay() {
        let output = render(&Configuration::default());
        let reader = PdfReader::from_bytes(&output).expect("output parses");
        assert_eq!(reader.page_count(), 1);

        let doc = reader.document();
        let page_id = reader.first_page_id().expect("page");
        let content = doc.get_page_content(page_id).expect("content");
        let text = String::from_utf8_lossy(&content);
        assert!(text.contains("Math test"));
        assert!(text.contains("BwPhoto"));
        assert!(text.contains("Name: anna schmidt"));

        let resources = doc
            .get_dictionary(page_id)
            .and_then(|page| page.get(b"Resources"))
            .and_then(Object::as_dict)
            .expect("inline resources");
        let fonts = resources.get(b"Font").and_then(Object::as_dict).expect("fonts");
        assert!(fonts.has(b"F1"));
        assert!(fonts.has(b"BwName"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let config = Configuration::default();
        assert_eq!(render(&config), render(&config));
    }

    #[test]
    fn no_font_resource_without_name() {
        let config = Configuration {
            add_name: false,
            ..Configuration::default()
        };
        let output = render(&config);
        let reader = PdfReader::from_bytes(&output).expect("output parses");
        let page_id = reader.first_page_id().expect("page");
        let content = reader.document().get_page_content(page_id).expect("content");
        assert!(!String::from_utf8_lossy(&content).contains("BwName"));
    }

    #[test]
    fn unused_name_skips_taken_keys() {
        let mut dict = Dictionary::new();
        assert_eq!(unused_name(&dict, "BwPhoto"), "BwPhoto");
        dict.set("BwPhoto", Object::Null);
        dict.set("BwPhoto1", Object::Null);
        assert_eq!(unused_name(&dict, "BwPhoto"), "BwPhoto2");
    }

    #[test]
    fn indirect_contents_array_is_spliced_not_nested() {
        let config = Configuration::default();
        let font = ResolvedFont::Standard(StandardFont::with_candidates(Vec::new()));
        let output = render_with(
            &worksheet_pdf_with(ContentsLayout::IndirectArray),
            &config,
            &font,
        );

        let reader = PdfReader::from_bytes(&output).expect("output parses");
        let page_id = reader.first_page_id().expect("page");
        let contents = reader
            .document()
            .get_dictionary(page_id)
            .and_then(|page| page.get(b"Contents"))
            .and_then(Object::as_array)
            .expect("contents array");
        assert_eq!(contents.len(), 3);
        assert!(contents.iter().all(|item| item.as_reference().is_ok()));

        let text = first_page_text(&output);
        assert!(text.contains("Math test"));
        assert!(text.contains("BwPhoto"));
    }

    #[test]
    fn display_font_is_embedded_as_symbolic_truetype() {
        let font = ResolvedFont::Embedded(
            EmbeddedFont::from_bytes("Schulschrift", truetype_font(true)).expect("font"),
        );
        let output = render_with(&worksheet_pdf(), &Configuration::default(), &font);
        assert!(first_page_text(&output).contains("Name: anna schmidt"));

        let reader = PdfReader::from_bytes(&output).expect("output parses");
        let doc = reader.document();
        let page_id = reader.first_page_id().expect("page");
        let fonts = doc
            .get_dictionary(page_id)
            .and_then(|page| page.get(b"Resources"))
            .and_then(Object::as_dict)
            .and_then(|resources| resources.get(b"Font"))
            .and_then(Object::as_dict)
            .expect("fonts");
        let font_dict = fonts
            .get(b"BwName")
            .and_then(Object::as_reference)
            .and_then(|id| doc.get_dictionary(id))
            .expect("name font");

        assert_eq!(
            font_dict.get(b"Subtype").and_then(Object::as_name).expect("subtype"),
            b"TrueType"
        );
        assert_eq!(
            font_dict.get(b"BaseFont").and_then(Object::as_name).expect("base font"),
            b"Schulschrift"
        );
        assert!(!font_dict.has(b"Encoding"));
        let widths = font_dict.get(b"Widths").and_then(Object::as_array).expect("widths");
        assert_eq!(widths.len(), usize::from(LAST_CODE - FIRST_CODE) + 1);
        assert_eq!(widths[usize::from(b'A' - FIRST_CODE)].as_i64().expect("width"), 600);

        let descriptor = font_dict
            .get(b"FontDescriptor")
            .and_then(Object::as_reference)
            .and_then(|id| doc.get_dictionary(id))
            .expect("descriptor");
        assert_eq!(descriptor.get(b"Flags").and_then(Object::as_i64).expect("flags"), 4);
        let program = descriptor
            .get(b"FontFile2")
            .and_then(Object::as_reference)
            .and_then(|id| doc.get_object(id))
            .and_then(Object::as_stream)
            .expect("font program");
        let mut program = program.clone();
        let _ = program.decompress();
        assert_eq!(program.content, truetype_font(true));
    }
}
