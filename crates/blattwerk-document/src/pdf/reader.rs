// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader: open a worksheet PDF with `lopdf`, inspect its first page and
// resolve inherited page attributes.

use std::path::Path;

use blattwerk_core::error::{BlattwerkError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, info, instrument, warn};

/// Maximum depth followed up the page tree when resolving inherited keys.
const MAX_TREE_DEPTH: usize = 32;

/// Page box in PDF user space (origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaBox {
    pub llx: f32,
    pub lly: f32,
    pub urx: f32,
    pub ury: f32,
}

impl MediaBox {
    pub fn width(&self) -> f32 {
        (self.urx - self.llx).abs()
    }

    pub fn height(&self) -> f32 {
        (self.ury - self.lly).abs()
    }
}

/// Reads an existing worksheet PDF.
///
/// Wraps `lopdf::Document`; every failure is reported as a source document
/// error since a worksheet that cannot be read is unusable for its whole
/// roster.
pub struct PdfReader {
    /// The underlying lopdf document.
    document: Document,
    /// Source path, if opened from a file (useful for diagnostics).
    source_path: Option<String>,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        info!("Opening worksheet PDF: {}", path_ref.display());

        let document = Document::load(path_ref).map_err(|err| {
            BlattwerkError::SourceDocument(format!(
                "failed to open {}: {}",
                path_ref.display(),
                err
            ))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded");

        Ok(Self {
            document,
            source_path: Some(path_ref.display().to_string()),
        })
    }

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            BlattwerkError::SourceDocument(format!("failed to load PDF from memory: {}", err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");

        Ok(Self {
            document,
            source_path: None,
        })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Object id of page 1.
    pub fn first_page_id(&self) -> Result<ObjectId> {
        self.document
            .get_pages()
            .get(&1)
            .copied()
            .ok_or_else(|| self.error("document has no pages"))
    }

    /// MediaBox of page 1, inherited from the page tree if necessary.
    pub fn first_page_box(&self) -> Result<MediaBox> {
        let page_id = self.first_page_id()?;
        let media_box = inherited_attribute(&self.document, page_id, b"MediaBox")
            .ok_or_else(|| self.error("first page has no MediaBox"))?;
        let values = resolve(&self.document, media_box)
            .as_array()
            .map_err(|err| self.error(&format!("MediaBox is not an array: {}", err)))?
            .iter()
            .map(|value| resolve(&self.document, value).as_float())
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(|err| self.error(&format!("MediaBox is not numeric: {}", err)))?;

        let &[llx, lly, urx, ury] = values.as_slice() else {
            return Err(self.error(&format!("MediaBox has {} entries", values.len())));
        };
        let media_box = MediaBox { llx, lly, urx, ury };
        if media_box.width() <= 0.0 || media_box.height() <= 0.0 {
            return Err(self.error("first page has an empty MediaBox"));
        }
        Ok(media_box)
    }

    // -- Extraction -----------------------------------------------------------

    /// Consume the reader and return a document that only contains page 1.
    ///
    /// Worksheets are single pages; anything after page 1 is dropped with a
    /// warning.
    pub fn into_first_page(self) -> Result<Document> {
        let mut document = self.document;
        let total = document.get_pages().len() as u32;
        if total == 0 {
            return Err(BlattwerkError::SourceDocument(
                "document has no pages".to_string(),
            ));
        }
        if total > 1 {
            warn!(
                pages = total,
                source = self.source_path.as_deref().unwrap_or("<memory>"),
                "Worksheet has more than one page; only page 1 is personalised"
            );
            let extra: Vec<u32> = (2..=total).collect();
            document.delete_pages(&extra);
            document.prune_objects();
        }
        Ok(document)
    }

    // -- Helpers --------------------------------------------------------------

    fn error(&self, detail: &str) -> BlattwerkError {
        BlattwerkError::SourceDocument(format!(
            "{}: {}",
            self.source_path.as_deref().unwrap_or("<memory>"),
            detail
        ))
    }
}

/// Follow a reference to the object it points at. Unresolvable references and
/// non-reference objects are returned unchanged.
pub fn resolve<'a>(document: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => document.get_object(*id).unwrap_or(object),
        other => other,
    }
}

/// Look up an inheritable page attribute (MediaBox, Resources, ...) on the
/// page itself or its ancestors.
pub fn inherited_attribute<'a>(
    document: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut node: &Dictionary = document.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = document.get_dictionary(parent).ok()?;
    }
    None
}

/// Resolve an object that should be a dictionary into an owned copy.
pub fn owned_dictionary(document: &Document, object: &Object) -> Option<Dictionary> {
    resolve(document, object).as_dict().ok().cloned()
}
