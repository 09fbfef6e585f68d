// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF source: load a document with `lopdf` and read each page's displayed
// geometry (inherited /MediaBox and /Rotate).

use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, ObjectId};
use stempel_core::PageCanvas;
use stempel_core::error::{Result, StempelError};
use tracing::{debug, info, instrument};

/// Guard against cyclic /Parent chains in damaged page trees.
const MAX_TREE_DEPTH: usize = 64;

/// A loaded PDF whose pages are about to be watermarked. Never modified.
pub struct PdfSource {
    document: Document,
    source_path: Option<PathBuf>,
}

impl PdfSource {
    // -- Construction ---------------------------------------------------------

    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        let document = Document::load(path_ref).map_err(|err| {
            StempelError::PdfError(format!("failed to open {}: {}", path_ref.display(), err))
        })?;
        info!(pages = document.get_pages().len(), "PDF loaded");
        Ok(Self {
            document,
            source_path: Some(path_ref.to_path_buf()),
        })
    }

    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            StempelError::PdfError(format!("failed to load PDF from memory: {}", err))
        })?;
        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self {
            document,
            source_path: None,
        })
    }

    pub fn from_document(document: Document) -> Self {
        Self {
            document,
            source_path: None,
        }
    }

    // -- Inspection -----------------------------------------------------------

    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Geometry of every page, in page order.
    ///
    /// A page without a readable media box is still returned; its canvas is
    /// empty and the compositor rejects it, so only that page fails.
    pub fn pages(&self) -> Result<Vec<PageGeometry>> {
        let pages = self.document.get_pages();
        if pages.is_empty() {
            return Err(StempelError::PdfError("document has no pages".into()));
        }
        Ok(pages
            .into_iter()
            .map(|(number, id)| PageGeometry::read(&self.document, number, id))
            .collect())
    }

    /// Displayed canvases of every page, in page order.
    pub fn canvases(&self) -> Result<Vec<PageCanvas>> {
        Ok(self.pages()?.iter().map(PageGeometry::canvas).collect())
    }
}

/// Where a page lives in the document and how it is displayed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// 1-based page number.
    pub number: u32,
    pub id: ObjectId,
    /// Normalised `[llx, lly, urx, ury]`, if the page (or an ancestor) has one.
    pub media_box: Option<[f32; 4]>,
    /// Clockwise display rotation: 0, 90, 180 or 270.
    pub rotation: u16,
}

impl PageGeometry {
    fn read(document: &Document, number: u32, id: ObjectId) -> Self {
        let media_box = inherited(document, id, b"MediaBox").and_then(|obj| read_box(document, obj));
        let rotation = inherited(document, id, b"Rotate")
            .and_then(|obj| obj.as_i64().ok())
            .map(normalise_rotation)
            .unwrap_or(0);
        Self {
            number,
            id,
            media_box,
            rotation,
        }
    }

    /// Page size as displayed; width and height swap for quarter turns.
    pub fn canvas(&self) -> PageCanvas {
        let Some([llx, lly, urx, ury]) = self.media_box else {
            return PageCanvas::new(self.number, 0.0, 0.0);
        };
        let (width, height) = (urx - llx, ury - lly);
        if self.rotation % 180 == 90 {
            PageCanvas::new(self.number, height, width)
        } else {
            PageCanvas::new(self.number, width, height)
        }
    }
}

/// Look `key` up on the page, then on its ancestors in the page tree.
pub(crate) fn inherited<'a>(document: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current: &Dictionary = document.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(resolve(document, value));
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = document.get_dictionary(parent).ok()?;
    }
    None
}

/// Follow one level of indirection.
pub(crate) fn resolve<'a>(document: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => document.get_object(*id).unwrap_or(object),
        other => other,
    }
}

fn read_box(document: &Document, object: &Object) -> Option<[f32; 4]> {
    let values = object.as_array().ok()?;
    if values.len() != 4 {
        return None;
    }
    let mut coords = [0.0f32; 4];
    for (slot, value) in coords.iter_mut().zip(values) {
        *slot = resolve(document, value).as_float().ok()?;
    }
    let [x0, y0, x1, y1] = coords;
    Some([x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)])
}

/// Fold /Rotate into 0/90/180/270. Values that are not multiples of 90 are
/// invalid and treated as 0, as viewers do.
fn normalise_rotation(raw: i64) -> u16 {
    match raw.rem_euclid(360) {
        90 => 90,
        180 => 180,
        270 => 270,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::testing::{TestPage, build_pdf};

    #[test]
    fn reads_page_sizes_in_order() {
        let bytes = build_pdf(&[
            TestPage::new(612.0, 792.0),
            TestPage::new(595.0, 842.0),
        ]);
        let source = PdfSource::from_bytes(&bytes).unwrap();
        assert_eq!(source.page_count(), 2);

        let canvases = source.canvases().unwrap();
        assert_eq!(canvases[0], PageCanvas::new(1, 612.0, 792.0));
        assert_eq!(canvases[1], PageCanvas::new(2, 595.0, 842.0));
    }

    #[test]
    fn quarter_turn_swaps_displayed_size() {
        let bytes = build_pdf(&[
            TestPage::new(612.0, 792.0).rotated(90),
            TestPage::new(612.0, 792.0).rotated(-90),
            TestPage::new(612.0, 792.0).rotated(180),
        ]);
        let pages = PdfSource::from_bytes(&bytes).unwrap().pages().unwrap();
        assert_eq!(pages[0].rotation, 90);
        assert_eq!(pages[1].rotation, 270);
        assert_eq!(pages[0].canvas(), PageCanvas::new(1, 792.0, 612.0));
        assert_eq!(pages[1].canvas(), PageCanvas::new(2, 792.0, 612.0));
        assert_eq!(pages[2].canvas(), PageCanvas::new(3, 612.0, 792.0));
    }

    #[test]
    fn media_box_is_inherited_from_page_tree() {
        let bytes = build_pdf(&[TestPage::new(300.0, 400.0).inherit_media_box()]);
        let canvases = PdfSource::from_bytes(&bytes).unwrap().canvases().unwrap();
        assert_eq!(canvases[0], PageCanvas::new(1, 300.0, 400.0));
    }

    #[test]
    fn garbage_is_pdf_error() {
        let err = PdfSource::from_bytes(b"%PDF-1.5 nonsense").err().unwrap();
        assert!(matches!(err, StempelError::PdfError(_)));
    }

    #[test]
    fn rotation_normalisation() {
        assert_eq!(normalise_rotation(450), 90);
        assert_eq!(normalise_rotation(-180), 180);
        assert_eq!(normalise_rotation(45), 0);
    }
}
