// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page applier: composite an overlay for every page of a PDF and merge the
// overlays into a copy of the document.
//
// Overlays are computed and compressed on the rayon pool; merging into the
// output document is sequential since it has a single owner.

use std::path::Path;

use lopdf::Document;
use rayon::prelude::*;
use stempel_core::error::{Result, StempelError};
use stempel_core::{FailurePolicy, GridParams};
use tracing::{debug, info, instrument, warn};

use super::overlay::{EncodedOverlay, embed_overlay, encode_overlay};
use super::reader::{PageGeometry, PdfSource};
use crate::composite::GridCompositor;
use crate::tile::Tile;

/// A page left unwatermarked under [`FailurePolicy::BestEffort`].
#[derive(Debug)]
pub struct PageFailure {
    pub page: u32,
    pub error: StempelError,
}

/// The watermarked copy of a document.
pub struct WatermarkedDocument {
    document: Document,
    placements: Vec<usize>,
    failures: Vec<PageFailure>,
}

impl WatermarkedDocument {
    pub fn page_count(&self) -> usize {
        self.placements.len()
    }

    /// Tile instances drawn on each page, in page order. Zero for failed pages.
    pub fn placements(&self) -> &[usize] {
        &self.placements
    }

    pub fn failures(&self) -> &[PageFailure] {
        &self.failures
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    /// Serialise the document.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.document.save_to(&mut output).map_err(|err| {
            StempelError::PdfError(format!("failed to serialise watermarked PDF: {}", err))
        })?;
        Ok(output)
    }

    /// Serialise the document to `path`.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path.as_ref(), bytes)?;
        info!(path = %path.as_ref().display(), "Wrote watermarked PDF");
        Ok(())
    }
}

/// Applies one tile to every page of a document.
#[derive(Debug, Clone, Copy)]
pub struct PageApplier {
    compositor: GridCompositor,
    policy: FailurePolicy,
}

impl PageApplier {
    pub fn new(compositor: GridCompositor, policy: FailurePolicy) -> Self {
        Self { compositor, policy }
    }

    pub fn compositor(&self) -> &GridCompositor {
        &self.compositor
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Watermark every page of `source` into a new document.
    ///
    /// `source` is never modified. The output has the same pages in the same
    /// order with the same media boxes. Under [`FailurePolicy::Strict`] the
    /// first failing page aborts with [`StempelError::CompositeFailure`];
    /// under [`FailurePolicy::BestEffort`] failing pages are left as they
    /// were and listed in [`WatermarkedDocument::failures`].
    #[instrument(skip_all, fields(mode = ?params.mode, policy = ?self.policy))]
    pub fn apply(
        &self,
        source: &PdfSource,
        tile: &Tile,
        params: &GridParams,
    ) -> Result<WatermarkedDocument> {
        params.validate()?;
        let pages = source.pages()?;
        let prepared = self.compositor.prepare(tile, params)?;

        let overlays: Vec<Result<(usize, EncodedOverlay)>> = pages
            .par_iter()
            .map(|page| {
                let layer = self
                    .compositor
                    .composite_prepared(&prepared, params, &page.canvas())?;
                let placements = layer.placements();
                Ok((placements, encode_overlay(&layer)?))
            })
            .collect();

        let mut document = source.document().clone();
        let mut placements = Vec::with_capacity(pages.len());
        let mut failures = Vec::new();

        for (page, overlay) in pages.iter().zip(overlays) {
            let merged = overlay.and_then(|(count, encoded)| {
                embed_overlay(&mut document, page, encoded)?;
                Ok(count)
            });
            match merged {
                Ok(count) => {
                    debug!(page = page.number, placements = count, "Page watermarked");
                    placements.push(count);
                }
                Err(err) => match self.policy {
                    FailurePolicy::Strict => return Err(as_page_failure(page, err)),
                    FailurePolicy::BestEffort => {
                        warn!(page = page.number, %err, "Leaving page unwatermarked");
                        placements.push(0);
                        failures.push(PageFailure {
                            page: page.number,
                            error: err,
                        });
                    }
                },
            }
        }

        info!(
            pages = pages.len(),
            failed = failures.len(),
            "Document watermarked"
        );
        Ok(WatermarkedDocument {
            document,
            placements,
            failures,
        })
    }
}

fn as_page_failure(page: &PageGeometry, err: StempelError) -> StempelError {
    match err {
        StempelError::CompositeFailure { .. } => err,
        other => StempelError::CompositeFailure {
            page: page.number,
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::testing::{TestPage, build_pdf, letter_pdf};
    use image::{Rgba, RgbaImage};
    use lopdf::Object;

    fn tile() -> Tile {
        Tile::new(RgbaImage::from_pixel(40, 12, Rgba([68, 68, 68, 220])))
    }

    fn applier(policy: FailurePolicy) -> PageApplier {
        PageApplier::new(GridCompositor::new(), policy)
    }

    fn page_dict<'a>(document: &'a Document, number: u32) -> &'a lopdf::Dictionary {
        let id = document.get_pages()[&number];
        document.get_dictionary(id).unwrap()
    }

    #[test]
    fn page_count_and_sizes_are_preserved() {
        let bytes = build_pdf(&[
            TestPage::new(612.0, 792.0),
            TestPage::new(595.0, 842.0).rotated(90),
            TestPage::new(300.0, 300.0),
        ]);
        let source = PdfSource::from_bytes(&bytes).unwrap();
        let mut result = applier(FailurePolicy::Strict)
            .apply(&source, &tile(), &GridParams::default())
            .unwrap();
        assert_eq!(result.page_count(), 3);
        assert!(result.failures().is_empty());

        let reloaded = PdfSource::from_bytes(&result.to_bytes().unwrap()).unwrap();
        assert_eq!(reloaded.canvases().unwrap(), source.canvases().unwrap());
    }

    #[test]
    fn source_document_is_not_modified() {
        let source = PdfSource::from_bytes(&letter_pdf(2)).unwrap();
        let before = source.document().objects.len();
        applier(FailurePolicy::Strict)
            .apply(&source, &tile(), &GridParams::default())
            .unwrap();
        assert_eq!(source.document().objects.len(), before);
        assert!(matches!(
            page_dict(source.document(), 1).get(b"Contents").unwrap(),
            Object::Reference(_)
        ));
    }

    #[test]
    fn original_content_is_wrapped_and_overlay_drawn_last() {
        let source = PdfSource::from_bytes(&letter_pdf(1)).unwrap();
        let original = page_dict(source.document(), 1).get(b"Contents").unwrap().clone();
        let result = applier(FailurePolicy::Strict)
            .apply(&source, &tile(), &GridParams::default())
            .unwrap();

        let document = result.document();
        let page = page_dict(document, 1);
        let contents = page.get(b"Contents").unwrap().as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1], original);

        let content_of = |object: &Object| {
            let id = object.as_reference().unwrap();
            document.get_object(id).unwrap().as_stream().unwrap().content.clone()
        };
        assert_eq!(content_of(&contents[0]), b"q\n");
        let draw = String::from_utf8(content_of(&contents[2])).unwrap();
        assert_eq!(draw, "Q\nq 612 0 0 792 0 0 cm /StempelWm0 Do Q\n");

        let xobjects = page
            .get(b"Resources")
            .unwrap()
            .as_dict()
            .unwrap()
            .get(b"XObject")
            .unwrap()
            .as_dict()
            .unwrap();
        let image_id = xobjects.get(b"StempelWm0").unwrap().as_reference().unwrap();
        let image = document.get_object(image_id).unwrap().as_stream().unwrap();
        assert_eq!(image.dict.get(b"Width").unwrap().as_i64().unwrap(), 612);
        assert_eq!(image.dict.get(b"Height").unwrap().as_i64().unwrap(), 792);
        assert!(image.dict.get(b"SMask").unwrap().as_reference().is_ok());
        // Inherited font resources are copied down with the overlay.
        assert!(page.get(b"Resources").unwrap().as_dict().unwrap().has(b"Font"));
    }

    #[test]
    fn existing_xobject_names_are_not_reused() {
        let bytes = build_pdf(&[TestPage::new(200.0, 200.0).with_xobject("StempelWm0")]);
        let source = PdfSource::from_bytes(&bytes).unwrap();
        let result = applier(FailurePolicy::Strict)
            .apply(&source, &tile(), &GridParams::grid(1, 1))
            .unwrap();

        let page = page_dict(result.document(), 1);
        let xobjects = page
            .get(b"Resources")
            .unwrap()
            .as_dict()
            .unwrap()
            .get(b"XObject")
            .unwrap()
            .as_dict()
            .unwrap();
        assert!(xobjects.has(b"StempelWm0"));
        assert!(xobjects.has(b"StempelWm1"));
    }

    #[test]
    fn rotated_page_gets_compensating_matrix() {
        let bytes = build_pdf(&[TestPage::new(612.0, 792.0).rotated(90)]);
        let source = PdfSource::from_bytes(&bytes).unwrap();
        let result = applier(FailurePolicy::Strict)
            .apply(&source, &tile(), &GridParams::grid(1, 1))
            .unwrap();
        let document = result.document();
        let contents = page_dict(document, 1).get(b"Contents").unwrap().as_array().unwrap();
        let draw_id = contents.last().unwrap().as_reference().unwrap();
        let draw = document.get_object(draw_id).unwrap().as_stream().unwrap();
        assert_eq!(draw.content, b"Q\nq 0 792 -612 0 612 0 cm /StempelWm0 Do Q\n");
    }

    #[test]
    fn best_effort_skips_broken_page() {
        let bytes = build_pdf(&[
            TestPage::new(612.0, 792.0),
            TestPage::new(0.0, 0.0),
            TestPage::new(612.0, 792.0),
        ]);
        let source = PdfSource::from_bytes(&bytes).unwrap();
        let result = applier(FailurePolicy::BestEffort)
            .apply(&source, &tile(), &GridParams::default())
            .unwrap();

        assert_eq!(result.page_count(), 3);
        assert_eq!(result.placements(), &[18, 0, 18]);
        assert_eq!(result.failures().len(), 1);
        assert_eq!(result.failures()[0].page, 2);
        assert!(matches!(
            result.failures()[0].error,
            StempelError::InvalidCanvas { .. }
        ));
        // The broken page keeps its single original content stream.
        assert!(matches!(
            page_dict(result.document(), 2).get(b"Contents").unwrap(),
            Object::Reference(_)
        ));
    }

    #[test]
    fn strict_reports_failing_page() {
        let bytes = build_pdf(&[TestPage::new(612.0, 792.0), TestPage::new(0.0, 0.0)]);
        let source = PdfSource::from_bytes(&bytes).unwrap();
        let err = applier(FailurePolicy::Strict)
            .apply(&source, &tile(), &GridParams::default())
            .err()
            .unwrap();
        match err {
            StempelError::CompositeFailure { page, .. } => assert_eq!(page, 2),
            other => panic!("expected CompositeFailure, got {other:?}"),
        }
    }

    #[test]
    fn invalid_params_touch_nothing() {
        let source = PdfSource::from_bytes(&letter_pdf(1)).unwrap();
        let err = applier(FailurePolicy::BestEffort)
            .apply(&source, &tile(), &GridParams::grid(3, 0))
            .err()
            .unwrap();
        assert!(matches!(err, StempelError::InvalidConfig(_)));
    }

    #[test]
    fn applying_twice_stacks_overlays() {
        let source = PdfSource::from_bytes(&letter_pdf(1)).unwrap();
        let applier = applier(FailurePolicy::Strict);
        let mut once = applier.apply(&source, &tile(), &GridParams::default()).unwrap();
        let reloaded = PdfSource::from_bytes(&once.to_bytes().unwrap()).unwrap();
        let twice = applier.apply(&reloaded, &tile(), &GridParams::default()).unwrap();

        let page = page_dict(twice.document(), 1);
        let xobjects = page
            .get(b"Resources")
            .unwrap()
            .as_dict()
            .unwrap()
            .get(b"XObject")
            .unwrap()
            .as_dict()
            .unwrap();
        assert!(xobjects.has(b"StempelWm0"));
        assert!(xobjects.has(b"StempelWm1"));
        assert_eq!(page.get(b"Contents").unwrap().as_array().unwrap().len(), 5);
    }
}
