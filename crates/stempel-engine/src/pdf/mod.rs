// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: reading page geometry, stamping overlays onto pages, and
// creating PDFs from text or images.

pub mod applier;
mod overlay;
pub mod reader;
pub mod writer;

pub use applier::{PageApplier, PageFailure, WatermarkedDocument};
pub use reader::{PageGeometry, PdfSource};
pub use writer::PdfWriter;

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory PDF fixtures.

    use lopdf::{Dictionary, Document, Object, Stream, dictionary};

    #[derive(Debug, Clone)]
    pub(crate) struct TestPage {
        width: f32,
        height: f32,
        rotate: Option<i64>,
        inherit_media_box: bool,
        xobject_name: Option<&'static str>,
    }

    impl TestPage {
        pub(crate) fn new(width: f32, height: f32) -> Self {
            Self {
                width,
                height,
                rotate: None,
                inherit_media_box: false,
                xobject_name: None,
            }
        }

        pub(crate) fn rotated(mut self, degrees: i64) -> Self {
            self.rotate = Some(degrees);
            self
        }

        /// Put the media box on the page tree node instead of the page.
        pub(crate) fn inherit_media_box(mut self) -> Self {
            self.inherit_media_box = true;
            self
        }

        /// Give the page its own resources with an image XObject of this name.
        pub(crate) fn with_xobject(mut self, name: &'static str) -> Self {
            self.xobject_name = Some(name);
            self
        }
    }

    fn media_box(width: f32, height: f32) -> Vec<Object> {
        vec![0.into(), 0.into(), width.into(), height.into()]
    }

    /// A document with one Helvetica text line per page; shared resources
    /// live on the page tree node.
    pub(crate) fn build_pdf(pages: &[TestPage]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        let mut tree_media_box = None;
        for (index, page) in pages.iter().enumerate() {
            let content = format!("BT /F1 24 Tf 72 700 Td (Page {}) Tj ET", index + 1);
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

            let mut page_dict = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            };
            if page.inherit_media_box {
                tree_media_box = Some(media_box(page.width, page.height));
            } else {
                page_dict.set("MediaBox", media_box(page.width, page.height));
            }
            if let Some(rotate) = page.rotate {
                page_dict.set("Rotate", rotate);
            }
            if let Some(name) = page.xobject_name {
                let image_id = doc.add_object(Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => 1i64,
                        "Height" => 1i64,
                        "ColorSpace" => "DeviceGray",
                        "BitsPerComponent" => 8i64,
                    },
                    vec![0],
                ));
                let mut xobjects = Dictionary::new();
                xobjects.set(name, image_id);
                page_dict.set(
                    "Resources",
                    dictionary! {
                        "Font" => dictionary! { "F1" => font_id },
                        "XObject" => xobjects,
                    },
                );
            }
            kids.push(doc.add_object(page_dict).into());
        }

        let mut pages_dict = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages.len() as i64,
            "Resources" => resources_id,
        };
        if let Some(media_box) = tree_media_box {
            pages_dict.set("MediaBox", media_box);
        }
        doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("fixture PDF serialises");
        bytes
    }

    /// `count` US Letter pages.
    pub(crate) fn letter_pdf(count: usize) -> Vec<u8> {
        build_pdf(&vec![TestPage::new(612.0, 792.0); count])
    }
}
