// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer: turn plain text and raster images into PDFs with `printpdf`
// 0.8, so they can be watermarked like any other document.
//
// printpdf 0.8 builds documents from `PdfPage`s holding `Vec<Op>` operation
// lists, serialised with `PdfDocument::save()`.

use stempel_core::PaperSize;
use stempel_core::error::{Result, StempelError};
use printpdf::{
    BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt, RawImage,
    RawImageData, RawImageFormat, TextItem, XObjectTransform,
};
use tracing::{debug, instrument};

const BODY_FONT_SIZE_PT: f32 = 11.0;
const LINE_HEIGHT_PT: f32 = 14.0;
const TEXT_MARGIN_MM: f32 = 20.0;
const IMAGE_MARGIN_MM: f32 = 15.0;
/// Resolution assumed for images that carry no physical size.
const IMAGE_DPI: f32 = 150.0;

/// Lays out text or a single image on pages of a fixed paper size.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfWriter {
    paper_size: PaperSize,
}

impl PdfWriter {
    pub fn new(paper_size: PaperSize) -> Self {
        Self { paper_size }
    }

    pub fn paper_size(&self) -> PaperSize {
        self.paper_size
    }

    fn page_dimensions(&self) -> (Mm, Mm) {
        let (w_mm, h_mm) = self.paper_size.dimensions_mm();
        (Mm(w_mm as f32), Mm(h_mm as f32))
    }

    // -- Text -----------------------------------------------------------------

    /// Flow `text` top to bottom in 11pt Helvetica, wrapping long lines and
    /// breaking pages as needed. Empty text gives one blank page.
    #[instrument(skip(self, text), fields(text_len = text.len(), paper = ?self.paper_size))]
    pub fn text_to_pdf(&self, text: &str) -> Result<Vec<u8>> {
        let (page_w, page_h) = self.page_dimensions();
        let margin_pt = Mm(TEXT_MARGIN_MM).into_pt().0;

        // Helvetica averages about half an em per glyph.
        let usable_width_pt = page_w.into_pt().0 - 2.0 * margin_pt;
        let max_chars = ((usable_width_pt / (0.5 * BODY_FONT_SIZE_PT)) as usize).max(1);

        let lines = wrap_text(text, max_chars);
        let page_h_pt = page_h.into_pt().0;
        let lines_per_page =
            (((page_h_pt - 2.0 * margin_pt) / LINE_HEIGHT_PT) as usize).max(1);

        let mut pages: Vec<PdfPage> = lines
            .chunks(lines_per_page)
            .map(|chunk| {
                let ops = chunk
                    .iter()
                    .enumerate()
                    .flat_map(|(index, line)| {
                        let y_pt = page_h_pt - margin_pt - index as f32 * LINE_HEIGHT_PT;
                        text_line_ops(line, margin_pt, y_pt)
                    })
                    .collect();
                PdfPage::new(page_w, page_h, ops)
            })
            .collect();
        if pages.is_empty() {
            pages.push(PdfPage::new(page_w, page_h, Vec::new()));
        }

        debug!(lines = lines.len(), pages = pages.len(), "Text laid out");

        let mut doc = PdfDocument::new("Stempel text document");
        doc.with_pages(pages);
        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        Ok(doc.save(&PdfSaveOptions::default(), &mut warnings))
    }

    // -- Image ----------------------------------------------------------------

    /// One page holding the image centered within the margins, shrunk to fit
    /// but never enlarged.
    #[instrument(skip(self, image_bytes), fields(bytes_len = image_bytes.len(), paper = ?self.paper_size))]
    pub fn image_to_pdf(&self, image_bytes: &[u8]) -> Result<Vec<u8>> {
        let (page_w, page_h) = self.page_dimensions();

        let decoded = ::image::load_from_memory(image_bytes).map_err(|err| {
            StempelError::ImageError(format!("failed to decode image for PDF: {}", err))
        })?;
        let (img_w, img_h) = (decoded.width(), decoded.height());
        let raw = RawImage {
            pixels: RawImageData::U8(decoded.to_rgb8().into_raw()),
            width: img_w as usize,
            height: img_h as usize,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };

        let mut doc = PdfDocument::new("Stempel image document");
        let xobject_id = doc.add_image(&raw);

        let margin_pt = Mm(IMAGE_MARGIN_MM).into_pt().0;
        let usable_w_pt = page_w.into_pt().0 - 2.0 * margin_pt;
        let usable_h_pt = page_h.into_pt().0 - 2.0 * margin_pt;
        let natural_w_pt = img_w as f32 / IMAGE_DPI * 72.0;
        let natural_h_pt = img_h as f32 / IMAGE_DPI * 72.0;

        let scale = (usable_w_pt / natural_w_pt)
            .min(usable_h_pt / natural_h_pt)
            .min(1.0);
        let placed_w_pt = natural_w_pt * scale;
        let placed_h_pt = natural_h_pt * scale;

        let ops = vec![Op::UseXobject {
            id: xobject_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(margin_pt + (usable_w_pt - placed_w_pt) / 2.0)),
                translate_y: Some(Pt(margin_pt + (usable_h_pt - placed_h_pt) / 2.0)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(IMAGE_DPI),
                rotate: None,
            },
        }];
        doc.with_pages(vec![PdfPage::new(page_w, page_h, ops)]);

        debug!(img_w, img_h, scale, "Image placed");

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        Ok(doc.save(&PdfSaveOptions::default(), &mut warnings))
    }
}

fn text_line_ops(line: &str, x_pt: f32, y_pt: f32) -> Vec<Op> {
    vec![
        Op::StartTextSection,
        Op::SetTextCursor {
            pos: Point {
                x: Pt(x_pt),
                y: Pt(y_pt),
            },
        },
        Op::SetFontSizeBuiltinFont {
            size: Pt(BODY_FONT_SIZE_PT),
            font: BuiltinFont::Helvetica,
        },
        Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(line.to_string())],
            font: BuiltinFont::Helvetica,
        },
        Op::EndTextSection,
    ]
}

/// Word-wrap `text` to lines of at most `max_chars` characters. Existing
/// newlines are kept; words longer than a line are split.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        let mut current_len = 0usize;

        for word in paragraph.split_whitespace() {
            let mut chars: Vec<char> = word.chars().collect();

            if chars.len() > max_chars {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                while chars.len() > max_chars {
                    let rest = chars.split_off(max_chars);
                    lines.push(chars.iter().collect());
                    chars = rest;
                }
                current = chars.iter().collect();
                current_len = chars.len();
            } else if current.is_empty() {
                current.push_str(word);
                current_len = chars.len();
            } else if current_len + 1 + chars.len() <= max_chars {
                current.push(' ');
                current.push_str(word);
                current_len += 1 + chars.len();
            } else {
                lines.push(std::mem::replace(&mut current, word.to_string()));
                current_len = chars.len();
            }
        }

        lines.push(current);
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::PdfSource;

    #[test]
    fn wrap_keeps_short_lines() {
        assert_eq!(wrap_text("one two\n\nthree", 20), vec!["one two", "", "three"]);
    }

    #[test]
    fn wrap_breaks_at_word_boundaries() {
        assert_eq!(
            wrap_text("alpha beta gamma delta", 11),
            vec!["alpha beta", "gamma delta"]
        );
    }

    #[test]
    fn wrap_splits_long_words_on_char_boundaries() {
        assert_eq!(wrap_text("äöüäöüäö", 3), vec!["äöü", "äöü", "äö"]);
    }

    #[test]
    fn text_pdf_paginates() {
        let writer = PdfWriter::new(PaperSize::A4);
        let long: String = (0..200).map(|i| format!("line {i}\n")).collect();
        let bytes = writer.text_to_pdf(&long).unwrap();
        let source = PdfSource::from_bytes(&bytes).unwrap();
        assert!(source.page_count() >= 4);
    }

    #[test]
    fn empty_text_is_one_blank_page() {
        let bytes = PdfWriter::default().text_to_pdf("").unwrap();
        assert_eq!(PdfSource::from_bytes(&bytes).unwrap().page_count(), 1);
    }

    #[test]
    fn image_pdf_has_one_page() {
        let image = ::image::RgbImage::from_pixel(30, 20, ::image::Rgb([10, 200, 30]));
        let mut png = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut png), ::image::ImageFormat::Png)
            .unwrap();
        let bytes = PdfWriter::new(PaperSize::Letter).image_to_pdf(&png).unwrap();
        assert_eq!(PdfSource::from_bytes(&bytes).unwrap().page_count(), 1);
    }

    #[test]
    fn undecodable_image_is_image_error() {
        let err = PdfWriter::default().image_to_pdf(b"nope").unwrap_err();
        assert!(matches!(err, StempelError::ImageError(_)));
    }
}
