// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text rasterisation with ab_glyph.

use ab_glyph::{Font, FontArc, Glyph, GlyphId, OutlinedGlyph, PxScale, Rect, ScaleFont, point};
use image::{Rgba, RgbaImage};
use stempel_core::RgbaColor;
use stempel_core::error::{Result, StempelError};
use tracing::debug;

use crate::composite::MAX_TILE_PIXELS;
use crate::composite::blend::blend_over;

/// Render `text` with an em size of `em_px` pixels.
///
/// Lines split on `\n` are stacked and left-aligned; glyphs on a line are
/// kerned. The output is the ink bounding box of all glyphs plus `padding`
/// on each side, fully transparent except for the glyph coverage.
pub(crate) fn render_text(
    text: &str,
    font: &FontArc,
    em_px: f32,
    color: RgbaColor,
    padding: u32,
) -> Result<RgbaImage> {
    let scale = em_scale(font, em_px);
    let outlined = layout(text, font, scale);
    let Some(bounds) = ink_bounds(&outlined) else {
        return Err(StempelError::EmptyWatermark);
    };

    let ink_w = (bounds.max.x as f64 - bounds.min.x as f64).ceil();
    let ink_h = (bounds.max.y as f64 - bounds.min.y as f64).ceil();
    if ink_w.is_nan() || ink_h.is_nan() || ink_w < 1.0 || ink_h < 1.0 {
        return Err(StempelError::EmptyWatermark);
    }

    let (width, height) = canvas_size(ink_w, ink_h, padding)?;
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));

    for glyph in &outlined {
        let glyph_bounds = glyph.px_bounds();
        let origin_x = (glyph_bounds.min.x - bounds.min.x) as i64 + padding as i64;
        let origin_y = (glyph_bounds.min.y - bounds.min.y) as i64 + padding as i64;

        glyph.draw(|gx, gy, coverage| {
            let x = origin_x + gx as i64;
            let y = origin_y + gy as i64;
            if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
                return;
            }
            let alpha = (coverage.clamp(0.0, 1.0) * color.a as f32).round() as u8;
            if alpha == 0 {
                return;
            }
            let ink = Rgba([color.r, color.g, color.b, alpha]);
            let pixel = canvas.get_pixel_mut(x as u32, y as u32);
            *pixel = blend_over(*pixel, ink, 1.0);
        });
    }

    debug!(width, height, glyphs = outlined.len(), "Rendered text tile");
    Ok(canvas)
}

/// Padded canvas size, refused when over [`MAX_TILE_PIXELS`].
fn canvas_size(ink_w: f64, ink_h: f64, padding: u32) -> Result<(u32, u32)> {
    let width = ink_w + 2.0 * padding as f64;
    let height = ink_h + 2.0 * padding as f64;
    let pixels = width * height;
    if !pixels.is_finite() || pixels > MAX_TILE_PIXELS as f64 {
        return Err(StempelError::InvalidConfig(format!(
            "text tile of {}x{} pixels exceeds the {} pixel limit",
            width, height, MAX_TILE_PIXELS
        )));
    }
    Ok((width as u32, height as u32))
}

/// `PxScale` measures ascent-to-descent height; convert from an em size.
fn em_scale(font: &FontArc, em_px: f32) -> PxScale {
    match font.units_per_em() {
        Some(units_per_em) if units_per_em > 0.0 => {
            PxScale::from(em_px * font.height_unscaled() / units_per_em)
        }
        _ => PxScale::from(em_px),
    }
}

fn layout(text: &str, font: &FontArc, scale: PxScale) -> Vec<OutlinedGlyph> {
    let scaled = font.as_scaled(scale);
    let line_advance = scaled.height() + scaled.line_gap();
    let mut glyphs: Vec<Glyph> = Vec::new();

    for (line_index, line) in text.split('\n').enumerate() {
        let baseline = scaled.ascent() + line_index as f32 * line_advance;
        let mut caret = 0.0f32;
        let mut previous: Option<GlyphId> = None;

        for ch in line.chars().filter(|ch| !ch.is_control()) {
            let id = scaled.glyph_id(ch);
            if let Some(prev) = previous {
                caret += scaled.kern(prev, id);
            }
            glyphs.push(id.with_scale_and_position(scale, point(caret, baseline)));
            caret += scaled.h_advance(id);
            previous = Some(id);
        }
    }

    glyphs
        .into_iter()
        .filter_map(|glyph| font.outline_glyph(glyph))
        .collect()
}

fn ink_bounds(glyphs: &[OutlinedGlyph]) -> Option<Rect> {
    glyphs.iter().map(OutlinedGlyph::px_bounds).reduce(|acc, b| Rect {
        min: point(acc.min.x.min(b.min.x), acc.min.y.min(b.min.y)),
        max: point(acc.max.x.max(b.max.x), acc.max.y.max(b.max.y)),
    })
}
