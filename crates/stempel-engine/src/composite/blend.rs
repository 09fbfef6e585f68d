// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Straight-alpha pixel compositing.

use image::{Rgba, RgbaImage};

/// Porter-Duff "over" with an extra opacity factor on the foreground.
///
/// Both pixels are straight (non-premultiplied) alpha. Over a fully
/// transparent background the foreground is returned with its alpha scaled,
/// which keeps full-opacity placement onto an empty layer an exact copy.
pub fn blend_over(background: Rgba<u8>, foreground: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let fg_alpha = (foreground[3] as f32 / 255.0) * opacity.clamp(0.0, 1.0);

    if background[3] == 0 {
        return Rgba([foreground[0], foreground[1], foreground[2], unit_to_u8(fg_alpha)]);
    }
    if fg_alpha <= 0.0 {
        return background;
    }

    let bg_alpha = background[3] as f32 / 255.0;
    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);

    let blend_channel = |fg: u8, bg: u8| -> u8 {
        let fg_f = fg as f32 / 255.0;
        let bg_f = bg as f32 / 255.0;
        unit_to_u8((fg_f * fg_alpha + bg_f * bg_alpha * (1.0 - fg_alpha)) / out_alpha)
    };

    Rgba([
        blend_channel(foreground[0], background[0]),
        blend_channel(foreground[1], background[1]),
        blend_channel(foreground[2], background[2]),
        unit_to_u8(out_alpha),
    ])
}

/// Draw `tile` onto `target` with its top-left corner at `(left, top)`.
///
/// The tile may hang off any edge; only the overlapping region is touched.
pub fn draw_tile(target: &mut RgbaImage, tile: &RgbaImage, left: i64, top: i64, opacity: f32) {
    let x_start = left.max(0);
    let y_start = top.max(0);
    let x_end = (left + tile.width() as i64).min(target.width() as i64);
    let y_end = (top + tile.height() as i64).min(target.height() as i64);

    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let src = *tile.get_pixel((tx - left) as u32, (ty - top) as u32);
            let dst = target.get_pixel_mut(tx as u32, ty as u32);
            *dst = blend_over(*dst, src, opacity);
        }
    }
}

/// Multiply color channels by alpha, in place, so resampling does not pull
/// the color of transparent pixels into visible edges.
pub(crate) fn premultiply(image: &mut RgbaImage) {
    for pixel in image.pixels_mut() {
        let alpha = pixel[3] as u32;
        for channel in 0..3 {
            pixel[channel] = ((pixel[channel] as u32 * alpha + 127) / 255) as u8;
        }
    }
}

/// Inverse of [`premultiply`].
pub(crate) fn unpremultiply(image: &mut RgbaImage) {
    for pixel in image.pixels_mut() {
        let alpha = pixel[3] as u32;
        if alpha == 0 {
            *pixel = Rgba([0, 0, 0, 0]);
            continue;
        }
        for channel in 0..3 {
            pixel[channel] = ((pixel[channel] as u32 * 255 + alpha / 2) / alpha).min(255) as u8;
        }
    }
}

fn unit_to_u8(value: f32) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}
