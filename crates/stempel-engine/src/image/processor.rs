// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tile processor: scale and rotate a watermark tile before it is placed.
// Works on straight-alpha RGBA rasters; resampling is done on premultiplied
// pixels so transparent borders do not darken the edges.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use imageproc::geometric_transformations::{self, Interpolation};
use tracing::{debug, instrument};

use crate::composite::blend::{premultiply, unpremultiply};

/// Angles closer than this to a multiple of 90 take the lossless path.
const RIGHT_ANGLE_TOLERANCE: f32 = 0.01;

/// Scale factors closer than this to 1.0 skip resampling.
const UNIT_SCALE_TOLERANCE: f32 = 1e-6;

/// Transform pipeline over a single tile raster.
///
/// Each method consumes `self` and returns the transformed processor, so
/// steps chain:
///
/// ```ignore
/// let prepared = TileProcessor::new(tile.image().clone())
///     .scale(2.0)
///     .rotate(45.0)
///     .into_image();
/// ```
pub struct TileProcessor {
    image: RgbaImage,
}

impl TileProcessor {
    // -- Construction ---------------------------------------------------------

    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    // -- Transformations ------------------------------------------------------

    /// Multiply both dimensions by `factor` (rounded, at least one pixel).
    ///
    /// A factor of 1.0 returns the raster untouched.
    #[instrument(skip(self), fields(width = self.image.width(), height = self.image.height()))]
    pub fn scale(self, factor: f32) -> Self {
        if (factor - 1.0).abs() < UNIT_SCALE_TOLERANCE {
            return self;
        }
        let width = ((self.image.width() as f32 * factor).round() as u32).max(1);
        let height = ((self.image.height() as f32 * factor).round() as u32).max(1);
        debug!(width, height, "Scaling tile");

        let mut image = self.image;
        premultiply(&mut image);
        let mut resized = imageops::resize(&image, width, height, FilterType::Lanczos3);
        unpremultiply(&mut resized);
        Self { image: resized }
    }

    /// Rotate counter-clockwise by `degrees` (as seen on the page) about the
    /// tile center.
    ///
    /// Multiples of 90 are lossless; 0 and 360 return the raster untouched.
    /// Any other angle lands in an expanded transparent canvas large enough
    /// to hold every corner of the rotated tile.
    #[instrument(skip(self), fields(width = self.image.width(), height = self.image.height()))]
    pub fn rotate(self, degrees: f32) -> Self {
        let normalised = degrees.rem_euclid(360.0);
        let near = |target: f32| (normalised - target).abs() < RIGHT_ANGLE_TOLERANCE;

        // The `image` crate's quarter turns are clockwise.
        if near(0.0) || near(360.0) {
            return self;
        }
        if near(90.0) {
            return Self {
                image: imageops::rotate270(&self.image),
            };
        }
        if near(180.0) {
            return Self {
                image: imageops::rotate180(&self.image),
            };
        }
        if near(270.0) {
            return Self {
                image: imageops::rotate90(&self.image),
            };
        }

        let (width, height) = (self.image.width(), self.image.height());
        let radians = normalised.to_radians();
        let (sin, cos) = (radians.sin().abs(), radians.cos().abs());

        // Keep the parity of the source so the tile sits on whole pixels.
        let expand = |along: u32, across: u32, a: f32, b: f32| -> u32 {
            let needed = (along as f32 * a + across as f32 * b).ceil() as u32 + 2;
            let needed = needed.max(along);
            needed + (needed - along) % 2
        };
        let canvas_w = expand(width, height, cos, sin);
        let canvas_h = expand(height, width, cos, sin);

        let mut canvas = RgbaImage::from_pixel(canvas_w, canvas_h, Rgba([0, 0, 0, 0]));
        imageops::overlay(
            &mut canvas,
            &self.image,
            ((canvas_w - width) / 2) as i64,
            ((canvas_h - height) / 2) as i64,
        );
        premultiply(&mut canvas);

        // imageproc rotates clockwise in image space (y down).
        let mut rotated = geometric_transformations::rotate_about_center(
            &canvas,
            -radians,
            Interpolation::Bilinear,
            Rgba([0, 0, 0, 0]),
        );
        unpremultiply(&mut rotated);

        debug!(canvas_w, canvas_h, "General rotation applied");
        Self { image: rotated }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 4x2 tile: left half red, right half blue, all opaque.
    fn two_tone() -> RgbaImage {
        RgbaImage::from_fn(4, 2, |x, _| {
            if x < 2 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        })
    }

    #[test]
    fn unit_scale_is_passthrough() {
        let image = two_tone();
        assert_eq!(TileProcessor::new(image.clone()).scale(1.0).into_image(), image);
    }

    #[test]
    fn scale_multiplies_dimensions() {
        let scaled = TileProcessor::new(two_tone()).scale(2.5);
        assert_eq!((scaled.width(), scaled.height()), (10, 5));
    }

    #[test]
    fn zero_and_full_turn_are_passthrough() {
        let image = two_tone();
        assert_eq!(TileProcessor::new(image.clone()).rotate(0.0).into_image(), image);
        assert_eq!(TileProcessor::new(image.clone()).rotate(360.0).into_image(), image);
        assert_eq!(TileProcessor::new(image.clone()).rotate(-720.0).into_image(), image);
    }

    #[test]
    fn quarter_turn_is_counter_clockwise() {
        let rotated = TileProcessor::new(two_tone()).rotate(90.0).into_image();
        assert_eq!(rotated.dimensions(), (2, 4));
        // The right (blue) half ends up on top after a counter-clockwise turn.
        assert_eq!(*rotated.get_pixel(0, 0), Rgba([0, 0, 255, 255]));
        assert_eq!(*rotated.get_pixel(0, 3), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn half_turn_swaps_sides() {
        let rotated = TileProcessor::new(two_tone()).rotate(180.0).into_image();
        assert_eq!(rotated.dimensions(), (4, 2));
        assert_eq!(*rotated.get_pixel(0, 0), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn arbitrary_angle_expands_canvas_to_fit() {
        let tile = RgbaImage::from_pixel(100, 20, Rgba([10, 20, 30, 255]));
        let rotated = TileProcessor::new(tile).rotate(45.0).into_image();

        let diagonal = (120.0 * std::f32::consts::FRAC_1_SQRT_2).ceil() as u32;
        assert!(rotated.width() >= diagonal);
        assert!(rotated.height() >= diagonal);
        // Corners of the expanded canvas stay transparent.
        assert_eq!(rotated.get_pixel(0, 0)[3], 0);
        // The center is still covered.
        let center = rotated.get_pixel(rotated.width() / 2, rotated.height() / 2);
        assert_eq!(center[3], 255);
    }

    #[test]
    fn rotation_is_deterministic() {
        let tile = RgbaImage::from_pixel(33, 17, Rgba([200, 100, 0, 180]));
        let a = TileProcessor::new(tile.clone()).rotate(30.0).into_image();
        let b = TileProcessor::new(tile).rotate(30.0).into_image();
        assert_eq!(a, b);
    }
}
