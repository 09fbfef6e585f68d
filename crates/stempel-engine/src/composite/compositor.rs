// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Grid compositor: tile -> per-page overlay layer.

use std::fmt;

use image::{Rgba, RgbaImage};
use stempel_core::error::{Result, StempelError};
use stempel_core::{GridParams, PageCanvas};
use tracing::{debug, instrument};

use super::blend::draw_tile;
use super::placement::placement_centers;
use crate::image::TileProcessor;
use crate::tile::Tile;

/// Overlays larger than this are refused rather than allocated.
pub const MAX_OVERLAY_PIXELS: u64 = 150_000_000;

/// Tiles (rendered, or scaled and rotated) larger than this are refused.
pub const MAX_TILE_PIXELS: u64 = 50_000_000;

/// A tile after scaling and rotation, ready to be stamped onto any page of a
/// document. Computing it once per document keeps per-page work to placement
/// and blending.
#[derive(Clone)]
pub struct PreparedTile {
    image: RgbaImage,
}

impl PreparedTile {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

impl fmt::Debug for PreparedTile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedTile")
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .finish()
    }
}

/// The transparent composite of every tile instance on one page.
pub struct OverlayLayer {
    page_number: u32,
    image: RgbaImage,
    placements: usize,
}

impl OverlayLayer {
    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Number of tile instances drawn (including ones partly off the page).
    pub fn placements(&self) -> usize {
        self.placements
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Mean alpha over the whole layer, 0.0..=255.0.
    pub fn mean_alpha(&self) -> f64 {
        let pixels = self.image.width() as u64 * self.image.height() as u64;
        if pixels == 0 {
            return 0.0;
        }
        let total: u64 = self.image.pixels().map(|p| p[3] as u64).sum();
        total as f64 / pixels as f64
    }
}

impl fmt::Debug for OverlayLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayLayer")
            .field("page_number", &self.page_number)
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .field("placements", &self.placements)
            .finish()
    }
}

/// Scales, rotates and repeats a tile into an overlay for one page.
///
/// `resolution` is the number of overlay pixels per canvas unit. A canvas of
/// 612x792 points at resolution 2 yields a 1224x1584 overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCompositor {
    resolution: f32,
}

impl Default for GridCompositor {
    fn default() -> Self {
        Self::new()
    }
}

impl GridCompositor {
    pub fn new() -> Self {
        Self { resolution: 1.0 }
    }

    pub fn with_resolution(resolution: f32) -> Result<Self> {
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(StempelError::InvalidConfig(format!(
                "overlay resolution must be a positive number, got {}",
                resolution
            )));
        }
        Ok(Self { resolution })
    }

    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    /// Scale and rotate `tile` for `params`.
    ///
    /// The scale factor accounts for the tile's own density, so a tile
    /// rendered at the compositor's resolution is not resampled at scale 1.
    #[instrument(skip_all, fields(tile_w = tile.width(), tile_h = tile.height()))]
    pub fn prepare(&self, tile: &Tile, params: &GridParams) -> Result<PreparedTile> {
        params.validate()?;
        let factor = params.scale * self.resolution / tile.density();
        check_prepared_size(tile.width(), tile.height(), factor, params.normalized_angle())?;
        let image = TileProcessor::new(tile.image().clone())
            .scale(factor)
            .rotate(params.normalized_angle())
            .into_image();
        debug!(
            factor,
            width = image.width(),
            height = image.height(),
            "Tile prepared"
        );
        Ok(PreparedTile { image })
    }

    /// Composite `tile` onto a fresh overlay for `canvas`.
    pub fn composite_overlay(
        &self,
        tile: &Tile,
        params: &GridParams,
        canvas: &PageCanvas,
    ) -> Result<OverlayLayer> {
        let prepared = self.prepare(tile, params)?;
        self.composite_prepared(&prepared, params, canvas)
    }

    /// Composite an already prepared tile onto a fresh overlay for `canvas`.
    pub fn composite_prepared(
        &self,
        prepared: &PreparedTile,
        params: &GridParams,
        canvas: &PageCanvas,
    ) -> Result<OverlayLayer> {
        if !canvas.is_valid() {
            return Err(StempelError::InvalidCanvas {
                width: canvas.width,
                height: canvas.height,
            });
        }
        let (width, height) = self.overlay_size(canvas)?;

        let mut image = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
        let centers = placement_centers(params, width as f32, height as f32, prepared.width() as f32);
        for center in &centers {
            let (left, top) = center.top_left(prepared.width(), prepared.height());
            draw_tile(&mut image, &prepared.image, left, top, params.opacity);
        }

        debug!(
            page = canvas.page_number,
            width,
            height,
            placements = centers.len(),
            "Overlay composited"
        );
        Ok(OverlayLayer {
            page_number: canvas.page_number,
            image,
            placements: centers.len(),
        })
    }

    /// Overlay raster dimensions for `canvas`, at least one pixel each way.
    pub fn overlay_size(&self, canvas: &PageCanvas) -> Result<(u32, u32)> {
        let width = (canvas.width * self.resolution).round().max(1.0);
        let height = (canvas.height * self.resolution).round().max(1.0);
        let pixels = width as f64 * height as f64;
        if pixels > MAX_OVERLAY_PIXELS as f64 {
            return Err(StempelError::CompositeFailure {
                page: canvas.page_number,
                reason: format!(
                    "overlay of {}x{} pixels exceeds the {} pixel limit",
                    width, height, MAX_OVERLAY_PIXELS
                ),
            });
        }
        Ok((width as u32, height as u32))
    }
}

/// Refuse a scale and rotation whose result would exceed [`MAX_TILE_PIXELS`],
/// before anything is allocated.
fn check_prepared_size(width: u32, height: u32, factor: f32, degrees: f32) -> Result<()> {
    let factor = factor as f64;
    let scaled_w = (width as f64 * factor).round().max(1.0);
    let scaled_h = (height as f64 * factor).round().max(1.0);
    let radians = (degrees as f64).to_radians();
    let (sin, cos) = (radians.sin().abs(), radians.cos().abs());
    // Rotation canvas plus its two-pixel margin and parity pixel.
    let rotated_w = (scaled_w * cos + scaled_h * sin).ceil().max(scaled_w) + 3.0;
    let rotated_h = (scaled_h * cos + scaled_w * sin).ceil().max(scaled_h) + 3.0;
    let pixels = scaled_w * scaled_h + rotated_w * rotated_h;
    if !pixels.is_finite() || pixels > MAX_TILE_PIXELS as f64 {
        return Err(StempelError::InvalidConfig(format!(
            "tile scaled by {} would be about {}x{} pixels, over the {} pixel limit",
            factor, rotated_w, rotated_h, MAX_TILE_PIXELS
        )));
    }
    Ok(())
}
