// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Watermark tiles: the elementary raster that gets repeated over each page.

pub mod cache;
pub mod generator;
pub mod spec;
mod text;

use std::fmt;
use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, RgbaImage};
use stempel_core::error::{Result, StempelError};

pub use cache::TileCache;
pub use generator::TileGenerator;
pub use spec::WatermarkSpec;

/// An RGBA8 tile with straight alpha.
///
/// `density` is the number of tile pixels per canvas unit the tile was
/// rendered at. A tile rendered at density 2 covers half as many page points
/// per pixel as one rendered at density 1, so the compositor can rasterise
/// sharp text at high overlay resolutions without upscaling.
#[derive(Clone, PartialEq)]
pub struct Tile {
    image: RgbaImage,
    density: f32,
}

impl Tile {
    /// A tile at one pixel per canvas unit.
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image,
            density: 1.0,
        }
    }

    pub(crate) fn with_density(image: RgbaImage, density: f32) -> Self {
        Self { image, density }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn density(&self) -> f32 {
        self.density
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Lossless PNG encoding of the tile.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .map_err(|err| StempelError::ImageError(format!("PNG encoding failed: {}", err)))?;
        Ok(buffer)
    }

    /// Write the tile as a PNG file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.image
            .save_with_format(path, ImageFormat::Png)
            .map_err(|err| {
                StempelError::ImageError(format!(
                    "failed to save tile to {}: {}",
                    path.display(),
                    err
                ))
            })
    }
}

impl fmt::Debug for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tile")
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .field("density", &self.density)
            .finish()
    }
}
