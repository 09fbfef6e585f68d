// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tile generation: text is rasterised with the spec's font, image tiles are
// decoded as-is.

use stempel_core::SourceKind;
use stempel_core::error::{Result, StempelError};
use tracing::{info, instrument};

use super::text::render_text;
use super::{Tile, TileCache, WatermarkSpec};

/// Renders [`WatermarkSpec`]s into [`Tile`]s.
///
/// Text is rendered at `density` pixels per point: font size and padding are
/// multiplied by it so the tile keeps its physical size on the page. Image
/// tiles are always decoded at their native size (density 1).
#[derive(Debug, Clone)]
pub struct TileGenerator {
    density: f32,
    cache: Option<TileCache>,
}

impl Default for TileGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TileGenerator {
    pub fn new() -> Self {
        Self {
            density: 1.0,
            cache: None,
        }
    }

    /// Render text tiles at `density` pixels per canvas unit.
    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    /// Reuse text tiles through `cache`.
    pub fn with_cache(mut self, cache: TileCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn density(&self) -> f32 {
        self.density
    }

    /// Produce the tile for `spec`.
    ///
    /// Deterministic: the same spec and density always yield the same pixels.
    #[instrument(skip(self, spec), fields(kind = %spec.source_kind(), density = self.density))]
    pub fn generate(&self, spec: &WatermarkSpec) -> Result<Tile> {
        match spec.source_kind() {
            SourceKind::Text => self.generate_text(spec),
            SourceKind::Image => load_image_tile(spec),
        }
    }

    fn generate_text(&self, spec: &WatermarkSpec) -> Result<Tile> {
        if !self.density.is_finite() || self.density <= 0.0 {
            return Err(StempelError::InvalidConfig(format!(
                "tile density must be a positive number, got {}",
                self.density
            )));
        }
        let font = spec.font().ok_or_else(|| {
            StempelError::InvalidConfig("text watermark has no font".into())
        })?;
        let text = spec.text_content().unwrap_or_default();

        if let Some(tile) = self.cache.as_ref().and_then(|c| c.load(spec, self.density)) {
            return Ok(tile);
        }

        let em_px = spec.font_size_pt() * self.density;
        let padding = (spec.padding_px() as f32 * self.density).round() as u32;
        let image = render_text(text, font.font(), em_px, spec.color(), padding)?;
        let tile = Tile::with_density(image, self.density);

        info!(
            width = tile.width(),
            height = tile.height(),
            font = %font.source().display(),
            "Text tile generated"
        );

        if let Some(cache) = &self.cache {
            cache.store(spec, &tile);
        }
        Ok(tile)
    }
}

fn load_image_tile(spec: &WatermarkSpec) -> Result<Tile> {
    let path = spec.source_image_path().ok_or_else(|| {
        StempelError::InvalidConfig("image watermark has no image path".into())
    })?;
    let decoded = image::open(path).map_err(|err| {
        StempelError::ImageError(format!("failed to open {}: {}", path.display(), err))
    })?;
    let tile = Tile::new(decoded.to_rgba8());
    info!(
        width = tile.width(),
        height = tile.height(),
        path = %path.display(),
        "Image tile loaded"
    );
    Ok(tile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::tests::fixture_font;
    use image::{Rgba, RgbaImage};
    use stempel_core::RgbaColor;

    fn text_spec(text: &str) -> WatermarkSpec {
        WatermarkSpec::text(text, fixture_font(), 36.0, RgbaColor::new(68, 68, 68, 220), 20)
            .unwrap()
    }

    #[test]
    fn generation_is_deterministic() {
        let generator = TileGenerator::new();
        let first = generator.generate(&text_spec("CONFIDENTIAL")).unwrap();
        let second = generator.generate(&text_spec("CONFIDENTIAL")).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.density(), 1.0);
    }

    #[test]
    fn empty_text_is_empty_watermark() {
        let err = TileGenerator::new().generate(&text_spec("")).unwrap_err();
        assert!(matches!(err, StempelError::EmptyWatermark));
    }

    #[test]
    fn density_scales_text_tile() {
        let one = TileGenerator::new().generate(&text_spec("Stempel")).unwrap();
        let two = TileGenerator::new()
            .with_density(2.0)
            .generate(&text_spec("Stempel"))
            .unwrap();
        assert_eq!(two.density(), 2.0);
        let ratio = two.width() as f32 / one.width() as f32;
        assert!((1.9..=2.1).contains(&ratio), "ratio {ratio}");
    }

    #[test]
    fn image_tile_keeps_native_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        let image = RgbaImage::from_fn(7, 5, |x, y| Rgba([x as u8 * 30, y as u8 * 50, 90, 77]));
        image.save(&path).unwrap();

        let tile = TileGenerator::new()
            .with_density(3.0)
            .generate(&WatermarkSpec::image(&path).unwrap())
            .unwrap();
        assert_eq!(tile.image(), &image);
        assert_eq!(tile.density(), 1.0);
    }

    #[test]
    fn unreadable_image_is_image_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        let err = TileGenerator::new()
            .generate(&WatermarkSpec::image(&path).unwrap())
            .unwrap_err();
        assert!(matches!(err, StempelError::ImageError(_)));
    }

    #[test]
    fn cached_generation_matches_fresh_render() {
        let dir = tempfile::tempdir().unwrap();
        let cached = TileGenerator::new().with_cache(TileCache::new(dir.path()));
        let first = cached.generate(&text_spec("cache me")).unwrap();
        let second = cached.generate(&text_spec("cache me")).unwrap();
        let fresh = TileGenerator::new().generate(&text_spec("cache me")).unwrap();

        assert_eq!(first, fresh);
        assert_eq!(second, fresh);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
