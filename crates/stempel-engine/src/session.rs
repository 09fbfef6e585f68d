// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// A watermark session: one validated configuration turned into the tile,
// placement parameters and page applier shared by every document of a run.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use stempel_core::error::{Result, StempelError};
use stempel_core::{DocumentType, GridParams, SourceKind, WatermarkConfig};
use tracing::{info, instrument, warn};

use crate::batch::BatchOrchestrator;
use crate::composite::GridCompositor;
use crate::font::FontResolver;
use crate::pdf::PageApplier;
use crate::render::DocumentRenderer;
use crate::tile::{Tile, TileCache, TileGenerator, WatermarkSpec};

/// The text actually rendered: the configured text, plus ` - YYYY-MM-DD`
/// when `add_date` is set.
pub fn watermark_text(config: &WatermarkConfig, today: NaiveDate) -> String {
    if config.add_date {
        format!("{} - {}", config.text, today.format("%Y-%m-%d"))
    } else {
        config.text.clone()
    }
}

/// First PNG or JPEG directly inside `dir`, by file name.
pub fn find_watermark_image(dir: &Path) -> Option<PathBuf> {
    let mut images: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && matches!(
                    DocumentType::from_path(path),
                    Some(DocumentType::Png | DocumentType::Jpeg)
                )
        })
        .collect();
    images.sort();
    images.into_iter().next()
}

/// Build the tile description for `config`. Text sources resolve a font
/// through `fonts`; image sources do not touch it.
///
/// When no font loads, or an image source has no path, the first image in
/// `config.watermark_dir` is used instead. Without one the original error
/// is returned.
pub fn build_spec(
    config: &WatermarkConfig,
    fonts: &FontResolver,
    today: NaiveDate,
) -> Result<WatermarkSpec> {
    match config.source {
        SourceKind::Text => {
            // Checked before the date suffix, which is never a watermark alone.
            if config.text.trim().is_empty() {
                return Err(StempelError::EmptyWatermark);
            }
            let font = match fonts.handle() {
                Ok(font) => font,
                Err(err @ StempelError::FontNotFound { .. }) => {
                    return image_from_dir(config, err);
                }
                Err(err) => return Err(err),
            };
            WatermarkSpec::text(
                watermark_text(config, today),
                font,
                config.font_size,
                config.text_color,
                config.padding,
            )
        }
        SourceKind::Image => match &config.image {
            Some(path) => WatermarkSpec::image(path.clone()),
            None => image_from_dir(
                config,
                StempelError::InvalidConfig(format!(
                    "image watermark selected but no image path set and none found in {}",
                    config.watermark_dir.display()
                )),
            ),
        },
    }
}

fn image_from_dir(config: &WatermarkConfig, cause: StempelError) -> Result<WatermarkSpec> {
    match find_watermark_image(&config.watermark_dir) {
        Some(path) => {
            warn!(%cause, image = %path.display(), "Falling back to watermark image");
            WatermarkSpec::image(path)
        }
        None => Err(cause),
    }
}

/// Everything a run needs after configuration: built once, read by every
/// document.
#[derive(Debug, Clone)]
pub struct WatermarkSession {
    tile: Tile,
    params: GridParams,
    applier: PageApplier,
}

impl WatermarkSession {
    /// Validate `config`, generate the tile and set up compositing at the
    /// configured render resolution.
    #[instrument(skip_all, fields(source = %config.source, dpi = config.render_dpi))]
    pub fn from_config(
        config: &WatermarkConfig,
        fonts: &FontResolver,
        cache: Option<TileCache>,
    ) -> Result<Self> {
        Self::from_config_on(config, fonts, cache, chrono::Local::now().date_naive())
    }

    /// [`WatermarkSession::from_config`] with a fixed date for the text suffix.
    pub fn from_config_on(
        config: &WatermarkConfig,
        fonts: &FontResolver,
        cache: Option<TileCache>,
        today: NaiveDate,
    ) -> Result<Self> {
        config.validate()?;
        let params = config.grid_params()?;
        let density = config.pixels_per_point();

        let spec = build_spec(config, fonts, today)?;
        let mut generator = TileGenerator::new().with_density(density);
        if let Some(cache) = cache {
            generator = generator.with_cache(cache);
        }
        let tile = generator.generate(&spec)?;

        let compositor = GridCompositor::with_resolution(density)?;
        let applier = PageApplier::new(compositor, config.failure_policy);

        info!(
            tile_width = tile.width(),
            tile_height = tile.height(),
            placements = params.placements_per_page(),
            "Session ready"
        );
        Ok(Self {
            tile,
            params,
            applier,
        })
    }

    pub fn tile(&self) -> &Tile {
        &self.tile
    }

    pub fn params(&self) -> &GridParams {
        &self.params
    }

    pub fn applier(&self) -> PageApplier {
        self.applier
    }

    /// An orchestrator that renders inputs with `renderer` and watermarks them
    /// with this session's applier.
    pub fn orchestrator(&self, renderer: Box<dyn DocumentRenderer>) -> BatchOrchestrator {
        BatchOrchestrator::new(renderer, self.applier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::tests::fixture_font_path;
    use crate::pdf::PdfSource;
    use crate::pdf::testing::letter_pdf;

    fn fixture_fonts() -> FontResolver {
        FontResolver::new(vec![fixture_font_path()], None)
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    fn config() -> WatermarkConfig {
        WatermarkConfig {
            text: "CONFIDENTIAL".into(),
            add_date: false,
            render_dpi: 72.0,
            watermark_dir: PathBuf::from("/nonexistent/stempel-watermarks"),
            ..WatermarkConfig::default()
        }
    }

    #[test]
    fn date_suffix_is_iso() {
        let mut config = config();
        assert_eq!(watermark_text(&config, date()), "CONFIDENTIAL");
        config.add_date = true;
        assert_eq!(watermark_text(&config, date()), "CONFIDENTIAL - 2024-03-09");
    }

    #[test]
    fn session_watermarks_every_page() {
        let session = WatermarkSession::from_config_on(&config(), &fixture_fonts(), None, date())
            .unwrap();
        assert_eq!(session.params().placements_per_page(), 18);

        let source = PdfSource::from_bytes(&letter_pdf(3)).unwrap();
        let result = session
            .applier()
            .apply(&source, session.tile(), session.params())
            .unwrap();
        assert_eq!(result.page_count(), 3);
        assert_eq!(result.placements(), &[18, 18, 18]);
        assert!(result.failures().is_empty());
    }

    #[test]
    fn higher_dpi_renders_denser_text() {
        let low = WatermarkSession::from_config_on(&config(), &fixture_fonts(), None, date())
            .unwrap();
        let high_config = WatermarkConfig {
            render_dpi: 144.0,
            ..config()
        };
        let high = WatermarkSession::from_config_on(&high_config, &fixture_fonts(), None, date())
            .unwrap();
        let ratio = high.tile().width() as f32 / low.tile().width() as f32;
        assert!((1.8..=2.2).contains(&ratio), "ratio {}", ratio);
    }

    #[test]
    fn zero_boxes_is_invalid_config() {
        let config = WatermarkConfig {
            horizontal_boxes: 0,
            ..config()
        };
        let err = WatermarkSession::from_config_on(&config, &fixture_fonts(), None, date())
            .unwrap_err();
        assert!(matches!(err, StempelError::InvalidConfig(_)));
    }

    #[test]
    fn empty_text_is_rejected_before_rendering() {
        let config = WatermarkConfig {
            text: "   ".into(),
            ..config()
        };
        let err = WatermarkSession::from_config_on(&config, &fixture_fonts(), None, date())
            .unwrap_err();
        assert!(matches!(err, StempelError::EmptyWatermark));
    }

    #[test]
    fn missing_font_is_reported() {
        let fonts = FontResolver::new(vec![PathBuf::from("/nonexistent/font.ttf")], None);
        let err = WatermarkSession::from_config_on(&config(), &fonts, None, date()).unwrap_err();
        assert!(matches!(err, StempelError::FontNotFound { tried: 1 }));
    }

    #[test]
    fn empty_text_with_date_suffix_is_still_empty() {
        let config = WatermarkConfig {
            text: String::new(),
            add_date: true,
            ..config()
        };
        let err = WatermarkSession::from_config_on(&config, &fixture_fonts(), None, date())
            .unwrap_err();
        assert!(matches!(err, StempelError::EmptyWatermark));
    }

    fn write_png(path: &Path, width: u32, height: u32) {
        image::RgbaImage::from_pixel(width, height, image::Rgba([200, 0, 0, 255]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn image_source_skips_font_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        write_png(&path, 40, 10);
        let config = WatermarkConfig {
            source: SourceKind::Image,
            image: Some(path),
            ..config()
        };
        let fonts = FontResolver::new(Vec::new(), None);
        let session = WatermarkSession::from_config_on(&config, &fonts, None, date()).unwrap();
        assert_eq!((session.tile().width(), session.tile().height()), (40, 10));
    }

    #[test]
    fn missing_font_falls_back_to_watermark_dir() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("b_stamp.png"), 12, 8);
        write_png(&dir.path().join("a_logo.png"), 30, 6);
        std::fs::write(dir.path().join("notes.txt"), "not an image").unwrap();
        let config = WatermarkConfig {
            watermark_dir: dir.path().to_path_buf(),
            ..config()
        };
        let fonts = FontResolver::new(vec![PathBuf::from("/nonexistent/font.ttf")], None);
        let session = WatermarkSession::from_config_on(&config, &fonts, None, date()).unwrap();
        assert_eq!((session.tile().width(), session.tile().height()), (30, 6));
    }

    #[test]
    fn missing_font_and_empty_dir_keeps_font_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = WatermarkConfig {
            watermark_dir: dir.path().to_path_buf(),
            ..config()
        };
        let fonts = FontResolver::new(vec![PathBuf::from("/nonexistent/font.ttf")], None);
        let err = WatermarkSession::from_config_on(&config, &fonts, None, date()).unwrap_err();
        assert!(matches!(err, StempelError::FontNotFound { tried: 1 }));
    }

    #[test]
    fn image_source_without_path_uses_watermark_dir() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("mark.PNG"), 9, 9);
        let config = WatermarkConfig {
            source: SourceKind::Image,
            watermark_dir: dir.path().to_path_buf(),
            ..config()
        };
        let fonts = FontResolver::new(Vec::new(), None);
        let session = WatermarkSession::from_config_on(&config, &fonts, None, date()).unwrap();
        assert_eq!(session.tile().width(), 9);

        let empty = tempfile::tempdir().unwrap();
        let config = WatermarkConfig {
            watermark_dir: empty.path().to_path_buf(),
            ..config
        };
        let err = WatermarkSession::from_config_on(&config, &fonts, None, date()).unwrap_err();
        assert!(matches!(err, StempelError::InvalidConfig(_)));
    }
}
