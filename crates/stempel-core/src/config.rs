// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Watermark run configuration.
//
// Resolution order: defaults, then an optional JSON file, then environment
// variables, then whatever the caller (CLI) overrides. The result is an
// immutable value that is validated once and handed to each component.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StempelError};
use crate::types::{
    FailurePolicy, GridParams, HorizontalAlignment, InsertAnchor, RgbaColor, SourceKind,
    WatermarkMode,
};

/// Environment variable holding a font path that bypasses the candidate scan.
pub const FONT_OVERRIDE_ENV: &str = "WATERMARK_FONT";

/// Points per inch in PDF user space.
const POINTS_PER_INCH: f32 = 72.0;

/// Settings for one watermarking run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkConfig {
    /// Whether the tile comes from `text` or from `image`.
    pub source: SourceKind,
    /// Watermark text (text source).
    pub text: String,
    /// Append ` - YYYY-MM-DD` to the text.
    pub add_date: bool,
    /// Watermark image (image source).
    pub image: Option<PathBuf>,
    /// Font em size in points; rendered at `render_dpi`.
    pub font_size: f32,
    pub text_color: RgbaColor,
    /// Transparent border around the rendered text, in points.
    pub padding: u32,
    /// Font path that takes precedence over the candidate list.
    pub font_override: Option<PathBuf>,
    /// Directory searched for a ready-made watermark image when no font
    /// loads or an image source has no path.
    pub watermark_dir: PathBuf,

    pub watermark_type: WatermarkMode,
    pub opacity: f32,
    pub angle: f32,
    pub image_scale: f32,
    pub horizontal_boxes: u32,
    pub vertical_boxes: u32,
    /// Insert-mode anchor as page fractions from the top-left corner.
    pub insert_x: f32,
    pub insert_y: f32,
    pub horizontal_alignment: HorizontalAlignment,
    /// Overlay raster resolution.
    pub render_dpi: f32,

    pub failure_policy: FailurePolicy,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Reuse generated text tiles across runs.
    pub cache_tiles: bool,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Text,
            text: "Watermark".into(),
            add_date: true,
            image: None,
            font_size: 36.0,
            text_color: RgbaColor::new(68, 68, 68, 220),
            padding: 20,
            font_override: None,
            watermark_dir: PathBuf::from("watermarks"),
            watermark_type: WatermarkMode::Grid,
            opacity: 0.2,
            angle: 45.0,
            image_scale: 1.0,
            horizontal_boxes: 3,
            vertical_boxes: 6,
            insert_x: 0.5,
            insert_y: 0.5,
            horizontal_alignment: HorizontalAlignment::Center,
            render_dpi: 144.0,
            failure_policy: FailurePolicy::BestEffort,
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
            cache_tiles: true,
        }
    }
}

impl WatermarkConfig {
    /// Load a JSON configuration file. Missing keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay values found through `lookup` (an environment accessor).
    ///
    /// Recognised keys: `WATERMARK_TYPE`, `OPACITY`, `ANGLE`, `IMAGE_SCALE`,
    /// `HORIZONTAL_BOXES`, `VERTICAL_BOXES`, `FONT_SIZE`, `TEXT_COLOR`,
    /// `PADDING`, `INSERT_X`, `INSERT_Y`, `HORIZONTAL_ALIGNMENT`, `RENDER_DPI`,
    /// `WATERMARK_DIR` and [`FONT_OVERRIDE_ENV`]. Unparseable values are an error, not ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = get("WATERMARK_TYPE") {
            self.watermark_type = value.parse()?;
        }
        if let Some(value) = get("OPACITY") {
            self.opacity = parse_env("OPACITY", &value)?;
        }
        if let Some(value) = get("ANGLE") {
            self.angle = parse_env("ANGLE", &value)?;
        }
        if let Some(value) = get("IMAGE_SCALE") {
            self.image_scale = parse_env("IMAGE_SCALE", &value)?;
        }
        if let Some(value) = get("HORIZONTAL_BOXES") {
            self.horizontal_boxes = parse_env("HORIZONTAL_BOXES", &value)?;
        }
        if let Some(value) = get("VERTICAL_BOXES") {
            self.vertical_boxes = parse_env("VERTICAL_BOXES", &value)?;
        }
        if let Some(value) = get("FONT_SIZE") {
            self.font_size = parse_env("FONT_SIZE", &value)?;
        }
        if let Some(value) = get("TEXT_COLOR") {
            self.text_color = value.parse()?;
        }
        if let Some(value) = get("PADDING") {
            self.padding = parse_env("PADDING", &value)?;
        }
        if let Some(value) = get("INSERT_X") {
            self.insert_x = parse_env("INSERT_X", &value)?;
        }
        if let Some(value) = get("INSERT_Y") {
            self.insert_y = parse_env("INSERT_Y", &value)?;
        }
        if let Some(value) = get("HORIZONTAL_ALIGNMENT") {
            self.horizontal_alignment = value.parse()?;
        }
        if let Some(value) = get("RENDER_DPI") {
            self.render_dpi = parse_env("RENDER_DPI", &value)?;
        }
        if let Some(value) = get("WATERMARK_DIR") {
            self.watermark_dir = PathBuf::from(value);
        }
        if let Some(value) = get(FONT_OVERRIDE_ENV) {
            self.font_override = Some(PathBuf::from(value));
        }
        Ok(())
    }

    /// Check every field the engine consumes. Fails fast on the first
    /// out-of-range value.
    pub fn validate(&self) -> Result<()> {
        self.grid_params()?;

        // An image source without a path is resolved from `watermark_dir`
        // when the session is built.
        if self.source == SourceKind::Text
            && (!self.font_size.is_finite() || self.font_size <= 0.0)
        {
            return Err(StempelError::InvalidConfig(format!(
                "font size must be a positive number, got {}",
                self.font_size
            )));
        }

        if !(36.0..=1200.0).contains(&self.render_dpi) {
            return Err(StempelError::InvalidConfig(format!(
                "render dpi must be within 36..=1200, got {}",
                self.render_dpi
            )));
        }
        Ok(())
    }

    /// The validated placement parameters of this configuration.
    pub fn grid_params(&self) -> Result<GridParams> {
        let params = GridParams {
            mode: self.watermark_type,
            horizontal_count: self.horizontal_boxes,
            vertical_count: self.vertical_boxes,
            angle_degrees: self.angle,
            opacity: self.opacity,
            scale: self.image_scale,
            anchor: InsertAnchor {
                x: self.insert_x,
                y: self.insert_y,
                alignment: self.horizontal_alignment,
            },
        };
        params.validate()?;
        Ok(params)
    }

    /// Overlay raster pixels per PDF point.
    pub fn pixels_per_point(&self) -> f32 {
        self.render_dpi / POINTS_PER_INCH
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse::<T>().map_err(|_| {
        StempelError::InvalidConfig(format!("{} has an unparseable value {:?}", key, value))
    })
}
