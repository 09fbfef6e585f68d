// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Stempel watermark engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StempelError};

/// Upper bound on tile repetitions per page axis.
pub const MAX_DENSITY: u32 = 200;

/// What the watermark tile is generated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Text rendered with a resolved font.
    Text,
    /// A raster image file used as-is.
    Image,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Image => f.write_str("image"),
        }
    }
}

/// Straight-alpha RGBA color. Serialised as a 4-element array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u8; 4]", into = "[u8; 4]")]
pub struct RgbaColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// Base opacity of the glyph fill.
    pub a: u8,
}

impl RgbaColor {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl From<[u8; 4]> for RgbaColor {
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Self { r, g, b, a }
    }
}

impl From<RgbaColor> for [u8; 4] {
    fn from(color: RgbaColor) -> Self {
        color.to_array()
    }
}

impl FromStr for RgbaColor {
    type Err = StempelError;

    /// Parse `r,g,b,a` (whitespace and surrounding parentheses tolerated).
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_start_matches('(').trim_end_matches(')');
        let parts: Vec<&str> = trimmed.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(StempelError::InvalidConfig(format!(
                "color must have 4 components (r,g,b,a), got {:?}",
                s
            )));
        }
        let mut components = [0u8; 4];
        for (slot, part) in components.iter_mut().zip(&parts) {
            *slot = part.parse::<u8>().map_err(|_| {
                StempelError::InvalidConfig(format!(
                    "color component {:?} is not an integer in 0..=255",
                    part
                ))
            })?;
        }
        Ok(Self::from(components))
    }
}

/// How the tile is laid out on each page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkMode {
    /// Repeat the tile across a fixed grid of rows and columns.
    #[default]
    Grid,
    /// Place a single tile at an anchor.
    Insert,
}

impl FromStr for WatermarkMode {
    type Err = StempelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grid" => Ok(Self::Grid),
            "insert" => Ok(Self::Insert),
            other => Err(StempelError::InvalidConfig(format!(
                "watermark type must be `grid` or `insert`, got {:?}",
                other
            ))),
        }
    }
}

/// Which edge of the tile the insert anchor refers to horizontally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalAlignment {
    Left,
    #[default]
    Center,
    Right,
}

impl FromStr for HorizontalAlignment {
    type Err = StempelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "center" | "centre" => Ok(Self::Center),
            "right" => Ok(Self::Right),
            other => Err(StempelError::InvalidConfig(format!(
                "horizontal alignment must be left, center or right, got {:?}",
                other
            ))),
        }
    }
}

/// Anchor for insert mode, as fractions of the page size measured from the
/// top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InsertAnchor {
    pub x: f32,
    pub y: f32,
    pub alignment: HorizontalAlignment,
}

impl Default for InsertAnchor {
    fn default() -> Self {
        Self {
            x: 0.5,
            y: 0.5,
            alignment: HorizontalAlignment::Center,
        }
    }
}

/// Placement parameters shared by every page of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridParams {
    pub mode: WatermarkMode,
    /// Tile repetitions across the page width.
    pub horizontal_count: u32,
    /// Tile repetitions down the page height.
    pub vertical_count: u32,
    /// Counter-clockwise rotation applied to each tile. Wraps at 360.
    pub angle_degrees: f32,
    /// Multiplied into the tile's own alpha.
    pub opacity: f32,
    /// Multiplier on tile dimensions.
    pub scale: f32,
    /// Only used in insert mode.
    pub anchor: InsertAnchor,
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            mode: WatermarkMode::Grid,
            horizontal_count: 3,
            vertical_count: 6,
            angle_degrees: 45.0,
            opacity: 0.2,
            scale: 1.0,
            anchor: InsertAnchor::default(),
        }
    }
}

impl GridParams {
    /// Grid layout with the given density, upright, fully opaque, unscaled.
    pub fn grid(horizontal_count: u32, vertical_count: u32) -> Self {
        Self {
            mode: WatermarkMode::Grid,
            horizontal_count,
            vertical_count,
            angle_degrees: 0.0,
            opacity: 1.0,
            scale: 1.0,
            anchor: InsertAnchor::default(),
        }
    }

    /// Single placement at `anchor`, upright, fully opaque, unscaled.
    pub fn insert(anchor: InsertAnchor) -> Self {
        Self {
            mode: WatermarkMode::Insert,
            horizontal_count: 1,
            vertical_count: 1,
            anchor,
            ..Self::grid(1, 1)
        }
    }

    pub fn with_angle(mut self, degrees: f32) -> Self {
        self.angle_degrees = degrees;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Rotation folded into `[0, 360)`.
    pub fn normalized_angle(&self) -> f32 {
        let wrapped = self.angle_degrees.rem_euclid(360.0);
        // rem_euclid can round up to exactly 360.0 for tiny negative inputs.
        if wrapped >= 360.0 { 0.0 } else { wrapped }
    }

    /// Number of tile instances drawn per page.
    pub fn placements_per_page(&self) -> usize {
        match self.mode {
            WatermarkMode::Grid => self.horizontal_count as usize * self.vertical_count as usize,
            WatermarkMode::Insert => 1,
        }
    }

    /// Reject out-of-range values before any rendering happens.
    pub fn validate(&self) -> Result<()> {
        if self.mode == WatermarkMode::Grid {
            for (name, count) in [
                ("horizontal", self.horizontal_count),
                ("vertical", self.vertical_count),
            ] {
                if count == 0 || count > MAX_DENSITY {
                    return Err(StempelError::InvalidConfig(format!(
                        "{} box count must be in 1..={}, got {}",
                        name, MAX_DENSITY, count
                    )));
                }
            }
        }
        if !self.angle_degrees.is_finite() {
            return Err(StempelError::InvalidConfig(format!(
                "angle must be finite, got {}",
                self.angle_degrees
            )));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(StempelError::InvalidConfig(format!(
                "opacity must be within 0.0..=1.0, got {}",
                self.opacity
            )));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(StempelError::InvalidConfig(format!(
                "image scale must be a positive number, got {}",
                self.scale
            )));
        }
        if self.mode == WatermarkMode::Insert {
            for (name, value) in [("x", self.anchor.x), ("y", self.anchor.y)] {
                if !(0.0..=1.0).contains(&value) {
                    return Err(StempelError::InvalidConfig(format!(
                        "insert anchor {} must be within 0.0..=1.0, got {}",
                        name, value
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Size of one page as displayed, in the document's native unit (PDF points).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageCanvas {
    /// 1-based page number within its document.
    pub page_number: u32,
    pub width: f32,
    pub height: f32,
}

impl PageCanvas {
    pub fn new(page_number: u32, width: f32, height: f32) -> Self {
        Self {
            page_number,
            width,
            height,
        }
    }

    /// Whether both dimensions are finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// What to do when one page of a document fails to composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Abort the document on the first page failure.
    Strict,
    /// Leave failing pages unwatermarked and report them.
    #[default]
    BestEffort,
}

/// Supported input document types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    Pdf,
    Markdown,
    Html,
    PlainText,
    Png,
    Jpeg,
}

impl DocumentType {
    /// MIME type string, used in log fields and error messages.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Markdown => "text/markdown",
            Self::Html => "text/html",
            Self::PlainText => "text/plain",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    /// Infer document type from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "md" | "markdown" => Some(Self::Markdown),
            "html" | "htm" => Some(Self::Html),
            "txt" => Some(Self::PlainText),
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    /// Infer document type from a path's extension.
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// Paper sizes for documents the engine creates itself (text and image inputs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaperSize {
    #[default]
    A4,
    A3,
    A5,
    Letter,
    Legal,
}

impl PaperSize {
    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A3 => (297, 420),
            Self::A5 => (148, 210),
            Self::Letter => (216, 279),
            Self::Legal => (216, 356),
        }
    }
}
