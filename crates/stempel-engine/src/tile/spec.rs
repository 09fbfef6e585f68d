// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// What a tile is made of. Immutable once built.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use stempel_core::error::{Result, StempelError};
use stempel_core::{RgbaColor, SourceKind};

use crate::font::FontHandle;

/// Description of a watermark tile, validated at construction.
///
/// Text specs always carry a font, so a text tile can never be generated
/// without one. There are no setters; build a new spec to change anything.
#[derive(Debug, Clone)]
pub struct WatermarkSpec {
    source_kind: SourceKind,
    text: Option<String>,
    source_image_path: Option<PathBuf>,
    font: Option<FontHandle>,
    font_size_pt: f32,
    color: RgbaColor,
    padding_px: u32,
}

impl WatermarkSpec {
    /// A text watermark. `color.a` is the base opacity of the glyph fill.
    pub fn text(
        text: impl Into<String>,
        font: FontHandle,
        font_size_pt: f32,
        color: RgbaColor,
        padding_px: u32,
    ) -> Result<Self> {
        if !font_size_pt.is_finite() || font_size_pt <= 0.0 {
            return Err(StempelError::InvalidConfig(format!(
                "font size must be a positive number, got {}",
                font_size_pt
            )));
        }
        Ok(Self {
            source_kind: SourceKind::Text,
            text: Some(text.into()),
            source_image_path: None,
            font: Some(font),
            font_size_pt,
            color,
            padding_px,
        })
    }

    /// An image watermark, used at the image's native size.
    pub fn image(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(StempelError::InvalidConfig(
                "watermark image path is empty".into(),
            ));
        }
        Ok(Self {
            source_kind: SourceKind::Image,
            text: None,
            source_image_path: Some(path),
            font: None,
            font_size_pt: 0.0,
            color: RgbaColor::new(0, 0, 0, 0),
            padding_px: 0,
        })
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source_kind
    }

    pub fn text_content(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn source_image_path(&self) -> Option<&Path> {
        self.source_image_path.as_deref()
    }

    pub fn font(&self) -> Option<&FontHandle> {
        self.font.as_ref()
    }

    pub fn font_size_pt(&self) -> f32 {
        self.font_size_pt
    }

    pub fn color(&self) -> RgbaColor {
        self.color
    }

    pub fn padding_px(&self) -> u32 {
        self.padding_px
    }

    /// Hex SHA-256 over everything that affects the rendered pixels at
    /// `density` pixels per unit.
    pub fn cache_key(&self, density: f32) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.source_kind.to_string().as_bytes());
        hasher.update([0u8]);
        if let Some(text) = &self.text {
            hasher.update(text.as_bytes());
        }
        hasher.update([0u8]);
        if let Some(font) = &self.font {
            hasher.update(font.digest().as_bytes());
        }
        hasher.update([0u8]);
        if let Some(path) = &self.source_image_path {
            hasher.update(path.to_string_lossy().as_bytes());
        }
        hasher.update([0u8]);
        hasher.update(self.font_size_pt.to_le_bytes());
        hasher.update(self.color.to_array());
        hasher.update(self.padding_px.to_le_bytes());
        hasher.update(density.to_le_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontHandle;
    use crate::font::tests::{fixture_font, fixture_font_path};

    #[test]
    fn rejects_non_positive_font_size() {
        for size in [0.0, -3.0, f32::NAN, f32::INFINITY] {
            let result = WatermarkSpec::text("x", fixture_font(), size, RgbaColor::new(0, 0, 0, 255), 0);
            assert!(matches!(result, Err(StempelError::InvalidConfig(_))), "size {size}");
        }
    }

    #[test]
    fn image_spec_requires_a_path() {
        assert!(WatermarkSpec::image("").is_err());
        let spec = WatermarkSpec::image("logo.png").unwrap();
        assert_eq!(spec.source_kind(), SourceKind::Image);
        assert!(spec.font().is_none());
    }

    #[test]
    fn cache_key_tracks_every_input() {
        let color = RgbaColor::new(68, 68, 68, 220);
        let base = WatermarkSpec::text("CONFIDENTIAL", fixture_font(), 36.0, color, 20).unwrap();
        let same = WatermarkSpec::text("CONFIDENTIAL", fixture_font(), 36.0, color, 20).unwrap();
        let other_text = WatermarkSpec::text("DRAFT", fixture_font(), 36.0, color, 20).unwrap();
        let other_pad = WatermarkSpec::text("CONFIDENTIAL", fixture_font(), 36.0, color, 21).unwrap();

        assert_eq!(base.cache_key(1.0), same.cache_key(1.0));
        assert_eq!(base.cache_key(1.0).len(), 64);
        assert_ne!(base.cache_key(1.0), other_text.cache_key(1.0));
        assert_ne!(base.cache_key(1.0), other_pad.cache_key(1.0));
        assert_ne!(base.cache_key(1.0), base.cache_key(2.0));
    }

    #[test]
    fn cache_key_follows_font_contents_not_path() {
        let color = RgbaColor::new(68, 68, 68, 220);
        let bytes = std::fs::read(fixture_font_path()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let copy = dir.path().join("copy.ttf");
        std::fs::write(&copy, &bytes).unwrap();

        let original = WatermarkSpec::text("A", fixture_font(), 36.0, color, 0).unwrap();
        let copied =
            WatermarkSpec::text("A", FontHandle::load(&copy).unwrap(), 36.0, color, 0).unwrap();
        assert_eq!(original.cache_key(1.0), copied.cache_key(1.0));

        let mut changed = bytes.clone();
        changed.extend_from_slice(&[0, 0, 0, 0]);
        let replaced = WatermarkSpec::text(
            "A",
            FontHandle::from_bytes(changed, fixture_font_path()).unwrap(),
            36.0,
            color,
            0,
        )
        .unwrap();
        assert_ne!(original.cache_key(1.0), replaced.cache_key(1.0));
    }
}
