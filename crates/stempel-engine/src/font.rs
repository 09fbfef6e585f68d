// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Font resolution: turn a prioritised list of font files (plus an optional
// override) into one loaded font handle.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use ab_glyph::FontArc;
use sha2::{Digest, Sha256};
use stempel_core::error::{Result, StempelError};
use tracing::{debug, info, instrument, warn};

/// A loaded font, cheap to clone and safe to share between worker threads.
#[derive(Clone)]
pub struct FontHandle {
    font: FontArc,
    source: PathBuf,
    /// Hex SHA-256 of the font file bytes.
    digest: String,
}

impl FontHandle {
    /// Load a TrueType/OpenType font (or the first face of a collection).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Self::from_bytes(std::fs::read(path)?, path)
    }

    /// Build a handle from font bytes already in memory. `source` is only
    /// used for logs; tile cache keys use the bytes.
    pub fn from_bytes(data: Vec<u8>, source: impl Into<PathBuf>) -> Result<Self> {
        let source = source.into();
        let digest = hex::encode(Sha256::digest(&data));
        let font = FontArc::try_from_vec(data).map_err(|err| {
            StempelError::InvalidConfig(format!("{} is not a usable font: {}", source.display(), err))
        })?;
        Ok(Self {
            font,
            source,
            digest,
        })
    }

    pub fn font(&self) -> &FontArc {
        &self.font
    }

    /// Path the font was loaded from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Content digest, identical for identical font files wherever they live.
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

impl fmt::Debug for FontHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontHandle")
            .field("source", &self.source)
            .field("digest", &self.digest)
            .finish()
    }
}

/// Resolve a font from an optional override and an ordered candidate list.
///
/// A loadable override wins without scanning. Otherwise the first candidate
/// that exists and parses is returned. There is no built-in fallback: when
/// nothing loads the caller gets [`StempelError::FontNotFound`] and decides
/// what to do about it.
#[instrument(skip(candidates), fields(candidates = candidates.len(), override_path = ?override_path))]
pub fn resolve_font(candidates: &[PathBuf], override_path: Option<&Path>) -> Result<FontHandle> {
    if let Some(path) = override_path {
        match FontHandle::load(path) {
            Ok(handle) => {
                info!(font = %path.display(), "Using font override");
                return Ok(handle);
            }
            Err(err) => {
                warn!(font = %path.display(), %err, "Font override not loadable, scanning candidates");
            }
        }
    }

    for candidate in candidates {
        if !candidate.is_file() {
            continue;
        }
        match FontHandle::load(candidate) {
            Ok(handle) => {
                info!(font = %candidate.display(), "Resolved font");
                return Ok(handle);
            }
            Err(err) => {
                debug!(font = %candidate.display(), %err, "Skipping unusable font candidate");
            }
        }
    }

    Err(StempelError::FontNotFound {
        tried: candidates.len(),
    })
}

/// Session-scoped resolver: resolves once, then hands out the cached handle.
pub struct FontResolver {
    candidates: Vec<PathBuf>,
    override_path: Option<PathBuf>,
    resolved: OnceLock<FontHandle>,
}

impl FontResolver {
    pub fn new(candidates: Vec<PathBuf>, override_path: Option<PathBuf>) -> Self {
        Self {
            candidates,
            override_path,
            resolved: OnceLock::new(),
        }
    }

    /// Resolver over [`default_font_candidates`] with the given override.
    pub fn with_default_candidates(override_path: Option<PathBuf>) -> Self {
        Self::new(default_font_candidates(), override_path)
    }

    /// The resolved font, probing the filesystem on first use only.
    ///
    /// Failures are not cached, so a later call tries the candidates again.
    pub fn handle(&self) -> Result<FontHandle> {
        if let Some(handle) = self.resolved.get() {
            return Ok(handle.clone());
        }
        let handle = resolve_font(&self.candidates, self.override_path.as_deref())?;
        // A concurrent caller may have won the race; either handle is fine.
        Ok(self.resolved.get_or_init(|| handle).clone())
    }
}

/// Conventional locations of CJK-capable fonts on Windows, macOS and Linux.
pub fn default_font_candidates() -> Vec<PathBuf> {
    [
        // Windows
        r"C:\Windows\Fonts\msyh.ttc",
        r"C:\Windows\Fonts\msyhbd.ttc",
        r"C:\Windows\Fonts\msyhl.ttc",
        r"C:\Windows\Fonts\simhei.ttf",
        r"C:\Windows\Fonts\simsun.ttc",
        r"C:\Windows\Fonts\simkai.ttf",
        r"C:\Windows\Fonts\simfang.ttf",
        r"C:\Windows\Fonts\SourceHanSansCN-Normal.otf",
        r"C:\Windows\Fonts\NotoSansCJK-Regular.ttc",
        r"C:\Windows\Fonts\AlibabaPuHuiTi-2-55-Regular.ttf",
        r"C:\Windows\Fonts\HarmonyOS_Sans_SC_Regular.ttf",
        // macOS
        "/System/Library/Fonts/PingFang.ttc",
        "/System/Library/Fonts/Hiragino Sans GB W3.ttc",
        "/Library/Fonts/Arial Unicode.ttf",
        // Linux
        "/usr/share/fonts/truetype/noto/NotoSansCJK-Regular.ttc",
        "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
        "/usr/share/fonts/opentype/noto/NotoSansCJKSC-Regular.otf",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect()
}
