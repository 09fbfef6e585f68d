// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// On-disk tile cache. Tiles are stored as lossless PNG keyed by the spec's
// content hash, so a hit is bit-identical to a fresh render.

use std::fs;
use std::path::{Path, PathBuf};

use stempel_core::error::Result;
use tracing::{debug, info, warn};

use super::{Tile, WatermarkSpec};

/// Longest sanitised text prefix used in a cache file name.
const MAX_NAME_CHARS: usize = 80;

/// Length of the hash suffix in a cache file name.
const HASH_CHARS: usize = 16;

#[derive(Debug, Clone)]
pub struct TileCache {
    dir: PathBuf,
}

impl TileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<sanitised text>_<hash16>.png` inside the cache directory.
    pub fn path_for(&self, spec: &WatermarkSpec, density: f32) -> PathBuf {
        let key = spec.cache_key(density);
        let stem = sanitise(spec.text_content().unwrap_or("image"));
        self.dir
            .join(format!("{}_{}.png", stem, &key[..HASH_CHARS]))
    }

    /// The cached tile for `spec`, if present and decodable.
    pub fn load(&self, spec: &WatermarkSpec, density: f32) -> Option<Tile> {
        let path = self.path_for(spec, density);
        let bytes = fs::read(&path).ok()?;
        match image::load_from_memory_with_format(&bytes, image::ImageFormat::Png) {
            Ok(decoded) => {
                debug!(path = %path.display(), "Tile cache hit");
                Some(Tile::with_density(decoded.to_rgba8(), density))
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "Ignoring unreadable cached tile");
                None
            }
        }
    }

    /// Store `tile`. Failures are logged and otherwise ignored.
    pub fn store(&self, spec: &WatermarkSpec, tile: &Tile) {
        let path = self.path_for(spec, tile.density());
        let result = fs::create_dir_all(&self.dir)
            .map_err(Into::into)
            .and_then(|()| tile.save(&path));
        match result {
            Ok(()) => debug!(path = %path.display(), "Tile cached"),
            Err(err) => warn!(path = %path.display(), %err, "Could not cache tile"),
        }
    }

    /// Delete every cached tile. Returns how many files were removed.
    pub fn purge(&self) -> Result<usize> {
        if !self.dir.is_dir() {
            return Ok(0);
        }
        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_png = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
            if path.is_file() && is_png {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        info!(removed, dir = %self.dir.display(), "Tile cache purged");
        Ok(removed)
    }
}

/// Keep alphanumerics, `_` and `-`; whitespace runs become one `_`; anything
/// else becomes `_`.
fn sanitise(text: &str) -> String {
    let mut out = String::new();
    let mut in_space = false;
    for ch in text.trim().chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        if ch.is_alphanumeric() || ch == '_' || ch == '-' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    let mut out: String = out.chars().take(MAX_NAME_CHARS).collect();
    if out.is_empty() {
        out.push_str("watermark");
    }
    out
}
