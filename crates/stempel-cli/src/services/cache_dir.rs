// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-aware tile cache directory resolution.

use std::path::PathBuf;

/// Return the tile cache directory. The engine creates it on first store.
pub fn tile_cache_dir() -> PathBuf {
    resolve(
        std::env::var("XDG_CACHE_HOME").ok(),
        std::env::var("HOME").ok(),
    )
}

fn resolve(xdg_cache_home: Option<String>, home: Option<String>) -> PathBuf {
    // Try XDG cache dir, then fallback to home
    let base = match (xdg_cache_home, home) {
        (Some(xdg), _) if !xdg.is_empty() => PathBuf::from(xdg),
        (_, Some(home)) if !home.is_empty() => PathBuf::from(home).join(".cache"),
        // Last resort
        _ => std::env::temp_dir(),
    };
    base.join("stempel").join("tiles")
}
