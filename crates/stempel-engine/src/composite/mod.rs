// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Compositing: turn one tile into a per-page overlay layer.

pub mod blend;
pub mod compositor;
pub mod placement;

pub use compositor::{
    GridCompositor, MAX_OVERLAY_PIXELS, MAX_TILE_PIXELS, OverlayLayer, PreparedTile,
};
pub use placement::{Placement, placement_centers};
