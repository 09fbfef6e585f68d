// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Where tile instances go on a page.
//
// Grid mode spreads a fixed number of instances over the page, so density
// is the same on every page size. Insert mode places one instance at an
// anchor expressed as page fractions.

use stempel_core::{GridParams, HorizontalAlignment, WatermarkMode};

/// Center point of one tile instance, in overlay pixels (origin top-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
}

impl Placement {
    /// Top-left corner of a `width` x `height` tile centered here.
    pub fn top_left(&self, width: u32, height: u32) -> (i64, i64) {
        (
            (self.x - width as f32 / 2.0).round() as i64,
            (self.y - height as f32 / 2.0).round() as i64,
        )
    }
}

/// Tile centers for one page of `width` x `height`.
///
/// `tile_width` is the width of the (rotated) tile and only matters for
/// insert mode, where the anchor may refer to the tile's left or right edge.
///
/// Grid mode yields `horizontal_count * vertical_count` centers at
/// `(step_x * (i + 0.5), step_y * (j + 0.5))`, row by row. Insert mode
/// yields exactly one.
pub fn placement_centers(
    params: &GridParams,
    width: f32,
    height: f32,
    tile_width: f32,
) -> Vec<Placement> {
    match params.mode {
        WatermarkMode::Grid => {
            let columns = params.horizontal_count;
            let rows = params.vertical_count;
            let step_x = width / columns as f32;
            let step_y = height / rows as f32;

            let mut centers = Vec::with_capacity(columns as usize * rows as usize);
            for row in 0..rows {
                for column in 0..columns {
                    centers.push(Placement {
                        x: step_x * (column as f32 + 0.5),
                        y: step_y * (row as f32 + 0.5),
                    });
                }
            }
            centers
        }
        WatermarkMode::Insert => {
            let anchor_x = params.anchor.x * width;
            let x = match params.anchor.alignment {
                HorizontalAlignment::Left => anchor_x + tile_width / 2.0,
                HorizontalAlignment::Center => anchor_x,
                HorizontalAlignment::Right => anchor_x - tile_width / 2.0,
            };
            vec![Placement {
                x,
                y: params.anchor.y * height,
            }]
        }
    }
}
