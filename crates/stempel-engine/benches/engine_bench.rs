// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the compositing hot path: one letter-size overlay
// with the default 3x6 rotated grid, at screen and print resolution.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{Rgba, RgbaImage};

use stempel_core::{GridParams, PageCanvas};
use stempel_engine::{GridCompositor, Tile};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// A 180x40 tile standing in for a rendered text watermark.
fn synthetic_tile() -> Tile {
    let mut img = RgbaImage::from_pixel(180, 40, Rgba([0, 0, 0, 0]));
    for y in 8..32 {
        for x in 10..170 {
            img.put_pixel(x, y, Rgba([68, 68, 68, 220]));
        }
    }
    Tile::new(img)
}

fn bench_composite_overlay(c: &mut Criterion) {
    let tile = synthetic_tile();
    let params = GridParams::default();
    let canvas = PageCanvas::new(1, 612.0, 792.0);

    for resolution in [1.0f32, 2.0] {
        let Ok(compositor) = GridCompositor::with_resolution(resolution) else {
            continue;
        };
        c.bench_function(&format!("composite_overlay letter @{}x", resolution), |b| {
            b.iter(|| {
                let layer = compositor
                    .composite_overlay(black_box(&tile), &params, &canvas)
                    .expect("composite");
                black_box(layer.placements());
            });
        });
    }
}

fn bench_prepared_reuse(c: &mut Criterion) {
    let tile = synthetic_tile();
    let params = GridParams::default();
    let canvas = PageCanvas::new(1, 612.0, 792.0);
    let compositor = GridCompositor::new();
    let prepared = compositor.prepare(&tile, &params).expect("prepare");

    c.bench_function("composite_prepared letter @1x", |b| {
        b.iter(|| {
            let layer = compositor
                .composite_prepared(black_box(&prepared), &params, &canvas)
                .expect("composite");
            black_box(layer.placements());
        });
    });
}

criterion_group!(benches, bench_composite_overlay, bench_prepared_reuse);
criterion_main!(benches);
