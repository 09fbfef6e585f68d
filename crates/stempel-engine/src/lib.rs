// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// stempel-engine: the watermarking pipeline.
//
// Resolves a font, renders the watermark tile, composites it into a
// per-page overlay raster and embeds that overlay into each page of a PDF.
// Non-PDF inputs are turned into PDFs first; the batch layer runs the whole
// pipeline over a directory of documents.

pub mod batch;
pub mod composite;
pub mod font;
pub mod image;
pub mod pdf;
pub mod render;
pub mod session;
pub mod tile;

// Re-export the primary types so callers can use `stempel_engine::PageApplier` etc.
pub use batch::{BatchOrchestrator, BatchReport, CancellationToken, FileOutcome, collect_inputs};
pub use composite::{GridCompositor, OverlayLayer};
pub use font::{FontHandle, FontResolver, resolve_font};
pub use image::TileProcessor;
pub use pdf::{PageApplier, PdfSource, PdfWriter, WatermarkedDocument};
pub use render::{BuiltinRenderer, CommandRenderer, DocumentRenderer};
pub use session::WatermarkSession;
pub use tile::{Tile, TileCache, TileGenerator, WatermarkSpec};
