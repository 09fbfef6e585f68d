// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Stempel.

use thiserror::Error;

/// Top-level error type for all Stempel operations.
#[derive(Debug, Error)]
pub enum StempelError {
    // -- Watermark generation --
    #[error("no usable font found ({tried} candidates tried, no loadable override)")]
    FontNotFound { tried: usize },

    #[error("watermark text renders to an empty image")]
    EmptyWatermark,

    // -- Compositing --
    #[error("invalid page canvas {width}x{height}: dimensions must be positive")]
    InvalidCanvas { width: f32, height: f32 },

    #[error("invalid watermark configuration: {0}")]
    InvalidConfig(String),

    #[error("compositing page {page} failed: {reason}")]
    CompositeFailure { page: u32, reason: String },

    // -- Documents --
    #[error("unsupported document type: {0}")]
    UnsupportedDocument(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("document rendering failed: {0}")]
    RenderFailed(String),

    #[error("batch cancelled before this document was processed")]
    Cancelled,

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StempelError {
    /// Page number this error refers to, if it is a per-page failure.
    pub fn page(&self) -> Option<u32> {
        match self {
            Self::CompositeFailure { page, .. } => Some(*page),
            _ => None,
        }
    }

    /// Whether the error was raised by parameter validation, before any page
    /// was touched.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig(_) | Self::EmptyWatermark | Self::FontNotFound { .. }
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, StempelError>;
