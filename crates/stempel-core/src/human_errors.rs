// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the batch report.
//
// Every technical error is mapped to a plain sentence with a concrete next
// step. Severity drives how the CLI prints the line and whether a rerun is
// worth suggesting.

use crate::error::StempelError;

/// Severity of an error from the operator's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Rerunning may succeed (I/O hiccup, interrupted run).
    Transient,
    /// The operator must change something (config, font, input file).
    ActionRequired,
    /// Cannot be fixed by retrying: broken or unsupported input.
    Permanent,
}

/// A human-readable error with a plain message and an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    pub message: String,
    pub suggestion: String,
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `StempelError` into a `HumanError` for the batch report.
pub fn humanize_error(err: &StempelError) -> HumanError {
    match err {
        StempelError::FontNotFound { .. } => HumanError {
            message: "No font could be loaded for the watermark text.".into(),
            suggestion: "Point WATERMARK_FONT (or --font) at a .ttf/.otf/.ttc file that covers your text.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        StempelError::EmptyWatermark => HumanError {
            message: "The watermark text is empty.".into(),
            suggestion: "Provide some visible text, or switch to an image watermark.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        StempelError::InvalidConfig(detail) => HumanError {
            message: "The watermark settings are out of range.".into(),
            suggestion: format!("Fix the setting and run again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        StempelError::InvalidCanvas { width, height } => HumanError {
            message: "A page in this document has no usable size.".into(),
            suggestion: format!("The page reports {width}x{height}; re-export the document and try again."),
            retriable: false,
            severity: Severity::Permanent,
        },

        StempelError::CompositeFailure { page, reason } => HumanError {
            message: format!("Page {page} could not be watermarked."),
            suggestion: format!("Check that page in the source document. ({reason})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        StempelError::UnsupportedDocument(detail) => HumanError {
            message: "This type of document isn't supported.".into(),
            suggestion: format!("Convert it to PDF first, or configure a renderer command. (File type: {detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        StempelError::PdfError(_) => HumanError {
            message: "There's a problem with this PDF file.".into(),
            suggestion: "The file may be damaged or encrypted. Open it in a viewer to check, or re-export it.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        StempelError::ImageError(_) => HumanError {
            message: "There's a problem with an image.".into(),
            suggestion: "The image may be damaged or in an unusual format. Save it as PNG and try again.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        StempelError::RenderFailed(detail) => HumanError {
            message: "The document could not be converted to PDF.".into(),
            suggestion: format!("Check the renderer command and its output. ({detail})"),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        StempelError::Cancelled => HumanError {
            message: "The run was stopped before this file was processed.".into(),
            suggestion: "Run again to process the remaining files.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        StempelError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "A file or folder couldn't be found.".into(),
                    suggestion: "Check the input/output paths and the watermark image path.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "Permission denied while reading or writing a file.".into(),
                    suggestion: "Check the permissions of the input and output folders.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, the disk may be full.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        StempelError::Serialization(_) => HumanError {
            message: "The configuration file could not be read.".into(),
            suggestion: "Check that it is valid JSON with the documented keys.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
    }
}
