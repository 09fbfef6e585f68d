// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rendering boundary: every input document becomes PDF bytes before it is
// watermarked.
//
// PDFs pass through untouched. Plain text and images are laid out with
// `PdfWriter`. Markdown and HTML need an external renderer (a headless
// browser, pandoc, ...), configured as a command template.

use std::fs;
use std::path::Path;
use std::process::Command;

use stempel_core::error::{Result, StempelError};
use stempel_core::{DocumentType, PaperSize};
use tracing::{debug, info, instrument};

use crate::pdf::PdfWriter;

const INPUT_PLACEHOLDER: &str = "{input}";
const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Produces PDF bytes for an input document.
///
/// Only the page count and page sizes of the result matter downstream.
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, input: &Path, kind: DocumentType) -> Result<Vec<u8>>;
}

/// In-process renderer for PDF, plain text, PNG and JPEG inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinRenderer {
    writer: PdfWriter,
}

impl BuiltinRenderer {
    pub fn new(paper_size: PaperSize) -> Self {
        Self {
            writer: PdfWriter::new(paper_size),
        }
    }
}

impl DocumentRenderer for BuiltinRenderer {
    #[instrument(skip(self, input, kind), fields(input = %input.display(), mime = kind.mime_type()))]
    fn render(&self, input: &Path, kind: DocumentType) -> Result<Vec<u8>> {
        match kind {
            DocumentType::Pdf => Ok(fs::read(input)?),
            DocumentType::PlainText => {
                let bytes = fs::read(input)?;
                self.writer.text_to_pdf(&String::from_utf8_lossy(&bytes))
            }
            DocumentType::Png | DocumentType::Jpeg => self.writer.image_to_pdf(&fs::read(input)?),
            DocumentType::Markdown | DocumentType::Html => Err(StempelError::UnsupportedDocument(
                format!("{} needs an external renderer", kind.mime_type()),
            )),
        }
    }
}

/// Renders Markdown and HTML through an external program; everything else
/// goes to the [`BuiltinRenderer`].
///
/// The template is split on whitespace; `{input}` and `{output}` in any
/// argument are replaced with the source file and a temporary PDF path, e.g.
/// `pandoc {input} -o {output}`.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: String,
    args: Vec<String>,
    fallback: BuiltinRenderer,
}

impl CommandRenderer {
    pub fn from_template(template: &str, fallback: BuiltinRenderer) -> Result<Self> {
        let mut parts = template.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or_else(|| {
            StempelError::InvalidConfig("renderer command is empty".into())
        })?;
        let args: Vec<String> = parts.collect();

        for placeholder in [INPUT_PLACEHOLDER, OUTPUT_PLACEHOLDER] {
            if !args.iter().any(|arg| arg.contains(placeholder)) {
                return Err(StempelError::InvalidConfig(format!(
                    "renderer command must contain {}",
                    placeholder
                )));
            }
        }
        Ok(Self {
            program,
            args,
            fallback,
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn run(&self, input: &Path) -> Result<Vec<u8>> {
        let workdir = tempfile::tempdir()?;
        let output = workdir.path().join("rendered.pdf");
        let input_arg = input.to_string_lossy();
        let output_arg = output.to_string_lossy();

        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                arg.replace(INPUT_PLACEHOLDER, &input_arg)
                    .replace(OUTPUT_PLACEHOLDER, &output_arg)
            })
            .collect();

        info!(program = %self.program, "Running external renderer");
        let result = Command::new(&self.program).args(&args).output().map_err(|err| {
            StempelError::RenderFailed(format!("could not start {}: {}", self.program, err))
        })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(StempelError::RenderFailed(format!(
                "{} exited with {}: {}",
                self.program,
                result.status,
                stderr.trim()
            )));
        }

        let bytes = fs::read(&output).map_err(|err| {
            StempelError::RenderFailed(format!("{} produced no output: {}", self.program, err))
        })?;
        debug!(bytes = bytes.len(), "External renderer finished");
        Ok(bytes)
    }
}

impl DocumentRenderer for CommandRenderer {
    fn render(&self, input: &Path, kind: DocumentType) -> Result<Vec<u8>> {
        match kind {
            DocumentType::Markdown | DocumentType::Html => self.run(input),
            _ => self.fallback.render(input, kind),
        }
    }
}
