// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch orchestration: watermark every document in a directory.
//
// Each file is rendered to PDF, watermarked and written to the output
// directory. A failing file is recorded and the batch moves on; only
// invalid parameters or an unusable output directory stop the run.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use stempel_core::error::{Result, StempelError};
use stempel_core::{DocumentType, GridParams};
use tracing::{info, instrument, warn};

use crate::pdf::{PageApplier, PdfSource};
use crate::render::DocumentRenderer;
use crate::tile::Tile;

/// Cooperative stop flag shared between the caller and a running batch.
///
/// Checked before each document; a document already in progress finishes.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What happened to one successfully written document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSummary {
    pub pages: usize,
    /// Pages left unwatermarked under the best-effort policy.
    pub failed_pages: Vec<u32>,
}

/// Result of one input file.
#[derive(Debug)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub result: Result<DocumentSummary>,
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }
}

/// Supported documents directly inside `dir`, sorted by path.
pub fn collect_inputs(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let mut inputs: Vec<PathBuf> = fs::read_dir(dir.as_ref())?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && DocumentType::from_path(path).is_some())
        .collect();
    inputs.sort();
    Ok(inputs)
}

/// Renders, watermarks and writes a list of documents.
pub struct BatchOrchestrator {
    renderer: Box<dyn DocumentRenderer>,
    applier: PageApplier,
}

impl BatchOrchestrator {
    pub fn new(renderer: Box<dyn DocumentRenderer>, applier: PageApplier) -> Self {
        Self { renderer, applier }
    }

    /// Watermark `inputs` into `output_dir`, one outcome per input, in order.
    ///
    /// `<output_dir>/<stem>.pdf` is the output path; inputs sharing a stem
    /// get `_1`, `_2`, ... suffixes instead of overwriting each other.
    #[instrument(skip_all, fields(inputs = inputs.len(), output_dir = %output_dir.display()))]
    pub fn run(
        &self,
        inputs: &[PathBuf],
        output_dir: &Path,
        tile: &Tile,
        params: &GridParams,
        cancel: &CancellationToken,
    ) -> Result<BatchReport> {
        params.validate()?;
        fs::create_dir_all(output_dir)?;

        let mut report = BatchReport::default();
        let mut claimed: HashSet<PathBuf> = HashSet::new();

        for input in inputs {
            if cancel.is_cancelled() {
                report.outcomes.push(FileOutcome {
                    input: input.clone(),
                    output: None,
                    result: Err(StempelError::Cancelled),
                });
                continue;
            }

            let output = output_path(output_dir, input, &mut claimed);
            let result = self.process(input, &output, tile, params);
            match &result {
                Ok(summary) => info!(
                    input = %input.display(),
                    output = %output.display(),
                    pages = summary.pages,
                    failed_pages = summary.failed_pages.len(),
                    "Document watermarked"
                ),
                Err(err) => warn!(input = %input.display(), %err, "Document failed"),
            }
            let output = result.is_ok().then_some(output);
            report.outcomes.push(FileOutcome {
                input: input.clone(),
                output,
                result,
            });
        }

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Batch finished"
        );
        Ok(report)
    }

    fn process(
        &self,
        input: &Path,
        output: &Path,
        tile: &Tile,
        params: &GridParams,
    ) -> Result<DocumentSummary> {
        let kind = DocumentType::from_path(input).ok_or_else(|| {
            StempelError::UnsupportedDocument(input.display().to_string())
        })?;
        if same_file(input, output) {
            return Err(StempelError::InvalidConfig(format!(
                "output {} would overwrite its input",
                output.display()
            )));
        }

        let bytes = self.renderer.render(input, kind)?;
        let source = PdfSource::from_bytes(&bytes)?;
        let mut watermarked = self.applier.apply(&source, tile, params)?;
        watermarked.save(output)?;

        Ok(DocumentSummary {
            pages: watermarked.page_count(),
            failed_pages: watermarked.failures().iter().map(|f| f.page).collect(),
        })
    }
}

fn output_path(output_dir: &Path, input: &Path, claimed: &mut HashSet<PathBuf>) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".into());

    let mut candidate = output_dir.join(format!("{}.pdf", stem));
    let mut counter = 1;
    while claimed.contains(&candidate) {
        candidate = output_dir.join(format!("{}_{}.pdf", stem, counter));
        counter += 1;
    }
    claimed.insert(candidate.clone());
    candidate
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
