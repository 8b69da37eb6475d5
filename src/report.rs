//! Per-document and per-page records produced by a run.
//!
//! These are plain data: created as the driver walks the pipeline and
//! returned inside [`RunReport`] so callers (and the CLI's `--json` mode)
//! can inspect exactly what happened to every artifact. Identity of a
//! document is its source path; the entity survives even when its backing
//! file is deleted per the retention policy.

use crate::error::StepError;
use crate::tracker::RunSummary;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Final classification of one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentOutcome {
    /// At least one page, and every page produced text.
    Success,
    /// Some pages produced text, some did not.
    Partial,
    /// Rasterisation produced zero pages.
    Failed,
}

/// One rasterised page and what became of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    /// 0-based page index within the document.
    pub index: usize,
    /// Where the rasteriser wrote the page image.
    pub image_path: PathBuf,
    /// The text artifact, when one still exists on disk. `None` when OCR
    /// failed, and also after a successful aggregate append removed it.
    pub text_path: Option<PathBuf>,
    /// Whether the expected text artifact existed after OCR ran. This is
    /// the artifact-existence check, not the tool's exit status.
    pub ocr_succeeded: bool,
    /// Whether the page image was removed per the retention policy.
    pub image_deleted: bool,
    /// Set when OCR succeeded but the aggregate append failed; the page
    /// counts as failed and its temporary text file is preserved.
    pub aggregation_failed: bool,
}

impl PageRecord {
    pub fn new(index: usize, image_path: PathBuf) -> Self {
        Self {
            index,
            image_path,
            text_path: None,
            ocr_succeeded: false,
            image_deleted: false,
            aggregation_failed: false,
        }
    }

    /// A page succeeded when OCR produced text and, in aggregation mode,
    /// the text made it into the aggregate file.
    pub fn succeeded(&self) -> bool {
        self.ocr_succeeded && !self.aggregation_failed
    }
}

/// Everything that happened to one discovered document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Source path; the document's identity.
    pub path: PathBuf,
    /// File stem, used to name page images and text artifacts.
    pub stem: String,
    /// Pages in ascending page-index order.
    pub pages: Vec<PageRecord>,
    /// Whether the source PDF was removed per the retention policy.
    pub pdf_deleted: bool,
    pub outcome: DocumentOutcome,
    /// Errors recorded while processing this document.
    pub errors: Vec<StepError>,
}

impl DocumentRecord {
    /// Classify from the page set: zero pages is `Failed`, all pages
    /// succeeded is `Success`, anything else is `Partial`.
    pub fn classify(pages: &[PageRecord]) -> DocumentOutcome {
        if pages.is_empty() {
            DocumentOutcome::Failed
        } else if pages.iter().all(PageRecord::succeeded) {
            DocumentOutcome::Success
        } else {
            DocumentOutcome::Partial
        }
    }
}

/// The full result of one run: per-document detail plus the summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub documents: Vec<DocumentRecord>,
    pub summary: RunSummary,
}
