//! The run driver: discovery → per-document processing → summary.
//!
//! ## State machine
//!
//! ```text
//! Init ─▶ Discover ─▶ (no files)  ─▶ Summarize ─▶ Done
//!                  └▶ (has files) ─▶ for each document:
//!                       Rasterize ─▶ (zero pages) ─▶ MarkFailed
//!                                 └▶ for each page: OCR ─▶ Route ─▶ Retain
//!                       Finalize
//!                     ─▶ Summarize ─▶ Done
//! ```
//!
//! After every recorded error the driver consults the error policy: under
//! `continue` it proceeds to the next unit of work; under `exit` it
//! returns [`RunError::Aborted`] immediately, so no further unit is
//! scheduled and the final summary is never emitted. Already-started
//! external processes are not interrupted — dropping the worker stream
//! stops polling their futures but the child processes run to completion.
//!
//! ## Concurrency
//!
//! Pages within a document are OCR'd through a bounded
//! `buffer_unordered` worker pool, then sorted back into page-index order
//! before any output routing. The driver alone owns the tracker and the
//! aggregator, so counters have a single point of mutation and aggregate
//! appends are serialised even when completions arrive out of order.

use crate::aggregate::Aggregator;
use crate::config::{OnError, RunConfig};
use crate::error::{RunError, StepError};
use crate::logsink::{LogSink, NullSink};
use crate::pipeline::ocr::{expected_text_path, TesseractRecognizer, TextRecognizer};
use crate::pipeline::raster::{MagickRasterizer, Rasterizer};
use crate::report::{DocumentOutcome, DocumentRecord, PageRecord, RunReport};
use crate::retention::{Disposition, FileKind, RetentionPolicy};
use crate::tracker::{RunTracker, RunSummary};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Execute one preprocessing run.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(RunReport)` on normal completion, even when documents failed
/// (check `report.summary`). The zero-documents case completes normally
/// with an all-zero summary.
///
/// # Errors
/// Returns `Err(RunError)` only for fatal conditions: the input directory
/// is missing, the aggregate file cannot be opened, or the first recorded
/// error under the `exit` policy ([`RunError::Aborted`], which skips the
/// summary).
pub async fn run(config: &RunConfig) -> Result<RunReport, RunError> {
    let mut driver = Driver::from_config(config);
    info!("Starting run over '{}'", config.input_dir.display());

    // ── Output directory ─────────────────────────────────────────────────
    driver.log(format!(
        "Directory '{}' check...",
        config.output_dir.display()
    ));
    if config.output_dir.is_dir() {
        driver.log(format!(
            "Directory '{}' already exists.",
            config.output_dir.display()
        ));
    } else {
        driver.log(format!(
            "Directory '{}' does not exist. Creating it now...",
            config.output_dir.display()
        ));
        if let Err(e) = std::fs::create_dir_all(&config.output_dir) {
            driver.note(StepError::DirectoryCreation {
                path: config.output_dir.clone(),
                detail: e.to_string(),
            })?;
        }
    }

    // ── Discovery ────────────────────────────────────────────────────────
    driver.log(format!(
        "Checking for PDF files in '{}'...",
        config.input_dir.display()
    ));
    let documents = discover_documents(&config.input_dir)?;
    if documents.is_empty() {
        driver.log(format!(
            "No PDF files found in '{}'.",
            config.input_dir.display()
        ));
        driver.log("No files to process.".to_string());
        let summary = driver.summarize();
        return Ok(RunReport {
            documents: Vec::new(),
            summary,
        });
    }
    debug!("Discovered {} documents", documents.len());

    // ── Aggregation ──────────────────────────────────────────────────────
    let mut aggregator = match &config.aggregate_file {
        Some(path) => Some(Aggregator::open(path).map_err(|source| {
            RunError::AggregateOpenFailed {
                path: path.clone(),
                source,
            }
        })?),
        None => None,
    };

    // ── Per-document processing ──────────────────────────────────────────
    let mut records = Vec::with_capacity(documents.len());
    for pdf in &documents {
        let record = driver
            .process_document(config, pdf, aggregator.as_mut())
            .await?;
        driver.tracker.record_document(&record.path, record.outcome);
        records.push(record);
    }

    // ── Summary ──────────────────────────────────────────────────────────
    let summary = driver.summarize();
    info!(
        "Run complete: {} succeeded, {} failed, {} errors",
        summary.success_count, summary.fail_count, summary.error_count
    );
    Ok(RunReport {
        documents: records,
        summary,
    })
}

/// Synchronous wrapper around [`run`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_sync(config: &RunConfig) -> Result<RunReport, RunError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| RunError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(run(config))
}

/// List `*.pdf` files (non-recursive, ASCII case-insensitive extension) in
/// path order, so aggregate output is deterministic across runs.
fn discover_documents(input_dir: &Path) -> Result<Vec<PathBuf>, RunError> {
    let entries = std::fs::read_dir(input_dir).map_err(|_| RunError::InputDirNotFound {
        path: input_dir.to_path_buf(),
    })?;

    let mut documents: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    documents.sort_unstable();
    Ok(documents)
}

/// Owns the run-scoped state: sink, adapters, policy, tracker.
struct Driver {
    sink: Arc<dyn LogSink>,
    raster: Arc<dyn Rasterizer>,
    ocr: Arc<dyn TextRecognizer>,
    policy: RetentionPolicy,
    on_error: OnError,
    tracker: RunTracker,
}

impl Driver {
    /// Resolve the sink and the two external-capability adapters, falling
    /// back to the subprocess-backed defaults when the caller supplied none.
    fn from_config(config: &RunConfig) -> Self {
        let sink = config
            .log_sink
            .clone()
            .unwrap_or_else(|| Arc::new(NullSink));
        let raster = config
            .rasterizer
            .clone()
            .unwrap_or_else(|| Arc::new(MagickRasterizer::new(&config.work_dir, config.dpi)));
        let ocr = config
            .recognizer
            .clone()
            .unwrap_or_else(|| Arc::new(TesseractRecognizer::new(&config.language)));
        Self {
            sink,
            raster,
            ocr,
            policy: config.retention(),
            on_error: config.on_error,
            tracker: RunTracker::new(),
        }
    }

    fn log(&self, line: String) {
        self.sink.record(&line);
    }

    /// Record an error and apply the error policy. Under `continue` the
    /// error is handed back so the caller can attach it to the document
    /// record; under `exit` the run aborts here.
    fn note(&mut self, err: StepError) -> Result<StepError, RunError> {
        self.log(format!("Error: {err}"));
        self.tracker.record_error(&err);
        match self.on_error {
            OnError::Continue => Ok(err),
            OnError::Exit => Err(RunError::Aborted { cause: err }),
        }
    }

    /// Rasterize → OCR pages → route output → retain-or-delete → finalize.
    async fn process_document(
        &mut self,
        config: &RunConfig,
        pdf: &Path,
        mut aggregator: Option<&mut Aggregator>,
    ) -> Result<DocumentRecord, RunError> {
        let stem = pdf
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut errors = Vec::new();

        // ── Rasterise ────────────────────────────────────────────────────
        self.log(format!("Converting {} to page images...", pdf.display()));
        let images = self.raster.rasterize(pdf, &stem).await;

        if images.is_empty() {
            // Zero pages is total failure: the source PDF is always
            // preserved, whatever the retention flags say.
            self.log(format!("No page images generated for {}.", pdf.display()));
            errors.push(self.note(StepError::Rasterization {
                document: pdf.to_path_buf(),
            })?);
            self.log(format!(
                "Skipping deletion of {} due to conversion failure.",
                pdf.display()
            ));
            self.log(format!(
                "Processing of {} incomplete due to errors.",
                pdf.display()
            ));
            return Ok(DocumentRecord {
                path: pdf.to_path_buf(),
                stem,
                pages: Vec::new(),
                pdf_deleted: false,
                outcome: DocumentOutcome::Failed,
                errors,
            });
        }

        // ── Source PDF retention ─────────────────────────────────────────
        let mut pdf_deleted = false;
        match self.policy.decide(FileKind::Pdf) {
            Disposition::Keep => self.log(format!(
                "Skipping deletion of {} per user option.",
                pdf.display()
            )),
            Disposition::Delete => {
                self.log(format!("Deleting {}...", pdf.display()));
                match std::fs::remove_file(pdf) {
                    Ok(()) => pdf_deleted = true,
                    Err(e) => {
                        errors.push(self.note(StepError::Deletion {
                            path: pdf.to_path_buf(),
                            detail: e.to_string(),
                        })?);
                    }
                }
            }
        }

        // ── OCR pages (bounded worker pool) ──────────────────────────────
        let mut pages = self
            .recognize_pages(config, &images, &mut errors)
            .await?;
        pages.sort_unstable_by_key(|p| p.index);

        // ── Route output and retain ──────────────────────────────────────
        let mut header_written = false;
        for page in pages.iter_mut() {
            if !page.ocr_succeeded {
                self.log(format!(
                    "Skipping deletion of {} due to text conversion failure.",
                    page.image_path.display()
                ));
                continue;
            }

            if let Some(agg) = aggregator.as_deref_mut() {
                self.route_to_aggregate(agg, pdf, &stem, page, &mut header_written, &mut errors)?;
            }

            match self.policy.decide(FileKind::Png) {
                Disposition::Keep => self.log(format!(
                    "Skipping deletion of {} per user option.",
                    page.image_path.display()
                )),
                Disposition::Delete => {
                    self.log(format!("Deleting {}...", page.image_path.display()));
                    match std::fs::remove_file(&page.image_path) {
                        Ok(()) => page.image_deleted = true,
                        Err(e) => {
                            errors.push(self.note(StepError::Deletion {
                                path: page.image_path.clone(),
                                detail: e.to_string(),
                            })?);
                        }
                    }
                }
            }
        }

        // ── Finalize ─────────────────────────────────────────────────────
        let outcome = DocumentRecord::classify(&pages);
        let succeeded = pages.iter().filter(|p| p.succeeded()).count();
        let failed = pages.len() - succeeded;
        match outcome {
            DocumentOutcome::Success => self.log(format!(
                "Successfully processed {} (all {} pages)",
                pdf.display(),
                pages.len()
            )),
            _ => self.log(format!(
                "Processing of {} incomplete: {succeeded} pages succeeded, {failed} pages failed",
                pdf.display()
            )),
        }

        Ok(DocumentRecord {
            path: pdf.to_path_buf(),
            stem,
            pages,
            pdf_deleted,
            outcome,
            errors,
        })
    }

    /// OCR all page images through the bounded pool, recording a missing
    /// text artifact for each failed page as results arrive. Under the
    /// `exit` policy the first failure drops the stream, which prevents
    /// queued pages from being scheduled.
    async fn recognize_pages(
        &mut self,
        config: &RunConfig,
        images: &[PathBuf],
        errors: &mut Vec<StepError>,
    ) -> Result<Vec<PageRecord>, RunError> {
        let ocr = Arc::clone(&self.ocr);
        let sink = Arc::clone(&self.sink);
        let output_dir = config.output_dir.clone();

        let jobs = images.iter().enumerate().map(|(index, image)| {
            let ocr = Arc::clone(&ocr);
            let sink = Arc::clone(&sink);
            let output_dir = output_dir.clone();
            let image = image.clone();
            async move {
                let page_stem = image
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let output_base = output_dir.join(page_stem);
                let expected = expected_text_path(&output_base);
                sink.record(&format!(
                    "Converting {} to {}...",
                    image.display(),
                    expected.display()
                ));
                let text_path = ocr.recognize(&image, &output_base).await;
                let mut page = PageRecord::new(index, image);
                page.ocr_succeeded = text_path.is_some();
                page.text_path = text_path;
                (page, expected)
            }
        });

        let mut results = stream::iter(jobs).buffer_unordered(config.concurrency);
        let mut pages = Vec::with_capacity(images.len());
        while let Some((page, expected)) = results.next().await {
            if !page.ocr_succeeded {
                errors.push(self.note(StepError::OcrMissingOutput {
                    image: page.image_path.clone(),
                    expected,
                })?);
            }
            pages.push(page);
        }
        Ok(pages)
    }

    /// Append one recognised page to the aggregate file, writing the
    /// document header before its first page. On append failure the page is
    /// marked failed and its temporary text file is preserved; on success
    /// the temporary file is removed (a removal failure is recorded but
    /// never fails the page).
    fn route_to_aggregate(
        &mut self,
        agg: &mut Aggregator,
        pdf: &Path,
        stem: &str,
        page: &mut PageRecord,
        header_written: &mut bool,
        errors: &mut Vec<StepError>,
    ) -> Result<(), RunError> {
        let Some(text_path) = page.text_path.clone() else {
            return Ok(());
        };

        if !*header_written {
            if let Err(e) = agg.begin_document(stem) {
                page.aggregation_failed = true;
                errors.push(self.note(StepError::AggregationWrite {
                    document: pdf.to_path_buf(),
                    page: page.index,
                    detail: e.to_string(),
                })?);
                return Ok(());
            }
            *header_written = true;
        }

        match agg.append_page(&text_path) {
            Ok(()) => {
                match std::fs::remove_file(&text_path) {
                    Ok(()) => page.text_path = None,
                    Err(e) => {
                        errors.push(self.note(StepError::Deletion {
                            path: text_path,
                            detail: e.to_string(),
                        })?);
                    }
                }
            }
            Err(e) => {
                page.aggregation_failed = true;
                errors.push(self.note(StepError::AggregationWrite {
                    document: pdf.to_path_buf(),
                    page: page.index,
                    detail: e.to_string(),
                })?);
            }
        }
        Ok(())
    }

    /// Close the run and emit the summary block through the sink.
    fn summarize(self) -> RunSummary {
        let sink = self.sink;
        let summary = self.tracker.finish();
        sink.record("Preprocessing complete!");
        sink.record("Summary:");
        sink.record(&format!(
            "  Total files successfully processed: {}",
            summary.success_count
        ));
        sink.record(&format!(
            "  Total files not processed: {}",
            summary.fail_count
        ));
        sink.record(&format!(
            "  Total errors encountered: {}",
            summary.error_count
        ));
        if !summary.failed_documents.is_empty() {
            sink.record("  Failed documents:");
            for doc in &summary.failed_documents {
                sink.record(&format!("    {}", doc.display()));
            }
        }
        sink.record(&format!(
            "  Run duration: {} seconds",
            summary.duration_secs
        ));
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn discovery_filters_and_sorts() {
        let tmp = TempDir::new().unwrap();
        for name in ["b.pdf", "a.PDF", "notes.txt", "c.pdf.bak"] {
            std::fs::write(tmp.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(tmp.path().join("nested.pdf")).unwrap();

        let docs = discover_documents(tmp.path()).unwrap();
        let names: Vec<_> = docs
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf"]);
    }

    #[test]
    fn discovery_of_missing_directory_is_fatal() {
        let err = discover_documents(Path::new("/nonexistent/pdfprep")).unwrap_err();
        assert!(matches!(err, RunError::InputDirNotFound { .. }));
    }
}
