//! End-to-end pipeline tests with in-process doubles for the external
//! tools. The doubles write real files, so retention, aggregation, and
//! output routing are exercised against a real filesystem.

use async_trait::async_trait;
use pdfprep::pipeline::ocr::expected_text_path;
use pdfprep::{
    DocumentOutcome, LogSink, MemorySink, OnError, Rasterizer, RunConfig, RunError, TextRecognizer,
};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Writes `<stem>-<N>.png` files into the work directory, one per page
/// configured for that stem. Unknown stems rasterise to zero pages.
struct FakeRasterizer {
    work_dir: PathBuf,
    pages: HashMap<String, usize>,
}

#[async_trait]
impl Rasterizer for FakeRasterizer {
    async fn rasterize(&self, _pdf: &Path, stem: &str) -> Vec<PathBuf> {
        let count = self.pages.get(stem).copied().unwrap_or(0);
        (0..count)
            .map(|i| {
                let path = self.work_dir.join(format!("{stem}-{i}.png"));
                std::fs::write(&path, format!("image {stem} {i}")).unwrap();
                path
            })
            .collect()
    }
}

/// Writes `<output_base>.txt` with text derived from the page stem, except
/// for image file names listed in `fail`, which produce no artifact.
struct FakeRecognizer {
    fail: HashSet<String>,
}

impl FakeRecognizer {
    fn flawless() -> Self {
        Self {
            fail: HashSet::new(),
        }
    }

    fn failing_on(names: &[&str]) -> Self {
        Self {
            fail: names.iter().map(|n| n.to_string()).collect(),
        }
    }
}

#[async_trait]
impl TextRecognizer for FakeRecognizer {
    async fn recognize(&self, image: &Path, output_base: &Path) -> Option<PathBuf> {
        let name = image.file_name()?.to_str()?;
        if self.fail.contains(name) {
            return None;
        }
        let stem = image.file_stem()?.to_str()?;
        let out = expected_text_path(output_base);
        std::fs::write(&out, format!("text of {stem}\n")).unwrap();
        Some(out)
    }
}

/// Simulates a text artifact that cannot be read back when the aggregate
/// is assembled: for the listed image names it leaves a directory where
/// the text file should be, so the later read fails with an I/O error.
struct UnreadableTextRecognizer {
    unreadable: HashSet<String>,
}

#[async_trait]
impl TextRecognizer for UnreadableTextRecognizer {
    async fn recognize(&self, image: &Path, output_base: &Path) -> Option<PathBuf> {
        let name = image.file_name()?.to_str()?;
        let stem = image.file_stem()?.to_str()?;
        let out = expected_text_path(output_base);
        if self.unreadable.contains(name) {
            std::fs::create_dir(&out).unwrap();
        } else {
            std::fs::write(&out, format!("text of {stem}\n")).unwrap();
        }
        Some(out)
    }
}

/// Writes the text artifact, then removes its input image, so the
/// retention step's deletion attempt finds nothing to delete.
struct ImageRemovingRecognizer;

#[async_trait]
impl TextRecognizer for ImageRemovingRecognizer {
    async fn recognize(&self, image: &Path, output_base: &Path) -> Option<PathBuf> {
        let stem = image.file_stem()?.to_str()?;
        let out = expected_text_path(output_base);
        std::fs::write(&out, format!("text of {stem}\n")).unwrap();
        std::fs::remove_file(image).unwrap();
        Some(out)
    }
}

struct Fixture {
    _tmp: TempDir,
    input: PathBuf,
    output: PathBuf,
    sink: Arc<MemorySink>,
}

impl Fixture {
    /// An input directory holding one empty `.pdf` file per named document.
    fn new(documents: &[&str]) -> Self {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        let output = tmp.path().join("out");
        std::fs::create_dir(&input).unwrap();
        for doc in documents {
            std::fs::write(input.join(format!("{doc}.pdf")), b"%PDF-1.4").unwrap();
        }
        Self {
            _tmp: tmp,
            input,
            output,
            sink: Arc::new(MemorySink::new()),
        }
    }

    /// A config wired to the doubles, with the input directory doubling as
    /// the work directory, the way the real tool operates by default.
    fn config(
        &self,
        pages: &[(&str, usize)],
        recognizer: impl TextRecognizer + 'static,
    ) -> RunConfig {
        let raster = FakeRasterizer {
            work_dir: self.input.clone(),
            pages: pages
                .iter()
                .map(|(stem, n)| (stem.to_string(), *n))
                .collect(),
        };
        RunConfig::builder()
            .input_dir(&self.input)
            .output_dir(&self.output)
            .work_dir(&self.input)
            .concurrency(4)
            .log_sink(Arc::clone(&self.sink) as Arc<dyn LogSink>)
            .rasterizer(Arc::new(raster))
            .recognizer(Arc::new(recognizer))
            .build()
            .unwrap()
    }
}

#[tokio::test]
async fn clean_run_extracts_text_and_deletes_intermediates() {
    let fx = Fixture::new(&["a", "b"]);
    let config = fx.config(&[("a", 2), ("b", 1)], FakeRecognizer::flawless());

    let report = pdfprep::run(&config).await.unwrap();

    assert_eq!(report.summary.success_count, 2);
    assert_eq!(report.summary.fail_count, 0);
    assert_eq!(report.summary.error_count, 0);
    assert!(report.summary.failed_documents.is_empty());
    assert!(report
        .documents
        .iter()
        .all(|d| d.outcome == DocumentOutcome::Success));

    // Per-page text artifacts exist.
    for name in ["a-0.txt", "a-1.txt", "b-0.txt"] {
        let text = std::fs::read_to_string(fx.output.join(name)).unwrap();
        assert!(text.starts_with("text of"));
    }

    // Default retention deletes the sources and the page images.
    assert!(!fx.input.join("a.pdf").exists());
    assert!(!fx.input.join("b.pdf").exists());
    assert!(!fx.input.join("a-0.png").exists());
    assert!(!fx.input.join("b-0.png").exists());

    assert!(fx.sink.contains("Successfully processed"));
    assert!(fx.sink.contains("Preprocessing complete!"));
    assert!(fx.sink.contains("Total files successfully processed: 2"));
}

#[tokio::test]
async fn failed_page_makes_document_partial_and_keeps_its_image() {
    let fx = Fixture::new(&["doc"]);
    let config = fx.config(&[("doc", 3)], FakeRecognizer::failing_on(&["doc-1.png"]));

    let report = pdfprep::run(&config).await.unwrap();

    assert_eq!(report.summary.success_count, 0);
    assert_eq!(report.summary.fail_count, 1);
    assert_eq!(report.summary.error_count, 1);
    assert_eq!(
        report.summary.failed_documents,
        vec![fx.input.join("doc.pdf")]
    );

    let doc = &report.documents[0];
    assert_eq!(doc.outcome, DocumentOutcome::Partial);
    assert!(!doc.pages[1].ocr_succeeded);
    assert!(doc.pages[0].ocr_succeeded && doc.pages[2].ocr_succeeded);

    // The failed page's image survives for a rerun; the others are gone.
    assert!(fx.input.join("doc-1.png").exists());
    assert!(!fx.input.join("doc-0.png").exists());
    assert!(!fx.input.join("doc-2.png").exists());

    assert!(fx.sink.contains("Error:"));
    assert!(fx
        .sink
        .contains("due to text conversion failure"));
    assert!(fx.sink.contains("incomplete: 2 pages succeeded, 1 pages failed"));
}

#[tokio::test]
async fn zero_page_document_fails_and_source_is_preserved() {
    let fx = Fixture::new(&["broken"]);
    // No page count configured for "broken": rasterisation yields nothing.
    let config = fx.config(&[], FakeRecognizer::flawless());

    let report = pdfprep::run(&config).await.unwrap();

    assert_eq!(report.summary.fail_count, 1);
    assert_eq!(report.summary.error_count, 1);
    assert_eq!(report.documents[0].outcome, DocumentOutcome::Failed);
    assert!(report.documents[0].pages.is_empty());
    assert!(!report.documents[0].pdf_deleted);

    // Deletion is skipped on conversion failure even under the default
    // delete-everything retention.
    assert!(fx.input.join("broken.pdf").exists());
    assert!(fx.sink.contains("due to conversion failure"));
}

#[tokio::test]
async fn empty_input_directory_completes_with_zero_summary() {
    let fx = Fixture::new(&[]);
    let config = fx.config(&[], FakeRecognizer::flawless());

    let report = pdfprep::run(&config).await.unwrap();

    assert!(report.documents.is_empty());
    assert_eq!(report.summary.success_count, 0);
    assert_eq!(report.summary.fail_count, 0);
    assert_eq!(report.summary.error_count, 0);
    assert!(fx.sink.contains("No PDF files found"));
    assert!(fx.sink.contains("Preprocessing complete!"));
}

#[tokio::test]
async fn missing_input_directory_is_fatal() {
    let fx = Fixture::new(&[]);
    let mut config = fx.config(&[], FakeRecognizer::flawless());
    config.input_dir = fx.input.join("nowhere");

    let err = pdfprep::run(&config).await.unwrap_err();
    assert!(matches!(err, RunError::InputDirNotFound { .. }));
}

#[tokio::test]
async fn output_directory_is_created_on_demand() {
    let fx = Fixture::new(&["a"]);
    let config = fx.config(&[("a", 1)], FakeRecognizer::flawless());

    assert!(!fx.output.exists());
    pdfprep::run(&config).await.unwrap();
    assert!(fx.output.is_dir());
    assert!(fx.sink.contains("does not exist. Creating it now"));
}

#[tokio::test]
async fn aggregation_writes_one_header_per_document_in_order() {
    let fx = Fixture::new(&["a", "b"]);
    let agg_path = fx.input.join("all.txt");
    let mut config = fx.config(&[("a", 2), ("b", 1)], FakeRecognizer::flawless());
    config.aggregate_file = Some(agg_path.clone());

    let report = pdfprep::run(&config).await.unwrap();
    assert_eq!(report.summary.success_count, 2);

    // Documents in discovery order, pages in index order, despite the
    // concurrent OCR pool.
    let content = std::fs::read_to_string(&agg_path).unwrap();
    assert_eq!(
        content,
        "\n=== a ===\ntext of a-0\ntext of a-1\n\n=== b ===\ntext of b-0\n"
    );

    // Per-page temporaries were folded in and removed.
    assert!(!fx.output.join("a-0.txt").exists());
    assert!(!fx.output.join("a-1.txt").exists());
    assert!(!fx.output.join("b-0.txt").exists());
}

#[tokio::test]
async fn aggregation_skips_failed_pages_but_keeps_the_rest() {
    let fx = Fixture::new(&["doc"]);
    let agg_path = fx.input.join("all.txt");
    let mut config = fx.config(&[("doc", 3)], FakeRecognizer::failing_on(&["doc-1.png"]));
    config.aggregate_file = Some(agg_path.clone());

    let report = pdfprep::run(&config).await.unwrap();
    assert_eq!(report.documents[0].outcome, DocumentOutcome::Partial);

    let content = std::fs::read_to_string(&agg_path).unwrap();
    assert_eq!(content, "\n=== doc ===\ntext of doc-0\ntext of doc-2\n");
}

#[tokio::test]
async fn aggregation_write_failure_fails_the_page_and_preserves_its_text() {
    let fx = Fixture::new(&["doc"]);
    let agg_path = fx.input.join("all.txt");
    let mut config = fx.config(
        &[("doc", 2)],
        UnreadableTextRecognizer {
            unreadable: ["doc-1.png".to_string()].into_iter().collect(),
        },
    );
    config.aggregate_file = Some(agg_path.clone());

    let report = pdfprep::run(&config).await.unwrap();

    assert_eq!(report.summary.success_count, 0);
    assert_eq!(report.summary.fail_count, 1);
    assert_eq!(report.summary.error_count, 1);

    let doc = &report.documents[0];
    assert_eq!(doc.outcome, DocumentOutcome::Partial);
    assert!(doc.pages[1].ocr_succeeded);
    assert!(doc.pages[1].aggregation_failed);
    assert!(!doc.pages[1].succeeded());

    // The good page made it into the aggregate and its temporary was
    // removed; the bad page's artifact is preserved where OCR left it.
    let content = std::fs::read_to_string(&agg_path).unwrap();
    assert_eq!(content, "\n=== doc ===\ntext of doc-0\n");
    assert!(!fx.output.join("doc-0.txt").exists());
    assert!(fx.output.join("doc-1.txt").exists());

    assert!(fx.sink.contains("Error: Failed to append page 1"));
}

#[tokio::test]
async fn deletion_failure_is_recorded_without_failing_the_document() {
    let fx = Fixture::new(&["doc"]);
    let config = fx.config(&[("doc", 1)], ImageRemovingRecognizer);

    let report = pdfprep::run(&config).await.unwrap();

    // The page image was already gone when retention tried to delete it:
    // the error is counted but the document still succeeds.
    assert_eq!(report.summary.success_count, 1);
    assert_eq!(report.summary.fail_count, 0);
    assert_eq!(report.summary.error_count, 1);
    assert!(report.summary.failed_documents.is_empty());

    let doc = &report.documents[0];
    assert_eq!(doc.outcome, DocumentOutcome::Success);
    assert!(!doc.pages[0].image_deleted);
    assert_eq!(doc.errors.len(), 1);

    assert!(fx.sink.contains("Error: Failed to delete"));
}

#[tokio::test]
async fn keep_flags_preserve_sources_and_images() {
    let fx = Fixture::new(&["a"]);
    let mut config = fx.config(&[("a", 1)], FakeRecognizer::flawless());
    config.keep_pdfs = true;
    config.keep_pngs = true;

    pdfprep::run(&config).await.unwrap();

    assert!(fx.input.join("a.pdf").exists());
    assert!(fx.input.join("a-0.png").exists());
    assert!(fx.sink.contains("per user option"));
}

#[tokio::test]
async fn no_delete_overrides_everything() {
    let fx = Fixture::new(&["a"]);
    let mut config = fx.config(&[("a", 2)], FakeRecognizer::flawless());
    config.no_delete = true;

    let report = pdfprep::run(&config).await.unwrap();

    assert_eq!(report.summary.success_count, 1);
    assert!(fx.input.join("a.pdf").exists());
    assert!(fx.input.join("a-0.png").exists());
    assert!(fx.input.join("a-1.png").exists());
}

#[tokio::test]
async fn exit_policy_aborts_before_the_summary() {
    let fx = Fixture::new(&["doc", "later"]);
    let mut config = fx.config(
        &[("doc", 2), ("later", 1)],
        FakeRecognizer::failing_on(&["doc-0.png", "doc-1.png"]),
    );
    config.on_error = OnError::Exit;

    let err = pdfprep::run(&config).await.unwrap_err();
    assert!(matches!(err, RunError::Aborted { .. }));

    // Fail-loud: the summary block was never emitted and the second
    // document was never started.
    assert!(!fx.sink.contains("Preprocessing complete!"));
    assert!(fx.sink.contains("Error:"));
    assert!(!fx.sink.contains("later.pdf to page images"));
}

#[tokio::test]
async fn exit_policy_triggers_on_any_recorded_error() {
    let fx = Fixture::new(&["broken"]);
    let mut config = fx.config(&[], FakeRecognizer::flawless());
    config.on_error = OnError::Exit;

    // Zero-page rasterisation is the first recorded error.
    let err = pdfprep::run(&config).await.unwrap_err();
    let RunError::Aborted { cause } = err else {
        panic!("expected abort");
    };
    assert!(cause.to_string().contains("broken.pdf"));
}

#[tokio::test]
async fn rerun_over_surviving_files_redoes_the_work() {
    let fx = Fixture::new(&["a"]);
    let mut config = fx.config(&[("a", 1)], FakeRecognizer::flawless());
    config.no_delete = true;

    let first = pdfprep::run(&config).await.unwrap();
    let second = pdfprep::run(&config).await.unwrap();

    // Intermediates are working state, not a cache: the second run
    // processes the document again from scratch.
    assert_eq!(first.summary.success_count, 1);
    assert_eq!(second.summary.success_count, 1);
    let text = std::fs::read_to_string(fx.output.join("a-0.txt")).unwrap();
    assert_eq!(text, "text of a-0\n");
}
