//! # pdfprep
//!
//! Batch preprocessing of scanned PDFs into plain text for downstream
//! search and analysis. Every PDF in an input directory is rasterised
//! into per-page images (ImageMagick `convert`), each page is OCR'd
//! (`tesseract`), and the extracted text lands either as one `.txt` file
//! per page or appended to a single aggregate file.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfprep::RunConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RunConfig::builder()
//!         .input_dir("scans")
//!         .output_dir("extracted-text")
//!         .dpi(300)
//!         .language("eng")
//!         .build()?;
//!
//!     let report = pdfprep::run(&config).await?;
//!     println!(
//!         "{} succeeded, {} failed",
//!         report.summary.success_count, report.summary.fail_count
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`run`] — the driver: discovery, per-document state machine, summary
//! - [`pipeline`] — adapters for the two external tools, behind the
//!   [`Rasterizer`] and [`TextRecognizer`] traits so tests never shell out
//! - [`RunConfig`] — builder-validated settings, including the retention
//!   flags and the error policy
//! - [`LogSink`] — the user-facing progress log, separate from `tracing`
//!   diagnostics
//!
//! Intermediate files are working state, not cache: reruns redo all work,
//! and the retention flags only decide what survives a successful step.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod logsink;
pub mod pipeline;
pub mod report;
pub mod retention;
pub mod run;
pub mod tracker;

pub use config::{OnError, RunConfig, RunConfigBuilder};
pub use error::{RunError, StepError};
pub use logsink::{LogSink, MemorySink, NullSink};
pub use pipeline::ocr::{TesseractRecognizer, TextRecognizer};
pub use pipeline::raster::{MagickRasterizer, Rasterizer};
pub use report::{DocumentOutcome, DocumentRecord, PageRecord, RunReport};
pub use retention::{Disposition, FileKind, RetentionPolicy};
pub use run::{run, run_sync};
pub use tracker::{RunSummary, RunTracker};
