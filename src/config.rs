//! Configuration types for a preprocessing run.
//!
//! All run behaviour is controlled through [`RunConfig`], built via its
//! [`RunConfigBuilder`]. Keeping every knob in one immutable struct makes
//! it trivial to share the config across page workers and to diff two runs
//! to understand why their outputs differ. Flag parsing and dependency
//! checks happen upstream in the CLI; the pipeline only ever sees the
//! resolved struct.

use crate::error::RunError;
use crate::logsink::LogSink;
use crate::pipeline::ocr::TextRecognizer;
use crate::pipeline::raster::Rasterizer;
use crate::retention::RetentionPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// What to do after a recorded error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OnError {
    /// Record the error and move on to the next unit of work. (default)
    #[default]
    Continue,
    /// Terminate the run on the first error of any kind, with a non-zero
    /// status and no final summary.
    Exit,
}

/// Configuration for one preprocessing run.
///
/// Built via [`RunConfig::builder()`] or [`RunConfig::default()`].
///
/// # Example
/// ```rust
/// use pdfprep::RunConfig;
///
/// let config = RunConfig::builder()
///     .input_dir("./pdfs")
///     .output_dir("./text")
///     .keep_pdfs(true)
///     .concurrency(4)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct RunConfig {
    /// Directory scanned (non-recursively) for `*.pdf`. Default: `"."`.
    pub input_dir: PathBuf,

    /// Directory receiving text artifacts. Created if absent. Default:
    /// `"extracted-text"`.
    pub output_dir: PathBuf,

    /// Directory where the rasteriser produces page images. Default: `"."`.
    pub work_dir: PathBuf,

    /// Console output limited to error lines. Consumed by the CLI's log
    /// sink; the pipeline itself never filters what it records.
    pub quiet: bool,

    /// Log file path, when the caller wants one. Consumed by the CLI's log
    /// sink.
    pub log_file: Option<PathBuf>,

    /// Keep source PDFs after successful rasterisation.
    pub keep_pdfs: bool,

    /// Keep intermediate page images after successful OCR.
    pub keep_pngs: bool,

    /// Keep every file; overrides `keep_pdfs` and `keep_pngs`.
    pub no_delete: bool,

    /// Error policy: continue past recorded errors or abort on the first.
    pub on_error: OnError,

    /// When set, append all extracted text to this single file (with one
    /// header per document) instead of leaving per-page text files.
    pub aggregate_file: Option<PathBuf>,

    /// Width of the per-document OCR worker pool. Default: the number of
    /// available processing units.
    ///
    /// OCR is a blocking external process per page, so pages within a
    /// document are independent units of blocking work. `1` restores fully
    /// sequential processing.
    pub concurrency: usize,

    /// Rasterisation density passed to the external tool. Range: 72–600.
    /// Default: 300.
    ///
    /// 300 DPI is the usual floor for reliable OCR on ordinary body text;
    /// lower densities speed up rasterisation at the cost of recognition
    /// accuracy on small fonts.
    pub dpi: u32,

    /// OCR language code passed to the external tool. Default: `"eng"`.
    pub language: String,

    /// Log sink receiving every progress and summary line. When `None`,
    /// the run logs nothing (a [`crate::logsink::NullSink`] is used).
    pub log_sink: Option<Arc<dyn LogSink>>,

    /// Pre-constructed rasteriser. When `None`, the run uses the external
    /// ImageMagick `convert` tool. This is the seam for test doubles.
    pub rasterizer: Option<Arc<dyn Rasterizer>>,

    /// Pre-constructed text recogniser. When `None`, the run uses the
    /// external `tesseract` tool. This is the seam for test doubles.
    pub recognizer: Option<Arc<dyn TextRecognizer>>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("extracted-text"),
            work_dir: PathBuf::from("."),
            quiet: false,
            log_file: None,
            keep_pdfs: false,
            keep_pngs: false,
            no_delete: false,
            on_error: OnError::Continue,
            aggregate_file: None,
            concurrency: default_concurrency(),
            dpi: 300,
            language: "eng".to_string(),
            log_sink: None,
            rasterizer: None,
            recognizer: None,
        }
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("input_dir", &self.input_dir)
            .field("output_dir", &self.output_dir)
            .field("work_dir", &self.work_dir)
            .field("quiet", &self.quiet)
            .field("log_file", &self.log_file)
            .field("keep_pdfs", &self.keep_pdfs)
            .field("keep_pngs", &self.keep_pngs)
            .field("no_delete", &self.no_delete)
            .field("on_error", &self.on_error)
            .field("aggregate_file", &self.aggregate_file)
            .field("concurrency", &self.concurrency)
            .field("dpi", &self.dpi)
            .field("language", &self.language)
            .field("log_sink", &self.log_sink.as_ref().map(|_| "<dyn LogSink>"))
            .field(
                "rasterizer",
                &self.rasterizer.as_ref().map(|_| "<dyn Rasterizer>"),
            )
            .field(
                "recognizer",
                &self.recognizer.as_ref().map(|_| "<dyn TextRecognizer>"),
            )
            .finish()
    }
}

impl RunConfig {
    /// Create a new builder for `RunConfig`.
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder {
            config: Self::default(),
        }
    }

    /// Collapse the three retention flags into the per-run policy.
    pub fn retention(&self) -> RetentionPolicy {
        RetentionPolicy::from_flags(self.no_delete, self.keep_pdfs, self.keep_pngs)
    }
}

/// Builder for [`RunConfig`].
#[derive(Debug)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    pub fn input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.input_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = dir.into();
        self
    }

    pub fn quiet(mut self, v: bool) -> Self {
        self.config.quiet = v;
        self
    }

    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.log_file = Some(path.into());
        self
    }

    pub fn keep_pdfs(mut self, v: bool) -> Self {
        self.config.keep_pdfs = v;
        self
    }

    pub fn keep_pngs(mut self, v: bool) -> Self {
        self.config.keep_pngs = v;
        self
    }

    pub fn no_delete(mut self, v: bool) -> Self {
        self.config.no_delete = v;
        self
    }

    pub fn on_error(mut self, mode: OnError) -> Self {
        self.config.on_error = mode;
        self
    }

    pub fn aggregate_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.aggregate_file = Some(path.into());
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.config.language = lang.into();
        self
    }

    pub fn log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.config.log_sink = Some(sink);
        self
    }

    pub fn rasterizer(mut self, r: Arc<dyn Rasterizer>) -> Self {
        self.config.rasterizer = Some(r);
        self
    }

    pub fn recognizer(mut self, r: Arc<dyn TextRecognizer>) -> Self {
        self.config.recognizer = Some(r);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RunConfig, RunError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(RunError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.concurrency == 0 {
            return Err(RunError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        if c.language.is_empty() {
            return Err(RunError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
