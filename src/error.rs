//! Error types for the pdfprep library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`RunError`] — **Fatal**: the run cannot proceed at all (input
//!   directory missing, aggregate file unopenable) or was deliberately
//!   aborted under the `exit` error policy. Returned as `Err(RunError)`
//!   from [`crate::run::run`].
//!
//! * [`StepError`] — **Non-fatal**: one unit of work failed (a document
//!   rasterised to zero pages, one page's OCR produced no output, one
//!   deletion was refused). Recorded into the [`crate::tracker::RunTracker`]
//!   and, under the `continue` policy, processing moves on to the next unit.
//!
//! The external tools are not trusted as error oracles: the adapters never
//! return `Err` from a bad exit status. A step fails only when the expected
//! output artifact is absent, so every `StepError` here is derived from an
//! observable filesystem state rather than a subprocess exit code.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdfprep library.
///
/// Per-unit failures use [`StepError`] and are recorded in the run summary
/// rather than propagated here.
#[derive(Debug, Error)]
pub enum RunError {
    /// The input directory does not exist or cannot be read.
    #[error("Input directory not found or unreadable: '{path}'\nCheck the path exists and is a directory.")]
    InputDirNotFound { path: PathBuf },

    /// The aggregate output file could not be opened for appending.
    #[error("Failed to open aggregate file '{path}': {source}")]
    AggregateOpenFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The first recorded error terminated the run under the `exit` policy.
    ///
    /// The run stops before any further unit of work is scheduled and no
    /// summary is emitted — an aborted run fails loud rather than reporting
    /// partial counts.
    #[error("Run aborted on first error: {cause}")]
    Aborted { cause: StepError },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single unit of work.
///
/// Every variant increments the run's error counter. Whether it also fails
/// the enclosing document depends on the variant: `Rasterization` is
/// document-fatal, `OcrMissingOutput` and `AggregationWrite` are page-fatal,
/// `DirectoryCreation` and `Deletion` are recorded only.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum StepError {
    /// The output directory could not be created.
    #[error("Failed to create directory '{path}': {detail}")]
    DirectoryCreation { path: PathBuf, detail: String },

    /// Rasterisation produced zero page images for a document.
    #[error("Rasterisation produced no pages for '{document}'")]
    Rasterization { document: PathBuf },

    /// OCR ran but the expected text artifact does not exist.
    #[error("No text produced for '{image}' (expected '{expected}')")]
    OcrMissingOutput { image: PathBuf, expected: PathBuf },

    /// A file slated for deletion could not be removed.
    #[error("Failed to delete '{path}': {detail}")]
    Deletion { path: PathBuf, detail: String },

    /// Appending a page to the aggregate file failed. The page's temporary
    /// text file is preserved for inspection.
    #[error("Failed to append page {page} of '{document}' to the aggregate file: {detail}")]
    AggregationWrite {
        document: PathBuf,
        page: usize,
        detail: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aborted_display_names_cause() {
        let e = RunError::Aborted {
            cause: StepError::Rasterization {
                document: PathBuf::from("broken.pdf"),
            },
        };
        let msg = e.to_string();
        assert!(msg.contains("aborted"), "got: {msg}");
        assert!(msg.contains("broken.pdf"), "got: {msg}");
    }

    #[test]
    fn ocr_missing_output_display() {
        let e = StepError::OcrMissingOutput {
            image: PathBuf::from("doc-2.png"),
            expected: PathBuf::from("out/doc-2.txt"),
        };
        let msg = e.to_string();
        assert!(msg.contains("doc-2.png"));
        assert!(msg.contains("doc-2.txt"));
    }

    #[test]
    fn deletion_display() {
        let e = StepError::Deletion {
            path: PathBuf::from("a.pdf"),
            detail: "permission denied".into(),
        };
        assert!(e.to_string().contains("permission denied"));
    }

    #[test]
    fn step_error_round_trips_through_json() {
        let e = StepError::AggregationWrite {
            document: PathBuf::from("multi.pdf"),
            page: 1,
            detail: "disk full".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        let back: StepError = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, StepError::AggregationWrite { page: 1, .. }));
    }
}
