//! Single-file aggregation of extracted text.
//!
//! When aggregation is configured, the run appends every successfully
//! recognised page to one shared output file instead of leaving per-page
//! text files behind. Each document contributes one header followed by its
//! page texts in page-index order.
//!
//! The aggregator is the single writer: the run driver owns it exclusively
//! and appends documents one at a time in discovery order, even when page
//! OCR completed out of order in the worker pool. Headers and bodies from
//! different documents therefore never interleave.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Appends extracted text to the shared aggregate file.
pub struct Aggregator {
    path: PathBuf,
    file: File,
}

impl Aggregator {
    /// Open (creating if needed) the aggregate file for appending.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    /// Where this aggregator writes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the header opening a document's section.
    pub fn begin_document(&mut self, document_name: &str) -> io::Result<()> {
        debug!("aggregate: begin document '{document_name}'");
        write!(self.file, "\n=== {document_name} ===\n")
    }

    /// Append one page's text from its temporary file. The temporary file
    /// is never touched here — on success the caller removes it, on failure
    /// it stays behind for inspection.
    pub fn append_page(&mut self, text_path: &Path) -> io::Result<()> {
        let text = std::fs::read_to_string(text_path)?;
        self.file.write_all(text.as_bytes())?;
        if !text.ends_with('\n') {
            self.file.write_all(b"\n")?;
        }
        self.file.flush()
    }
}
