//! Result tracking: per-run counters and the set of failed documents.
//!
//! The tracker is an explicit value owned mutably by the run driver, which
//! is the single point of mutation: page workers return their results
//! through the worker-pool stream and the driver folds them in one at a
//! time. Nothing else writes to the counters, so no lock is needed even
//! when pages complete concurrently.

use crate::error::StepError;
use crate::report::DocumentOutcome;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;

/// Accumulates outcomes while a run is in flight.
#[derive(Debug)]
pub struct RunTracker {
    success_count: u64,
    fail_count: u64,
    error_count: u64,
    failed_documents: BTreeSet<PathBuf>,
    started: Instant,
}

impl Default for RunTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RunTracker {
    pub fn new() -> Self {
        Self {
            success_count: 0,
            fail_count: 0,
            error_count: 0,
            failed_documents: BTreeSet::new(),
            started: Instant::now(),
        }
    }

    /// Record a finished document. `Success` increments the success counter;
    /// any other outcome increments the failure counter and adds the path to
    /// the failed set. The set deduplicates, so a document that fails in
    /// several ways is still listed exactly once.
    pub fn record_document(&mut self, path: &Path, outcome: DocumentOutcome) {
        match outcome {
            DocumentOutcome::Success => self.success_count += 1,
            DocumentOutcome::Partial | DocumentOutcome::Failed => {
                self.fail_count += 1;
                self.failed_documents.insert(path.to_path_buf());
            }
        }
    }

    /// Record a detected error. Independent of document outcomes: a deletion
    /// failure bumps this counter without failing the document, and a
    /// document with three bad pages bumps it three times.
    pub fn record_error(&mut self, error: &StepError) {
        debug!("recorded error: {error}");
        self.error_count += 1;
    }

    pub fn error_count(&self) -> u64 {
        self.error_count
    }

    /// Close the run and produce the summary.
    pub fn finish(self) -> RunSummary {
        RunSummary {
            success_count: self.success_count,
            fail_count: self.fail_count,
            error_count: self.error_count,
            failed_documents: self.failed_documents.into_iter().collect(),
            duration_secs: self.started.elapsed().as_secs(),
        }
    }
}

/// Final counters for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Documents where every page produced text.
    pub success_count: u64,
    /// Documents that failed in whole or in part.
    pub fail_count: u64,
    /// Every detected error, whether or not it failed a document.
    pub error_count: u64,
    /// Each failing document exactly once, in path order.
    pub failed_documents: Vec<PathBuf>,
    pub duration_secs: u64,
}
