//! Artifact-retention policy: which files survive a successful run.
//!
//! Three independent CLI flags collapse into two booleans once per run.
//! `no_delete` is the master switch and overrides both keep flags:
//!
//! | no_delete | keep_pdfs | keep_pngs | PDF    | PNG    |
//! |-----------|-----------|-----------|--------|--------|
//! | true      | *         | *         | keep   | keep   |
//! | false     | true      | true      | keep   | keep   |
//! | false     | true      | false     | keep   | delete |
//! | false     | false     | true      | delete | keep   |
//! | false     | false     | false     | delete | delete |
//!
//! The policy only *decides*; actual deletion (and the rule that deletion
//! failures never fail a document) lives in the run driver.

use serde::{Deserialize, Serialize};

/// The two artifact kinds the policy distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// A source PDF document.
    Pdf,
    /// An intermediate page image.
    Png,
}

/// What to do with an artifact after its processing succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Keep,
    Delete,
}

/// Resolved retention decisions for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub delete_pdf: bool,
    pub delete_png: bool,
}

impl RetentionPolicy {
    /// Derive the policy from the three user flags.
    pub fn from_flags(no_delete: bool, keep_pdfs: bool, keep_pngs: bool) -> Self {
        Self {
            delete_pdf: !no_delete && !keep_pdfs,
            delete_png: !no_delete && !keep_pngs,
        }
    }

    /// Decide the fate of one artifact kind.
    pub fn decide(&self, kind: FileKind) -> Disposition {
        let delete = match kind {
            FileKind::Pdf => self.delete_pdf,
            FileKind::Png => self.delete_png,
        };
        if delete {
            Disposition::Delete
        } else {
            Disposition::Keep
        }
    }
}
