//! PDF rasterisation via the external ImageMagick `convert` tool.
//!
//! ## Why scan instead of trusting the exit status?
//!
//! `convert` exits zero after writing only some pages of a damaged PDF, and
//! exits non-zero while still leaving usable images behind. The adapter
//! therefore runs the tool, ignores its status entirely, and reports
//! whatever `<stem>-<N>.png` files actually exist in the work directory.
//! An empty result is a normal return value — it signals document-level
//! failure to the driver, never an `Err`.

use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Rasterises one document into page images.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Produce page images for `pdf`, returning their paths ordered by
    /// page index ascending (starting at 0). Returns an empty vector on
    /// total failure.
    async fn rasterize(&self, pdf: &Path, stem: &str) -> Vec<PathBuf>;
}

/// The default rasteriser: shells out to ImageMagick `convert`.
///
/// Page images land in `work_dir` as `<stem>-<N>.png`, `N` starting at 0,
/// which is the naming `convert`'s `%d` output template produces.
pub struct MagickRasterizer {
    pub work_dir: PathBuf,
    pub dpi: u32,
    pub quality: u32,
}

impl MagickRasterizer {
    pub fn new(work_dir: impl Into<PathBuf>, dpi: u32) -> Self {
        Self {
            work_dir: work_dir.into(),
            dpi,
            quality: 100,
        }
    }
}

#[async_trait]
impl Rasterizer for MagickRasterizer {
    async fn rasterize(&self, pdf: &Path, stem: &str) -> Vec<PathBuf> {
        let status = Command::new("convert")
            .arg("-density")
            .arg(self.dpi.to_string())
            .arg(pdf)
            .arg("-quality")
            .arg(self.quality.to_string())
            .arg(format!("{stem}-%d.png"))
            .current_dir(&self.work_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(s) => debug!("convert exited with {s} for {}", pdf.display()),
            // Spawn failure (tool missing, work dir gone) still falls
            // through to the scan, which reports zero pages.
            Err(e) => warn!("failed to run convert for {}: {e}", pdf.display()),
        }

        scan_page_images(&self.work_dir, stem)
    }
}

/// Find `<stem>-<N>.png` files in `dir`, sorted by page index ascending.
pub fn scan_page_images(dir: &Path, stem: &str) -> Vec<PathBuf> {
    let pattern = match Regex::new(&format!(r"^{}-(\d+)\.png$", regex::escape(stem))) {
        Ok(p) => p,
        Err(e) => {
            warn!("invalid page-image pattern for stem '{stem}': {e}");
            return Vec::new();
        }
    };

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("cannot scan '{}' for page images: {e}", dir.display());
            return Vec::new();
        }
    };

    let mut pages: Vec<(usize, PathBuf)> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name();
            let name = name.to_str()?;
            let caps = pattern.captures(name)?;
            let index: usize = caps.get(1)?.as_str().parse().ok()?;
            Some((index, entry.path()))
        })
        .collect();

    pages.sort_unstable_by_key(|(index, _)| *index);
    pages.into_iter().map(|(_, path)| path).collect()
}
