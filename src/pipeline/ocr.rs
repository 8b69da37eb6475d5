//! Text recognition via the external `tesseract` tool.
//!
//! The recogniser targets a deterministic output path and reports success
//! by checking that the file exists afterwards — [`artifact_exists`] is the
//! only success oracle. Tesseract's exit code is deliberately ignored: it
//! sometimes exits zero with no output and non-zero with a perfectly good
//! text file.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Recognises text from one page image.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Run recognition on `image`, targeting `output_base` (the tool adds
    /// its own `.txt` extension). Returns the path of the text artifact if
    /// it exists afterwards, `None` otherwise.
    async fn recognize(&self, image: &Path, output_base: &Path) -> Option<PathBuf>;
}

/// The default recogniser: shells out to `tesseract`.
pub struct TesseractRecognizer {
    pub language: String,
}

impl TesseractRecognizer {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    async fn recognize(&self, image: &Path, output_base: &Path) -> Option<PathBuf> {
        let status = Command::new("tesseract")
            .arg(image)
            .arg(output_base)
            .arg("-l")
            .arg(&self.language)
            .arg("txt")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(s) => debug!("tesseract exited with {s} for {}", image.display()),
            Err(e) => warn!("failed to run tesseract for {}: {e}", image.display()),
        }

        let expected = expected_text_path(output_base);
        artifact_exists(&expected).then_some(expected)
    }
}

/// The text file a recogniser invocation is expected to create.
pub fn expected_text_path(output_base: &Path) -> PathBuf {
    let mut path = output_base.as_os_str().to_owned();
    path.push(".txt");
    PathBuf::from(path)
}

/// The named postcondition check: a step succeeded iff its expected output
/// artifact exists on disk.
pub fn artifact_exists(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn expected_path_appends_txt_without_replacing_dots() {
        // Page stems contain a dash and index, never an extension, but a
        // stem with a dot must not lose anything to set_extension.
        let base = Path::new("out/report.v2-0");
        assert_eq!(expected_text_path(base), PathBuf::from("out/report.v2-0.txt"));
    }

    #[test]
    fn artifact_exists_only_for_files() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("page.txt");
        assert!(!artifact_exists(&file));
        std::fs::write(&file, "text").unwrap();
        assert!(artifact_exists(&file));
        assert!(!artifact_exists(tmp.path()));
    }

    #[tokio::test]
    async fn missing_output_reports_none() {
        let tmp = TempDir::new().unwrap();
        let image = tmp.path().join("page-0.png");
        std::fs::write(&image, b"not a real image").unwrap();
        let ocr = TesseractRecognizer::new("eng");
        // Whether tesseract is installed or not, a junk image produces no
        // text artifact, so the adapter must report None.
        let result = ocr.recognize(&image, &tmp.path().join("page-0")).await;
        assert!(result.is_none());
    }
}
