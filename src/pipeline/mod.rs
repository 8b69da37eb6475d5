//! Pipeline stages backed by external tools.
//!
//! Each submodule wraps exactly one external capability behind a narrow
//! trait, so the run driver never shells out directly and tests can swap
//! in doubles that simulate success, failure, or partial output.
//!
//! ## Data Flow
//!
//! ```text
//! document ──▶ raster ──▶ ocr
//! (*.pdf)      (convert)  (tesseract)
//! ```
//!
//! 1. [`raster`] — rasterise every page of a PDF into `<stem>-<N>.png`
//!    images, discovered by scanning for the naming pattern
//! 2. [`ocr`] — recognise text from one page image into
//!    `<out_dir>/<stem>-<N>.txt`, success verified by artifact existence
//!
//! Both adapters deliberately ignore the external tool's exit status: the
//! tools are known to exit zero with partial output and non-zero while
//! still producing usable files. The only success oracle is whether the
//! expected output artifact exists afterwards.

pub mod ocr;
pub mod raster;
