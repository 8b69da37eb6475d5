//! CLI binary for pdfprep.
//!
//! A thin shim over the library crate: maps CLI flags to `RunConfig`,
//! wires up the console/file log sink, and prints the run report.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use pdfprep::{LogSink, OnError, RunConfig, RunError};
use std::io::Write;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Preprocess every PDF in the current directory
  pdfprep

  # Custom input/output directories, keep the source PDFs
  pdfprep -i scans -o text --keep-pdfs

  # Aggregate all extracted text into one file, 8 OCR workers
  pdfprep --aggregate all-text.txt -j 8

  # Dry-ish run: keep every file, log to a chosen path
  pdfprep --no-delete --log-file run.log

  # Stop at the first error instead of continuing
  pdfprep --on-error exit

  # Machine-readable report
  pdfprep --json > report.json

EXTERNAL TOOLS:
  ImageMagick `convert` rasterises PDF pages and `tesseract` performs the
  OCR. Both must be on PATH; the run refuses to start otherwise.

LOGGING:
  Progress lines go to stdout (errors to stderr, even under --quiet) and,
  timestamped, to the log file. Diagnostics honour RUST_LOG as usual.
"#;

/// Batch-preprocess scanned PDFs into plain text via OCR.
#[derive(Parser, Debug)]
#[command(
    name = "pdfprep",
    version,
    about = "Batch-preprocess scanned PDFs into plain text via OCR",
    long_about = "Rasterise every PDF in a directory into per-page images (ImageMagick \
`convert`), recognise text from each page (`tesseract`), and collect the results as \
per-page text files or one aggregate file. Intermediate files are deleted as steps \
succeed unless told otherwise.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory scanned (non-recursively) for *.pdf files.
    #[arg(short, long, env = "PDFPREP_INPUT_DIR", default_value = ".")]
    input_dir: PathBuf,

    /// Directory receiving extracted text files.
    #[arg(short, long, env = "PDFPREP_OUTPUT_DIR", default_value = "extracted-text")]
    output_dir: PathBuf,

    /// Directory where intermediate page images are produced.
    #[arg(long, env = "PDFPREP_WORK_DIR", default_value = ".")]
    work_dir: PathBuf,

    /// Append all extracted text to this single file instead of leaving
    /// per-page text files.
    #[arg(short, long, env = "PDFPREP_AGGREGATE")]
    aggregate: Option<PathBuf>,

    /// Keep source PDFs after successful rasterisation.
    #[arg(short, long)]
    keep_pdfs: bool,

    /// Keep intermediate page images after successful OCR.
    #[arg(short = 'p', long)]
    keep_pngs: bool,

    /// Keep every file (overrides --keep-pdfs/--keep-pngs).
    #[arg(short, long)]
    no_delete: bool,

    /// Error policy: continue past errors or exit on the first one.
    #[arg(long, env = "PDFPREP_ON_ERROR", value_enum, default_value = "continue")]
    on_error: OnErrorArg,

    /// Number of concurrent OCR workers per document (default: CPU count).
    #[arg(short, long, env = "PDFPREP_JOBS")]
    jobs: Option<usize>,

    /// Rasterisation density (72–600).
    #[arg(long, env = "PDFPREP_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// OCR language code passed to tesseract.
    #[arg(long, env = "PDFPREP_LANG", default_value = "eng")]
    lang: String,

    /// Log file path (default: preprocess_log_<timestamp>.txt).
    #[arg(short, long, env = "PDFPREP_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Do not write a log file.
    #[arg(long)]
    no_log: bool,

    /// Suppress progress output on the console (errors still shown).
    #[arg(short, long, env = "PDFPREP_QUIET")]
    quiet: bool,

    /// Print the run report as JSON to stdout.
    #[arg(long)]
    json: bool,

    /// Enable DEBUG-level tracing diagnostics.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OnErrorArg {
    Continue,
    Exit,
}

impl From<OnErrorArg> for OnError {
    fn from(v: OnErrorArg) -> Self {
        match v {
            OnErrorArg::Continue => OnError::Continue,
            OnErrorArg::Exit => OnError::Exit,
        }
    }
}

/// The CLI's log sink: progress lines to stdout, error lines to stderr
/// (even under `--quiet`), and every line timestamped into the log file.
struct CliSink {
    quiet: bool,
    file: Option<Mutex<std::fs::File>>,
}

impl CliSink {
    fn open(quiet: bool, log_file: Option<&PathBuf>) -> Result<Self> {
        let file = match log_file {
            Some(path) => Some(Mutex::new(
                std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("Failed to open log file {}", path.display()))?,
            )),
            None => None,
        };
        Ok(Self { quiet, file })
    }
}

impl LogSink for CliSink {
    fn record(&self, line: &str) {
        if line.starts_with("Error:") {
            eprintln!("{line}");
        } else if !self.quiet {
            println!("{line}");
        }
        if let Some(file) = &self.file {
            let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
            if let Ok(mut f) = file.lock() {
                let _ = writeln!(f, "{stamp}: {line}");
            }
        }
    }
}

/// Refuse to start without the external tools on PATH; a missing tool
/// would otherwise surface as every single document failing.
fn check_external_tools() -> Result<()> {
    for (tool, version_flag) in [("convert", "-version"), ("tesseract", "--version")] {
        std::process::Command::new(tool)
            .arg(version_flag)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| {
                format!("Required tool '{tool}' not found in PATH (install ImageMagick and Tesseract)")
            })?;
    }
    Ok(())
}

fn default_log_file_name() -> PathBuf {
    PathBuf::from(format!(
        "preprocess_log_{}.txt",
        Local::now().format("%Y%m%d_%H%M%S")
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The sink carries all user-facing progress; tracing stays quiet unless
    // asked for diagnostics.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    check_external_tools()?;

    // ── Build config ─────────────────────────────────────────────────────
    let mut builder = RunConfig::builder()
        .input_dir(&cli.input_dir)
        .output_dir(&cli.output_dir)
        .work_dir(&cli.work_dir)
        .quiet(cli.quiet)
        .keep_pdfs(cli.keep_pdfs)
        .keep_pngs(cli.keep_pngs)
        .no_delete(cli.no_delete)
        .on_error(cli.on_error.into())
        .dpi(cli.dpi)
        .language(&cli.lang);
    if !cli.no_log {
        builder = builder.log_file(cli.log_file.clone().unwrap_or_else(default_log_file_name));
    }
    if let Some(path) = &cli.aggregate {
        builder = builder.aggregate_file(path);
    }
    if let Some(jobs) = cli.jobs {
        builder = builder.concurrency(jobs);
    }
    let mut config = builder.build().context("Invalid configuration")?;

    // The sink reads its settings back from the resolved config, so what
    // the run reports as `quiet`/`log_file` is exactly what the sink does.
    let sink = Arc::new(CliSink::open(config.quiet, config.log_file.as_ref())?);
    config.log_sink = Some(sink as Arc<dyn LogSink>);

    // ── Run ──────────────────────────────────────────────────────────────
    match pdfprep::run(&config).await {
        Ok(report) => {
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report)
                        .context("Failed to serialise run report")?
                );
            }
            Ok(())
        }
        Err(err @ RunError::Aborted { .. }) => {
            // Abort is fail-loud: no summary was emitted and the process
            // exits non-zero.
            Err(anyhow::Error::new(err).context("Run aborted on first error"))
        }
        Err(err) => Err(anyhow::Error::new(err).context("Run failed")),
    }
}
