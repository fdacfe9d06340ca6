//! # edgequake-pdf2json
//!
//! Convert one PDF, or every PDF in a directory, into JSON sidecar files.
//!
//! ## Pipeline Overview
//!
//! ```text
//! input path
//!  │
//!  ├─ 1. Initialize  version / help / missing input short-circuit
//!  ├─ 2. Resolve     stat: single file, or directory scan for *.pdf
//!  ├─ 3. Tasks       one FileTask at a time: validate → parse → write
//!  ├─ 4. Fold        each outcome folded into RunCounters
//!  └─ 5. Complete    one-line summary, exit code 0 iff every file converted
//! ```
//!
//! Each `<name>.pdf` becomes `<output_dir>/<name>.json` containing
//! `{"formImage": <payload>}`, where the payload comes from a
//! [`DocumentParser`]. The default parser, [`PdfiumParser`], extracts page
//! geometry and positioned text runs through pdfium.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2json::{BatchRun, PdfiumParserFactory, RunOptions};
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = RunOptions::builder().input("/data/forms").build()?;
//!     let run = BatchRun::new(options, Arc::new(PdfiumParserFactory::default()));
//!     let status = run.start().await?;
//!     if let Some(c) = status.counters() {
//!         eprintln!("{}", c.summary_line());
//!     }
//!     std::process::exit(status.exit_code());
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2json` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf2json = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod output;
pub mod parser;
pub mod progress;
pub mod task;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{BatchRun, Startup};
pub use config::{ParseVerbosity, RunOptions, RunOptionsBuilder};
pub use error::{FileError, Pdf2JsonError};
pub use output::{FileOutcome, RunCounters, RunStatus, StopReason};
pub use parser::pdfium::{PdfiumParser, PdfiumParserFactory};
pub use parser::{DocumentParser, ParseEvent, ParserFactory};
pub use progress::{
    Clock, NoopProgressCallback, ProcessExit, ProgressCallback, RunProgressCallback, SystemClock,
    Terminate,
};
pub use task::FileTask;
