//! CLI binary for edgequake-pdf2json.
//!
//! A thin shim over the library crate that maps CLI flags to `RunOptions`,
//! renders progress, and ends the process with the run's exit code.

use anyhow::{Context, Result};
use clap::{ArgAction, CommandFactory, Parser};
use edgequake_pdf2json::{
    BatchRun, FileOutcome, PdfiumParserFactory, ProcessExit, RunCounters, RunOptions,
    RunProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Label printed with the elapsed run time.
const RUN_TIMER: &str = concat!(
    env!("CARGO_PKG_NAME"),
    "@",
    env!("CARGO_PKG_VERSION"),
    " - ",
    env!("CARGO_PKG_HOMEPAGE")
);

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal reporter: usage/version text, a per-file progress bar, the
/// summary line and the run timer.
struct CliReporter {
    /// `None` when `--silent` or `--no-progress` is set.
    bar: Option<ProgressBar>,
}

impl CliReporter {
    fn new(show_progress: bool) -> Arc<Self> {
        let bar = show_progress.then(|| {
            let bar = ProgressBar::new(0);
            bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.cyan} {prefix:.bold}  \
                     [{bar:42.green/238}] {pos:>3}/{len} files  \
                     ⏱ {elapsed_precise}  {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏  ")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
            );
            bar.set_prefix("Converting");
            bar
        });
        Arc::new(Self { bar })
    }

    fn file_name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    }
}

impl RunProgressCallback for CliReporter {
    fn on_version(&self) {
        println!("{}", env!("CARGO_PKG_VERSION"));
    }

    fn on_help(&self, missing_input: bool) {
        if let Err(e) = Cli::command().print_help() {
            warn!("Failed to print help: {e}");
        }
        if missing_input {
            println!("\n-f is required to specify input directory or file.");
        }
    }

    fn on_run_start(&self, _input: &Path) {
        println!("\n{RUN_TIMER}");
    }

    fn on_batch_start(&self, total: usize) {
        if let Some(ref bar) = self.bar {
            bar.set_length(total as u64);
            bar.enable_steady_tick(Duration::from_millis(80));
        }
    }

    fn on_file_start(&self, _index: usize, _total: usize, path: &Path) {
        if let Some(ref bar) = self.bar {
            bar.set_message(Self::file_name(path));
        }
    }

    fn on_file_complete(&self, _index: usize, _total: usize, outcome: &FileOutcome) {
        let Some(ref bar) = self.bar else {
            return;
        };

        let name = Self::file_name(outcome.input());
        let line = match outcome {
            FileOutcome::Converted { output, .. } => format!(
                "  {} {}  {}",
                green("✓"),
                name,
                dim(&format!("→ {}", output.display()))
            ),
            FileOutcome::Skipped { reason, .. } => {
                format!("  {} {}  {}", dim("–"), name, dim(&format!("skipped ({reason})")))
            }
            FileOutcome::Failed { error, .. } => {
                // Truncate very long error messages to keep output tidy.
                let msg = error.to_string();
                let msg = if msg.chars().count() > 80 {
                    format!("{}\u{2026}", msg.chars().take(79).collect::<String>())
                } else {
                    msg
                };
                format!("  {} {}  {}", red("✗"), name, red(&msg))
            }
        };

        bar.println(line);
        bar.inc(1);
    }

    fn on_summary(&self, counters: &RunCounters) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
        println!("\n{}", counters.summary_line());
    }

    fn on_finish(&self, elapsed: Duration) {
        println!("{RUN_TIMER}: {:.3}ms", elapsed.as_secs_f64() * 1000.0);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert one file; writes ./forms/w9.json next to the input
  pdf2json -f ./forms/w9.pdf

  # Convert every PDF in a directory into another directory
  pdf2json -f ./forms -o ./json

  # Only log errors
  pdf2json -s -f ./forms

EXIT STATUS:
  0  every input file was converted
  1  at least one file failed or was skipped, or the input could not be read

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to libpdfium; otherwise ./ then the system library path
  RUST_LOG          Override the log filter (e.g. RUST_LOG=debug)
"#;

/// Convert PDF files to JSON.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2json",
    version,
    about = "Convert a PDF file, or every PDF file in a directory, to JSON",
    disable_help_flag = true,
    disable_version_flag = true,
    color = clap::ColorChoice::Auto,
    after_help = AFTER_HELP
)]
struct Cli {
    /// (required) Full path of input PDF file or a directory to scan for all PDF files.
    #[arg(short = 'f', long = "file", env = "PDF2JSON_FILE")]
    file: Option<PathBuf>,

    /// Output directory, must already exist. Existing JSON files with the same name are replaced.
    #[arg(
        short = 'o',
        long = "output-dir",
        visible_alias = "output_dir",
        env = "PDF2JSON_OUTPUT_DIR"
    )]
    output_dir: Option<PathBuf>,

    /// Only log errors, otherwise verbose.
    #[arg(short, long, env = "PDF2JSON_SILENT")]
    silent: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2JSON_NO_PROGRESS")]
    no_progress: bool,

    /// Path to an existing pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Display version.
    #[arg(short = 'v', long = "version", action = ArgAction::SetTrue)]
    show_version: bool,

    /// Display brief help information.
    #[arg(short = 'h', long = "help", action = ArgAction::SetTrue)]
    show_help: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar prints one line per file, so library INFO logs would
    // only duplicate it.
    let show_progress = !cli.silent && !cli.no_progress;
    let filter = if show_progress {
        "error"
    } else if cli.silent {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let options = build_options(&cli)?;
    let parsers = Arc::new(PdfiumParserFactory::new(cli.pdfium_lib.clone()));

    let run = BatchRun::new(options, parsers)
        .with_progress_callback(CliReporter::new(show_progress))
        .with_terminator(Arc::new(ProcessExit));

    run.start().await.context("Batch run aborted")?;

    Ok(())
}

/// Map CLI args to `RunOptions`.
fn build_options(cli: &Cli) -> Result<RunOptions> {
    let mut builder = RunOptions::builder()
        .silent(cli.silent)
        .show_version(cli.show_version)
        .show_help(cli.show_help);

    if let Some(ref file) = cli.file {
        builder = builder.input(file.clone());
    }
    if let Some(ref dir) = cli.output_dir {
        builder = builder.output_dir(dir.clone());
    }

    builder.build().context("Invalid configuration")
}
