//! Batch orchestration: resolve the input, drive file tasks, decide the exit code.
//!
//! ## Why strictly sequential?
//!
//! Files are processed one at a time from an ordered queue. The next
//! [`FileTask`] is only constructed after the previous one has reported and
//! been destroyed, so at most one parser and one output file are alive at
//! any moment, and per-file log lines and counter updates come out in
//! directory order regardless of I/O latency.
//!
//! ```text
//! start ─▶ initialize ─┬─▶ Stop(version | help | missing input)
//!                      └─▶ stat input ─┬─▶ file ──────▶ [task] ─────────┐
//!                                      └─▶ directory ─▶ [task, task, …] ┴─▶ complete
//! ```
//!
//! A per-file failure is recorded and the queue advances. Only a failure to
//! resolve the input itself aborts the run.

use crate::config::RunOptions;
use crate::error::Pdf2JsonError;
use crate::output::{RunCounters, RunStatus, StopReason};
use crate::parser::ParserFactory;
use crate::progress::{Clock, NoopProgressCallback, ProgressCallback, SystemClock, Terminate};
use crate::task::{FileTask, PDF_EXTENSION};
use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Result of [`BatchRun::initialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Startup {
    /// Resolve and process this input.
    Proceed(PathBuf),
    /// Do not touch any file.
    Stop(StopReason),
}

/// One invocation of the converter over a file or a directory.
pub struct BatchRun {
    options: RunOptions,
    parsers: Arc<dyn ParserFactory>,
    progress: ProgressCallback,
    clock: Arc<dyn Clock>,
    terminator: Option<Arc<dyn Terminate>>,
    started_at: Option<Instant>,
}

impl BatchRun {
    pub fn new(options: RunOptions, parsers: Arc<dyn ParserFactory>) -> Self {
        Self {
            options,
            parsers,
            progress: Arc::new(NoopProgressCallback),
            clock: Arc::new(SystemClock),
            terminator: None,
            started_at: None,
        }
    }

    pub fn with_progress_callback(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Without a terminator the exit code is only returned in [`RunStatus`].
    pub fn with_terminator(mut self, terminator: Arc<dyn Terminate>) -> Self {
        self.terminator = Some(terminator);
        self
    }

    /// Start the run timer and decide whether to proceed.
    ///
    /// Version and help requests, or a missing input, are reported through
    /// the progress callback; no file is touched and counters stay at zero.
    pub fn initialize(&mut self) -> Startup {
        self.started_at = Some(self.clock.now());

        if self.options.show_version {
            self.progress.on_version();
            return Startup::Stop(StopReason::Version);
        }
        if self.options.show_help {
            self.progress.on_help(false);
            return Startup::Stop(StopReason::Help);
        }
        match &self.options.input {
            Some(input) => Startup::Proceed(input.clone()),
            None => {
                self.progress.on_help(true);
                Startup::Stop(StopReason::MissingInput)
            }
        }
    }

    /// Run to completion.
    ///
    /// # Errors
    /// Returns `Err(Pdf2JsonError)` only when the input cannot be resolved
    /// (stat failure, unsupported file type, unreadable directory). Per-file
    /// failures are folded into the counters of `RunStatus::Completed`.
    pub async fn start(mut self) -> Result<RunStatus, Pdf2JsonError> {
        let input = match self.initialize() {
            Startup::Proceed(input) => input,
            Startup::Stop(reason) => {
                self.stop_timer();
                return Ok(RunStatus::Stopped(reason));
            }
        };

        self.progress.on_run_start(&input);

        match self.dispatch(&input).await {
            Ok(counters) => {
                let exit_code = self.complete(counters).await;
                Ok(RunStatus::Completed {
                    counters,
                    exit_code,
                })
            }
            Err(e) => {
                error!("{}", e);
                self.stop_timer();
                Err(e)
            }
        }
    }

    async fn dispatch(&self, input: &Path) -> Result<RunCounters, Pdf2JsonError> {
        let metadata =
            tokio::fs::metadata(input)
                .await
                .map_err(|source| Pdf2JsonError::InputUnavailable {
                    path: input.to_path_buf(),
                    source,
                })?;

        if metadata.is_file() {
            Ok(self.process_one_file(input).await)
        } else if metadata.is_dir() {
            self.process_one_directory(input).await
        } else {
            Err(Pdf2JsonError::UnsupportedInput {
                path: input.to_path_buf(),
            })
        }
    }

    /// Process a single file; `input_count` is 1.
    pub async fn process_one_file(&self, input: &Path) -> RunCounters {
        let input_dir = input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let input_file = input
            .file_name()
            .unwrap_or(input.as_os_str())
            .to_os_string();

        self.progress.on_batch_start(1);
        self.process_files(input_dir, &[input_file], RunCounters::with_inputs(1))
            .await
    }

    /// Process every PDF in `dir`, in file-name order.
    pub async fn process_one_directory(&self, dir: &Path) -> Result<RunCounters, Pdf2JsonError> {
        let files = list_pdf_files(dir).await?;
        let counters = RunCounters::with_inputs(files.len());
        self.progress.on_batch_start(files.len());

        if files.is_empty() {
            info!("No PDF files found. [{}].", dir.display());
            return Ok(counters);
        }

        Ok(self.process_files(dir, &files, counters).await)
    }

    /// Drain `files` one task at a time, folding each outcome into `counters`.
    pub async fn process_files(
        &self,
        input_dir: &Path,
        files: &[OsString],
        counters: RunCounters,
    ) -> RunCounters {
        let total = files.len();
        let verbosity = self.options.parse_verbosity();
        let output_dir = self.options.output_dir_for(input_dir);
        let mut queue: VecDeque<(usize, &OsString)> = files.iter().enumerate().collect();
        let mut counters = counters;

        while let Some((index, file)) = queue.pop_front() {
            let mut task = FileTask::new(input_dir, file.clone(), &output_dir, verbosity);
            self.progress.on_file_start(index, total, task.input_path());

            let outcome = task.process_file(self.parsers.as_ref()).await;
            counters = counters.record(&outcome);
            self.progress.on_file_complete(index, total, &outcome);

            task.destroy();
        }

        counters
    }

    /// Report the summary, then stop the timer and terminate on the next
    /// scheduler turn. Returns the exit code.
    pub async fn complete(&self, counters: RunCounters) -> i32 {
        debug!("Run complete: {}", counters.summary_line());
        self.progress.on_summary(&counters);

        // Let pending log output flush before the process may exit.
        tokio::task::yield_now().await;

        self.stop_timer();
        let exit_code = counters.exit_code();
        if let Some(ref terminator) = self.terminator {
            terminator.terminate(exit_code);
        }
        exit_code
    }

    fn stop_timer(&self) {
        let elapsed = self
            .started_at
            .map(|start| self.clock.now().saturating_duration_since(start))
            .unwrap_or(Duration::ZERO);
        self.progress.on_finish(elapsed);
    }
}

/// Regular files in `dir` whose name ends in `.pdf` (any case), sorted by name.
async fn list_pdf_files(dir: &Path) -> Result<Vec<OsString>, Pdf2JsonError> {
    let read_err = |source: std::io::Error| Pdf2JsonError::DirectoryRead {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_err)?;
    let suffix = format!(".{PDF_EXTENSION}");
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
        let name = entry.file_name();
        if !name.to_string_lossy().to_lowercase().ends_with(&suffix) {
            continue;
        }
        // Follow symlinks; directories named `*.pdf` are not inputs.
        match tokio::fs::metadata(entry.path()).await {
            Ok(m) if m.is_file() => files.push(name),
            _ => debug!("Ignoring non-file entry {}", entry.path().display()),
        }
    }

    files.sort();
    Ok(files)
}
