//! Reporting and process-level capabilities injected into a batch run.
//!
//! Inject an [`Arc<dyn RunProgressCallback>`] via
//! [`crate::batch::BatchRun::with_progress_callback`] to receive events as
//! the run resolves its input and processes each file.
//!
//! The run never touches a global timer or calls `std::process::exit`
//! directly. Elapsed time comes from an injected [`Clock`], and the final
//! exit code is handed to an injected [`Terminate`] implementation. The
//! binary wires in [`SystemClock`] and [`ProcessExit`]; tests use their own.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2json::{FileOutcome, RunProgressCallback};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl RunProgressCallback for CountingCallback {
//!     fn on_file_complete(&self, index: usize, total: usize, _outcome: &FileOutcome) {
//!         let done = self.done.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("file {}/{} done ({done} so far)", index + 1, total);
//!     }
//! }
//! ```

use crate::output::{FileOutcome, RunCounters};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Called by the batch run as it progresses.
///
/// All methods have default no-op implementations so callers only
/// override what they care about. Events arrive strictly in order: the run
/// has at most one file in flight.
pub trait RunProgressCallback: Send + Sync {
    /// `--version` was requested; the run stops afterwards.
    fn on_version(&self) {}

    /// Usage was requested, or the required input was missing.
    fn on_help(&self, missing_input: bool) {
        let _ = missing_input;
    }

    /// The run is about to stat `input`.
    fn on_run_start(&self, input: &Path) {
        let _ = input;
    }

    /// The input resolved to `total` candidate files.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// A task for `path` was constructed (0-indexed).
    fn on_file_start(&self, index: usize, total: usize, path: &Path) {
        let _ = (index, total, path);
    }

    /// The task for file `index` reported its outcome.
    fn on_file_complete(&self, index: usize, total: usize, outcome: &FileOutcome) {
        let _ = (index, total, outcome);
    }

    /// Final counters, printed once per completed run.
    fn on_summary(&self, counters: &RunCounters) {
        let _ = counters;
    }

    /// The run timer stopped. Fires on every path that ends a run.
    fn on_finish(&self, elapsed: Duration) {
        let _ = elapsed;
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl RunProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::batch::BatchRun`].
pub type ProgressCallback = Arc<dyn RunProgressCallback>;

/// Source of the run timer.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Ends the process once the run has completed.
pub trait Terminate: Send + Sync {
    fn terminate(&self, exit_code: i32);
}

/// Calls [`std::process::exit`]. Only the binary should install this.
pub struct ProcessExit;

impl Terminate for ProcessExit {
    fn terminate(&self, exit_code: i32) {
        std::process::exit(exit_code);
    }
}
