//! Per-file outcomes and the run-wide counter accumulator.
//!
//! Each [`crate::task::FileTask`] reports exactly one [`FileOutcome`]; the
//! batch folds outcomes into [`RunCounters`] one at a time, in processing
//! order. Counters are a plain `Copy` value rather than shared mutable
//! state, so `success + failed <= input` can be checked after every fold.

use crate::error::FileError;
use serde::Serialize;
use std::path::PathBuf;

/// The terminal state of one file task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// The JSON envelope was written.
    Converted { input: PathBuf, output: PathBuf },
    /// The file name was rejected; nothing was parsed or written and
    /// neither counter moves.
    Skipped { input: PathBuf, reason: String },
    /// Validation, parsing or writing failed.
    Failed { input: PathBuf, error: FileError },
}

impl FileOutcome {
    pub fn input(&self) -> &PathBuf {
        match self {
            FileOutcome::Converted { input, .. }
            | FileOutcome::Skipped { input, .. }
            | FileOutcome::Failed { input, .. } => input,
        }
    }

    pub fn error(&self) -> Option<&FileError> {
        match self {
            FileOutcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FileOutcome::Converted { .. })
    }
}

/// Run-wide counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounters {
    pub input_count: usize,
    pub success_count: usize,
    pub failed_count: usize,
    /// Printed in the summary; no current code path increments it.
    pub warning_count: usize,
}

impl RunCounters {
    /// Counters for a batch of `n` inputs, nothing processed yet.
    pub fn with_inputs(n: usize) -> Self {
        Self {
            input_count: n,
            ..Self::default()
        }
    }

    /// Fold one outcome into the counters.
    #[must_use]
    pub fn record(self, outcome: &FileOutcome) -> Self {
        let mut next = self;
        match outcome {
            FileOutcome::Converted { .. } => next.success_count += 1,
            FileOutcome::Failed { .. } => next.failed_count += 1,
            FileOutcome::Skipped { .. } => {}
        }
        debug_assert!(next.accounted() <= next.input_count);
        next
    }

    /// Files that ended in success or failure. Skips are not accounted.
    pub fn accounted(&self) -> usize {
        self.success_count + self.failed_count
    }

    /// `0` when every input converted, else `1`.
    ///
    /// A skipped file therefore yields `1` even though nothing failed.
    pub fn exit_code(&self) -> i32 {
        if self.success_count == self.input_count {
            0
        } else {
            1
        }
    }

    /// The one-line run summary.
    pub fn summary_line(&self) -> String {
        format!(
            "{} input files\t{} success\t{} fail\t{} warning.",
            self.input_count, self.success_count, self.failed_count, self.warning_count
        )
    }
}

/// Why a run stopped before resolving its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Version,
    Help,
    MissingInput,
}

/// What [`crate::batch::BatchRun::start`] returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// `initialize()` declined to proceed; no files were touched.
    Stopped(StopReason),
    /// The batch ran to completion (possibly with per-file failures).
    Completed { counters: RunCounters, exit_code: i32 },
}

impl RunStatus {
    pub fn counters(&self) -> Option<RunCounters> {
        match self {
            RunStatus::Completed { counters, .. } => Some(*counters),
            RunStatus::Stopped(_) => None,
        }
    }

    /// Exit code the process should end with.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunStatus::Completed { exit_code, .. } => *exit_code,
            RunStatus::Stopped(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converted(name: &str) -> FileOutcome {
        FileOutcome::Converted {
            input: PathBuf::from(name),
            output: PathBuf::from(format!("{name}.json")),
        }
    }

    #[test]
    fn record_folds_each_outcome_kind() {
        let failed = FileOutcome::Failed {
            input: PathBuf::from("b.pdf"),
            error: FileError::EmptyResult {
                path: PathBuf::from("b.pdf"),
            },
        };
        let skipped = FileOutcome::Skipped {
            input: PathBuf::from(".c.pdf"),
            reason: "invalid filename".into(),
        };

        let c = RunCounters::with_inputs(3)
            .record(&converted("a.pdf"))
            .record(&failed)
            .record(&skipped);

        assert_eq!(c.success_count, 1);
        assert_eq!(c.failed_count, 1);
        assert_eq!(c.accounted(), 2);
        assert!(c.accounted() < c.input_count);
    }

    #[test]
    fn exit_code_requires_every_input_to_succeed() {
        assert_eq!(RunCounters::default().exit_code(), 0);
        assert_eq!(
            RunCounters::with_inputs(1).record(&converted("a.pdf")).exit_code(),
            0
        );
        let skipped_only = RunCounters::with_inputs(1).record(&FileOutcome::Skipped {
            input: PathBuf::from("_x.pdf"),
            reason: "invalid filename".into(),
        });
        assert_eq!(skipped_only.failed_count, 0);
        assert_eq!(skipped_only.exit_code(), 1);
    }

    #[test]
    fn summary_line_format() {
        let c = RunCounters {
            input_count: 4,
            success_count: 2,
            failed_count: 1,
            warning_count: 0,
        };
        assert_eq!(
            c.summary_line(),
            "4 input files\t2 success\t1 fail\t0 warning."
        );
    }

    #[test]
    fn stopped_status_has_no_counters() {
        let s = RunStatus::Stopped(StopReason::Help);
        assert_eq!(s.counters(), None);
        assert_eq!(s.exit_code(), 0);
    }
}
