//! Error types for the edgequake-pdf2json library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2JsonError`]: **Fatal**: the operation cannot proceed at all.
//!   At run level this means the input target could not be resolved (stat
//!   failed, unreadable directory) and no per-file accounting happens. Inside
//!   the pdfium collaborator it means one document could not be extracted;
//!   those surface to the batch as a parser error event.
//!
//! * [`FileError`]: **Non-fatal**: a single input file failed validation,
//!   parsing or writing. It is recorded in [`crate::output::FileOutcome`]
//!   and folded into the run counters; the batch moves on to the next file.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2json library.
///
/// Per-file failures use [`FileError`] and never abort a batch.
#[derive(Debug, Error)]
pub enum Pdf2JsonError {
    // ── Input resolution ──────────────────────────────────────────────────
    /// `stat` on the input target failed (missing path, permission denied).
    #[error("Exception: cannot access input '{path}': {source}")]
    InputUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input exists but is neither a regular file nor a directory.
    #[error("Exception: input '{path}' is neither a file nor a directory")]
    UnsupportedInput { path: PathBuf },

    /// The input directory could not be listed.
    #[error("Exception: cannot read directory '{path}': {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── PDF errors ────────────────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or place the library next to the working directory."
    )]
    PdfiumBindingFailed(String),

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password; batch conversion never supplies one.
    #[error("PDF '{path}' is encrypted and requires a password")]
    PasswordRequired { path: PathBuf },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single input file.
///
/// Validation variants are produced before any parser is constructed; the
/// rest come from the parser collaborator or the final JSON write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileError {
    // ── Validation ────────────────────────────────────────────────────────
    #[error("Input error: input directory doesn't exist - {dir}.")]
    InputDirMissing { dir: PathBuf },

    #[error("Input error: input file doesn't exist - {path}.")]
    InputFileMissing { path: PathBuf },

    #[error("Input error: output directory doesn't exist - {dir}.")]
    OutputDirMissing { dir: PathBuf },

    #[error("Input error: input file name doesn't have pdf extension - {file}.")]
    NotPdf { file: String },

    #[error("Input error: can not write to {path}: {reason}")]
    OutputNotWritable { path: PathBuf, reason: String },

    // ── Parsing ───────────────────────────────────────────────────────────
    /// The collaborator reported a data error.
    #[error("Exception: {detail}")]
    ParseFailed { path: PathBuf, detail: String },

    /// The collaborator reported data-ready without a usable payload.
    #[error("Exception: empty parsing result - {path}")]
    EmptyResult { path: PathBuf },

    // ── Output ────────────────────────────────────────────────────────────
    #[error("{input} => {output} Exception: {detail}")]
    WriteFailed {
        input: String,
        output: String,
        detail: String,
    },
}

impl FileError {
    /// `true` for failures detected before parsing was attempted.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            FileError::InputDirMissing { .. }
                | FileError::InputFileMissing { .. }
                | FileError::OutputDirMissing { .. }
                | FileError::NotPdf { .. }
                | FileError::OutputNotWritable { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_unavailable_display_keeps_path() {
        let e = Pdf2JsonError::InputUnavailable {
            path: PathBuf::from("/nope/in"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        let msg = e.to_string();
        assert!(msg.starts_with("Exception:"), "got: {msg}");
        assert!(msg.contains("/nope/in"), "got: {msg}");
    }

    #[test]
    fn empty_result_display() {
        let e = FileError::EmptyResult {
            path: PathBuf::from("/data/a.pdf"),
        };
        assert_eq!(
            e.to_string(),
            "Exception: empty parsing result - /data/a.pdf"
        );
    }

    #[test]
    fn write_failed_display() {
        let e = FileError::WriteFailed {
            input: "a.pdf".into(),
            output: "a.json".into(),
            detail: "disk full".into(),
        };
        assert_eq!(e.to_string(), "a.pdf => a.json Exception: disk full");
    }

    #[test]
    fn validation_classification() {
        assert!(FileError::NotPdf { file: "a.txt".into() }.is_validation());
        assert!(FileError::OutputDirMissing {
            dir: PathBuf::from("/out")
        }
        .is_validation());
        assert!(!FileError::ParseFailed {
            path: PathBuf::from("a.pdf"),
            detail: "bad xref".into()
        }
        .is_validation());
        assert!(!FileError::EmptyResult {
            path: PathBuf::from("a.pdf")
        }
        .is_validation());
    }
}
