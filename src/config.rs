//! Resolved run options for a batch conversion.
//!
//! The CLI front end parses flags; everything the batch needs from them is
//! carried in [`RunOptions`]. Help and version requests travel as plain
//! booleans so [`crate::batch::BatchRun::initialize`] can decide whether the
//! run proceeds, without the library knowing how flags were parsed.
//!
//! # Design choice: builder over constructor
//! Most callers set only the input path. The builder lets them rely on the
//! defaults for the rest and still get validation in one place.

use crate::error::Pdf2JsonError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Options for one batch run.
///
/// Built via [`RunOptions::builder()`] or using [`RunOptions::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdf2json::RunOptions;
///
/// let options = RunOptions::builder()
///     .input("/data/forms")
///     .output_dir("/data/json")
///     .silent(true)
///     .build()
///     .unwrap();
/// assert_eq!(options.parse_verbosity().level(), 0);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunOptions {
    /// A PDF file, or a directory scanned for PDF files. Required.
    pub input: Option<PathBuf>,

    /// Where JSON files are written. Defaults to each input file's directory.
    ///
    /// Must already exist; a missing output directory fails every file.
    pub output_dir: Option<PathBuf>,

    /// Only log errors and ask the parser for its quietest verbosity.
    pub silent: bool,

    /// Print the version and stop before touching any file.
    pub show_version: bool,

    /// Print usage and stop before touching any file.
    pub show_help: bool,
}

impl RunOptions {
    /// Create a new builder for `RunOptions`.
    pub fn builder() -> RunOptionsBuilder {
        RunOptionsBuilder {
            options: Self::default(),
        }
    }

    /// Verbosity handed to the parser collaborator.
    pub fn parse_verbosity(&self) -> ParseVerbosity {
        if self.silent {
            ParseVerbosity::SILENT
        } else {
            ParseVerbosity::VERBOSE
        }
    }

    /// Output directory for files found in `input_dir`.
    pub fn output_dir_for(&self, input_dir: &Path) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| input_dir.to_path_buf())
    }
}

/// Builder for [`RunOptions`].
#[derive(Debug)]
pub struct RunOptionsBuilder {
    options: RunOptions,
}

impl RunOptionsBuilder {
    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.input = Some(path.into());
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.output_dir = Some(dir.into());
        self
    }

    pub fn silent(mut self, v: bool) -> Self {
        self.options.silent = v;
        self
    }

    pub fn show_version(mut self, v: bool) -> Self {
        self.options.show_version = v;
        self
    }

    pub fn show_help(mut self, v: bool) -> Self {
        self.options.show_help = v;
        self
    }

    /// Build the options, validating constraints.
    ///
    /// A missing input is not an error here: `initialize()` reports it as a
    /// stop reason so the caller can print usage instead of failing.
    pub fn build(self) -> Result<RunOptions, Pdf2JsonError> {
        let o = &self.options;
        if o.input.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
            return Err(Pdf2JsonError::InvalidConfig(
                "Input path must not be empty".into(),
            ));
        }
        if o.output_dir
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            return Err(Pdf2JsonError::InvalidConfig(
                "Output directory must not be empty".into(),
            ));
        }
        Ok(self.options)
    }
}

/// Logging verbosity requested from the parser collaborator.
///
/// Only affects how chatty the parser is, never what it extracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParseVerbosity(u8);

impl ParseVerbosity {
    /// Errors only.
    pub const SILENT: ParseVerbosity = ParseVerbosity(0);
    /// Per-page detail.
    pub const VERBOSE: ParseVerbosity = ParseVerbosity(5);

    pub fn new(level: u8) -> Self {
        Self(level)
    }

    pub fn level(self) -> u8 {
        self.0
    }

    pub fn is_silent(self) -> bool {
        self.0 == 0
    }
}

impl Default for ParseVerbosity {
    fn default() -> Self {
        Self::VERBOSE
    }
}

impl fmt::Display for ParseVerbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
