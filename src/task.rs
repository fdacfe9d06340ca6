//! One input-file-to-JSON conversion attempt.
//!
//! ```text
//! Created ─▶ Validating ─┬─▶ Invalid ──────────────┐
//!                        ├─▶ Skipped ──────────────┤
//!                        └─▶ Parsing ─┬─▶ Success ─┼─▶ outcome ─▶ destroy()
//!                                     ├─▶ ParseErr ┤
//!                                     └─▶ WriteErr ┘
//! ```
//!
//! [`FileTask::process_file`] walks the state machine once and returns the
//! single [`FileOutcome`]. [`FileTask::destroy`] consumes the task, so a
//! slot cannot be reused without constructing a new one.

use crate::config::ParseVerbosity;
use crate::error::FileError;
use crate::output::FileOutcome;
use crate::parser::{DocumentParser, ParseEvent, ParserFactory};
use serde_json::Value;
use std::ffi::{OsStr, OsString};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Characters that may not start a (lower-cased, extension-less) file name.
const RESERVED_LEADING_CHARS: &str = "!@#$%^&*()+=[]\\';,/{}|\":<>?~`.-_ ";

/// The PDF extension, without the dot.
pub(crate) const PDF_EXTENSION: &str = "pdf";

/// Validation, parsing and output for a single PDF.
pub struct FileTask {
    input_dir: PathBuf,
    input_file: OsString,
    input_path: PathBuf,
    output_dir: PathBuf,
    output_file: Option<OsString>,
    output_path: Option<PathBuf>,
    verbosity: ParseVerbosity,
    parser: Option<Box<dyn DocumentParser>>,
    reported: bool,
}

impl FileTask {
    pub fn new(
        input_dir: impl Into<PathBuf>,
        input_file: impl Into<OsString>,
        output_dir: impl Into<PathBuf>,
        verbosity: ParseVerbosity,
    ) -> Self {
        let input_dir = input_dir.into();
        let input_file = input_file.into();
        let input_path = input_dir.join(&input_file);
        let output_dir = output_dir.into();

        Self {
            input_dir,
            input_file,
            input_path,
            output_dir,
            output_file: None,
            output_path: None,
            verbosity,
            parser: None,
            reported: false,
        }
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    /// Set only once validation succeeded.
    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    fn input_name(&self) -> String {
        self.input_file.to_string_lossy().into_owned()
    }

    fn output_name(&self) -> String {
        self.output_file
            .as_ref()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Check that the conversion can be attempted.
    ///
    /// Checks run in order and stop at the first failure: input directory,
    /// input file, output directory, `.pdf` extension, output writability.
    /// On success the output file name and path are derived: an exact
    /// lower-case `.pdf` suffix is replaced by `.json`, any other spelling
    /// keeps the full name (`Form.PDF` becomes `Form.PDF.json`).
    pub fn validate_params(&mut self) -> Result<(), FileError> {
        if !self.input_dir.exists() {
            return Err(FileError::InputDirMissing {
                dir: self.input_dir.clone(),
            });
        }
        if !self.input_path.exists() {
            return Err(FileError::InputFileMissing {
                path: self.input_path.clone(),
            });
        }
        if !self.output_dir.exists() {
            return Err(FileError::OutputDirMissing {
                dir: self.output_dir.clone(),
            });
        }

        let file = Path::new(&self.input_file);
        let is_pdf = file
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(PDF_EXTENSION));
        if !is_pdf {
            return Err(FileError::NotPdf {
                file: self.input_name(),
            });
        }

        let mut output_file = if file.extension() == Some(OsStr::new(PDF_EXTENSION)) {
            file.file_stem().unwrap_or_default().to_os_string()
        } else {
            file.as_os_str().to_os_string()
        };
        output_file.push(".json");
        let output_path = self.output_dir.join(&output_file);

        if output_path.exists() {
            info!("Output file will be replaced - {}", output_path.display());
        } else {
            // Create-exclusive probe; the caller never sees the empty file.
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&output_path)
            {
                Ok(probe) => {
                    info!(
                        "Transcoding {} to - {}",
                        self.input_name(),
                        output_path.display()
                    );
                    drop(probe);
                    std::fs::remove_file(&output_path).map_err(|e| {
                        FileError::OutputNotWritable {
                            path: output_path.clone(),
                            reason: e.to_string(),
                        }
                    })?;
                }
                Err(e) => {
                    return Err(FileError::OutputNotWritable {
                        path: output_path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        self.output_file = Some(output_file);
        self.output_path = Some(output_path);
        Ok(())
    }

    /// Lower-cased file name without its `.pdf` suffix.
    fn skip_candidate_name(&self) -> String {
        let lower = self.input_name().to_lowercase();
        match lower.strip_suffix(".pdf") {
            Some(stem) => stem.to_string(),
            None => lower,
        }
    }

    /// `Some(reason)` when the file name must not be converted.
    fn skip_reason(&self) -> Option<&'static str> {
        match self.skip_candidate_name().chars().next() {
            None => Some("invalid filename"),
            Some(c) if RESERVED_LEADING_CHARS.contains(c) => Some("invalid filename"),
            Some(_) => None,
        }
    }

    /// Run the task to its terminal state and report the outcome.
    ///
    /// Must be called at most once per task.
    pub async fn process_file(&mut self, parsers: &dyn ParserFactory) -> FileOutcome {
        debug_assert!(!self.reported, "FileTask::process_file called twice");
        self.reported = true;

        if let Err(error) = self.validate_params() {
            warn!("{}", error);
            return self.failed(error);
        }

        if let Some(reason) = self.skip_reason() {
            info!("Skipped PDF {} - {}.", self.input_name(), reason);
            return FileOutcome::Skipped {
                input: self.input_path.clone(),
                reason: reason.to_string(),
            };
        }

        self.parse_one_pdf(parsers).await
    }

    async fn parse_one_pdf(&mut self, parsers: &dyn ParserFactory) -> FileOutcome {
        let verbosity = self.verbosity;
        let input_path = self.input_path.clone();
        let parser = self.parser.insert(parsers.create_parser());
        let event = parser.load_pdf(&input_path, verbosity).await;

        if let Some(payload) = event.payload() {
            return self.write_one_json(payload).await;
        }

        match event {
            ParseEvent::DataReady(_) => {
                let error = FileError::EmptyResult {
                    path: self.input_path.clone(),
                };
                warn!("{}", error);
                self.failed(error)
            }
            ParseEvent::DataError(detail) => {
                let error = FileError::ParseFailed {
                    path: self.input_path.clone(),
                    detail,
                };
                warn!("{}", error);
                self.failed(error)
            }
        }
    }

    /// Write `{"formImage": payload}` via a temp file and rename.
    async fn write_one_json(&self, payload: &Value) -> FileOutcome {
        let Some(output_path) = self.output_path.clone() else {
            return self.failed(self.write_error("output path was not derived"));
        };

        let envelope = serde_json::json!({ "formImage": payload });
        let bytes = match serde_json::to_vec(&envelope) {
            Ok(b) => b,
            Err(e) => return self.failed(self.write_error(e)),
        };

        let mut tmp_name = self.output_file.clone().unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = self.output_dir.join(tmp_name);

        if let Err(e) = tokio::fs::write(&tmp_path, &bytes).await {
            return self.failed(self.write_error(e));
        }
        if let Err(e) = tokio::fs::rename(&tmp_path, &output_path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return self.failed(self.write_error(e));
        }

        info!(
            "{} => {} [{}] OK",
            self.input_name(),
            self.output_name(),
            self.output_dir.display()
        );
        FileOutcome::Converted {
            input: self.input_path.clone(),
            output: output_path,
        }
    }

    fn write_error(&self, detail: impl ToString) -> FileError {
        let error = FileError::WriteFailed {
            input: self.input_name(),
            output: self.output_name(),
            detail: detail.to_string(),
        };
        warn!("{}", error);
        error
    }

    fn failed(&self, error: FileError) -> FileOutcome {
        FileOutcome::Failed {
            input: self.input_path.clone(),
            error,
        }
    }

    /// Release the parser and drop the task.
    pub fn destroy(mut self) {
        if let Some(mut parser) = self.parser.take() {
            parser.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Scripted {
        event: ParseEvent,
        released: Arc<AtomicUsize>,
    }

    impl DocumentParser for Scripted {
        fn load_pdf<'a>(
            &'a mut self,
            _path: &'a Path,
            _verbosity: ParseVerbosity,
        ) -> BoxFuture<'a, ParseEvent> {
            let event = self.event.clone();
            async move { event }.boxed()
        }

        fn release(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct ScriptedFactory {
        event: ParseEvent,
        created: AtomicUsize,
        released: Arc<AtomicUsize>,
    }

    impl ScriptedFactory {
        fn new(event: ParseEvent) -> Self {
            Self {
                event,
                created: AtomicUsize::new(0),
                released: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl ParserFactory for ScriptedFactory {
        fn create_parser(&self) -> Box<dyn DocumentParser> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Box::new(Scripted {
                event: self.event.clone(),
                released: Arc::clone(&self.released),
            })
        }
    }

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"%PDF-1.4\n").unwrap();
    }

    #[test]
    fn validation_checks_run_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope");

        let mut t = FileTask::new(&missing, "a.pdf", tmp.path(), ParseVerbosity::SILENT);
        assert!(matches!(
            t.validate_params(),
            Err(FileError::InputDirMissing { .. })
        ));

        let mut t = FileTask::new(tmp.path(), "a.pdf", tmp.path(), ParseVerbosity::SILENT);
        assert!(matches!(
            t.validate_params(),
            Err(FileError::InputFileMissing { .. })
        ));

        touch(tmp.path(), "a.pdf");
        let mut t = FileTask::new(tmp.path(), "a.pdf", &missing, ParseVerbosity::SILENT);
        assert!(matches!(
            t.validate_params(),
            Err(FileError::OutputDirMissing { .. })
        ));

        touch(tmp.path(), "notes.txt");
        let mut t = FileTask::new(tmp.path(), "notes.txt", tmp.path(), ParseVerbosity::SILENT);
        assert!(matches!(t.validate_params(), Err(FileError::NotPdf { .. })));
        assert!(t.output_path().is_none());
    }

    #[test]
    fn successful_validation_derives_output_and_leaves_no_probe() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "Form.PDF");

        let mut t = FileTask::new(tmp.path(), "Form.PDF", tmp.path(), ParseVerbosity::SILENT);
        t.validate_params().unwrap();

        let expected = tmp.path().join("Form.PDF.json");
        assert_eq!(t.output_path(), Some(expected.as_path()));
        assert!(!expected.exists(), "writability probe must be removed");

        touch(tmp.path(), "Form.pdf");
        let mut t = FileTask::new(tmp.path(), "Form.pdf", tmp.path(), ParseVerbosity::SILENT);
        t.validate_params().unwrap();
        assert_eq!(t.output_path(), Some(tmp.path().join("Form.json").as_path()));
    }

    #[test]
    fn output_dir_that_is_a_file_is_not_writable() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "a.pdf");
        let not_a_dir = tmp.path().join("out");
        std::fs::write(&not_a_dir, b"").unwrap();

        let mut t = FileTask::new(tmp.path(), "a.pdf", &not_a_dir, ParseVerbosity::SILENT);
        match t.validate_params() {
            Err(FileError::OutputNotWritable { path, .. }) => {
                assert_eq!(path, not_a_dir.join("a.json"));
            }
            other => panic!("expected OutputNotWritable, got {other:?}"),
        }
        assert!(t.output_path().is_none());
    }

    #[tokio::test]
    async fn failed_rename_reports_write_error_and_removes_temp_file() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "a.pdf");
        std::fs::create_dir(tmp.path().join("a.json")).unwrap();
        let factory = ScriptedFactory::new(ParseEvent::DataReady(Some(json!({"Pages": []}))));

        let mut t = FileTask::new(tmp.path(), "a.pdf", tmp.path(), ParseVerbosity::SILENT);
        let outcome = t.process_file(&factory).await;
        t.destroy();

        match outcome.error() {
            Some(FileError::WriteFailed { input, output, .. }) => {
                assert_eq!(input, "a.pdf");
                assert_eq!(output, "a.json");
            }
            other => panic!("expected WriteFailed, got {other:?}"),
        }
        assert!(!tmp.path().join("a.json.tmp").exists());
        assert!(tmp.path().join("a.json").is_dir());
        assert_eq!(factory.released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn existing_output_is_not_a_validation_error() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "a.pdf");
        std::fs::write(tmp.path().join("a.json"), b"{}").unwrap();

        let mut t = FileTask::new(tmp.path(), "a.pdf", tmp.path(), ParseVerbosity::SILENT);
        assert!(t.validate_params().is_ok());
        assert!(tmp.path().join("a.json").exists());
    }

    #[test]
    fn reserved_leading_characters_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        for name in [".hidden.pdf", "_draft.pdf", "-x.pdf", " space.pdf", "#1.pdf"] {
            let t = FileTask::new(tmp.path(), name, tmp.path(), ParseVerbosity::SILENT);
            assert_eq!(t.skip_reason(), Some("invalid filename"), "{name}");
        }
        for name in ["a.pdf", "Invoice.PDF", "2024-report.pdf"] {
            let t = FileTask::new(tmp.path(), name, tmp.path(), ParseVerbosity::SILENT);
            assert_eq!(t.skip_reason(), None, "{name}");
        }
    }

    #[tokio::test]
    async fn data_ready_writes_envelope() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "w9.pdf");
        let factory = ScriptedFactory::new(ParseEvent::DataReady(Some(json!({"Pages": [1]}))));

        let mut t = FileTask::new(tmp.path(), "w9.pdf", tmp.path(), ParseVerbosity::VERBOSE);
        let outcome = t.process_file(&factory).await;
        t.destroy();

        assert!(outcome.is_success(), "{outcome:?}");
        let written: Value =
            serde_json::from_slice(&std::fs::read(tmp.path().join("w9.json")).unwrap()).unwrap();
        assert_eq!(written, json!({"formImage": {"Pages": [1]}}));
        assert!(!tmp.path().join("w9.json.tmp").exists());
        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
        assert_eq!(factory.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_payload_and_data_error_fail() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "a.pdf");

        let factory = ScriptedFactory::new(ParseEvent::DataReady(Some(Value::Null)));
        let mut t = FileTask::new(tmp.path(), "a.pdf", tmp.path(), ParseVerbosity::SILENT);
        let outcome = t.process_file(&factory).await;
        assert!(matches!(
            outcome.error(),
            Some(FileError::EmptyResult { .. })
        ));
        t.destroy();

        let factory = ScriptedFactory::new(ParseEvent::DataError("bad xref".into()));
        let mut t = FileTask::new(tmp.path(), "a.pdf", tmp.path(), ParseVerbosity::SILENT);
        let outcome = t.process_file(&factory).await;
        assert_eq!(
            outcome.error().map(|e| e.to_string()),
            Some("Exception: bad xref".to_string())
        );
        t.destroy();

        assert!(!tmp.path().join("a.json").exists());
    }

    #[test]
    fn invalid_and_skipped_files_never_create_a_parser() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), ".hidden.pdf");
        let factory = ScriptedFactory::new(ParseEvent::DataReady(Some(json!({}))));

        let mut t = FileTask::new(tmp.path(), ".hidden.pdf", tmp.path(), ParseVerbosity::SILENT);
        let outcome = tokio_test::block_on(t.process_file(&factory));
        assert!(matches!(outcome, FileOutcome::Skipped { .. }));
        t.destroy();

        let mut t = FileTask::new(tmp.path(), "gone.pdf", tmp.path(), ParseVerbosity::SILENT);
        let outcome = tokio_test::block_on(t.process_file(&factory));
        assert!(outcome.error().is_some_and(FileError::is_validation));
        t.destroy();

        assert_eq!(factory.created.load(Ordering::SeqCst), 0);
        assert!(!tmp.path().join(".hidden.json").exists());
    }
}
