//! The parser collaborator boundary.
//!
//! The batch never looks inside a PDF itself. It asks a [`DocumentParser`]
//! to load one file and waits for exactly one [`ParseEvent`]:
//!
//! ```text
//! FileTask ──load_pdf(path, verbosity)──▶ DocumentParser
//!          ◀──── DataReady(payload) | DataError(reason) ────
//! ```
//!
//! A fresh parser is created per task through a [`ParserFactory`] and
//! released when the task is destroyed, so no parser state leaks between
//! files.
//!
//! [`pdfium`] provides the default implementation used by the CLI.

pub mod pdfium;

use crate::config::ParseVerbosity;
use futures::future::BoxFuture;
use serde_json::Value;
use std::path::Path;

/// The single terminal event of one `load_pdf` call.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseEvent {
    /// Parsing finished. The payload may still be missing or empty.
    DataReady(Option<Value>),
    /// Parsing failed with a human-readable reason.
    DataError(String),
}

impl ParseEvent {
    /// The payload, if present and non-empty.
    ///
    /// `null` and the empty string count as empty; an empty object does not.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            ParseEvent::DataReady(Some(v)) if !is_empty_payload(v) => Some(v),
            _ => None,
        }
    }
}

fn is_empty_payload(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// One parser instance, owned by exactly one file task.
pub trait DocumentParser: Send {
    /// Parse the PDF at `path`. Called at most once per instance.
    fn load_pdf<'a>(
        &'a mut self,
        path: &'a Path,
        verbosity: ParseVerbosity,
    ) -> BoxFuture<'a, ParseEvent>;

    /// Drop any resources held by the parser.
    fn release(&mut self) {}
}

/// Creates one parser per file task.
pub trait ParserFactory: Send + Sync {
    fn create_parser(&self) -> Box<dyn DocumentParser>;
}

impl<F> ParserFactory for F
where
    F: Fn() -> Box<dyn DocumentParser> + Send + Sync,
{
    fn create_parser(&self) -> Box<dyn DocumentParser> {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use serde_json::json;

    struct Fixed(ParseEvent);

    impl DocumentParser for Fixed {
        fn load_pdf<'a>(
            &'a mut self,
            _path: &'a Path,
            _verbosity: ParseVerbosity,
        ) -> BoxFuture<'a, ParseEvent> {
            let event = self.0.clone();
            async move { event }.boxed()
        }
    }

    #[test]
    fn payload_presence_rules() {
        assert!(ParseEvent::DataReady(None).payload().is_none());
        assert!(ParseEvent::DataReady(Some(Value::Null)).payload().is_none());
        assert!(ParseEvent::DataReady(Some(json!(""))).payload().is_none());
        assert!(ParseEvent::DataError("boom".into()).payload().is_none());
        assert_eq!(
            ParseEvent::DataReady(Some(json!({"Pages": []}))).payload(),
            Some(&json!({"Pages": []}))
        );
        assert!(ParseEvent::DataReady(Some(json!({}))).payload().is_some());
    }

    #[test]
    fn closures_are_factories() {
        let factory = || -> Box<dyn DocumentParser> {
            Box::new(Fixed(ParseEvent::DataError("no engine".into())))
        };
        let mut parser = factory.create_parser();
        let event = tokio_test::block_on(parser.load_pdf(Path::new("a.pdf"), ParseVerbosity::SILENT));
        assert_eq!(event, ParseEvent::DataError("no engine".into()));
        parser.release();
    }
}
