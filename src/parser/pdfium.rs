//! Default parser collaborator backed by pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves extraction onto the blocking pool so
//! the batch's single scheduler thread keeps flushing logs while a document
//! is parsed.
//!
//! ## Payload shape
//!
//! ```text
//! { "Transcoder": "edgequake-pdf2json@0.1.0",
//!   "Meta":  { "Title": …, "PageCount": 2, … },
//!   "Width": 612.0,
//!   "Pages": [ { "Width": 612.0, "Height": 792.0,
//!                "Texts": [ { "x": 72.0, "y": 90.5, "w": 120.3, "h": 11.0, "T": "Name" } ] } ] }
//! ```
//!
//! Coordinates are PDF points measured from the top-left corner of the page.

use crate::config::ParseVerbosity;
use crate::error::Pdf2JsonError;
use crate::parser::{DocumentParser, ParseEvent, ParserFactory};
use futures::future::BoxFuture;
use futures::FutureExt;
use pdfium_render::prelude::*;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Value of the `Transcoder` field in every payload.
const TRANSCODER: &str = concat!(env!("CARGO_PKG_NAME"), "@", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct FormImage {
    transcoder: &'static str,
    meta: DocumentMeta,
    width: f32,
    pages: Vec<PageImage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DocumentMeta {
    title: Option<String>,
    author: Option<String>,
    subject: Option<String>,
    creator: Option<String>,
    producer: Option<String>,
    creation_date: Option<String>,
    #[serde(rename = "ModDate")]
    modification_date: Option<String>,
    pdf_version: String,
    page_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PageImage {
    width: f32,
    height: f32,
    texts: Vec<TextRun>,
}

#[derive(Debug, Serialize)]
struct TextRun {
    x: f32,
    y: f32,
    w: f32,
    h: f32,
    #[serde(rename = "T")]
    text: String,
}

/// Builds a [`PdfiumParser`] per task, all bound to the same library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumParserFactory {
    library_path: Option<PathBuf>,
}

impl PdfiumParserFactory {
    /// `library_path` points at a pdfium shared library; `None` searches the
    /// working directory, then the system library path.
    pub fn new(library_path: Option<PathBuf>) -> Self {
        Self { library_path }
    }
}

impl ParserFactory for PdfiumParserFactory {
    fn create_parser(&self) -> Box<dyn DocumentParser> {
        Box::new(PdfiumParser {
            library_path: self.library_path.clone(),
        })
    }
}

/// One pdfium-backed parse of one document.
#[derive(Debug)]
pub struct PdfiumParser {
    library_path: Option<PathBuf>,
}

impl DocumentParser for PdfiumParser {
    fn load_pdf<'a>(
        &'a mut self,
        path: &'a Path,
        verbosity: ParseVerbosity,
    ) -> BoxFuture<'a, ParseEvent> {
        let pdf_path = path.to_path_buf();
        let library = self.library_path.clone();

        async move {
            let joined = tokio::task::spawn_blocking(move || {
                extract_form_image(&pdf_path, library.as_deref(), verbosity)
            })
            .await;

            match joined {
                Ok(Ok(payload)) => ParseEvent::DataReady(Some(payload)),
                Ok(Err(e)) => ParseEvent::DataError(e.to_string()),
                Err(e) => ParseEvent::DataError(
                    Pdf2JsonError::Internal(format!("Parser task panicked: {e}")).to_string(),
                ),
            }
        }
        .boxed()
    }
}

/// Bind pdfium from an explicit path, the working directory, or the system.
fn bind_pdfium(library_path: Option<&Path>) -> Result<Pdfium, Pdf2JsonError> {
    let bindings = match library_path {
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| Pdf2JsonError::PdfiumBindingFailed(format!("{e:?}")))?;

    Ok(Pdfium::new(bindings))
}

/// Blocking extraction of one document into its JSON payload.
fn extract_form_image(
    pdf_path: &Path,
    library_path: Option<&Path>,
    verbosity: ParseVerbosity,
) -> Result<Value, Pdf2JsonError> {
    let pdfium = bind_pdfium(library_path)?;

    let document = pdfium.load_pdf_from_file(pdf_path, None).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            Pdf2JsonError::PasswordRequired {
                path: pdf_path.to_path_buf(),
            }
        } else {
            Pdf2JsonError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    if !verbosity.is_silent() {
        info!("PDF loaded: {} ({} pages)", pdf_path.display(), total_pages);
    }

    let mut page_images = Vec::with_capacity(total_pages);
    for (idx, page) in pages.iter().enumerate() {
        let width = page.width().value;
        let height = page.height().value;

        let text = page.text().map_err(|e| Pdf2JsonError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: format!("page {}: {:?}", idx + 1, e),
        })?;

        let texts: Vec<TextRun> = text
            .segments()
            .iter()
            .filter_map(|segment| {
                let content = segment.text();
                if content.trim().is_empty() {
                    return None;
                }
                let bounds = segment.bounds();
                Some(TextRun {
                    x: bounds.left().value,
                    y: height - bounds.top().value,
                    w: bounds.width().value,
                    h: bounds.height().value,
                    text: content,
                })
            })
            .collect();

        if !verbosity.is_silent() {
            debug!(
                "Parsed page {}/{}: {:.0}x{:.0} pt, {} text runs",
                idx + 1,
                total_pages,
                width,
                height,
                texts.len()
            );
        }

        page_images.push(PageImage {
            width,
            height,
            texts,
        });
    }

    let form_image = FormImage {
        transcoder: TRANSCODER,
        meta: read_metadata(&document, total_pages),
        width: page_images.first().map(|p| p.width).unwrap_or(0.0),
        pages: page_images,
    };

    serde_json::to_value(&form_image)
        .map_err(|e| Pdf2JsonError::Internal(format!("Failed to serialise payload: {e}")))
}

fn read_metadata(document: &PdfDocument<'_>, page_count: usize) -> DocumentMeta {
    let metadata = document.metadata();

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    DocumentMeta {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
        modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
        pdf_version: format!("{:?}", document.version()),
        page_count,
    }
}
