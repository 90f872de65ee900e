//! Plain-text extraction from corpus files.
//!
//! The corpus scanner hands each file's path and bytes to a [`TextExtractor`].
//! [`FileExtractor`] dispatches on the file extension:
//!
//! | Extension | Method |
//! |-----------|--------|
//! | `pdf` | `pdf-extract` |
//! | `docx` | `word/document.xml` via `zip` + `quick-xml`, one line per paragraph |
//! | `txt`, `md` | UTF-8 (lossy) |
//!
//! A failed extraction is an error for that file only; the scanner logs it
//! and moves on.

use std::io::{Cursor, Read};
use std::path::Path;

use quick_xml::events::Event;
use thiserror::Error;

/// Upper bound on the decompressed size of a DOCX body.
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported file type: {0}")]
    Unsupported(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("DOCX extraction failed: {0}")]
    Docx(String),
}

/// Turns raw file content into plain text.
pub trait TextExtractor: Send + Sync {
    /// Whether this extractor handles `path`.
    fn supports(&self, path: &Path) -> bool;

    fn extract(&self, path: &Path, bytes: &[u8]) -> Result<String, ExtractError>;
}

/// Extension-dispatching extractor for PDF, DOCX and plain text.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileExtractor;

fn extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

impl TextExtractor for FileExtractor {
    fn supports(&self, path: &Path) -> bool {
        matches!(extension(path).as_str(), "pdf" | "docx" | "txt" | "md")
    }

    fn extract(&self, path: &Path, bytes: &[u8]) -> Result<String, ExtractError> {
        match extension(path).as_str() {
            "pdf" => extract_pdf(bytes),
            "docx" => extract_docx(bytes),
            "txt" | "md" => Ok(String::from_utf8_lossy(bytes).into_owned()),
            other => Err(ExtractError::Unsupported(if other.is_empty() {
                path.display().to_string()
            } else {
                other.to_string()
            })),
        }
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExtractError::Docx(e.to_string()))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| ExtractError::Docx("word/document.xml not found".to_string()))?;

    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Docx(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }
    docx_paragraphs(&xml)
}

/// Collect `w:t` runs, ending each `w:p` paragraph with a newline.
fn docx_paragraphs(xml: &[u8]) -> Result<String, ExtractError> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut out = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::Text(t)) if in_text => {
                let text = t
                    .unescape()
                    .map_err(|e| ExtractError::Docx(e.to_string()))?;
                out.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(out.trim_end().to_string())
}
