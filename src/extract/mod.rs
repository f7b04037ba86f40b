//! Text extraction for uploaded documents
//!
//! Turns PDF, DOCX and plain text files into a single string. Nothing here
//! touches the network; failures are reported per document.


use std::fmt;
use std::path::Path;

use docx_rs::{DocumentChild, InsertChild, ParagraphChild, Run, RunChild};
use tracing::debug;

use crate::{QaError, Result};

/// Formats accepted for upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Txt,
}

impl DocumentFormat {
    pub const ALL: [Self; 3] = [Self::Pdf, Self::Docx, Self::Txt];

    /// Determine the format from a filename's extension, ignoring case
    #[inline]
    pub fn from_filename(filename: &str) -> Result<Self> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "txt" => Ok(Self::Txt),
            "" => Err(QaError::UnsupportedFormat(format!(
                "{} has no file extension",
                filename
            ))),
            other => Err(QaError::UnsupportedFormat(format!(".{}", other))),
        }
    }

    #[inline]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Txt => "txt",
        }
    }
}

impl fmt::Display for DocumentFormat {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// An uploaded file, held only while it is being processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub format: DocumentFormat,
}

impl Document {
    /// Wrap uploaded bytes, rejecting unsupported extensions up front
    #[inline]
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let filename = filename.into();
        let format = DocumentFormat::from_filename(&filename)?;
        Ok(Self {
            filename,
            bytes,
            format,
        })
    }

    /// Read a document from disk. The stored filename is the final path
    /// component, which is what record identifiers are built from.
    #[inline]
    pub fn from_path(path: &Path) -> Result<Self> {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                QaError::UnsupportedFormat(format!("{} is not a file", path.display()))
            })?;

        // Check the extension before reading anything
        let format = DocumentFormat::from_filename(&filename)?;
        let bytes = std::fs::read(path)?;

        Ok(Self {
            filename,
            bytes,
            format,
        })
    }
}

/// Extract the full text of a document
#[inline]
pub fn extract_text(document: &Document) -> Result<String> {
    debug!(
        "Extracting text from {} ({} bytes, {})",
        document.filename,
        document.bytes.len(),
        document.format
    );

    match document.format {
        DocumentFormat::Pdf => extract_pdf(&document.filename, &document.bytes),
        DocumentFormat::Docx => extract_docx(&document.filename, &document.bytes),
        DocumentFormat::Txt => extract_txt(&document.filename, &document.bytes),
    }
}

/// One line per page, in page order. Pages without extractable text
/// become empty lines.
fn extract_pdf(filename: &str, bytes: &[u8]) -> Result<String> {
    let pdf = lopdf::Document::load_mem(bytes).map_err(|e| QaError::Extraction {
        filename: filename.to_string(),
        message: e.to_string(),
    })?;

    let mut text = String::new();
    for page_number in pdf.get_pages().keys() {
        match pdf.extract_text(&[*page_number]) {
            Ok(page_text) => text.push_str(page_text.trim_end()),
            Err(e) => debug!(
                "No extractable text on page {} of {}: {}",
                page_number, filename, e
            ),
        }
        text.push('\n');
    }

    Ok(text)
}

/// Body paragraphs joined by newlines. Tables are not paragraphs and are
/// skipped.
fn extract_docx(filename: &str, bytes: &[u8]) -> Result<String> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| QaError::Extraction {
        filename: filename.to_string(),
        message: e.to_string(),
    })?;

    let paragraphs: Vec<String> = docx
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            DocumentChild::Paragraph(paragraph) => Some(paragraph_text(&paragraph.children)),
            _ => None,
        })
        .collect();

    Ok(paragraphs.join("\n"))
}

fn paragraph_text(children: &[ParagraphChild]) -> String {
    let mut text = String::new();
    push_paragraph_children(&mut text, children);
    text
}

/// Runs nested in hyperlinks and tracked insertions are part of the visible
/// paragraph text; tracked deletions are not.
fn push_paragraph_children(text: &mut String, children: &[ParagraphChild]) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => push_run(text, run),
            ParagraphChild::Hyperlink(link) => push_paragraph_children(text, &link.children),
            ParagraphChild::Insert(insert) => {
                for insert_child in &insert.children {
                    if let InsertChild::Run(run) = insert_child {
                        push_run(text, run);
                    }
                }
            }
            _ => {}
        }
    }
}

fn push_run(text: &mut String, run: &Run) {
    for run_child in &run.children {
        match run_child {
            RunChild::Text(t) => text.push_str(&t.text),
            RunChild::Tab(_) => text.push('\t'),
            RunChild::Break(_) => text.push('\n'),
            _ => {}
        }
    }
}

fn extract_txt(filename: &str, bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| QaError::Decode {
        filename: filename.to_string(),
        message: e.to_string(),
    })
}
