//! Document text extraction seam.

use std::path::Path;

use crate::error::{ResearchError, Result};
use crate::types::MediaKind;

/// Placeholder returned for PDFs without an extractable text layer.
pub const EMPTY_PDF_TEXT: &str = "[No text could be extracted from PDF.]";

/// Turns a PDF or text file into plain text.
pub trait DocumentExtractor: Send + Sync {
    fn extract_text(&self, path: &Path, kind: MediaKind) -> Result<String>;
}

/// Reads text files from disk and PDFs through `pdf-extract`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsDocumentExtractor;

impl DocumentExtractor for FsDocumentExtractor {
    fn extract_text(&self, path: &Path, kind: MediaKind) -> Result<String> {
        match kind {
            MediaKind::Pdf => extract_pdf(path),
            MediaKind::Text => {
                let bytes = std::fs::read(path).map_err(|e| extraction_error(path, e))?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
            other => Err(extraction_error(
                path,
                format!("no text extractor for {other} files"),
            )),
        }
    }
}

fn extract_pdf(path: &Path) -> Result<String> {
    // pdf-extract panics on some malformed inputs.
    let outcome = std::panic::catch_unwind(|| pdf_extract::extract_text(path))
        .map_err(|_| extraction_error(path, "PDF parser panicked"))?;
    let text = outcome.map_err(|e| extraction_error(path, e))?;

    let pages: Vec<&str> = text
        .split('\u{c}')
        .map(str::trim)
        .filter(|page| !page.is_empty())
        .collect();
    if pages.is_empty() {
        return Ok(EMPTY_PDF_TEXT.to_string());
    }
    Ok(pages.join("\n\n"))
}

fn extraction_error(path: &Path, message: impl ToString) -> ResearchError {
    ResearchError::Extraction {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn text_files_are_read_verbatim() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "line one\n  line two\n").unwrap();

        let text = FsDocumentExtractor
            .extract_text(file.path(), MediaKind::Text)
            .unwrap();

        assert_eq!(text, "line one\n  line two\n");
    }

    #[test]
    fn invalid_utf8_is_replaced_not_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[b'o', b'k', 0xFF]).unwrap();

        let text = FsDocumentExtractor
            .extract_text(file.path(), MediaKind::Text)
            .unwrap();

        assert_eq!(text, "ok\u{FFFD}");
    }

    #[test]
    fn images_have_no_text_extractor() {
        let err = FsDocumentExtractor
            .extract_text(Path::new("photo.png"), MediaKind::Image)
            .unwrap_err();
        assert!(matches!(err, ResearchError::Extraction { .. }));
    }

    #[test]
    fn missing_file_is_an_extraction_error() {
        let err = FsDocumentExtractor
            .extract_text(Path::new("/definitely/not/here.txt"), MediaKind::Text)
            .unwrap_err();
        assert!(matches!(err, ResearchError::Extraction { .. }));
    }
}
