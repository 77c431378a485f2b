//! Document text producers.
//!
//! The extraction pipeline only ever sees text. A [`TextSource`] turns the
//! bytes of an uploaded document into that text, or reports why it cannot.

use std::path::Path;

use tracing::debug;

use crate::error::SourceError;
use crate::models::config::PdfConfig;

/// Image extensions; these need an OCR engine.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "tiff", "tif", "bmp"];

const TEXT_EXTENSIONS: &[&str] = &["txt", "text"];

/// Kind of an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Image,
    Text,
    /// Unrecognised; holds the lower-cased extension (may be empty).
    Unknown(String),
}

/// Detect the document kind from the filename and the leading bytes.
pub fn detect_kind(bytes: &[u8], filename: &str) -> DocumentKind {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    if extension == "pdf" || bytes.starts_with(b"%PDF") {
        DocumentKind::Pdf
    } else if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        DocumentKind::Image
    } else if TEXT_EXTENSIONS.contains(&extension.as_str()) {
        DocumentKind::Text
    } else {
        DocumentKind::Unknown(extension)
    }
}

/// Turns document bytes into text.
pub trait TextSource {
    /// Extract the text of a document; `filename` is a type hint only.
    fn extract_text(&self, bytes: &[u8], filename: &str) -> Result<String, SourceError>;
}

/// Text producer for PDFs with a text layer and plain-text files.
#[derive(Debug, Clone, Default)]
pub struct DocumentTextSource {
    min_text_length: usize,
}

impl DocumentTextSource {
    pub fn new(config: &PdfConfig) -> Self {
        Self {
            min_text_length: config.min_text_length,
        }
    }

    #[cfg(feature = "pdf")]
    fn pdf_text(&self, bytes: &[u8]) -> Result<String, SourceError> {
        let text = crate::pdf::pdf_to_text(bytes)?;
        if text.trim().chars().count() < self.min_text_length.max(1) {
            return Err(SourceError::ExtractionFailed("no text found".to_string()));
        }
        Ok(text)
    }

    #[cfg(not(feature = "pdf"))]
    fn pdf_text(&self, _bytes: &[u8]) -> Result<String, SourceError> {
        Err(SourceError::ExtractionFailed(
            "PDF support is not enabled".to_string(),
        ))
    }
}

impl TextSource for DocumentTextSource {
    fn extract_text(&self, bytes: &[u8], filename: &str) -> Result<String, SourceError> {
        if bytes.is_empty() {
            return Err(SourceError::EmptyFile);
        }

        let kind = detect_kind(bytes, filename);
        debug!("{}: {} bytes, detected {:?}", filename, bytes.len(), kind);

        match kind {
            DocumentKind::Pdf => self.pdf_text(bytes),
            DocumentKind::Image => Err(SourceError::UnsupportedFileType("image".to_string())),
            DocumentKind::Text => Ok(String::from_utf8_lossy(bytes).into_owned()),
            DocumentKind::Unknown(extension) => Err(SourceError::UnsupportedFileType(extension)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_kind() {
        assert_eq!(detect_kind(b"", "invoice.PDF"), DocumentKind::Pdf);
        assert_eq!(detect_kind(b"%PDF-1.7\n", "upload"), DocumentKind::Pdf);
        assert_eq!(detect_kind(b"\x89PNG", "scan.png"), DocumentKind::Image);
        assert_eq!(detect_kind(b"PI No", "pi.txt"), DocumentKind::Text);
        assert_eq!(
            detect_kind(b"PK", "sheet.xlsx"),
            DocumentKind::Unknown("xlsx".to_string())
        );
    }

    #[test]
    fn test_empty_file() {
        let source = DocumentTextSource::default();
        assert_eq!(source.extract_text(b"", "a.pdf"), Err(SourceError::EmptyFile));
    }

    #[test]
    fn test_image_is_unsupported() {
        let source = DocumentTextSource::default();
        assert_eq!(
            source.extract_text(b"\xff\xd8\xff", "photo.jpeg"),
            Err(SourceError::UnsupportedFileType("image".to_string()))
        );
    }

    #[test]
    fn test_plain_text_is_decoded_lossily() {
        let source = DocumentTextSource::default();
        let text = source.extract_text(b"PI No: 12\xff\n", "pi.txt").unwrap();
        assert!(text.starts_with("PI No: 12"));
    }

    #[test]
    fn test_broken_pdf_fails_extraction() {
        let source = DocumentTextSource::default();
        let err = source.extract_text(b"%PDF-1.4 garbage", "x.pdf").unwrap_err();
        assert!(matches!(err, SourceError::ExtractionFailed(_)));
    }
}
