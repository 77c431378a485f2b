//! Error types for the itrack-core library.
//!
//! The extraction pipeline itself never returns these: every exit path of
//! [`crate::invoice::InvoiceParser::parse`] is an [`crate::ExtractionResult`].
//! They cover the collaborators around it (document text producers, PDF
//! loading, configuration files).

use thiserror::Error;

/// Main error type for the itrack library.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Document text producer error.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,
}

/// Failures of a byte-to-text producer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The uploaded file had no bytes.
    #[error("file is empty")]
    EmptyFile,

    /// The file kind cannot be turned into text without OCR.
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// The producer ran but could not yield text.
    #[error("text extraction failed: {0}")]
    ExtractionFailed(String),
}

impl From<PdfError> for SourceError {
    fn from(err: PdfError) -> Self {
        SourceError::ExtractionFailed(err.to_string())
    }
}

/// Result type for the itrack library.
pub type Result<T> = std::result::Result<T, TrackerError>;
