//! Core library for invoice text extraction in the itrack service tracker.
//!
//! This crate provides:
//! - A pure text pipeline that recovers invoice header fields, totals and
//!   line items from PDF/OCR text ([`extract_invoice_data`])
//! - Document text producers for uploaded files ([`source`])
//! - Service-order timing helpers ([`eta`])
//!
//! ```
//! use itrack_core::extract_invoice_data;
//!
//! let result = extract_invoice_data("PI No: 4410\nGross Value: TSH 118,000\n");
//! assert!(result.succeeded);
//! assert_eq!(result.header.invoice_number.as_deref(), Some("4410"));
//! ```

pub mod error;
pub mod eta;
pub mod invoice;
pub mod models;
#[cfg(feature = "pdf")]
pub mod pdf;
pub mod source;

pub use error::{PdfError, Result, SourceError, TrackerError};
pub use invoice::{extract_invoice_data, HeuristicInvoiceParser, InvoiceParser};
pub use models::config::{EtaConfig, ExtractionConfig, PdfConfig, TrackerConfig};
pub use models::invoice::{ExtractionResult, FailureReason, HeaderRecord, LineItem, PaymentMethod};
pub use source::{detect_kind, DocumentKind, DocumentTextSource, TextSource};
#[cfg(feature = "pdf")]
pub use pdf::{PdfExtractor, PdfProcessor};
