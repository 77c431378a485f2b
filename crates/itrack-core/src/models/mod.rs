//! Data models: extraction records and configuration.

pub mod config;
pub mod invoice;

pub use config::{EtaConfig, ExtractionConfig, PdfConfig, TrackerConfig};
pub use invoice::{ExtractionResult, FailureReason, HeaderRecord, LineItem, PaymentMethod};
