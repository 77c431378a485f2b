//! Extraction pipeline: header, totals and line items over one text.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::models::config::ExtractionConfig;
use crate::models::invoice::{ExtractionResult, FailureReason};
use crate::source::TextSource;

use super::guard::guarded;
use super::rules::{extract_totals, HeaderResolver, InvoiceTotals, TableParser};

/// Trait for invoice parsing.
///
/// Implementations never fail outward: every problem is reported through
/// [`ExtractionResult::failure_reason`] or [`ExtractionResult::warnings`].
pub trait InvoiceParser {
    /// Parse invoice fields from extracted text.
    fn parse(&self, text: &str) -> ExtractionResult;
}

/// Label- and layout-heuristic invoice parser.
///
/// Field values are best-effort. In particular the quantity, rate and value
/// of a line item are inferred from number magnitudes and may be assigned
/// to the wrong role on unusual layouts.
#[derive(Debug, Clone, Default)]
pub struct HeuristicInvoiceParser {
    config: ExtractionConfig,
}

impl HeuristicInvoiceParser {
    /// Create a parser with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser from extraction settings.
    pub fn from_config(config: ExtractionConfig) -> Self {
        Self { config }
    }

    /// Set how many lines below a bare label are searched for its value.
    pub fn with_max_line_distance(mut self, lines: usize) -> Self {
        self.config.max_line_distance = lines;
        self
    }

    /// Set the keyword-group score that marks the item table header.
    pub fn with_header_threshold(mut self, threshold: usize) -> Self {
        self.config.header_keyword_threshold = threshold;
        self
    }

    /// Set the decimal places kept for derived rates.
    pub fn with_rate_scale(mut self, scale: u32) -> Self {
        self.config.rate_scale = scale;
        self
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Turn document bytes into text with `source`, then parse it.
    ///
    /// Producer failures become the matching failure reason; text that comes
    /// back blank is reported as [`FailureReason::SourceTextUnavailable`].
    pub fn extract_from_bytes<S: TextSource + ?Sized>(
        &self,
        bytes: &[u8],
        filename: &str,
        source: &S,
    ) -> ExtractionResult {
        match source.extract_text(bytes, filename) {
            Ok(text) if text.trim().is_empty() => {
                warn!("{}: text producer returned no text", filename);
                ExtractionResult::failure(FailureReason::SourceTextUnavailable, text)
            }
            Ok(text) => self.parse(&text),
            Err(err) => {
                warn!("{}: {}", filename, err);
                let mut result = ExtractionResult::failure(FailureReason::from(&err), "");
                result.warnings.push(err.to_string());
                result
            }
        }
    }
}

impl InvoiceParser for HeuristicInvoiceParser {
    fn parse(&self, text: &str) -> ExtractionResult {
        if text.trim().is_empty() {
            debug!("blank input");
            return ExtractionResult::failure(FailureReason::NoInput, text);
        }

        let start = Instant::now();
        let mut warnings = Vec::new();

        info!("Parsing invoice from {} characters of text", text.len());

        // Header fields are guarded one by one.
        let header = HeaderResolver::new(&self.config).resolve_guarded(text, &mut warnings);
        let totals = guarded("totals", &mut warnings, || extract_totals(text));
        let items = guarded("line items", &mut warnings, || {
            TableParser::new(&self.config).parse(text)
        });

        if header.is_none() && totals.is_none() && items.is_none() {
            let mut result = ExtractionResult::failure(FailureReason::ParsingFailed, text);
            result.warnings = warnings;
            return result;
        }

        let mut header = header.unwrap_or_default();
        let totals = totals.unwrap_or_default();
        let items = items.unwrap_or_default();

        if totals.reconciles() == Some(false) {
            warnings.push(reconcile_warning(&totals));
        }
        header.subtotal = totals.subtotal;
        header.tax = totals.tax;
        header.total = totals.total;
        header.normalize();

        if items.is_empty() {
            warnings.push("no line items found".to_string());
        }

        debug!(
            "Extracted {} line items, {} header fields missing in {} ms",
            items.len(),
            header.missing_fields().len(),
            start.elapsed().as_millis()
        );

        ExtractionResult {
            succeeded: true,
            failure_reason: None,
            header,
            items,
            raw_text: text.to_string(),
            warnings,
        }
    }
}

/// Parse invoice text with the default settings.
pub fn extract_invoice_data(text: &str) -> ExtractionResult {
    HeuristicInvoiceParser::new().parse(text)
}

fn reconcile_warning(totals: &InvoiceTotals) -> String {
    format!(
        "totals do not reconcile: net {} + tax {} != gross {}",
        totals.subtotal.unwrap_or_default(),
        totals.tax.unwrap_or_default(),
        totals.total.unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use rust_decimal::Decimal;

    struct FixedSource(Result<String, SourceError>);

    impl TextSource for FixedSource {
        fn extract_text(&self, _bytes: &[u8], _filename: &str) -> Result<String, SourceError> {
            self.0.clone()
        }
    }

    #[test]
    fn test_blank_input_is_no_input() {
        for text in ["", "   \n\t  "] {
            let result = extract_invoice_data(text);
            assert!(!result.succeeded);
            assert_eq!(result.failure_reason, Some(FailureReason::NoInput));
            assert!(result.items.is_empty());
            assert_eq!(result.header, Default::default());
        }
    }

    #[test]
    fn test_totals_are_assembled_into_header() {
        let result = extract_invoice_data("Net Value: 100\nVAT: 18\nGross Value: 120\n");

        assert!(result.succeeded);
        assert_eq!(result.header.subtotal, Some(Decimal::from(100)));
        assert_eq!(result.header.total, Some(Decimal::from(120)));
        assert!(result.warnings.iter().any(|w| w.starts_with("totals do not reconcile")));
        assert!(result.warnings.iter().any(|w| w == "no line items found"));
    }

    #[test]
    fn test_overflowing_totals_do_not_panic() {
        let text = "Net Value: 79228162514264337593543950335\nVAT: 1\nGross Value: 1\n";
        let result = extract_invoice_data(text);

        assert!(result.succeeded);
        assert_eq!(result.header.subtotal, Some(Decimal::MAX));
        assert!(!result.warnings.iter().any(|w| w.starts_with("totals do not reconcile")));
    }

    #[test]
    fn test_source_failures_map_to_reasons() {
        let parser = HeuristicInvoiceParser::new();

        let cases = [
            (SourceError::EmptyFile, FailureReason::NoInput),
            (
                SourceError::UnsupportedFileType("image".to_string()),
                FailureReason::UnsupportedFormat,
            ),
            (
                SourceError::ExtractionFailed("bad xref".to_string()),
                FailureReason::SourceTextUnavailable,
            ),
        ];
        for (err, reason) in cases {
            let result = parser.extract_from_bytes(b"x", "doc.bin", &FixedSource(Err(err)));
            assert!(!result.succeeded);
            assert_eq!(result.failure_reason, Some(reason));
        }
    }

    #[test]
    fn test_blank_source_text_is_unavailable() {
        let parser = HeuristicInvoiceParser::new();
        let result = parser.extract_from_bytes(b"x", "scan.pdf", &FixedSource(Ok("  \n".to_string())));
        assert_eq!(result.failure_reason, Some(FailureReason::SourceTextUnavailable));
    }

    #[test]
    fn test_source_text_is_parsed_and_echoed() {
        let parser = HeuristicInvoiceParser::new();
        let text = "PI No: 77\nGross Value: 500\n";
        let result = parser.extract_from_bytes(b"x", "pi.txt", &FixedSource(Ok(text.to_string())));

        assert!(result.succeeded);
        assert_eq!(result.raw_text, text);
        assert_eq!(result.header.invoice_number.as_deref(), Some("77"));
    }
}
