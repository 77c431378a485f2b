//! WASM bindings for invoice text field extraction.
//!
//! Lets a browser-side upload form run the extraction pipeline on text it
//! already holds (from a PDF text layer or a client-side OCR engine).

use wasm_bindgen::prelude::*;

use itrack_core::eta;
use itrack_core::invoice::rules::{parse_invoice_date, to_decimal};
use itrack_core::{FailureReason, HeuristicInvoiceParser, InvoiceParser, PaymentMethod};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Version information.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Extract invoice data from text.
///
/// Always yields an extraction result object; `succeeded` is false when the
/// text is blank or could not be parsed.
#[wasm_bindgen(js_name = extractInvoiceData)]
pub fn extract_invoice_data(text: &str) -> Result<JsValue, JsValue> {
    to_js(&itrack_core::extract_invoice_data(text))
}

/// Normalize an amount token (e.g. "TSH 1,234.50") to a plain decimal string.
///
/// Returned as a string so no precision is lost on the JS side.
#[wasm_bindgen(js_name = parseAmount)]
pub fn parse_amount(raw: &str) -> Option<String> {
    to_decimal(raw).map(|d| d.to_string())
}

/// Parse an invoice date to ISO `YYYY-MM-DD`.
#[wasm_bindgen(js_name = parseDate)]
pub fn parse_date(raw: &str) -> Option<String> {
    parse_invoice_date(raw).map(|d| d.format("%Y-%m-%d").to_string())
}

/// Map free payment text onto a canonical method identifier.
#[wasm_bindgen(js_name = normalizePaymentMethod)]
pub fn normalize_payment_method(text: &str) -> String {
    PaymentMethod::from_text(text.trim()).as_str().to_string()
}

/// Sum of service estimates in minutes, with the default for none.
#[wasm_bindgen(js_name = estimateDuration)]
pub fn estimate_duration(services: Vec<u32>, addons: Vec<u32>) -> u32 {
    eta::estimate_duration(&services, &addons, eta::DEFAULT_ESTIMATE_MINUTES)
}

/// Display a duration in minutes as `2h 30m`.
#[wasm_bindgen(js_name = formatDuration)]
pub fn format_duration(minutes: Option<i32>) -> String {
    eta::format_duration(minutes.map(i64::from))
}

/// Invoice extractor class for browser use.
#[wasm_bindgen]
pub struct InvoiceExtractor {
    parser: HeuristicInvoiceParser,
}

#[wasm_bindgen]
impl InvoiceExtractor {
    /// Create a new invoice extractor.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            parser: HeuristicInvoiceParser::new(),
        }
    }

    /// Lines searched below a bare label.
    #[wasm_bindgen(js_name = setMaxLineDistance)]
    pub fn set_max_line_distance(&mut self, lines: usize) {
        self.parser = self.parser.clone().with_max_line_distance(lines);
    }

    /// Decimal places kept for derived rates.
    #[wasm_bindgen(js_name = setRateScale)]
    pub fn set_rate_scale(&mut self, scale: u32) {
        self.parser = self.parser.clone().with_rate_scale(scale);
    }

    /// Extract invoice data from text.
    #[wasm_bindgen]
    pub fn extract(&self, text: &str) -> Result<JsValue, JsValue> {
        to_js(&self.parser.parse(text))
    }

    /// What the upload form needs to decide between review and manual entry.
    #[wasm_bindgen]
    pub fn summarize(&self, text: &str) -> Result<JsValue, JsValue> {
        #[derive(serde::Serialize)]
        struct Summary<'a> {
            succeeded: bool,
            failure_reason: Option<FailureReason>,
            missing_fields: Vec<&'static str>,
            item_count: usize,
            warnings: &'a [String],
        }

        let result = self.parser.parse(text);
        to_js(&Summary {
            succeeded: result.succeeded,
            failure_reason: result.failure_reason,
            missing_fields: result.header.missing_fields(),
            item_count: result.items.len(),
            warnings: &result.warnings,
        })
    }
}

impl Default for InvoiceExtractor {
    fn default() -> Self {
        Self::new()
    }
}
