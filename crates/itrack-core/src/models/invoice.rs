//! Invoice extraction records handed to the order/invoice workflow.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;

/// Outcome of one extraction call.
///
/// Built fresh per call; the same input text always yields an equal value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Whether text was available and parsed.
    pub succeeded: bool,

    /// Why extraction did not succeed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<FailureReason>,

    /// Header fields; absent fields were not found.
    pub header: HeaderRecord,

    /// Line items in document order.
    pub items: Vec<LineItem>,

    /// Source text, echoed verbatim whenever it was available.
    pub raw_text: String,

    /// Diagnostics that did not stop extraction.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ExtractionResult {
    /// A failed result with every field absent.
    pub fn failure(reason: FailureReason, raw_text: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            failure_reason: Some(reason),
            raw_text: raw_text.into(),
            ..Self::default()
        }
    }
}

/// Pipeline-level failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Blank or absent text.
    NoInput,
    /// The upstream producer cannot turn this input into text.
    UnsupportedFormat,
    /// The upstream producer ran but yielded no text.
    SourceTextUnavailable,
    /// Every sub-resolver failed internally.
    ParsingFailed,
}

impl From<&SourceError> for FailureReason {
    fn from(err: &SourceError) -> Self {
        match err {
            SourceError::EmptyFile => FailureReason::NoInput,
            SourceError::UnsupportedFileType(_) => FailureReason::UnsupportedFormat,
            SourceError::ExtractionFailed(_) => FailureReason::SourceTextUnavailable,
        }
    }
}

/// Invoice header fields. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderRecord {
    /// Invoice / PI number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,

    /// Customer code number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_number: Option<String>,

    /// Customer reference (often a vehicle registration).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// Date as it appeared in the text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_date: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Net value before tax.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<Decimal>,

    /// VAT / tax amount.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax: Option<Decimal>,

    /// Gross value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_terms: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attended_by: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind_attention: Option<String>,
}

impl HeaderRecord {
    /// Trim every string field and turn blanks into absent values.
    pub fn normalize(&mut self) {
        for field in [
            &mut self.invoice_number,
            &mut self.code_number,
            &mut self.reference,
            &mut self.invoice_date,
            &mut self.customer_name,
            &mut self.address,
            &mut self.phone,
            &mut self.email,
            &mut self.delivery_terms,
            &mut self.remarks,
            &mut self.attended_by,
            &mut self.kind_attention,
        ] {
            *field = non_blank(field.take());
        }

        if let Some(PaymentMethod::Other(raw)) = &self.payment_method {
            let trimmed = raw.trim();
            self.payment_method = if trimmed.is_empty() {
                None
            } else {
                Some(PaymentMethod::Other(trimmed.to_string()))
            };
        }
    }

    /// Names of the fields that were not found.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let present = [
            ("invoice_number", self.invoice_number.is_some()),
            ("code_number", self.code_number.is_some()),
            ("reference", self.reference.is_some()),
            ("invoice_date", self.invoice_date.is_some()),
            ("customer_name", self.customer_name.is_some()),
            ("address", self.address.is_some()),
            ("phone", self.phone.is_some()),
            ("email", self.email.is_some()),
            ("subtotal", self.subtotal.is_some()),
            ("tax", self.tax.is_some()),
            ("total", self.total.is_some()),
            ("payment_method", self.payment_method.is_some()),
            ("delivery_terms", self.delivery_terms.is_some()),
            ("remarks", self.remarks.is_some()),
            ("attended_by", self.attended_by.is_some()),
            ("kind_attention", self.kind_attention.is_some()),
        ];

        present
            .into_iter()
            .filter(|(_, found)| !found)
            .map(|(name, _)| name)
            .collect()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A single priced row from the item table.
///
/// Roles of the numbers on a row are inferred from their count and
/// magnitude, so `quantity`, `rate` and `value` are best-effort and may be
/// wrong on unusual layouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Item code (3-6 digits).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Item description; never empty.
    pub description: String,

    /// Quantity, 1 when not inferable.
    pub quantity: Decimal,

    /// Unit of measure (NOS, PCS, KG, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// Unit price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<Decimal>,

    /// Line total.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Decimal>,
}

impl LineItem {
    /// Create an item with the default quantity and no prices.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            code: None,
            description: description.into(),
            quantity: Decimal::ONE,
            unit: None,
            rate: None,
            value: None,
        }
    }
}

/// Payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Cheque,
    BankTransfer,
    Card,
    Mpesa,
    OnCredit,
    OnDelivery,
    /// Text that matched no known method, passed through unchanged.
    #[serde(untagged)]
    Other(String),
}

/// Keyword table checked in order; the first keyword found wins.
const PAYMENT_KEYWORDS: &[(&str, PaymentMethod)] = &[
    ("cash", PaymentMethod::Cash),
    ("cheque", PaymentMethod::Cheque),
    ("chq", PaymentMethod::Cheque),
    ("bank", PaymentMethod::BankTransfer),
    ("transfer", PaymentMethod::BankTransfer),
    ("card", PaymentMethod::Card),
    ("mpesa", PaymentMethod::Mpesa),
    ("credit", PaymentMethod::OnCredit),
    ("delivery", PaymentMethod::OnDelivery),
    ("cod", PaymentMethod::OnDelivery),
];

impl PaymentMethod {
    /// Map free text onto a canonical method.
    pub fn from_text(s: &str) -> Self {
        let lower = s.to_lowercase();

        PAYMENT_KEYWORDS
            .iter()
            .find(|(keyword, _)| lower.contains(keyword))
            .map(|(_, method)| method.clone())
            .unwrap_or_else(|| PaymentMethod::Other(s.to_string()))
    }

    /// Canonical identifier (or the raw text for unmapped methods).
    pub fn as_str(&self) -> &str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Cheque => "cheque",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Card => "card",
            PaymentMethod::Mpesa => "mpesa",
            PaymentMethod::OnCredit => "on_credit",
            PaymentMethod::OnDelivery => "on_delivery",
            PaymentMethod::Other(raw) => raw,
        }
    }
}
