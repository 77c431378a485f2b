//! Invoice header fields.
//!
//! Each field has an ordered list of label variants and a few stop tokens.
//! A field's stop set is every other field's tokens plus the table column
//! words, so a value can never run into the next field's label.

use lazy_static::lazy_static;
use std::collections::HashMap;
use tracing::debug;

use super::dates::find_date;
use super::labels::{find_field, find_field_block, LabelPattern, StopLabels};
use super::party::{is_likely_address, is_likely_customer_name};
use super::patterns::{collapse_whitespace, EMAIL, FAX_TAIL, REMARK_ENUMERATION};
use crate::invoice::guard::guarded;
use crate::models::config::ExtractionConfig;
use crate::models::invoice::{HeaderRecord, PaymentMethod};

/// Header fields resolved through labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderField {
    InvoiceNumber,
    CodeNumber,
    InvoiceDate,
    CustomerName,
    Address,
    Phone,
    Email,
    Reference,
    PaymentMethod,
    DeliveryTerms,
    Remarks,
    AttendedBy,
    KindAttention,
}

/// Table column words; a header value never starts with one.
const COLUMN_STOPS: &[&str] = &["Qty", "Quantity", "Rate", "Value", "Type", "Description"];

impl HeaderField {
    pub const ALL: [HeaderField; 13] = [
        HeaderField::InvoiceNumber,
        HeaderField::CodeNumber,
        HeaderField::InvoiceDate,
        HeaderField::CustomerName,
        HeaderField::Address,
        HeaderField::Phone,
        HeaderField::Email,
        HeaderField::Reference,
        HeaderField::PaymentMethod,
        HeaderField::DeliveryTerms,
        HeaderField::Remarks,
        HeaderField::AttendedBy,
        HeaderField::KindAttention,
    ];

    /// Label variants, most specific first.
    pub fn labels(self) -> &'static [&'static str] {
        match self {
            HeaderField::InvoiceNumber => &[
                r"\bPI\s*(?:No|Number|#)\.?",
                r"\bInvoice\s*(?:No|Number|#)\.?",
                r"\bProforma\s*(?:No|Number)\.?",
            ],
            HeaderField::CodeNumber => &[r"\bCode\s*(?:No|Number)\.?", r"\bCode\s*#", r"\bCode\b"],
            HeaderField::InvoiceDate => &[r"\bInvoice\s*Date\b", r"\bDate\b"],
            HeaderField::CustomerName => &[
                r"\bCustomer\s*Name\b",
                r"\bBill\s*To\b",
                r"\bBuyer\s*Name\b",
                r"\bClient\s*Name\b",
                r"\bCustomer\b",
            ],
            HeaderField::Address => &[r"\bAddress\b", r"\bAddr\b\.?"],
            HeaderField::Phone => &[r"\bTel(?:ephone)?\b\.?", r"\bPhone\b", r"\bMobile\b"],
            HeaderField::Email => &[r"\bE-?mail\b"],
            HeaderField::Reference => &[r"\bReference\b", r"\bRef\b\.?"],
            HeaderField::PaymentMethod => &[
                r"\bPayment\s*(?:Method|Type|Mode|Terms)\b",
                r"\bPayment\b",
            ],
            HeaderField::DeliveryTerms => &[r"\bDelivery\s*Terms\b", r"\bDelivery\b"],
            HeaderField::Remarks => &[r"\bRemarks\b", r"\bNotes?\b"],
            HeaderField::AttendedBy => &[r"\bAttended\s*By\b", r"\bAttended\b"],
            HeaderField::KindAttention => &[r"\bKind\s*(?:Attention|Attn)\b\.?", r"\bAttn\b\.?"],
        }
    }

    /// Tokens that mark the start of this field in running text.
    pub fn stop_tokens(self) -> &'static [&'static str] {
        match self {
            HeaderField::InvoiceNumber => &["PI", "Invoice"],
            HeaderField::CodeNumber => &["Code"],
            HeaderField::InvoiceDate => &["Date"],
            HeaderField::CustomerName => &["Customer", "Cust", r"Bill\s*To", "Buyer", "Client"],
            HeaderField::Address => &["Address", "Addr"],
            HeaderField::Phone => &["Tel", "Telephone", "Phone", "Mobile", "Fax"],
            HeaderField::Email => &["E-?mail"],
            HeaderField::Reference => &["Reference", "Ref"],
            HeaderField::PaymentMethod => &["Payment"],
            HeaderField::DeliveryTerms => &["Delivery", "Del"],
            HeaderField::Remarks => &["Remarks", "Notes?"],
            HeaderField::AttendedBy => &["Attended"],
            HeaderField::KindAttention => &["Kind", "Attn"],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            HeaderField::InvoiceNumber => "invoice_number",
            HeaderField::CodeNumber => "code_number",
            HeaderField::InvoiceDate => "invoice_date",
            HeaderField::CustomerName => "customer_name",
            HeaderField::Address => "address",
            HeaderField::Phone => "phone",
            HeaderField::Email => "email",
            HeaderField::Reference => "reference",
            HeaderField::PaymentMethod => "payment_method",
            HeaderField::DeliveryTerms => "delivery_terms",
            HeaderField::Remarks => "remarks",
            HeaderField::AttendedBy => "attended_by",
            HeaderField::KindAttention => "kind_attention",
        }
    }

    /// Stop tokens of every other field plus the table column words.
    pub fn stop_set(self) -> Vec<&'static str> {
        HeaderField::ALL
            .into_iter()
            .filter(|other| *other != self)
            .flat_map(|other| other.stop_tokens().iter().copied())
            .chain(COLUMN_STOPS.iter().copied())
            .collect()
    }
}

/// Compiled labels and stop set for one field.
struct FieldRule {
    labels: Vec<LabelPattern>,
    stops: StopLabels,
}

lazy_static! {
    static ref FIELD_RULES: HashMap<HeaderField, FieldRule> = HeaderField::ALL
        .into_iter()
        .map(|field| {
            let rule = FieldRule {
                labels: LabelPattern::compile_all(field.labels()).unwrap(),
                stops: StopLabels::new(&field.stop_set()).unwrap(),
            };
            (field, rule)
        })
        .collect();
}

/// Compiled stop labels for a field.
pub fn stop_labels(field: HeaderField) -> Option<&'static StopLabels> {
    FIELD_RULES.get(&field).map(|rule| &rule.stops)
}

/// Resolves every header field from invoice text.
#[derive(Debug, Clone)]
pub struct HeaderResolver {
    max_line_distance: usize,
    max_name_len: usize,
    address_max_lines: usize,
}

impl Default for HeaderResolver {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

impl HeaderResolver {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            max_line_distance: config.max_line_distance,
            max_name_len: config.max_name_len,
            address_max_lines: config.address_max_lines,
        }
    }

    /// Raw value for one field, with any trailing neighbour label removed.
    pub fn find(&self, field: HeaderField, text: &str) -> Option<String> {
        let rule = FIELD_RULES.get(&field)?;
        let value = find_field(&rule.labels, text, &rule.stops, self.max_line_distance)?;
        let value = rule.stops.strip_trailing(&value);
        debug!("{}: {:?}", field.name(), value);
        (!value.is_empty()).then_some(value)
    }

    /// Resolve the header. Totals are left empty.
    pub fn resolve(&self, text: &str) -> HeaderRecord {
        self.resolve_guarded(text, &mut Vec::new())
            .unwrap_or_default()
    }

    /// Resolve the header with every field behind its own panic guard.
    ///
    /// A field whose resolver panics is left absent and a warning is
    /// recorded. Returns `None` only when every field failed.
    pub(crate) fn resolve_guarded(
        &self,
        text: &str,
        warnings: &mut Vec<String>,
    ) -> Option<HeaderRecord> {
        let mut fields = FieldGuard::new(warnings);

        let (customer_name, address) = fields
            .run("customer_name", || Some(self.resolve_party(text)))
            .unwrap_or_default();

        let header = HeaderRecord {
            invoice_number: fields.run("invoice_number", || {
                self.find(HeaderField::InvoiceNumber, text)
            }),
            code_number: fields.run("code_number", || self.find(HeaderField::CodeNumber, text)),
            reference: fields.run("reference", || self.resolve_reference(text)),
            invoice_date: fields.run("invoice_date", || self.resolve_date(text)),
            customer_name,
            address,
            phone: fields.run("phone", || self.resolve_phone(text)),
            email: fields.run("email", || self.resolve_email(text)),
            payment_method: fields.run("payment_method", || self.resolve_payment(text)),
            delivery_terms: fields.run("delivery_terms", || {
                self.find(HeaderField::DeliveryTerms, text)
            }),
            remarks: fields.run("remarks", || self.resolve_remarks(text)),
            attended_by: fields.run("attended_by", || {
                self.find(HeaderField::AttendedBy, text)
                    .filter(|v| v.chars().count() >= 2)
            }),
            kind_attention: fields.run("kind_attention", || {
                self.find(HeaderField::KindAttention, text)
                    .filter(|v| v.chars().count() >= 2)
            }),
            ..HeaderRecord::default()
        };

        (!fields.all_failed()).then_some(header)
    }

    fn resolve_date(&self, text: &str) -> Option<String> {
        self.find(HeaderField::InvoiceDate, text)
            .and_then(|value| find_date(&value).map(str::to_string))
            .or_else(|| find_date(text).map(str::to_string))
    }

    /// Customer name and address, resolved together.
    ///
    /// A name that reads like an address is dropped; when no name is left,
    /// the first address line (or its first three words) is promoted to
    /// name if it passes the name test.
    fn resolve_party(&self, text: &str) -> (Option<String>, Option<String>) {
        let mut name = self.find(HeaderField::CustomerName, text).filter(|candidate| {
            if candidate.chars().count() > self.max_name_len {
                debug!("customer name candidate too long, dropped");
                return false;
            }
            if is_likely_address(candidate) && !is_likely_customer_name(candidate) {
                debug!("customer name candidate reads like an address: {:?}", candidate);
                return false;
            }
            true
        });

        let mut address = self.resolve_address_block(text);

        if name.is_none() {
            if let Some(block) = address.take() {
                let (recovered, rest) = split_leading_name(&block);
                if recovered.is_some() {
                    debug!("customer name recovered from address: {:?}", recovered);
                }
                name = recovered;
                address = rest;
            }
        }

        let address = address
            .map(|a| collapse_whitespace(&a))
            .filter(|a| a.chars().count() > 2);

        (name, address)
    }

    fn resolve_address_block(&self, text: &str) -> Option<String> {
        let rule = FIELD_RULES.get(&HeaderField::Address)?;
        let block = find_field_block(
            &rule.labels,
            text,
            &rule.stops,
            self.max_line_distance,
            self.address_max_lines,
        )?;

        let lines: Vec<String> = block
            .lines()
            .map(|line| rule.stops.strip_trailing(line))
            .filter(|line| !line.is_empty())
            .collect();
        (!lines.is_empty()).then(|| lines.join("\n"))
    }

    fn resolve_phone(&self, text: &str) -> Option<String> {
        let value = self.find(HeaderField::Phone, text)?;
        let value = FAX_TAIL.replace(&value, "");
        let first = value.split('/').next().unwrap_or_default().trim();

        let usable = first.chars().any(|c| c.is_ascii_digit()) || first.chars().count() > 3;
        usable.then(|| first.to_string())
    }

    fn resolve_email(&self, text: &str) -> Option<String> {
        self.find(HeaderField::Email, text)
            .and_then(|value| EMAIL.find(&value).map(|m| m.as_str().to_string()))
            .or_else(|| EMAIL.find(text).map(|m| m.as_str().to_string()))
    }

    fn resolve_reference(&self, text: &str) -> Option<String> {
        self.find(HeaderField::Reference, text)
            .filter(|value| !value.eq_ignore_ascii_case("none") && value.chars().count() >= 2)
    }

    fn resolve_payment(&self, text: &str) -> Option<PaymentMethod> {
        self.find(HeaderField::PaymentMethod, text)
            .filter(|value| value.chars().count() > 1)
            .map(|value| PaymentMethod::from_text(&value))
    }

    fn resolve_remarks(&self, text: &str) -> Option<String> {
        let value = self.find(HeaderField::Remarks, text)?;
        let cleaned = collapse_whitespace(&REMARK_ENUMERATION.replace_all(&value, ""));
        (!cleaned.is_empty()).then_some(cleaned)
    }
}

/// Runs field resolvers one at a time, counting the ones that panic.
struct FieldGuard<'w> {
    warnings: &'w mut Vec<String>,
    attempted: usize,
    failed: usize,
}

impl<'w> FieldGuard<'w> {
    fn new(warnings: &'w mut Vec<String>) -> Self {
        Self {
            warnings,
            attempted: 0,
            failed: 0,
        }
    }

    fn run<T>(&mut self, field: &str, resolve: impl FnOnce() -> Option<T>) -> Option<T> {
        self.attempted += 1;
        match guarded(field, &mut *self.warnings, resolve) {
            Some(value) => value,
            None => {
                self.failed += 1;
                None
            }
        }
    }

    fn all_failed(&self) -> bool {
        self.attempted > 0 && self.failed == self.attempted
    }
}

/// Split a leading customer name off an address block.
///
/// Returns the name (if any) and what remains of the address.
fn split_leading_name(block: &str) -> (Option<String>, Option<String>) {
    let candidate = match block.split_once('\n') {
        Some((first, _)) => first.trim().to_string(),
        None => block.split_whitespace().take(3).collect::<Vec<_>>().join(" "),
    };

    if !is_likely_customer_name(&candidate) {
        return (None, Some(block.to_string()));
    }

    let rest = match block.split_once('\n') {
        Some((_, rest)) => rest.trim().to_string(),
        None => {
            let collapsed = collapse_whitespace(block);
            collapsed
                .strip_prefix(&candidate)
                .unwrap_or_default()
                .trim()
                .to_string()
        }
    };

    let rest = (rest.chars().count() >= 3).then_some(rest);
    (Some(candidate), rest)
}

/// Resolve the header with the default settings.
pub fn extract_header(text: &str) -> HeaderRecord {
    HeaderResolver::default().resolve(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFORMA: &str = "\
SUPERDOLL TRAILER MANUFACTURE CO. LTD
PROFORMA INVOICE
PI No: PI/2024/0117
Date: 15/01/2024
Code No: C-1043
Customer Name: KILIMANJARO HAULAGE LTD
Address: P.O. Box 1234
ARUSHA
TANZANIA
Tel: 0755 123 456 / Fax: 027 250 0000
Email: accounts@kilihaulage.co.tz
Reference: T 456 DEF
Attended By: JOHN MUSHI
Kind Attention: MR PETER
Payment: Cash
Delivery Terms: Ex-Stock
Remarks: Prices valid 14 days
";

    #[test]
    fn test_stop_set_excludes_own_tokens() {
        let stops = HeaderField::Phone.stop_set();
        assert!(!stops.contains(&"Tel"));
        assert!(stops.contains(&"Address"));
        assert!(stops.contains(&"Qty"));
    }

    #[test]
    fn test_resolve_proforma_header() {
        let header = extract_header(PROFORMA);

        assert_eq!(header.invoice_number.as_deref(), Some("PI/2024/0117"));
        assert_eq!(header.code_number.as_deref(), Some("C-1043"));
        assert_eq!(header.invoice_date.as_deref(), Some("15/01/2024"));
        assert_eq!(header.customer_name.as_deref(), Some("KILIMANJARO HAULAGE LTD"));
        assert_eq!(header.address.as_deref(), Some("P.O. Box 1234 ARUSHA TANZANIA"));
        assert_eq!(header.phone.as_deref(), Some("0755 123 456"));
        assert_eq!(header.email.as_deref(), Some("accounts@kilihaulage.co.tz"));
        assert_eq!(header.reference.as_deref(), Some("T 456 DEF"));
        assert_eq!(header.attended_by.as_deref(), Some("JOHN MUSHI"));
        assert_eq!(header.kind_attention.as_deref(), Some("MR PETER"));
        assert_eq!(header.payment_method, Some(PaymentMethod::Cash));
        assert_eq!(header.delivery_terms.as_deref(), Some("Ex-Stock"));
        assert_eq!(header.remarks.as_deref(), Some("Prices valid 14 days"));
    }

    #[test]
    fn test_value_does_not_run_into_next_label() {
        let text = "PI No: 4410    Date: 12/01/2024\n";
        let header = extract_header(text);

        assert_eq!(header.invoice_number.as_deref(), Some("4410"));
        assert_eq!(header.invoice_date.as_deref(), Some("12/01/2024"));
    }

    #[test]
    fn test_address_like_name_is_rejected() {
        let text = "Customer Name: P.O. Box 123, Dar es Salaam\nAddress: P.O. Box 123\nDAR ES SALAAM\n";
        let header = extract_header(text);

        assert_eq!(header.customer_name, None);
        assert_eq!(header.address.as_deref(), Some("P.O. Box 123 DAR ES SALAAM"));
    }

    #[test]
    fn test_name_recovered_from_address() {
        let text = "Address: MERU AUTO SPARES\nP.O. Box 77\nMOSHI\nTel: 0700 111 222\n";
        let header = extract_header(text);

        assert_eq!(header.customer_name.as_deref(), Some("MERU AUTO SPARES"));
        assert_eq!(header.address.as_deref(), Some("P.O. Box 77 MOSHI"));
    }

    #[test]
    fn test_name_recovered_from_single_line_address() {
        let text = "Address: Juma Hassan Mwinyi Plot 4 Nyerere Road\n\nTel: 0700 111 222\n";
        let header = extract_header(text);

        assert_eq!(header.customer_name.as_deref(), Some("Juma Hassan Mwinyi"));
        assert_eq!(header.address.as_deref(), Some("Plot 4 Nyerere Road"));
    }

    #[test]
    fn test_panicking_field_leaves_others_intact() {
        let mut warnings = Vec::new();
        let mut fields = FieldGuard::new(&mut warnings);

        let phone: Option<String> = fields.run("phone", || panic!("bad pattern"));
        let email = fields.run("email", || Some("a@b.co".to_string()));

        assert_eq!(phone, None);
        assert_eq!(email.as_deref(), Some("a@b.co"));
        assert!(!fields.all_failed());
        assert_eq!(warnings, vec!["phone resolver failed: bad pattern".to_string()]);
    }

    #[test]
    fn test_all_fields_failing_is_reported() {
        let mut warnings = Vec::new();
        let mut fields = FieldGuard::new(&mut warnings);

        let _: Option<u8> = fields.run("phone", || panic!("one"));
        let _: Option<u8> = fields.run("email", || panic!("two"));

        assert!(fields.all_failed());
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_resolve_guarded_matches_resolve() {
        let mut warnings = Vec::new();
        let header = HeaderResolver::default().resolve_guarded(PROFORMA, &mut warnings);

        assert_eq!(header, Some(extract_header(PROFORMA)));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_reference_none_is_absent() {
        let header = extract_header("Reference: NONE\nTel: 0755 000 000\n");
        assert_eq!(header.reference, None);
        assert_eq!(header.phone.as_deref(), Some("0755 000 000"));
    }

    #[test]
    fn test_email_fallback_scan() {
        let header = extract_header("Contact sales@example.co.tz for queries\n");
        assert_eq!(header.email.as_deref(), Some("sales@example.co.tz"));
    }

    #[test]
    fn test_date_fallback_scan() {
        let header = extract_header("PROFORMA INVOICE 03/02/2024\n");
        assert_eq!(header.invoice_date.as_deref(), Some("03/02/2024"));
    }

    #[test]
    fn test_remarks_enumeration_removed() {
        let header = extract_header("NOTE 1: Prices valid 30 days\n");
        assert_eq!(header.remarks.as_deref(), Some("Prices valid 30 days"));
    }

    #[test]
    fn test_payment_unmapped_passes_through() {
        let header = extract_header("Payment Terms: Barter\n");
        assert_eq!(header.payment_method, Some(PaymentMethod::Other("Barter".to_string())));
    }
}
