//! Monetary amounts: token normalization and the invoice totals block.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::debug;

use super::patterns::{AMOUNT_CAPTURE, CURRENCY_PREFIX, RATE_SUFFIX};

/// Convert a numeric-looking token into an exact decimal.
///
/// Everything except digits, `.`, `,` and `-` is dropped and commas are
/// treated as thousands separators. Returns `None` for tokens that do not
/// hold a number.
pub fn to_decimal(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();

    if cleaned.is_empty() || matches!(cleaned.as_str(), "." | "," | "-") {
        return None;
    }

    let normalized = cleaned.replace(',', "");
    let normalized = normalized.strip_suffix('.').unwrap_or(&normalized);

    Decimal::from_str(normalized).ok()
}

/// One label synonym for an amount, compiled for each capture strategy.
struct AmountLabel {
    source: &'static str,
    delimited: Regex,
    adjacent: Regex,
    standalone: Regex,
}

impl AmountLabel {
    fn new(label: &'static str) -> Self {
        Self {
            source: label,
            delimited: Regex::new(&format!(
                r"(?i:{label}){RATE_SUFFIX}[ \t]*[:=][ \t]*{CURRENCY_PREFIX}{AMOUNT_CAPTURE}"
            ))
            .unwrap(),
            adjacent: Regex::new(&format!(
                r"(?i:{label}){RATE_SUFFIX}[ \t]+{CURRENCY_PREFIX}{AMOUNT_CAPTURE}"
            ))
            .unwrap(),
            standalone: Regex::new(&format!(r"(?i:{label}){RATE_SUFFIX}[ \t]*[:=]?[ \t]*$"))
                .unwrap(),
        }
    }

    /// Same-line `Label: 100`, then `Label 100`, then a bare label with the
    /// amount on one of the next two non-empty lines.
    fn find(&self, text: &str) -> Option<Decimal> {
        for pattern in [&self.delimited, &self.adjacent] {
            for caps in pattern.captures_iter(text) {
                if follows_sub(text, &caps) {
                    continue;
                }
                if let Some(amount) = to_decimal(&caps[1]) {
                    return Some(amount);
                }
            }
        }

        let lines: Vec<&str> = text.lines().collect();
        for (i, line) in lines.iter().enumerate() {
            let Some(label) = self.standalone.find(line) else {
                continue;
            };
            if ends_with_sub(&line[..label.start()]) {
                continue;
            }

            let amount = lines
                .iter()
                .skip(i + 1)
                .filter(|l| !l.trim().is_empty())
                .take(2)
                .find_map(|l| STANDALONE_AMOUNT.captures(l))
                .and_then(|caps| to_decimal(&caps[1]));
            if amount.is_some() {
                return amount;
            }
        }

        None
    }
}

// "Sub Total" must not be read as "Total".
fn follows_sub(text: &str, caps: &Captures<'_>) -> bool {
    caps.get(0)
        .is_some_and(|m| ends_with_sub(&text[..m.start()]))
}

fn ends_with_sub(prefix: &str) -> bool {
    prefix
        .trim_end_matches([' ', '\t', '-'])
        .to_ascii_lowercase()
        .ends_with("sub")
}

lazy_static! {
    static ref STANDALONE_AMOUNT: Regex = Regex::new(&format!(
        r"^[ \t]*{CURRENCY_PREFIX}{AMOUNT_CAPTURE}[ \t]*$"
    )).unwrap();

    static ref SUBTOTAL_LABELS: Vec<AmountLabel> = [
        r"Net\s*Value",
        r"Net\s*Amount",
        r"Sub\s*-?\s*total",
        r"\bNet\b",
    ].into_iter().map(AmountLabel::new).collect();

    static ref TAX_LABELS: Vec<AmountLabel> = [
        r"\bVAT\b",
        r"\bTax\b",
        r"\bGST\b",
        r"Sales\s*Tax",
    ].into_iter().map(AmountLabel::new).collect();

    static ref TOTAL_LABELS: Vec<AmountLabel> = [
        r"Gross\s*Value",
        r"Total\s*Amount",
        r"Grand\s*Total",
        r"\bTotal\b",
    ].into_iter().map(AmountLabel::new).collect();
}

/// The totals block of an invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceTotals {
    /// Net value before tax.
    pub subtotal: Option<Decimal>,
    /// VAT / tax amount.
    pub tax: Option<Decimal>,
    /// Gross value.
    pub total: Option<Decimal>,
}

impl InvoiceTotals {
    /// Whether `subtotal + tax == total`, when all three are known and the
/// sum does not overflow.
    pub fn reconciles(&self) -> Option<bool> {
        match (self.subtotal, self.tax, self.total) {
            (Some(net), Some(tax), Some(gross)) => net.checked_add(tax).map(|sum| sum == gross),
            _ => None,
        }
    }
}

/// Resolve subtotal, tax and total from invoice text.
///
/// Each amount tries its synonyms in order; the first synonym that yields a
/// parseable number wins.
pub fn extract_totals(text: &str) -> InvoiceTotals {
    let totals = InvoiceTotals {
        subtotal: first_amount(&SUBTOTAL_LABELS, text),
        tax: first_amount(&TAX_LABELS, text),
        total: first_amount(&TOTAL_LABELS, text),
    };
    debug!("totals resolved: {:?}", totals);
    totals
}

fn first_amount(labels: &[AmountLabel], text: &str) -> Option<Decimal> {
    labels.iter().find_map(|label| {
        let amount = label.find(text);
        if amount.is_some() {
            debug!("amount label {} matched", label.source);
        }
        amount
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_to_decimal() {
        assert_eq!(to_decimal("12,345.50"), Some(dec("12345.50")));
        assert_eq!(to_decimal("TSH 118,000"), Some(dec("118000")));
        assert_eq!(to_decimal("15000."), Some(dec("15000")));
        assert_eq!(to_decimal("-250"), Some(dec("-250")));
    }

    #[test]
    fn test_to_decimal_keeps_precision() {
        let value = to_decimal("0.1").unwrap() + to_decimal("0.2").unwrap();
        assert_eq!(value, dec("0.3"));
    }

    #[test]
    fn test_to_decimal_unparseable() {
        assert_eq!(to_decimal(""), None);
        assert_eq!(to_decimal("-"), None);
        assert_eq!(to_decimal("."), None);
        assert_eq!(to_decimal(","), None);
        assert_eq!(to_decimal("N/A"), None);
        assert_eq!(to_decimal("1.2.3"), None);
    }

    #[test]
    fn test_extract_totals() {
        let text = "Net Value: TSH 100,000\nVAT: TSH 18,000\nGross Value: TSH 118,000\n";
        let totals = extract_totals(text);

        assert_eq!(totals.subtotal, Some(dec("100000")));
        assert_eq!(totals.tax, Some(dec("18000")));
        assert_eq!(totals.total, Some(dec("118000")));
        assert_eq!(totals.reconciles(), Some(true));
    }

    #[test]
    fn test_tax_rate_is_skipped() {
        let totals = extract_totals("VAT 18%: 18,000.00\n");
        assert_eq!(totals.tax, Some(dec("18000.00")));

        let totals = extract_totals("VAT (18 %) = 540\n");
        assert_eq!(totals.tax, Some(dec("540")));
    }

    #[test]
    fn test_space_separated_amounts() {
        let totals = extract_totals("Net Value 100,000\nGrand Total TSH 118,000\n");
        assert_eq!(totals.subtotal, Some(dec("100000")));
        assert_eq!(totals.total, Some(dec("118000")));
        assert_eq!(totals.tax, None);
    }

    #[test]
    fn test_amount_on_following_line() {
        let text = "Gross Value\n\nTSH 59,000.00\nPayment: Cash\n";
        assert_eq!(extract_totals(text).total, Some(dec("59000.00")));
    }

    #[test]
    fn test_sub_total_is_not_total() {
        let text = "Sub Total: 100\nVAT: 18\nTotal: 118\n";
        let totals = extract_totals(text);

        assert_eq!(totals.subtotal, Some(dec("100")));
        assert_eq!(totals.total, Some(dec("118")));
    }

    #[test]
    fn test_synonym_order() {
        let text = "Total: 5\nGross Value: 118,000\n";
        assert_eq!(extract_totals(text).total, Some(dec("118000")));
    }

    #[test]
    fn test_reconcile_mismatch() {
        let totals = InvoiceTotals {
            subtotal: Some(dec("100")),
            tax: Some(dec("18")),
            total: Some(dec("120")),
        };
        assert_eq!(totals.reconciles(), Some(false));
        assert_eq!(InvoiceTotals::default().reconciles(), None);

        let overflowing = InvoiceTotals {
            subtotal: Some(Decimal::MAX),
            tax: Some(Decimal::ONE),
            total: Some(Decimal::ONE),
        };
        assert_eq!(overflowing.reconciles(), None);
    }
}
