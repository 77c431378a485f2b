//! Common regex patterns for invoice text extraction.
//!
//! Compiled once on first use and shared read-only across threads.

use lazy_static::lazy_static;
use regex::Regex;

/// Optional tax rate between a label and its delimiter, e.g. `VAT 18%:`.
pub const RATE_SUFFIX: &str = r"(?:[ \t]*\(?[ \t]*\d{1,2}(?:\.\d+)?[ \t]*%[ \t]*\)?)?";

/// Optional three-letter currency code in front of an amount.
pub const CURRENCY_PREFIX: &str = r"(?:[A-Z]{3}\.?[ \t]*)?";

/// A monetary amount with optional thousands separators and decimals.
pub const AMOUNT_CAPTURE: &str = r"(\d[\d,]*(?:\.\d+)?)";

lazy_static! {
    // Number tokens inside a table row
    pub static ref NUMBER_TOKEN: Regex = Regex::new(
        r"\d[\d,]*(?:\.\d+)?"
    ).unwrap();

    // Plain 3-6 digit item code token
    pub static ref ITEM_CODE_TOKEN: Regex = Regex::new(
        r"^\d{3,6}$"
    ).unwrap();

    pub static ref ITEM_CODE_IN_TEXT: Regex = Regex::new(
        r"\b(\d{3,6})\b"
    ).unwrap();

    // Units of measure
    pub static ref UNIT_TOKEN: Regex = Regex::new(
        r"(?i)\b(NOS|PCS|KG|HR|LTR|PIECES?|UNITS?|BOX|CASE|SETS?|PC|KIT)\b"
    ).unwrap();

    // Item table header keyword groups
    pub static ref HEADER_SERIAL: Regex = Regex::new(
        r"(?i)\b(?:Sr|S\.N|Serial|No)\b"
    ).unwrap();

    pub static ref HEADER_ITEM: Regex = Regex::new(
        r"(?i)\b(?:Item|Code)\b"
    ).unwrap();

    pub static ref HEADER_DESCRIPTION: Regex = Regex::new(
        r"(?i)\b(?:Description|Desc)\b"
    ).unwrap();

    pub static ref HEADER_QUANTITY: Regex = Regex::new(
        r"(?i)\b(?:Qty|Quantity|Type)\b"
    ).unwrap();

    pub static ref HEADER_RATE: Regex = Regex::new(
        r"(?i)\b(?:Rate|Price|Unit|UnitPrice)\b"
    ).unwrap();

    pub static ref HEADER_VALUE: Regex = Regex::new(
        r"(?i)\b(?:Value|Amount|Total)\b"
    ).unwrap();

    // Totals / footer section that ends the item table
    pub static ref TABLE_FOOTER: Regex = Regex::new(
        r"(?i)(?:Net\s*Value|Gross\s*Value|Grand\s*Total|Total\s*:|Payment|Delivery|Remarks|NOTE)"
    ).unwrap();

    // Date-shaped substrings
    pub static ref DATE_DMY: Regex = Regex::new(
        r"\b(\d{1,2})[./\-](\d{1,2})[./\-](\d{4}|\d{2})\b"
    ).unwrap();

    pub static ref DATE_YMD: Regex = Regex::new(
        r"\b(\d{4})[./\-](\d{1,2})[./\-](\d{1,2})\b"
    ).unwrap();

    pub static ref DATE_LONG: Regex = Regex::new(
        r"(?i)\b(\d{1,2})[ \-]+(jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec)[a-z]*\.?[ \-,]+(\d{4})\b"
    ).unwrap();

    // Email pattern
    pub static ref EMAIL: Regex = Regex::new(
        r"[\w.\-]+@[\w.\-]+\.\w+"
    ).unwrap();

    // Runs of two or more blanks separate columns in PDF text
    pub static ref COLUMN_GAP: Regex = Regex::new(
        r"[ \t]{2,}"
    ).unwrap();

    pub static ref WHITESPACE_RUN: Regex = Regex::new(
        r"\s+"
    ).unwrap();

    // Phone fax tail: "0755 123456 / Fax 022 ..."
    pub static ref FAX_TAIL: Regex = Regex::new(
        r"(?i)[\s/]*Fax.*$"
    ).unwrap();

    // Enumerated remarks: "1: ...", "NOTE 2: ..."
    pub static ref REMARK_ENUMERATION: Regex = Regex::new(
        r"(?i)(?:^NOTE\s*\d+\s*:|\d+\s*:)"
    ).unwrap();
}

/// Collapse every whitespace run to one space and trim.
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE_RUN.replace_all(s.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_token() {
        let found: Vec<&str> = NUMBER_TOKEN
            .find_iter("41003 ARM 2 15,000.50 x")
            .map(|m| m.as_str())
            .collect();
        assert_eq!(found, vec!["41003", "2", "15,000.50"]);
    }

    #[test]
    fn test_table_footer() {
        assert!(TABLE_FOOTER.is_match("Net Value 100,000"));
        assert!(TABLE_FOOTER.is_match("Total: 118,000"));
        assert!(!TABLE_FOOTER.is_match("41003 STEERING ARM NOS 2 15000 30000"));
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  STEERING   ARM \t LEFT "), "STEERING ARM LEFT");
    }
}
