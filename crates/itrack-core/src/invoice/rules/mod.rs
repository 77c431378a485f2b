//! Rule-based resolvers for invoice text.

pub mod amounts;
pub mod dates;
pub mod header;
pub mod labels;
pub mod party;
pub mod patterns;
pub mod table;

pub use amounts::{extract_totals, to_decimal, InvoiceTotals};
pub use dates::{find_date, parse_invoice_date};
pub use header::{extract_header, stop_labels, HeaderField, HeaderResolver};
pub use labels::{find_field, find_field_block, LabelPattern, StopLabels};
pub use party::{is_likely_address, is_likely_customer_name};
pub use table::{parse_line_items, TableParser};
