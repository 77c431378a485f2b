//! Invoice field extraction module.

mod guard;
mod parser;
pub mod rules;

pub use parser::{extract_invoice_data, HeuristicInvoiceParser, InvoiceParser};
