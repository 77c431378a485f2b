//! Extract command - pull invoice data from a single file or stdin.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info};

use itrack_core::invoice::rules::parse_invoice_date;
use itrack_core::models::config::TrackerConfig;
use itrack_core::{
    DocumentTextSource, ExtractionResult, FailureReason, HeuristicInvoiceParser, InvoiceParser,
};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input file (PDF or plain text), or `-` to read text from stdin
    #[arg(required = true)]
    input: String,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Include the source text in JSON output
    #[arg(long)]
    include_raw: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output, one row per line item
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = super::config::load(config_path)?;
    let parser = HeuristicInvoiceParser::from_config(config.extraction.clone());

    let result = if args.input == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        info!("Extracting from {} characters on stdin", text.len());
        parser.parse(&text)
    } else {
        let path = Path::new(&args.input);
        if !path.exists() {
            anyhow::bail!("Input file not found: {}", path.display());
        }
        info!("Processing file: {}", path.display());
        extract_file(path, &parser, &config)?
    };

    report(&result);

    let output = format_result(&result, args.format, args.include_raw)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Read a document and run it through the text producer and the parser.
pub fn extract_file(
    path: &Path,
    parser: &HeuristicInvoiceParser,
    config: &TrackerConfig,
) -> anyhow::Result<ExtractionResult> {
    let data = fs::read(path)?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    let source = DocumentTextSource::new(&config.pdf);
    Ok(parser.extract_from_bytes(&data, filename, &source))
}

/// Print the failure reason and warnings to stderr.
fn report(result: &ExtractionResult) {
    if let Some(reason) = result.failure_reason {
        eprintln!(
            "{} Extraction failed: {}. Enter the invoice manually.",
            style("!").yellow(),
            describe_failure(reason)
        );
    }

    if !result.warnings.is_empty() {
        eprintln!("{}", style("Warnings:").yellow());
        for warning in &result.warnings {
            eprintln!("  - {}", warning);
        }
    }
}

pub fn describe_failure(reason: FailureReason) -> &'static str {
    match reason {
        FailureReason::NoInput => "no input text",
        FailureReason::UnsupportedFormat => "unsupported file format",
        FailureReason::SourceTextUnavailable => "no text could be extracted",
        FailureReason::ParsingFailed => "the text could not be parsed",
    }
}

pub fn format_result(
    result: &ExtractionResult,
    format: OutputFormat,
    include_raw: bool,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => format_json(result, include_raw),
        OutputFormat::Csv => format_csv(result),
        OutputFormat::Text => Ok(format_text(result)),
    }
}

fn format_json(result: &ExtractionResult, include_raw: bool) -> anyhow::Result<String> {
    let mut value = serde_json::to_value(result)?;
    if !include_raw {
        if let Some(object) = value.as_object_mut() {
            object.remove("raw_text");
        }
    }
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Invoice date as ISO `YYYY-MM-DD` when it parses, otherwise as written.
pub fn iso_date(raw: Option<&str>) -> String {
    match raw {
        Some(raw) => parse_invoice_date(raw)
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| raw.to_string()),
        None => String::new(),
    }
}

fn format_csv(result: &ExtractionResult) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let header = &result.header;

    wtr.write_record([
        "invoice_number",
        "invoice_date",
        "customer_name",
        "code",
        "description",
        "quantity",
        "unit",
        "rate",
        "value",
    ])?;

    let invoice_number = header.invoice_number.clone().unwrap_or_default();
    let invoice_date = iso_date(header.invoice_date.as_deref());
    let customer_name = header.customer_name.clone().unwrap_or_default();

    for item in &result.items {
        wtr.write_record([
            &invoice_number,
            &invoice_date,
            &customer_name,
            &item.code.clone().unwrap_or_default(),
            &item.description,
            &item.quantity.to_string(),
            &item.unit.clone().unwrap_or_default(),
            &item.rate.map(|r| r.to_string()).unwrap_or_default(),
            &item.value.map(|v| v.to_string()).unwrap_or_default(),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(result: &ExtractionResult) -> String {
    let header = &result.header;
    let field = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    let mut output = String::new();

    if let Some(reason) = result.failure_reason {
        output.push_str(&format!("Extraction failed: {}\n", describe_failure(reason)));
        return output;
    }

    output.push_str(&format!("Invoice: {}\n", field(&header.invoice_number)));
    output.push_str(&format!("Date: {}\n", field(&header.invoice_date)));
    output.push_str(&format!("Reference: {}\n", field(&header.reference)));
    output.push('\n');

    output.push_str("Customer:\n");
    output.push_str(&format!("  {}\n", field(&header.customer_name)));
    if let Some(address) = &header.address {
        output.push_str(&format!("  {}\n", address));
    }
    if let Some(phone) = &header.phone {
        output.push_str(&format!("  Tel: {}\n", phone));
    }
    if let Some(email) = &header.email {
        output.push_str(&format!("  Email: {}\n", email));
    }
    output.push('\n');

    output.push_str(&format!("Items ({}):\n", result.items.len()));
    for item in &result.items {
        output.push_str(&format!(
            "  {:<8} {:<30} {} x {} = {}\n",
            item.code.as_deref().unwrap_or("-"),
            item.description,
            item.quantity,
            item.rate.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string()),
            item.value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()),
        ));
    }
    output.push('\n');

    output.push_str("Summary:\n");
    for (label, value) in [("Net", header.subtotal), ("Tax", header.tax), ("Gross", header.total)] {
        let value = value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
        output.push_str(&format!("  {:<6} {}\n", format!("{}:", label), value));
    }

    if let Some(method) = &header.payment_method {
        output.push_str(&format!("\nPayment: {}\n", method.as_str()));
    }

    output
}
