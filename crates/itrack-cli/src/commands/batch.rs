//! Batch command - extract invoice data from multiple files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use itrack_core::{ExtractionResult, HeuristicInvoiceParser};

use super::extract::{describe_failure, extract_file, format_result, iso_date, OutputFormat};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Include the source text in JSON output
    #[arg(long)]
    include_raw: bool,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,
}

/// Outcome for a single file.
struct FileOutcome {
    path: PathBuf,
    result: Option<ExtractionResult>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let started_at = Utc::now();

    let config = super::config::load(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let parser = HeuristicInvoiceParser::from_config(config.extraction.clone());
    let mut outcomes = Vec::with_capacity(files.len());

    for path in files {
        let file_start = Instant::now();
        pb.set_message(path.display().to_string());

        let (result, error) = match extract_file(&path, &parser, &config) {
            Ok(result) => (Some(result), None),
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                (None, Some(e.to_string()))
            }
        };

        outcomes.push(FileOutcome {
            path,
            result,
            error,
            processing_time_ms: file_start.elapsed().as_millis() as u64,
        });

        pb.inc(1);
    }

    pb.finish_and_clear();

    if let Some(output_dir) = &args.output_dir {
        for outcome in &outcomes {
            let Some(result) = &outcome.result else {
                continue;
            };
            let output_name = outcome
                .path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("invoice");

            let output_path = output_dir.join(format!("{}.{}", output_name, args.format.extension()));
            fs::write(&output_path, format_result(result, args.format, args.include_raw)?)?;
            debug!("Wrote output to {}", output_path.display());
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &outcomes, started_at)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let extracted = outcomes
        .iter()
        .filter(|o| o.result.as_ref().is_some_and(|r| r.succeeded))
        .count();
    let failed: Vec<&FileOutcome> = outcomes
        .iter()
        .filter(|o| o.result.as_ref().is_none_or(|r| !r.succeeded))
        .collect();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        outcomes.len(),
        start.elapsed()
    );
    println!(
        "   {} extracted, {} need manual entry",
        style(extracted).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Manual entry needed:").red());
        for outcome in &failed {
            println!("  - {}: {}", outcome.path.display(), failure_text(outcome));
        }
    }

    Ok(())
}

fn failure_text(outcome: &FileOutcome) -> String {
    match (&outcome.result, &outcome.error) {
        (Some(result), _) => result
            .failure_reason
            .map(describe_failure)
            .unwrap_or_default()
            .to_string(),
        (None, Some(error)) => error.clone(),
        (None, None) => "unknown error".to_string(),
    }
}

fn write_summary(
    path: &Path,
    outcomes: &[FileOutcome],
    started_at: DateTime<Utc>,
) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "invoice_number",
        "invoice_date",
        "customer_name",
        "items",
        "total",
        "warnings",
        "processing_time_ms",
        "processed_at",
        "error",
    ])?;

    let processed_at = started_at.to_rfc3339();

    for outcome in outcomes {
        let filename = outcome
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        let time_ms = outcome.processing_time_ms.to_string();

        match &outcome.result {
            Some(result) if result.succeeded => {
                let header = &result.header;
                wtr.write_record([
                    filename,
                    "success",
                    header.invoice_number.as_deref().unwrap_or(""),
                    &iso_date(header.invoice_date.as_deref()),
                    header.customer_name.as_deref().unwrap_or(""),
                    &result.items.len().to_string(),
                    &header.total.map(|t| t.to_string()).unwrap_or_default(),
                    &result.warnings.join("; "),
                    &time_ms,
                    &processed_at,
                    "",
                ])?;
            }
            _ => {
                wtr.write_record([
                    filename,
                    "manual",
                    "",
                    "",
                    "",
                    "",
                    "",
                    "",
                    &time_ms,
                    &processed_at,
                    &failure_text(outcome),
                ])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}
