//! Command-line integration tests.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

const PROFORMA: &str = "\
PI No: 4410
Date: 12/01/2024
Customer Name: MERU AUTO SPARES LTD
Sr  Item Code  Description  Unit  Qty  Rate  Value
1  41003  STEERING ARM  NOS  2  15,000.00  30,000.00
Net Value: 30,000.00
VAT: 5,400.00
Gross Value: TSH 35,400.00
";

fn itrack() -> Command {
    Command::cargo_bin("itrack").unwrap()
}

#[test]
fn test_extract_from_stdin() {
    itrack()
        .args(["extract", "-"])
        .write_stdin(PROFORMA)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""invoice_number": "4410""#))
        .stdout(predicate::str::contains(r#""code": "41003""#))
        .stdout(predicate::str::contains("raw_text").not());
}

#[test]
fn test_extract_include_raw() {
    itrack()
        .args(["extract", "-", "--include-raw"])
        .write_stdin(PROFORMA)
        .assert()
        .success()
        .stdout(predicate::str::contains("raw_text"));
}

#[test]
fn test_failed_extraction_still_exits_zero() {
    itrack()
        .args(["extract", "-"])
        .write_stdin("   \n")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""failure_reason": "no_input""#))
        .stderr(predicate::str::contains("Extraction failed"));
}

#[test]
fn test_extract_text_file_as_csv() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("pi-4410.txt");
    fs::write(&input, PROFORMA).unwrap();

    itrack()
        .args(["extract", "-f", "csv"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "4410,2024-01-12,MERU AUTO SPARES LTD,41003,STEERING ARM,2,NOS,15000,30000.00",
        ));
}

#[test]
fn test_image_needs_manual_entry() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("scan.png");
    fs::write(&input, b"\x89PNG\r\n\x1a\n").unwrap();

    itrack()
        .args(["extract", "-f", "text"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("unsupported file format"));
}

#[test]
fn test_missing_input_file() {
    itrack()
        .args(["extract", "does-not-exist.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_config_set_and_get() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.json");
    let config = config.to_str().unwrap();

    itrack()
        .args(["--config", config, "config", "init"])
        .assert()
        .success();

    itrack()
        .args(["--config", config, "config", "set", "extraction.max_line_distance", "3"])
        .assert()
        .success();

    itrack()
        .args(["--config", config, "config", "get", "extraction.max_line_distance"])
        .assert()
        .success()
        .stdout(predicate::str::diff("3\n"));

    itrack()
        .args(["--config", config, "config", "get", "extraction.nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration key not found"));
}

#[test]
fn test_batch_writes_outputs_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), PROFORMA).unwrap();
    fs::write(dir.path().join("b.txt"), "").unwrap();
    let out = dir.path().join("out");

    let pattern = format!("{}/*.txt", dir.path().display());
    itrack()
        .args(["batch", &pattern, "--summary", "-o"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 extracted, 1 need manual entry"));

    assert!(out.join("a.json").exists());

    let summary = fs::read_to_string(out.join("summary.csv")).unwrap();
    let lines: Vec<&str> = summary.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("a.txt,success,4410,2024-01-12,MERU AUTO SPARES LTD,1,35400.00,"));
    assert!(lines[2].starts_with("b.txt,manual,"));
}
