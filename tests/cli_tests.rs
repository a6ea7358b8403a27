//! Integration tests for the CLI interface

mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use common::{fixture, fixture_with, Fixture};
use hhg_pricing::dataset::Dataset;
use hhg_pricing::models::{ShipmentId, ShipmentStatus};

fn write_dataset(dir: &TempDir, fx: &Fixture) -> PathBuf {
    let path = dir.path().join("dataset.json");
    fs::write(&path, serde_json::to_string_pretty(&fx.dataset()).unwrap()).unwrap();
    path
}

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("hhg-pricing").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

fn verify_rates_args(dataset: &Path) -> Vec<String> {
    [
        "verify-rates",
        "--reference",
        dataset.to_str().unwrap(),
        "--origin-zip",
        "62225",
        "--destination-zip",
        "85004",
        "--weight",
        "3000",
        "--book-date",
        "2019-06-01",
        "--pickup-date",
        "2019-06-20",
        "--miles",
        "1000",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[test]
fn test_cli_help_lists_commands() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("verify-rates"))
        .stdout(predicate::str::contains("recalculate"));
}

#[test]
fn test_invalid_command() {
    cli()
        .arg("invalid-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn test_verify_rates_with_carrier_discount() {
    let dir = TempDir::new().unwrap();
    let dataset = write_dataset(&dir, &fixture());

    cli()
        .args(verify_rates_args(&dataset))
        .arg("--dataset")
        .arg(&dataset)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total\": 1872"));
}

#[test]
fn test_verify_rates_without_discount() {
    let dir = TempDir::new().unwrap();
    let dataset = write_dataset(&dir, &fixture());

    // Undiscounted: 3000 + 150 + 180 + 210 + 24 + 90
    cli()
        .args(verify_rates_args(&dataset))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total\": 3654"));
}

#[test]
fn test_verify_rates_rejects_out_of_range_discount() {
    let dir = TempDir::new().unwrap();
    let dataset = write_dataset(&dir, &fixture());

    cli()
        .args(verify_rates_args(&dataset))
        .args(["--discount", "1.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_config_code_of_service_reaches_selection() {
    let dir = TempDir::new().unwrap();
    let dataset = write_dataset(&dir, &fixture());
    let config = dir.path().join("pricing.toml");
    fs::write(&config, "code_of_service = \"2\"\n").unwrap();

    cli()
        .arg("--config")
        .arg(&config)
        .args(verify_rates_args(&dataset))
        .arg("--dataset")
        .arg(&dataset)
        .assert()
        .failure()
        .stderr(predicate::str::contains("US62/11/2"));
}

#[test]
fn test_recalculate_writes_report_and_records() {
    let dir = TempDir::new().unwrap();
    let fx = fixture();
    let dataset = write_dataset(&dir, &fx);
    let output = dir.path().join("out.json");

    cli()
        .arg("recalculate")
        .arg("--dataset")
        .arg(&dataset)
        .args(["--shipment", &fx.shipment_id.to_string(), "--miles", "1000"])
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains(fx.shipment_id.to_string()))
        .stdout(predicate::str::contains("\"failures\": []"));

    let updated = Dataset::from_json(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(updated.records.line_items.len(), 6);
    assert_eq!(
        updated.records.shipments[0].carrier_performance_id,
        Some(fx.best)
    );
}

#[test]
fn test_recalculate_with_delivery() {
    let dir = TempDir::new().unwrap();
    let fx = fixture_with(ShipmentStatus::InTransit);
    let dataset = write_dataset(&dir, &fx);

    cli()
        .arg("recalculate")
        .arg("--dataset")
        .arg(&dataset)
        .args(["--shipment", &fx.shipment_id.to_string(), "--miles", "1000"])
        .args(["--deliver", "2019-07-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"priced\""));
}

#[test]
fn test_recalculate_unknown_shipment_fails() {
    let dir = TempDir::new().unwrap();
    let dataset = write_dataset(&dir, &fixture());

    cli()
        .arg("recalculate")
        .arg("--dataset")
        .arg(&dataset)
        .args(["--shipment", &ShipmentId::new().to_string(), "--miles", "1000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("shipment not found"));
}

#[test]
fn test_unparseable_timeout_env_is_rejected() {
    let dir = TempDir::new().unwrap();
    let dataset = write_dataset(&dir, &fixture());

    cli()
        .env("HHG_PRICING_DISTANCE_TIMEOUT", "soon")
        .args(verify_rates_args(&dataset))
        .assert()
        .failure()
        .stderr(predicate::str::contains("HHG_PRICING_DISTANCE_TIMEOUT"));
}
