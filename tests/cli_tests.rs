//! CLI integration tests
//!
//! These tests run the `xsdgate` binary, which is only built with the `cli`
//! feature.

#![cfg(feature = "cli")]

use std::path::PathBuf;
use std::process::Command;

fn xsdgate_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_xsdgate"))
}

fn fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path.to_string_lossy().into_owned()
}

// ============================================================================
// Check Command Tests
// ============================================================================

#[test]
fn test_cli_check() {
    let output = Command::new(xsdgate_bin())
        .args(["check", &fixture("purchase.xsd")])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "check should succeed");
    assert!(stdout.contains("urn:example:purchase"), "should show namespace");
    assert!(stdout.contains("Global elements: 2"), "should show element count");
}

// ============================================================================
// Validate Command Tests
// ============================================================================

#[test]
fn test_cli_validate_valid() {
    let output = Command::new(xsdgate_bin())
        .args(["validate", "--schema", &fixture("purchase.xsd"), &fixture("purchase_valid.xml")])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("is valid"));
}

#[test]
fn test_cli_validate_invalid_json() {
    let output = Command::new(xsdgate_bin())
        .args([
            "validate",
            "--json",
            "--schema",
            &fixture("purchase.xsd"),
            &fixture("purchase_valid.xml"),
            &fixture("purchase_invalid.xml"),
        ])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(1));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report[0]["valid"], true);
    assert_eq!(report[1]["valid"], false);
    assert_eq!(report[1]["errors"].as_array().map(|a| a.len()), Some(6));
    assert_eq!(report[1]["errors"][0]["kind"], "missing_attribute");
}

#[test]
fn test_cli_validate_unparsable() {
    let output = Command::new(xsdgate_bin())
        .args(["validate", "--schema", &fixture("purchase.xsd"), &fixture("gateway.toml")])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("not well-formed"));
}
