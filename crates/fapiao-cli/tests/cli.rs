use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const INVOICE_TEXT: &str = "发票代码：044031900111\n发票号码：12345678\n开票日期：2024/3/5\n金额：¥1,234.5\n";

fn fapiao(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("fapiao").unwrap();
    // Keep the user's configuration out of the tests.
    cmd.arg("--config").arg(home.path().join("config.json"));
    cmd
}

/// Directory holding a default configuration file.
fn setup() -> TempDir {
    let home = TempDir::new().unwrap();
    fapiao(&home).args(["config", "init"]).assert().success();
    home
}

#[test]
fn test_extract_text_from_stdin() {
    let home = setup();

    fapiao(&home)
        .args(["extract", "-"])
        .write_stdin(INVOICE_TEXT)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""invoiceCode": "044031900111""#))
        .stdout(predicate::str::contains(r#""amount": "1234.50""#))
        .stdout(predicate::str::contains(r#""invoiceDate": "2024-03-05""#));
}

#[test]
fn test_extract_text_format() {
    let home = setup();

    fapiao(&home)
        .args(["extract", "--format", "text"])
        .write_stdin(INVOICE_TEXT)
        .assert()
        .success()
        .stdout(predicate::str::contains("发票号码: 12345678"));
}

#[test]
fn test_extract_service_failure() {
    let home = setup();

    fapiao(&home)
        .args(["extract", "--json"])
        .write_stdin(r#"{"code": 1002, "message": "quota exceeded"}"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("quota exceeded"));
}

#[test]
fn test_fill_reports_missing_target() {
    let home = setup();
    let dir = TempDir::new().unwrap();

    let record = dir.path().join("record.json");
    let form = dir.path().join("form.json");
    let mapping = dir.path().join("mapping.json");
    fs::write(&record, r#"{"invoiceCode": "1234567890", "amount": "100.5"}"#).unwrap();
    fs::write(&form, r#"[{"name": "inv_code"}]"#).unwrap();
    fs::write(
        &mapping,
        r#"[{"targetId": "inv_code", "field": "invoiceCode"}, {"targetId": "inv_amt", "field": "amount"}]"#,
    )
    .unwrap();

    fapiao(&home)
        .arg("fill")
        .arg(&record)
        .arg("--form")
        .arg(&form)
        .arg("--mapping")
        .arg(&mapping)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""inv_code": "1234567890""#))
        .stdout(predicate::str::contains("targetNotFound"))
        .stderr(predicate::str::contains("filled 1/2"));
}

#[test]
fn test_config_set_and_get() {
    let home = setup();

    fapiao(&home)
        .args(["config", "set", "orchestrator.debounce_ms", "250"])
        .assert()
        .success();

    fapiao(&home)
        .args(["config", "get", "orchestrator.debounce_ms"])
        .assert()
        .success()
        .stdout(predicate::str::diff("250\n"));
}

#[test]
fn test_recognize_without_matching_inputs_fails() {
    let home = setup();
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

    fapiao(&home)
        .arg("recognize")
        .arg(dir.path().join("*").display().to_string())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matching images"));
}

#[test]
fn test_recognize_remote_requires_api_config() {
    let home = setup();
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("invoice.png"), [0x89, b'P', b'N', b'G']).unwrap();

    fapiao(&home)
        .arg("recognize")
        .arg("--remote")
        .arg(dir.path().join("invoice.png"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("api.url"));
}
