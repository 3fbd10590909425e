// domain-broker/tests/cli_integration.rs

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const CUSTOMER: &str = "a0000000-0000-4000-8000-000000000001";

/// A sandbox with config, directory and record files, isolated from the
/// user's own configuration.
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new(taken: &[&str]) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let directory = dir.path().join("directory.toml");
        let records = dir.path().join("registrations.json");

        fs::write(
            &directory,
            format!(
                r#"
[[partner]]
id = "6f1c2d3e-0000-4000-8000-000000000001"
key = "handwerker24"
name = "Handwerker24"
auth_token = "tok-portal"

[[customer]]
id = "{CUSTOMER}"
partner_id = "6f1c2d3e-0000-4000-8000-000000000001"
name = "Schmidt Bau GmbH"
email = "info@schmidt-bau.de"
country = "DE"
industry = "handwerker"
"#
            ),
        )
        .expect("Failed to write directory");

        let taken: Vec<String> = taken.iter().map(|d| format!("{:?}", d)).collect();
        fs::write(
            dir.path().join("broker.toml"),
            format!(
                r#"
[registrar]
mode = "fake"
taken = [{}]

[auth]
tokens = {{ "tok-hw" = "handwerker24" }}

[storage]
directory = {:?}
registrations = {:?}
"#,
                taken.join(", "),
                directory.display().to_string(),
                records.display().to_string(),
            ),
        )
        .expect("Failed to write config");

        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("domain-broker").unwrap();
        cmd.current_dir(self.path())
            .env("HOME", self.path())
            .env("XDG_CONFIG_HOME", self.path())
            .env_remove("RUST_LOG")
            .env_remove("BROKER_REGISTRAR_MODE")
            .env_remove("BROKER_CONFIG")
            .arg("--config")
            .arg(self.path().join("broker.toml"));
        cmd
    }
}

#[test]
fn test_help_lists_subcommands() {
    let mut cmd = Command::cargo_bin("domain-broker").unwrap();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("suggest"))
        .stdout(predicate::str::contains("register"))
        .stdout(predicate::str::contains("wizard-start"))
        .stdout(predicate::str::contains("--registrar-mode"));
}

#[test]
fn test_suggest_json_ranks_de_first() {
    let sandbox = Sandbox::new(&[]);
    let output = sandbox
        .cmd()
        .args(["suggest", "Café Müller", "--country", "DE", "--limit", "3", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["label"], "cafe-mueller");
    let suggestions = body["suggestions"].as_array().unwrap();
    assert_eq!(suggestions.len(), 3);
    assert_eq!(suggestions[0]["domain"], "cafe-mueller.de");
    assert_eq!(suggestions[0]["availability"], "available");
    assert_eq!(suggestions[0]["price"], "8.99");
}

#[test]
fn test_suggest_text_marks_taken_domains() {
    let sandbox = Sandbox::new(&["schmidt-bau.de"]);
    sandbox
        .cmd()
        .args(["suggest", "Schmidt Bau GmbH", "--limit", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("schmidt-bau.de"))
        .stdout(predicate::str::contains("TAKEN"))
        .stdout(predicate::str::contains("AVAILABLE"));
}

#[test]
fn test_invalid_name_fails() {
    let sandbox = Sandbox::new(&[]);
    sandbox
        .cmd()
        .args(["suggest", "!!!"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("Invalid business name"));
}

#[test]
fn test_check_reports_prices() {
    let sandbox = Sandbox::new(&["mueller.com"]);
    sandbox
        .cmd()
        .args(["check", "mueller.de", "mueller.com", "mueller.xyz"])
        .assert()
        .success()
        .stdout(predicate::str::contains("8.99 EUR"))
        .stdout(predicate::str::contains("TAKEN"))
        .stdout(predicate::str::contains("not offered"));
}

#[test]
fn test_register_then_list_records() {
    let sandbox = Sandbox::new(&[]);

    sandbox
        .cmd()
        .args(["register", "--customer", CUSTOMER, "--domain", "schmidt-bau.de"])
        .assert()
        .success()
        .stdout(predicate::str::contains("REGISTERED"));

    // Same customer and domain again is a duplicate.
    sandbox
        .cmd()
        .args(["register", "--customer", CUSTOMER, "--domain", "schmidt-bau.de"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Duplicate submission"));

    let output = sandbox
        .cmd()
        .args(["records", "--customer", CUSTOMER, "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(records.as_array().unwrap().len(), 1);
    assert_eq!(records[0]["status"], "registered");
    assert_eq!(records[0]["sell_price"], "8.99");
}

#[test]
fn test_register_unknown_customer() {
    let sandbox = Sandbox::new(&[]);
    sandbox
        .cmd()
        .args([
            "register",
            "--customer",
            "b0000000-0000-4000-8000-000000000009",
            "--domain",
            "schmidt-bau.de",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_wizard_start() {
    let sandbox = Sandbox::new(&[]);

    sandbox
        .cmd()
        .args(["wizard-start", "--token", "tok-hw", "--customer", CUSTOMER])
        .assert()
        .success()
        .stdout(predicate::str::contains("Handwerker24"))
        .stdout(predicate::str::contains("Schmidt Bau GmbH"));

    // Token issued in the directory file.
    sandbox
        .cmd()
        .args(["wizard-start", "--token", "tok-portal", "--customer", CUSTOMER, "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("handwerker24"))
        .stdout(predicate::str::contains("tok-portal").not());

    sandbox
        .cmd()
        .args(["wizard-start", "--token", "wrong", "--customer", CUSTOMER, "--json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"kind\": \"unauthorized\""));
}

#[test]
fn test_tlds_lists_active_catalog() {
    let sandbox = Sandbox::new(&[]);
    sandbox
        .cmd()
        .arg("tlds")
        .assert()
        .success()
        .stdout(predicate::str::contains(".de"))
        .stdout(predicate::str::contains(".berlin"))
        .stdout(predicate::str::contains(".io").not());
}

#[test]
fn test_records_requires_a_filter() {
    let sandbox = Sandbox::new(&[]);
    sandbox
        .cmd()
        .arg("records")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--pending"));
}

#[test]
fn test_cancel_unknown_record_fails() {
    let sandbox = Sandbox::new(&[]);
    sandbox
        .cmd()
        .args(["cancel", "c0000000-0000-4000-8000-000000000042", "--json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("record_not_found"));
}
