//! End-to-end tests for the flowprobe CLI
//!
//! These tests run the built binary against suite fixtures with isolated
//! config and data directories and check what it prints.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use flowprobe::idgen::luhn_valid;

/// Test context with isolated directories
struct TestContext {
    /// Holds the temporary directory alive for the test
    _temp: tempfile::TempDir,
    /// Config directory (XDG_CONFIG_HOME)
    config_dir: PathBuf,
    /// Data directory (XDG_DATA_HOME)
    data_dir: PathBuf,
    /// Path to fixtures directory
    fixtures_dir: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let temp = tempfile::tempdir().expect("Failed to create temp dir");
        let config_dir = temp.path().join("config");
        let data_dir = temp.path().join("data");
        fs::create_dir_all(&config_dir).expect("Failed to create config dir");
        fs::create_dir_all(&data_dir).expect("Failed to create data dir");

        let fixtures_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures");

        Self {
            _temp: temp,
            config_dir,
            data_dir,
            fixtures_dir,
        }
    }

    fn fixture(&self, name: &str) -> String {
        self.fixtures_dir.join(name).to_string_lossy().to_string()
    }

    fn snapshot(&self) -> String {
        self.data_dir.join("state.json").to_string_lossy().to_string()
    }

    /// Create a config file for the test
    fn create_config(&self, content: &str) {
        let path = self.config_dir.join("flowprobe").join("config.toml");
        fs::create_dir_all(path.parent().unwrap()).expect("Failed to create config dir");
        fs::write(&path, content).expect("Failed to write config");
    }

    /// Run a flowprobe command
    fn run(&self, args: &[&str]) -> CliOutput {
        let output = Command::new(env!("CARGO_BIN_EXE_flowprobe"))
            .args(args)
            .env("XDG_CONFIG_HOME", &self.config_dir)
            .env("XDG_DATA_HOME", &self.data_dir)
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to run flowprobe");

        CliOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
        }
    }

    /// Run a command expecting success
    fn run_ok(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            output.success,
            "flowprobe {:?} failed:\nstdout: {}\nstderr: {}",
            args, output.stdout, output.stderr
        );
        output.stdout
    }
}

struct CliOutput {
    stdout: String,
    stderr: String,
    success: bool,
}

fn digits_only(line: &str) -> bool {
    !line.is_empty() && line.chars().all(|c| c.is_ascii_digit())
}

#[test]
fn test_matrix_lists_scenarios_in_order() {
    let ctx = TestContext::new();
    let out = ctx.run_ok(&["matrix", &ctx.fixture("credit_suite.yaml")]);

    let labels = [
        "CURRENCY=RD,AUTO_DATE=S",
        "CURRENCY=RD,AUTO_DATE=N",
        "CURRENCY=RD,AUTO_DATE=''",
        "CURRENCY=US,AUTO_DATE=$absent",
    ];
    let mut last = 0;
    for label in labels {
        let pos = out
            .find(label)
            .unwrap_or_else(|| panic!("Missing '{}' in:\n{}", label, out));
        assert!(pos >= last, "'{}' out of order in:\n{}", label, out);
        last = pos;
    }
    assert!(out.contains("credit-parameters"));
}

#[test]
fn test_intercept_rewrites_captured_body() {
    let ctx = TestContext::new();
    let out = ctx.run_ok(&[
        "intercept",
        &ctx.fixture("credit_suite.yaml"),
        "--rule",
        "credit-parameters",
        "--scenario",
        "1",
        "--body",
        &ctx.fixture("credit_parameters.json"),
        "--url",
        "https://bank.test/core/api/credit/parameters?branch=01",
    ]);
    assert_eq!(
        out.trim(),
        r#"{"status":"OK","data":{"CURRENCY":"RD","AUTO_DATE":"N","RATE":12.50,"LIMIT":1500.00}}"#
    );
}

#[test]
fn test_intercept_absent_field_removed() {
    let ctx = TestContext::new();
    let out = ctx.run_ok(&[
        "intercept",
        &ctx.fixture("credit_suite.yaml"),
        "--rule",
        "credit-parameters",
        "--scenario",
        "3",
        "--body",
        &ctx.fixture("credit_parameters.json"),
    ]);
    assert_eq!(
        out.trim(),
        r#"{"status":"OK","data":{"CURRENCY":"US","RATE":12.50,"LIMIT":1500.00}}"#
    );
}

#[test]
fn test_intercept_unrouted_url_fails() {
    let ctx = TestContext::new();
    let output = ctx.run(&[
        "intercept",
        &ctx.fixture("credit_suite.yaml"),
        "--rule",
        "credit-parameters",
        "--scenario",
        "0",
        "--body",
        &ctx.fixture("credit_parameters.json"),
        "--url",
        "https://bank.test/core/api/customers",
    ]);
    assert!(!output.success);
    assert!(output.stderr.contains("No rule covers this URL"), "{}", output.stderr);
}

#[test]
fn test_unknown_rule_fails() {
    let ctx = TestContext::new();
    let output = ctx.run(&[
        "intercept",
        &ctx.fixture("credit_suite.yaml"),
        "--rule",
        "nope",
        "--scenario",
        "0",
        "--body",
        &ctx.fixture("credit_parameters.json"),
    ]);
    assert!(!output.success);
    assert!(output.stderr.contains("nope"), "{}", output.stderr);
}

#[test]
fn test_state_round_trip() {
    let ctx = TestContext::new();
    let snapshot = ctx.snapshot();

    ctx.run_ok(&["state", "--snapshot", &snapshot, "set", "person.id", "40211111111"]);
    let out = ctx.run_ok(&["state", "--snapshot", &snapshot, "get", "person.id"]);
    assert_eq!(out.trim(), "40211111111");

    let out = ctx.run_ok(&["state", "--snapshot", &snapshot, "list"]);
    assert!(out.contains("person.id"));

    ctx.run_ok(&["state", "--snapshot", &snapshot, "require", "person.id"]);

    let output = ctx.run(&["state", "--snapshot", &snapshot, "require", "person.id", "credit.id"]);
    assert!(!output.success);
    assert!(output.stderr.contains("credit.id"), "{}", output.stderr);
}

#[test]
fn test_state_check_reads_saved_browser_storage() {
    let ctx = TestContext::new();
    let snapshot = ctx.snapshot();
    fs::write(
        &snapshot,
        r#"{
  "version": 1,
  "saved_at": 0,
  "driver_state": {
    "cookies": [],
    "origins": [{"origin": "https://bank.test", "localStorage": [{"name": "authToken", "value": "x"}]}]
  },
  "shared": {}
}"#,
    )
    .unwrap();

    ctx.run_ok(&["state", "--snapshot", &snapshot, "check", "authToken"]);
    let output = ctx.run(&["state", "--snapshot", &snapshot, "check", "authToken", "branchCode"]);
    assert!(!output.success);
    assert!(output.stdout.contains("branchCode"), "{}", output.stdout);
}

#[test]
fn test_state_uses_data_dir_by_default() {
    let ctx = TestContext::new();
    ctx.run_ok(&["state", "set", "k", "v"]);
    assert!(ctx
        .data_dir
        .join("flowprobe")
        .join("session-state.json")
        .exists());
}

#[test]
fn test_id_generation() {
    let ctx = TestContext::new();
    let out = ctx.run_ok(&["id", "--length", "11", "--count", "5"]);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 5);
    for line in &lines {
        assert_eq!(line.len(), 11);
        assert!(digits_only(line), "not digits: {}", line);
    }

    let out = ctx.run_ok(&["id", "--length", "11", "--check-digit", "--count", "3"]);
    for line in out.lines() {
        assert!(luhn_valid(line), "bad check digit: {}", line);
    }
}

#[test]
fn test_id_seed_is_reproducible() {
    let ctx = TestContext::new();
    let a = ctx.run_ok(&["id", "--seed", "7", "--count", "3"]);
    let b = ctx.run_ok(&["id", "--seed", "7", "--count", "3"]);
    assert_eq!(a, b);
}

#[test]
fn test_config_loading() {
    let ctx = TestContext::new();
    ctx.create_config(
        r#"
[generator]
default_length = 6

[sequencer]
max_concurrent_pipelines = 2
"#,
    );
    let out = ctx.run_ok(&["id"]);
    assert_eq!(out.trim().len(), 6);
}

#[test]
fn test_invalid_config_reported() {
    let ctx = TestContext::new();
    ctx.create_config("[sequencer]\nmax_concurrent_pipelines = 0\n");
    let output = ctx.run(&["id"]);
    assert!(!output.success);
    assert!(output.stderr.contains("max_concurrent_pipelines"), "{}", output.stderr);
}
