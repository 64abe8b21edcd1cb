//! Integration tests: self-check bundles and the `ulpunit` CLI.
//!
//! Validates:
//! 1. A self-check run writes a bundle whose index matches the files on disk.
//! 2. Tampering with a bundled file is reported by `verify_bundle`.
//! 3. The CLI `distance`, `selfcheck --artifacts` and `validate-log` paths exit cleanly.
//!
//! Run: cargo test -p ulpunit-harness --test cli_artifacts_test

use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use ulpunit::structured_log::validate_log_file;
use ulpunit::{FormattedWriter, LogEmitter, OutputFormat, SharedBuffer, SuiteConfig};
use ulpunit_harness::artifacts::{LOG_FILE, REPORT_FILE, SUMMARY_FILE, write_run_bundle};
use ulpunit_harness::{ArtifactIndex, selfcheck, verify_bundle};

fn unique_tmp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time should be after UNIX_EPOCH")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("{prefix}-{}-{nanos}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

#[test]
fn selfcheck_bundle_is_indexed_and_verifiable() {
    let dir = unique_tmp_dir("ulpunit-bundle");
    let emitter =
        LogEmitter::to_file(&dir.join(LOG_FILE), selfcheck::SUITE_NAME, "bundle-run").expect("open log");
    let mut suite = selfcheck::build_suite(SuiteConfig::default()).with_log(emitter);

    let report = SharedBuffer::new();
    let writer = FormattedWriter::with_format(OutputFormat::Raw, Box::new(report.clone()));
    let summary = suite.run(&writer);
    drop(suite.take_log());
    assert!(summary.all_passed(), "{}", report.contents());

    let index = write_run_bundle(&dir, "bundle-run", &report.contents(), &summary, Some(LOG_FILE))
        .expect("write bundle");
    let kinds: Vec<_> = index.artifacts.iter().map(|a| a.kind.as_str()).collect();
    assert_eq!(kinds, ["report", "summary", "log"]);
    assert!(verify_bundle(&dir).expect("verify").is_empty());

    let loaded = ArtifactIndex::load(&dir).expect("load index");
    assert_eq!(loaded.suite, selfcheck::SUITE_NAME);
    assert_eq!(loaded.run_id, "bundle-run");

    let (lines, errors) = validate_log_file(&dir.join(LOG_FILE)).expect("read log");
    assert!(lines > 2);
    assert!(errors.is_empty(), "{errors:?}");

    let summary_json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join(SUMMARY_FILE)).expect("summary"))
            .expect("summary json");
    assert_eq!(summary_json["failed"], 0);
    assert_eq!(summary_json["tests"], summary.stats.tests);

    std::fs::write(dir.join(REPORT_FILE), "edited\n").expect("tamper");
    let issues = verify_bundle(&dir).expect("verify");
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].path, REPORT_FILE);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn bundle_rejects_log_outside_the_directory() {
    let dir = unique_tmp_dir("ulpunit-escape");
    let mut suite = selfcheck::build_suite(SuiteConfig::default());
    let summary = suite.run(&FormattedWriter::with_format(
        OutputFormat::Raw,
        Box::new(SharedBuffer::new()),
    ));
    let err = write_run_bundle(&dir, "escape", "", &summary, Some("../elsewhere.jsonl"))
        .expect_err("parent path must be rejected");
    assert!(err.to_string().contains("escapes the bundle"));
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn cli_distance_reports_adjacent_doubles() {
    let output = Command::new(env!("CARGO_BIN_EXE_ulpunit"))
        .args(["distance", "1.0", "1.0000000000000002", "--json"])
        .output()
        .expect("run ulpunit");
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(report["ulps"], 1);
    assert_eq!(report["within"], true);
    assert_eq!(report["precision"], "double");
}

#[test]
fn cli_distance_rejects_unknown_precision() {
    let output = Command::new(env!("CARGO_BIN_EXE_ulpunit"))
        .args(["distance", "1", "2", "--precision", "f16"])
        .output()
        .expect("run ulpunit");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("f16"));
}

#[test]
fn cli_selfcheck_writes_a_verifiable_bundle() {
    let dir = unique_tmp_dir("ulpunit-cli");
    let output = Command::new(env!("CARGO_BIN_EXE_ulpunit"))
        .arg("selfcheck")
        .arg("--format")
        .arg("raw")
        .arg("--artifacts")
        .arg(&dir)
        .output()
        .expect("run ulpunit");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "{stdout}");
    assert!(stdout.contains("   SUCCESS"));
    assert!(!stdout.contains('\x1b'));

    let report = std::fs::read_to_string(dir.join(REPORT_FILE)).expect("report");
    assert!(report.contains("   NAME: ulpunit_selfcheck"));

    let verify = Command::new(env!("CARGO_BIN_EXE_ulpunit"))
        .arg("verify-artifacts")
        .arg("--dir")
        .arg(&dir)
        .output()
        .expect("run ulpunit");
    assert!(verify.status.success());

    let validate = Command::new(env!("CARGO_BIN_EXE_ulpunit"))
        .arg("validate-log")
        .arg("--log")
        .arg(dir.join(LOG_FILE))
        .output()
        .expect("run ulpunit");
    assert!(validate.status.success());

    std::fs::remove_dir_all(&dir).ok();
}
