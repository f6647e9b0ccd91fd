use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn selene_run_quickstart() {
    let mut cmd = Command::cargo_bin("selene").expect("binary exists");
    cmd.arg("run").arg("demos/quickstart.sel");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Hello from Selene!"));
}

#[test]
fn selene_eval_snippet() {
    let mut cmd = Command::cargo_bin("selene").expect("binary exists");
    cmd.arg("eval").arg("1 + 2 + 3");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("6"));
}

#[test]
fn selene_run_reports_runtime_errors() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("broken.sel");
    fs::write(&script, "println(missing)\n").expect("write script");

    let mut cmd = Command::cargo_bin("selene").expect("binary exists");
    cmd.arg("run").arg(&script);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("use of undefined variable"))
        .stderr(predicate::str::contains("RuntimeError"));
}

#[test]
fn selene_run_missing_file_fails() {
    let mut cmd = Command::cargo_bin("selene").expect("binary exists");
    cmd.arg("run").arg("demos/does-not-exist.sel");
    cmd.assert().failure();
}

#[test]
fn selene_eval_reports_parse_errors() {
    let mut cmd = Command::cargo_bin("selene").expect("binary exists");
    cmd.arg("eval").arg("1 +");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("ParseError"));
}
