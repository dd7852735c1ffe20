use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn recdir() -> Command {
    Command::new(env!("CARGO_BIN_EXE_recdir"))
}

#[test]
fn shows_help() {
    recdir()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--top-dir"))
        .stdout(predicate::str::contains("--continue-from"));
}

#[test]
fn writes_report_to_stdout() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), "x".repeat(42)).unwrap();
    let record = format!("{};42", dir.path().join("a").display());
    recdir()
        .arg("-d")
        .arg(dir.path())
        .args(["-f", "%p;%s", "-"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("# --- --- start of recording"))
        .stdout(predicate::str::contains(record))
        .stdout(predicate::str::contains("(recording finished successfully)"));
}

#[test]
fn refuses_existing_output_without_append() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("report.rec");
    fs::write(&out, "keep me\n").unwrap();
    recdir()
        .arg("-d")
        .arg(dir.path())
        .arg(&out)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("already exists"));
    assert_eq!(fs::read_to_string(&out).unwrap(), "keep me\n");
}

#[test]
fn appends_with_flag() {
    let dir = tempdir().unwrap();
    let top = dir.path().join("data");
    fs::create_dir(&top).unwrap();
    let out = dir.path().join("report.rec");
    fs::write(&out, "keep me\n").unwrap();
    recdir()
        .arg("-d")
        .arg(&top)
        .args(["-p", "-f", "%p"])
        .arg(&out)
        .assert()
        .success();
    let report = fs::read_to_string(&out).unwrap();
    assert!(report.starts_with("keep me\n# --- --- start of recording"));
}

#[test]
fn rejects_unknown_file_type() {
    let dir = tempdir().unwrap();
    recdir()
        .arg("-d")
        .arg(dir.path())
        .args(["-y", "x", "-"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid file type"));
}

#[test]
fn requires_a_top_dir() {
    recdir()
        .arg("-")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("top directory"));
}

#[test]
fn loads_options_from_config_file() {
    let dir = tempdir().unwrap();
    let top = dir.path().join("data");
    fs::create_dir(&top).unwrap();
    fs::write(top.join("a"), "").unwrap();
    let config = dir.path().join("recdir.json");
    let json = serde_json::json!({
        "top_dirs": [top],
        "template": "%F|%p",
        "comment_prefix": "//"
    });
    fs::write(&config, json.to_string()).unwrap();
    recdir()
        .arg("--config")
        .arg(&config)
        .arg("-")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("// --- --- start of recording"))
        .stdout(predicate::str::contains(format!("f|{}", top.join("a").display())));
}
