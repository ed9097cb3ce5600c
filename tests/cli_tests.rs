//! Smoke tests for the tml-cfg binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn cmd() -> Command {
    Command::cargo_bin("tml-cfg").unwrap()
}

#[test]
fn test_print_tml() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.tml");
    fs::write(&file, "# note\nobj\n\ta = 1\n").unwrap();

    cmd()
        .arg("print-tml")
        .arg(&file)
        .assert()
        .success()
        .stdout("# note\nobj\n\ta = 1\n");
}

#[test]
fn test_print_tml_values_strips_comments() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.tml");
    fs::write(&file, "# note\na = 1\n\n").unwrap();

    cmd()
        .arg("print-tml-values")
        .arg(&file)
        .assert()
        .success()
        .stdout("a = 1\n");
}

#[test]
fn test_parse_error_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("bad.tml");
    fs::write(&file, "a = = b\n").unwrap();

    cmd()
        .arg("print-tml")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad.tml:1"));
}

#[test]
fn test_tml2btml_and_back() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.tml");
    let binary = dir.path().join("out.btml");
    let output = dir.path().join("out.tml");
    fs::write(&input, "obj\n\ta = 1\n\tb = two\n").unwrap();

    cmd()
        .arg("tml2btml")
        .arg("shrink")
        .arg(&input)
        .arg(&binary)
        .assert()
        .success();

    let bytes = fs::read(&binary).unwrap();
    assert_eq!(&bytes[..4], b"btml");

    cmd()
        .arg("btml2tml")
        .arg(&binary)
        .arg(&output)
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "obj\n\ta = 1\n\tb = two\n"
    );
}

#[test]
fn test_all_features_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let main = dir.path().join("main.tml");
    let part = dir.path().join("part.tml");
    fs::write(
        &main,
        "include part.tml\ntranslations\n\ttitle EN = Config\nname = tr(title)\n",
    )
    .unwrap();
    fs::write(&part, "total = _i ( 20 + 1 )\n").unwrap();

    cmd()
        .arg("all-features")
        .arg(&main)
        .assert()
        .success()
        .stdout(predicate::str::contains("total = 21"))
        .stdout(predicate::str::contains("name = Config"));
}

#[test]
fn test_templates_command() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.tml");
    fs::write(
        &file,
        "template\n\tname = pair\n\tparameters = k v\n\t$k = $v\nuse-template pair foo 42\n",
    )
    .unwrap();

    cmd()
        .arg("templates")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("templates: 1"))
        .stdout(predicate::str::contains("foo = 42"));
}

#[test]
fn test_json_command() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.tml");
    fs::write(&file, "a = 1\nb = x y\n").unwrap();

    cmd()
        .arg("json")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"a\": 1"));
}
