//! Help and usage specs

use crate::prelude::*;
use predicates::prelude::*;

#[test]
fn help_lists_subcommands() {
    let temp = Project::empty();

    temp.solod()
        .args(&["--help"])
        .passes()
        .stdout_has("run")
        .stdout_has("check");
}

#[test]
fn version_is_reported() {
    let temp = Project::empty();

    temp.solod()
        .args(&["--version"])
        .passes()
        .stdout_has("solod");
}

#[test]
fn missing_subcommand_fails() {
    let temp = Project::empty();

    temp.solod().args(&[]).fails().stderr_has("Usage");
}

#[test]
fn run_requires_config_path() {
    let temp = Project::empty();

    temp.solod().args(&["run"]).fails().stderr_has("<CONFIG>");
}

#[test]
fn unknown_subcommand_is_rejected() {
    assert_cmd::Command::cargo_bin("solod")
        .unwrap()
        .arg("serve")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}
