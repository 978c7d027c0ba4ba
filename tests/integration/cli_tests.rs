//! Tests for the relpack binary: argument handling, help output, and the
//! error surface a user sees for common misconfigurations.
//!
//! Every test here runs offline. Paths that would reach the release host are
//! cut short earlier, by a missing manifest or a missing token.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const VALID_MANIFEST: &str = r#"
[bundle]
name = "TestPack"
repo = "owner/pack"
version = "1.0.0"

[loader]
repo = "Loader/Loader"
platforms = ["x64"]
"#;

/// Builds a command with a neutral environment: CI detection off and no
/// ambient token, regardless of what the test runner exports.
fn relpack() -> Command {
    let mut cmd = Command::cargo_bin("relpack").unwrap();
    cmd.env("CI", "");
    cmd.env_remove("GITHUB_PERSONAL_ACCESS_TOKEN");
    cmd
}

#[test]
fn help_lists_both_subcommands() {
    relpack()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("bundle"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn version_flag_reports_the_package() {
    relpack()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("relpack"));
}

#[test]
fn bundle_without_manifest_fails_with_guidance() {
    let temp = TempDir::new().unwrap();

    relpack()
        .arg("bundle")
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Manifest file not found"))
        .stderr(predicate::str::contains("relpack.toml"));
}

#[test]
fn invalid_manifest_toml_is_reported() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("relpack.toml"), "[bundle\nname = ").unwrap();

    relpack()
        .arg("bundle")
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("syntax"));
}

#[test]
fn manifest_validation_failures_are_reported() {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("relpack.toml"),
        r#"
[bundle]
name = "TestPack"
repo = "owner/pack"
version = "1.0.0"

[loader]
repo = "Loader/Loader"
platforms = []
"#,
    )
    .unwrap();

    relpack()
        .arg("bundle")
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("platforms"));
}

#[test]
fn ci_flag_without_token_fails_fast() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("relpack.toml"), VALID_MANIFEST).unwrap();

    relpack()
        .args(["bundle", "--ci"])
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("GITHUB_PERSONAL_ACCESS_TOKEN"));
}

#[test]
fn manifest_path_flag_names_the_missing_file() {
    let temp = TempDir::new().unwrap();

    relpack()
        .args(["bundle", "--manifest-path", "packs/alt.toml"])
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("packs/alt.toml"));
}

#[test]
fn verbose_and_quiet_reject_each_other() {
    relpack()
        .args(["bundle", "--verbose", "--quiet"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}
