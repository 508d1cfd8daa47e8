//! Integration tests for the `validate` command.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn capsule() -> Command {
    Command::cargo_bin("capsule").unwrap()
}

fn write_file(dir: &Path, relative: &str, contents: &str) {
    let path = dir.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[test]
fn test_validate_accepts_well_formed_manifest() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "bin/Sample.dll", "binary");
    write_file(
        temp.path(),
        "Sample.pkgspec",
        r#"
[metadata]
id = "Sample"
version = "1.0.0"
authors = ["Alice"]

[[files]]
source = "bin/Sample.dll"
target = "lib"
"#,
    );

    capsule()
        .arg("validate")
        .arg(temp.path().join("Sample.pkgspec"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Valid"));

    // Validation must not produce an archive
    assert!(!temp.path().join("Sample.1.0.0.capsule").exists());
}

#[test]
fn test_validate_rejects_prerelease_dependency_on_stable() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "bin/Sample.dll", "binary");
    write_file(
        temp.path(),
        "Sample.pkgspec",
        r#"
[metadata]
id = "Sample"
version = "2.0.0"
authors = ["Alice"]

[[metadata.dependency-sets]]
dependencies = [{ id = "Helper", version = "1.0.0-beta" }]

[[files]]
source = "bin/Sample.dll"
target = "lib"
"#,
    );

    capsule()
        .arg("validate")
        .arg(temp.path().join("Sample.pkgspec"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("pre-release"));
}

#[test]
fn test_validate_rejects_missing_reference_assembly() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "bin/Foo.dll", "binary");
    write_file(temp.path(), "bin/Foo.xml", "<doc/>");
    write_file(
        temp.path(),
        "Sample.pkgspec",
        r#"
[metadata]
id = "Sample"
version = "1.0.0"
authors = ["Alice"]

[[metadata.reference-sets]]
references = ["Bar.dll"]

[[files]]
source = "bin/*.*"
target = "lib"
"#,
    );

    capsule()
        .arg("validate")
        .arg(temp.path().join("Sample.pkgspec"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Bar.dll"));
}

#[test]
fn test_validate_rejects_malformed_manifest() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "Sample.pkgspec", "this is not [ valid toml");

    capsule()
        .arg("validate")
        .arg(temp.path().join("Sample.pkgspec"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid manifest file syntax"));
}

#[test]
fn test_validate_reports_unresolved_placeholders() {
    let temp = TempDir::new().unwrap();
    // Artifact exists but carries no metadata records
    write_file(temp.path(), "bin/Foo.dll", "no records");
    write_file(
        temp.path(),
        "template.pkgspec",
        r#"
schema = "template"

[metadata]
id = "$id$"
version = "$version$"
authors = ["Alice"]

[[files]]
source = "bin/Foo.dll"
target = "lib/net45"
"#,
    );

    capsule()
        .arg("validate")
        .arg(temp.path().join("template.pkgspec"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot resolve template values"));
}
