use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

fn orgward_bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_orgward"))
}

fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("mkdir");
    }
    std::fs::write(path, contents).expect("write");
}

#[test]
fn merge_prints_the_combined_document() {
    let root = TempDir::new().expect("tempdir");
    write(&root.path().join("org.yaml"), "name: acme\n");
    write(
        &root.path().join("platform/team.yaml"),
        "name: platform\nmembers:\n  - alice@acme.example\n",
    );
    write(
        &root.path().join("platform/build-tools/team.yaml"),
        "name: build-tools\n",
    );

    let output = Command::new(orgward_bin_path())
        .arg("org")
        .arg("merge")
        .arg("--dir")
        .arg(root.path())
        .output()
        .expect("run orgward org merge");
    assert!(
        output.status.success(),
        "command failed: status={} stderr={}",
        output.status,
        String::from_utf8_lossy(&output.stderr),
    );

    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert!(stdout.contains("name: acme"));
    assert!(stdout.contains("platform"));
    assert!(stdout.contains("build-tools"));
    assert!(stdout.contains("alice@acme.example"));
}

#[test]
fn merge_fails_on_a_stray_file() {
    let root = TempDir::new().expect("tempdir");
    write(&root.path().join("org.yaml"), "name: acme\n");
    write(&root.path().join("notes.txt"), "scratch\n");

    let output = Command::new(orgward_bin_path())
        .arg("org")
        .arg("merge")
        .arg("--dir")
        .arg(root.path())
        .output()
        .expect("run orgward org merge");

    assert!(!output.status.success(), "stray files must fail the merge");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("notes.txt"), "stderr was: {stderr}");
}

#[test]
fn merge_rejects_a_maintainers_key() {
    let root = TempDir::new().expect("tempdir");
    write(&root.path().join("org.yaml"), "name: acme\n");
    write(
        &root.path().join("platform/team.yaml"),
        "name: platform\nmaintainers:\n  - sneaky@acme.example\n",
    );

    let output = Command::new(orgward_bin_path())
        .arg("org")
        .arg("merge")
        .arg("--dir")
        .arg(root.path())
        .output()
        .expect("run orgward org merge");

    assert!(!output.status.success(), "maintainers key must be rejected");
}

#[test]
fn version_emits_build_metadata_as_json() {
    let output = Command::new(orgward_bin_path())
        .arg("--format")
        .arg("json")
        .arg("version")
        .output()
        .expect("run orgward version");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).expect("utf8");
    let value: serde_json::Value = serde_json::from_str(&stdout).expect("json output");
    assert_eq!(value["name"], "orgward-cli");
    assert!(value["version"].is_string());
}

#[test]
fn quiet_format_suppresses_structured_output() {
    let output = Command::new(orgward_bin_path())
        .arg("--format")
        .arg("quiet")
        .arg("version")
        .output()
        .expect("run orgward version");
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}
