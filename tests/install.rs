mod common;

use common::{aipim_cmd, file_status};
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn install_creates_prompts_and_project_structure() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    aipim_cmd(root)
        .args(["install", "--ai", "claude-code,gemini", "--guidelines", "node"])
        .assert()
        .success()
        .stdout(predicate::str::contains("created  CLAUDE.md"))
        .stdout(predicate::str::contains("created  GEMINI.md"));

    for path in [
        "CLAUDE.md",
        "GEMINI.md",
        ".project/context.md",
        ".project/aipim.toml",
        ".project/_templates/v1/task-template.md",
        ".project/scripts/pre-session.sh",
        ".project/scripts/validate-dod.sh",
    ] {
        assert!(root.join(path).is_file(), "{path} should exist");
    }
    assert!(root.join(".project/backlog/archived").is_dir());
    assert!(!root.join(".project-backups").exists());

    let claude = fs::read_to_string(root.join("CLAUDE.md")).unwrap();
    assert!(claude.contains("## Node.js (Generic)"));
    assert!(claude.contains("<!-- @aipim-signature: "));

    let config = fs::read_to_string(root.join(".project/aipim.toml")).unwrap();
    assert!(config.contains("[project]"));
    assert!(config.contains("\"gemini\""));
    assert!(config.contains("\"node\""));

    assert_eq!(file_status(root, "CLAUDE.md"), "pristine");
}

#[test]
fn install_uses_default_ais() {
    let temp = TempDir::new().unwrap();

    aipim_cmd(temp.path()).arg("install").assert().success();

    assert!(temp.path().join("CLAUDE.md").exists());
    assert!(temp.path().join("GEMINI.md").exists());
}

#[test]
fn install_maps_unknown_tools_to_uppercase_files() {
    let temp = TempDir::new().unwrap();

    aipim_cmd(temp.path())
        .args(["install", "--ai", "chatgpt,cursor"])
        .assert()
        .success();

    assert!(temp.path().join("CHATGPT.md").exists());
    assert!(temp.path().join("CURSOR.md").exists());
    assert!(!temp.path().join("CLAUDE.md").exists());
}

#[test]
fn install_dry_run_writes_nothing() {
    let temp = TempDir::new().unwrap();

    aipim_cmd(temp.path())
        .args(["install", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("created  CLAUDE.md"));

    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[test]
fn install_rejects_unknown_guideline() {
    let temp = TempDir::new().unwrap();

    aipim_cmd(temp.path())
        .args(["install", "--guidelines", "cobol"])
        .assert()
        .code(255)
        .stderr(predicate::str::contains("Unknown guideline 'cobol'"));

    assert!(!temp.path().join(".project").exists());
}

#[test]
fn reinstall_keeps_edited_files() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    aipim_cmd(root).arg("install").assert().success();
    fs::write(root.join(".project/context.md"), "my notes").unwrap();
    fs::write(root.join("GEMINI.md"), "my prompt").unwrap();

    aipim_cmd(root)
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains("updated  CLAUDE.md"))
        .stdout(predicate::str::contains("skipped  GEMINI.md"));

    assert_eq!(
        fs::read_to_string(root.join(".project/context.md")).unwrap(),
        "my notes"
    );
    assert_eq!(fs::read_to_string(root.join("GEMINI.md")).unwrap(), "my prompt");
    assert_eq!(fs::read_dir(root.join(".project-backups")).unwrap().count(), 1);
}

#[test]
fn validate_after_install() {
    let temp = TempDir::new().unwrap();

    aipim_cmd(temp.path())
        .arg("validate")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("No .project directory found"));

    aipim_cmd(temp.path()).arg("install").assert().success();

    aipim_cmd(temp.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    fs::remove_file(temp.path().join(".project/scripts/pre-session.sh")).unwrap();

    aipim_cmd(temp.path())
        .arg("validate")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Missing .project/scripts/pre-session.sh"));
}
