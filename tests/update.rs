mod common;

use common::{aipim_cmd, file_status, install};
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_templates(dir: &Path, prompt: &str) {
    fs::create_dir_all(dir.join("base")).unwrap();
    fs::write(
        dir.join("base/project-manager.md"),
        format!("{prompt}\n\n{{{{SLOT:guidelines}}}}\n{{{{/SLOT:guidelines}}}}\n"),
    )
    .unwrap();
}

#[test]
fn update_regenerates_pristine_and_skips_modified() {
    let project = TempDir::new().unwrap();
    let templates = TempDir::new().unwrap();
    let root = project.path();
    install(root);
    write_templates(templates.path(), "# Version 2");

    aipim_cmd(root)
        .arg("update")
        .arg("--templates-dir")
        .arg(templates.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("updated  CLAUDE.md"))
        .stdout(predicate::str::contains("updated  GEMINI.md"));

    assert!(
        fs::read_to_string(root.join("CLAUDE.md"))
            .unwrap()
            .starts_with("# Version 2")
    );
    assert_eq!(file_status(root, "CLAUDE.md"), "pristine");

    let mut gemini = fs::read_to_string(root.join("GEMINI.md")).unwrap();
    gemini.insert_str(0, "My own rule.\n");
    fs::write(root.join("GEMINI.md"), &gemini).unwrap();
    assert_eq!(file_status(root, "GEMINI.md"), "modified");
    write_templates(templates.path(), "# Version 3");

    aipim_cmd(root)
        .arg("update")
        .arg("--templates-dir")
        .arg(templates.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("updated  CLAUDE.md"))
        .stdout(predicate::str::contains("skipped  GEMINI.md"))
        .stdout(predicate::str::contains("reason: User modified"))
        .stderr(predicate::str::contains("Skipping user-modified file: GEMINI.md"));

    assert!(
        fs::read_to_string(root.join("CLAUDE.md"))
            .unwrap()
            .starts_with("# Version 3")
    );
    assert_eq!(fs::read_to_string(root.join("GEMINI.md")).unwrap(), gemini);
    assert_eq!(fs::read_dir(root.join(".project-backups")).unwrap().count(), 2);
}

#[test]
fn update_skips_unsigned_files() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    install(root);
    fs::write(root.join("CLAUDE.md"), "hand written").unwrap();

    aipim_cmd(root)
        .arg("update")
        .assert()
        .success()
        .stdout(predicate::str::contains("skipped  CLAUDE.md"))
        .stdout(predicate::str::contains(
            "reason: User modified or unsigned (no signature found)",
        ));

    assert_eq!(file_status(root, "CLAUDE.md"), "legacy");
    assert_eq!(
        fs::read_to_string(root.join("CLAUDE.md")).unwrap(),
        "hand written"
    );
}

#[test]
fn update_recreates_deleted_prompt() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    install(root);
    fs::remove_file(root.join("GEMINI.md")).unwrap();
    assert_eq!(file_status(root, "GEMINI.md"), "missing");

    aipim_cmd(root)
        .arg("update")
        .assert()
        .success()
        .stdout(predicate::str::contains("created  GEMINI.md"));

    assert_eq!(file_status(root, "GEMINI.md"), "pristine");
}

#[test]
fn update_dry_run_writes_nothing() {
    let project = TempDir::new().unwrap();
    let templates = TempDir::new().unwrap();
    let root = project.path();
    install(root);
    let before = fs::read_to_string(root.join("CLAUDE.md")).unwrap();
    write_templates(templates.path(), "# Changed");

    aipim_cmd(root)
        .args(["update", "--dry-run", "--templates-dir"])
        .arg(templates.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("updated  CLAUDE.md"));

    assert_eq!(fs::read_to_string(root.join("CLAUDE.md")).unwrap(), before);
    assert!(!root.join(".project-backups").exists());
}

#[test]
fn missing_template_is_reported_as_error() {
    let project = TempDir::new().unwrap();
    let templates = TempDir::new().unwrap();
    let root = project.path();
    install(root);
    let before = fs::read_to_string(root.join("CLAUDE.md")).unwrap();

    aipim_cmd(root)
        .arg("update")
        .arg("--templates-dir")
        .arg(templates.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("error    CLAUDE.md"))
        .stdout(predicate::str::contains("Template not found"));

    assert_eq!(fs::read_to_string(root.join("CLAUDE.md")).unwrap(), before);
}

#[test]
fn update_uses_configured_prompt_files() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    aipim_cmd(root)
        .args(["install", "--ai", "chatgpt"])
        .assert()
        .success();

    aipim_cmd(root)
        .arg("update")
        .assert()
        .success()
        .stdout(predicate::str::contains("updated  CHATGPT.md"))
        .stdout(predicate::str::contains("CLAUDE.md").not());
}

#[test]
fn status_without_configuration_lists_default_files() {
    let temp = TempDir::new().unwrap();

    aipim_cmd(temp.path())
        .arg("status")
        .assert()
        .success()
        .stdout("missing   CLAUDE.md\nmissing   GEMINI.md\n");
}

#[test]
fn unsupported_config_version_is_an_error() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join(".project")).unwrap();
    fs::write(
        temp.path().join(".project/aipim.toml"),
        "[metadata]\nversion = 99\n",
    )
    .unwrap();

    aipim_cmd(temp.path())
        .arg("update")
        .assert()
        .code(255)
        .stderr(predicate::str::contains("Unsupported config file version: 99"));
}
