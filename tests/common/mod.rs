use assert_cmd::{Command, cargo::cargo_bin_cmd};
use std::path::Path;

pub fn aipim_cmd(cwd: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("aipim");
    cmd.arg("-C").arg(cwd);
    cmd
}

// Each integration test file is compiled as its own crate, so helpers unused
// by one of them are allowed to be dead there.
#[allow(dead_code)]
pub fn install(cwd: &Path) {
    aipim_cmd(cwd)
        .args(["install", "--ai", "claude-code,gemini"])
        .assert()
        .success();
}

/// Status of `file` as printed by `aipim status`.
#[allow(dead_code)]
pub fn file_status(cwd: &Path, file: &str) -> String {
    let output = aipim_cmd(cwd)
        .arg("status")
        .output()
        .expect("failed to run `aipim status`");
    let stdout = String::from_utf8(output.stdout).expect("status stdout should be UTF-8");
    stdout
        .lines()
        .find_map(|line| {
            let (status, path) = line.split_once(char::is_whitespace)?;
            (path.trim() == file).then(|| status.to_string())
        })
        .unwrap_or_else(|| panic!("{file} not found in status output:\n{stdout}"))
}
