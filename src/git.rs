//! Thin wrapper around the `git` executable.
//!
//! Session commands only need a handful of facts about the work tree. Every
//! query degrades to `None`/empty when git is missing or the directory is not
//! a repository.

use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("Failed to run git: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("git {args} exited with {status}: {stderr}")]
    Failed {
        args: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub hash: String,
    pub subject: String,
    /// Relative age as reported by git, e.g. `2 hours ago`.
    pub age: String,
}

pub trait Git {
    fn current_branch(&self) -> Option<String>;
    fn recent_commits(&self, count: usize) -> Vec<Commit>;
    fn is_dirty(&self) -> Option<bool>;
    fn stash_push(&self, message: &str) -> Result<(), GitError>;
    fn stash_pop(&self) -> Result<(), GitError>;

    fn last_commit(&self) -> Option<Commit> {
        self.recent_commits(1).into_iter().next()
    }
}

/// Runs `git -C <dir> ...`.
pub struct SystemGit {
    dir: PathBuf,
}

impl SystemGit {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<String, GitError> {
        let output = Command::new("git").arg("-C").arg(&self.dir).args(args).output()?;
        if !output.status.success() {
            return Err(GitError::Failed {
                args: args.join(" "),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn query(&self, args: &[&str]) -> Option<String> {
        match self.run(args) {
            Ok(stdout) => Some(stdout),
            Err(e) => {
                debug!("{e}");
                None
            }
        }
    }
}

impl Git for SystemGit {
    fn current_branch(&self) -> Option<String> {
        let branch = self.query(&["branch", "--show-current"])?;
        let branch = branch.trim();
        (!branch.is_empty()).then(|| branch.to_string())
    }

    fn recent_commits(&self, count: usize) -> Vec<Commit> {
        let limit = format!("-{count}");
        self.query(&["log", &limit, "--format=%h%x09%s%x09%cr"])
            .map(|stdout| parse_log(&stdout))
            .unwrap_or_default()
    }

    fn is_dirty(&self) -> Option<bool> {
        self.query(&["status", "--porcelain"])
            .map(|stdout| !stdout.trim().is_empty())
    }

    fn stash_push(&self, message: &str) -> Result<(), GitError> {
        self.run(&["stash", "push", "--include-untracked", "-m", message])
            .map(|_| ())
    }

    fn stash_pop(&self) -> Result<(), GitError> {
        self.run(&["stash", "pop"]).map(|_| ())
    }
}

/// Parses `git log --format=%h%x09%s%x09%cr` output.
fn parse_log(stdout: &str) -> Vec<Commit> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut fields = line.splitn(3, '\t');
            let hash = fields.next()?.trim();
            let subject = fields.next()?.trim();
            let age = fields.next().unwrap_or("").trim();
            (!hash.is_empty()).then(|| Commit {
                hash: hash.to_string(),
                subject: subject.to_string(),
                age: age.to_string(),
            })
        })
        .collect()
}
