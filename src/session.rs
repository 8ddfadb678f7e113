//! Session continuity: start prompts, interruption snapshots and resume summaries.

use crate::backup::PROJECT_DIR;
use crate::git::{Commit, Git, GitError};
use crate::signature::strip_trailer;
use crate::task::{
    CURRENT_TASK_FILE, TaskError, TaskInfo, TaskProgress, markdown_files, parse_task,
    task_objective, task_progress,
};
use crate::templates::CONTEXT_FILE;
use crate::util::fs::write_atomic;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const SNAPSHOT_FILE: &str = ".project/.interruption-snapshot.toml";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No .project directory found (run `aipim install` first)")]
    NotInstalled,
    #[error("Task error: {0}")]
    Task(#[from] TaskError),
    #[error("Git error: {0}")]
    Git(#[from] GitError),
    #[error("Failed to parse interruption snapshot: {0}")]
    SnapshotParse(#[from] toml::de::Error),
    #[error("Failed to serialize snapshot: {0}")]
    SnapshotSerialize(#[from] toml::ser::Error),
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
}

impl SessionError {
    fn from_io(e: std::io::Error, path: &Path) -> Self {
        if e.kind() == ErrorKind::PermissionDenied {
            SessionError::PermissionDenied(path.to_path_buf())
        } else {
            SessionError::Io(e)
        }
    }
}

fn ensure_installed(root: &Path) -> Result<(), SessionError> {
    if root.join(PROJECT_DIR).is_dir() {
        Ok(())
    } else {
        Err(SessionError::NotInstalled)
    }
}

/// Reads a project file, treating a missing file as `None`.
fn read_optional(path: &Path) -> Result<Option<String>, SessionError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SessionError::from_io(e, path)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontmatterValue {
    Scalar(String),
    List(Vec<String>),
}

/// The parts of `.project/context.md` the session commands care about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    pub frontmatter: BTreeMap<String, FrontmatterValue>,
    /// Body of the `# Current State` section, trimmed.
    pub current_state: String,
}

impl Context {
    /// Parses flat `key: value` frontmatter between `---` fences. Values in
    /// `[a, b]` form become lists; surrounding double quotes are dropped.
    pub fn parse(content: &str) -> Self {
        let content = strip_trailer(content);
        let mut context = Context::default();
        let mut fences = 0;
        let mut in_current_state = false;
        let mut current_state = String::new();

        for (index, line) in content.lines().enumerate() {
            if (index == 0 || fences == 1) && line.trim() == "---" {
                fences += 1;
                continue;
            }
            if fences == 1 {
                if let Some((key, value)) = parse_frontmatter_line(line) {
                    context.frontmatter.insert(key, value);
                }
                continue;
            }

            if line.starts_with("# Current State") {
                in_current_state = true;
                continue;
            }
            if in_current_state {
                if line.starts_with('#') {
                    break;
                }
                current_state.push_str(line);
                current_state.push('\n');
            }
        }

        context.current_state = current_state.trim().to_string();
        context
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        match self.frontmatter.get(key)? {
            FrontmatterValue::Scalar(value) => Some(value),
            FrontmatterValue::List(_) => None,
        }
    }

    pub fn list(&self, key: &str) -> &[String] {
        match self.frontmatter.get(key) {
            Some(FrontmatterValue::List(values)) => values,
            _ => &[],
        }
    }

    pub fn next_action(&self) -> Option<&str> {
        self.get("next_action").filter(|action| !action.is_empty())
    }
}

pub(crate) fn parse_frontmatter_line(line: &str) -> Option<(String, FrontmatterValue)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim_end();
    if key.is_empty() || !key.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return None;
    }
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let value = if let Some(inner) = value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
        FrontmatterValue::List(
            inner
                .split(',')
                .map(|item| item.trim().trim_matches('"').to_string())
                .filter(|item| !item.is_empty())
                .collect(),
        )
    } else if let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        FrontmatterValue::Scalar(inner.to_string())
    } else {
        FrontmatterValue::Scalar(value.to_string())
    };
    Some((key.to_string(), value))
}

/// Name from `Cargo.toml`, falling back to the directory name.
pub fn project_name(root: &Path) -> String {
    #[derive(Deserialize)]
    struct Manifest {
        package: Option<Package>,
    }
    #[derive(Deserialize)]
    struct Package {
        name: Option<String>,
    }

    let manifest_name = std::fs::read_to_string(root.join("Cargo.toml"))
        .ok()
        .and_then(|content| toml::from_str::<Manifest>(&content).ok())
        .and_then(|manifest| manifest.package?.name);
    if let Some(name) = manifest_name {
        return name;
    }

    std::fs::canonicalize(root)
        .ok()
        .as_deref()
        .unwrap_or(root)
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| "Unknown".to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub file: String,
    pub title: String,
}

/// The `count` newest decision records by file name, newest first.
pub fn recent_decisions(root: &Path, count: usize) -> Result<Vec<Decision>, SessionError> {
    let dir = root.join(PROJECT_DIR).join("decisions");
    let mut files = markdown_files(&dir)?;
    files.sort_by(|a, b| b.cmp(a));
    files.truncate(count);

    files
        .into_iter()
        .map(|file| {
            let path = dir.join(&file);
            let content =
                std::fs::read_to_string(&path).map_err(|e| SessionError::from_io(e, &path))?;
            let title = content
                .lines()
                .find_map(|line| line.strip_prefix("# "))
                .unwrap_or("No title")
                .trim()
                .to_string();
            Ok(Decision { file, title })
        })
        .collect()
}

/// Builds the prompt that opens a new assistant session.
///
/// `full` widens the history to ten commits and five decisions.
pub fn session_prompt(
    root: &Path,
    git: &dyn Git,
    full: bool,
    now: DateTime<Utc>,
) -> Result<String, SessionError> {
    ensure_installed(root)?;

    let mut parts = vec![
        format!("# AIPIM Development Session - {}", now.format("%Y-%m-%d")),
        String::new(),
        format!("## Project: {}", project_name(root)),
        String::new(),
    ];

    match read_optional(&root.join(CONTEXT_FILE))? {
        Some(content) => {
            let context = Context::parse(&content);
            let branch = match context.list("active_branches").first() {
                Some(branch) => branch.clone(),
                None => git.current_branch().unwrap_or_else(|| "N/A".to_string()),
            };
            parts.push(format!(
                "**Session:** {}",
                context.get("session").unwrap_or("N/A")
            ));
            parts.push(format!("**Branch:** {branch}"));
            parts.push(format!(
                "**Next Action:** {}",
                context.next_action().unwrap_or("Not specified")
            ));
            parts.push(String::new());
            parts.push("## Current State".to_string());
            parts.push(String::new());
            if context.current_state.is_empty() {
                parts.push("No context available.".to_string());
            } else {
                parts.push(context.current_state);
            }
            parts.push(String::new());
        }
        None => {
            warn!("No {CONTEXT_FILE} found");
            parts.push("**Status:** No context.md found (run after first session)".to_string());
            parts.push(String::new());
        }
    }

    parts.push("## Active Task".to_string());
    parts.push(String::new());
    match read_optional(&root.join(CURRENT_TASK_FILE))? {
        Some(content) => {
            let task = parse_task(&content);
            parts.push(format!(
                "**{}** ({}h estimated)",
                task.title, task.estimated_hours
            ));
            if task.status == "in-progress" {
                parts.push(format!("Status: In Progress ({}h actual)", task.actual_hours));
                if let Some(phase) = &task.current_phase {
                    parts.push(format!("Current Phase: {phase}"));
                }
            }
        }
        None => {
            parts.push("**None** - No current task".to_string());
            parts.push(String::new());
            parts.push("Available tasks in backlog/".to_string());
        }
    }
    parts.push(String::new());

    let commits = git.recent_commits(if full { 10 } else { 3 });
    if !commits.is_empty() {
        parts.push("## Recent Commits".to_string());
        parts.push(String::new());
        for (i, commit) in commits.iter().enumerate() {
            parts.push(format!("{}. `{}` {}", i + 1, commit.hash, commit.subject));
        }
        parts.push(String::new());
    }

    let decisions = recent_decisions(root, if full { 5 } else { 1 })?;
    if !decisions.is_empty() {
        parts.push("## Recent Decisions".to_string());
        parts.push(String::new());
        for decision in &decisions {
            parts.push(format!("**{}:** {}", decision.file, decision.title));
        }
        parts.push(String::new());
    }

    parts.extend(
        [
            "---",
            "",
            "**I'm ready to continue development. Please:**",
            "1. Confirm you understand the project state",
            "2. Suggest the next immediate step",
            "",
        ]
        .map(str::to_string),
    );

    Ok(parts.join("\n"))
}

/// State captured when a session is interrupted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// RFC 3339, UTC.
    pub timestamp: String,
    pub reason: String,
    pub task: String,
    /// `None` when git state could not be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dirty: Option<bool>,
    #[serde(default)]
    pub stashed: bool,
}

/// Records an interruption snapshot, stashing a dirty work tree when `stash` is set.
///
/// A failed stash aborts before anything is written.
pub fn pause(
    root: &Path,
    git: &dyn Git,
    reason: &str,
    stash: bool,
    now: DateTime<Utc>,
) -> Result<Snapshot, SessionError> {
    ensure_installed(root)?;

    let task = read_optional(&root.join(CURRENT_TASK_FILE))?
        .map(|content| parse_task(&content).title)
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());

    let dirty = git.is_dirty();
    let mut stashed = false;
    if stash {
        if dirty == Some(true) {
            git.stash_push(&format!("Paused: {reason}"))?;
            stashed = true;
            info!("Stashed uncommitted changes");
        } else {
            debug!("Nothing to stash");
        }
    }

    let snapshot = Snapshot {
        timestamp: now.to_rfc3339_opts(SecondsFormat::Secs, true),
        reason: reason.to_string(),
        task,
        dirty,
        stashed,
    };

    let path = root.join(SNAPSHOT_FILE);
    let content = toml::to_string_pretty(&snapshot)?;
    write_atomic(&path, content.as_bytes()).map_err(|e| SessionError::from_io(e, &path))?;
    info!("Saved snapshot to {}", path.display());

    Ok(snapshot)
}

pub fn load_snapshot(root: &Path) -> Result<Option<Snapshot>, SessionError> {
    read_optional(&root.join(SNAPSHOT_FILE))?
        .map(|content| toml::from_str(&content).map_err(SessionError::from))
        .transpose()
}

#[derive(Debug)]
pub struct RestoredSnapshot {
    pub snapshot: Snapshot,
    /// Set when popping the recorded stash failed; the snapshot is removed anyway.
    pub stash_error: Option<GitError>,
}

/// Restores a pending snapshot: pops its stash and deletes the snapshot file.
///
/// With `keep`, the snapshot is only reported and nothing is touched.
pub fn restore_snapshot(
    root: &Path,
    git: &dyn Git,
    keep: bool,
) -> Result<Option<RestoredSnapshot>, SessionError> {
    ensure_installed(root)?;

    let Some(snapshot) = load_snapshot(root)? else {
        return Ok(None);
    };
    if keep {
        return Ok(Some(RestoredSnapshot {
            snapshot,
            stash_error: None,
        }));
    }

    let stash_error = if snapshot.stashed {
        git.stash_pop().err()
    } else {
        None
    };
    if let Some(e) = &stash_error {
        warn!("Failed to pop stash, resolve it manually: {e}");
    }

    let path = root.join(SNAPSHOT_FILE);
    std::fs::remove_file(&path).map_err(|e| SessionError::from_io(e, &path))?;

    Ok(Some(RestoredSnapshot {
        snapshot,
        stash_error,
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Recent,
    Stale,
    Old,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionAge {
    pub hours: i64,
    pub text: String,
    pub freshness: Freshness,
}

/// Describes how long ago `last_updated` was, in whole hours or days.
pub fn session_age(last_updated: DateTime<Utc>, now: DateTime<Utc>) -> SessionAge {
    let hours = (now - last_updated).num_hours().max(0);
    let days = hours / 24;

    let (text, freshness) = match hours {
        0 => ("less than an hour ago".to_string(), Freshness::Recent),
        1 => ("1 hour ago".to_string(), Freshness::Recent),
        2..24 => (format!("{hours} hours ago"), Freshness::Stale),
        _ if days == 1 => ("1 day ago".to_string(), Freshness::Stale),
        _ if days < 7 => (format!("{days} days ago"), Freshness::Stale),
        _ => (format!("{days} days ago, it's been a while!"), Freshness::Old),
    };

    SessionAge {
        hours,
        text,
        freshness,
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeStatus {
    /// Last update under an hour ago.
    Fresh,
    Active,
    NoTask,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSummary {
    pub info: TaskInfo,
    pub progress: TaskProgress,
    pub objective: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeSummary {
    pub age: SessionAge,
    pub task: Option<TaskSummary>,
    pub next_action: String,
    pub last_commit: Option<Commit>,
    pub status: ResumeStatus,
}

/// Summarizes where the last session stopped.
///
/// A missing or unparseable `last_updated` counts as just now.
pub fn resume_summary(
    root: &Path,
    git: &dyn Git,
    now: DateTime<Utc>,
) -> Result<ResumeSummary, SessionError> {
    ensure_installed(root)?;

    let context = read_optional(&root.join(CONTEXT_FILE))?
        .map(|content| Context::parse(&content))
        .unwrap_or_default();
    let last_updated = context
        .get("last_updated")
        .and_then(parse_timestamp)
        .unwrap_or(now);
    let age = session_age(last_updated, now);

    let task = read_optional(&root.join(CURRENT_TASK_FILE))?.map(|content| TaskSummary {
        info: parse_task(&content),
        progress: task_progress(&content),
        objective: task_objective(&content),
    });

    let status = match &task {
        _ if age.hours < 1 => ResumeStatus::Fresh,
        None => ResumeStatus::NoTask,
        Some(task) if task.info.status == "completed" => ResumeStatus::Completed,
        Some(_) => ResumeStatus::Active,
    };

    Ok(ResumeSummary {
        age,
        task,
        next_action: context.next_action().unwrap_or("Not specified").to_string(),
        last_commit: git.last_commit(),
        status,
    })
}
