//! Task files in `.project/backlog` and checkbox progress tracking.

use crate::backup::PROJECT_DIR;
use crate::paths::{PathError, resolve_within};
use crate::signature::{sign, strip_trailer};
use crate::templates::{TASK_TEMPLATE_FILE, TemplateError, Templates};
use crate::util::fs::write_atomic;
use chrono::{DateTime, SecondsFormat, Utc};
use regex::{NoExpand, Regex};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

pub const CURRENT_TASK_FILE: &str = ".project/current-task.md";
pub const BACKLOG_INDEX_FILE: &str = ".project/backlog.md";

const BACKLOG_HEADER: &str = "# Project Backlog\n\n| ID | Type | Task | Status | Priority |\n|----|------|------|--------|----------|\n";

static TASK_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^TASK-(\d+)-").expect("task id pattern is valid"));
static TITLE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"title: "Task Name""#).expect("title pattern is valid"));
static HEADER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"# Task: \[Task Name\]").expect("header pattern is valid"));
static CREATED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^created: .*$").expect("created pattern is valid"));
static UPDATED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^last_updated: .*$").expect("last_updated pattern is valid")
});
static CHECKBOX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[-*] \[([ xX])\]\s*(.*)$").expect("checkbox pattern is valid")
});
static PHASE_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^### (Phase \d+:.+)$").expect("phase pattern is valid"));

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("No .project directory found (run `aipim install` first)")]
    NotInstalled,
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),
    #[error("Path error: {0}")]
    Path(#[from] PathError),
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Task id {0} is the largest possible, no next id")]
    IdOverflow(u32),
}

impl TaskError {
    fn from_io(e: std::io::Error, path: &Path) -> Self {
        if e.kind() == ErrorKind::PermissionDenied {
            TaskError::PermissionDenied(path.to_path_buf())
        } else {
            TaskError::Io(e)
        }
    }
}

pub struct NewTask<'a> {
    /// Conventional kind such as `feat`, `fix` or `chore`.
    pub task_type: &'a str,
    pub name: &'a str,
}

/// Creates the next `TASK-NNN-<slug>.md` in the backlog and lists it in
/// `.project/backlog.md`.
///
/// The task body comes from the project's own task template when present,
/// falling back to `templates`. Both written files are signed. Returns the
/// path of the new task file.
pub fn init_task(
    root: &Path,
    templates: &Templates,
    task: NewTask<'_>,
    producer_version: &str,
    now: DateTime<Utc>,
) -> Result<PathBuf, TaskError> {
    let backlog_dir = resolve_within(root, &Path::new(PROJECT_DIR).join("backlog"))?;
    std::fs::create_dir_all(&backlog_dir).map_err(|e| TaskError::from_io(e, &backlog_dir))?;

    let id = format!("{:03}", next_id(&backlog_dir)?);
    let filename = format!("TASK-{id}-{}.md", slugify(task.name));
    let path = resolve_within(root, &Path::new(PROJECT_DIR).join("backlog").join(&filename))?;

    let template = load_task_template(root, templates)?;
    let title = format!("{}: {}", task.task_type, task.name);
    let date = now.to_rfc3339_opts(SecondsFormat::Secs, true);
    let content = TITLE_LINE.replace(&template, NoExpand(&format!("title: \"{title}\"")));
    let content = HEADER_LINE.replace(&content, NoExpand(&format!("# Task: {title}")));
    let content = CREATED_LINE.replace(&content, NoExpand(&format!("created: {date}")));
    let content = UPDATED_LINE.replace(&content, NoExpand(&format!("last_updated: {date}")));

    write_atomic(&path, sign(&content, producer_version).as_bytes())
        .map_err(|e| TaskError::from_io(e, &path))?;
    debug!("Wrote {}", path.display());

    append_to_backlog_index(root, &id, &task, &filename, producer_version)?;

    Ok(path)
}

fn load_task_template(root: &Path, templates: &Templates) -> Result<String, TaskError> {
    let project_template = resolve_within(root, Path::new(TASK_TEMPLATE_FILE))?;
    match std::fs::read_to_string(&project_template) {
        Ok(content) => Ok(strip_trailer(&content)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Ok(templates.scaffold(Path::new(TASK_TEMPLATE_FILE))?)
        }
        Err(e) => Err(TaskError::from_io(e, &project_template)),
    }
}

/// One more than the highest `TASK-NNN-` number in `backlog_dir`, or 1.
fn next_id(backlog_dir: &Path) -> Result<u32, TaskError> {
    let read_dir = match std::fs::read_dir(backlog_dir) {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(1),
        Err(e) => return Err(TaskError::from_io(e, backlog_dir)),
    };

    let mut highest = 0;
    for entry in read_dir {
        let entry = entry.map_err(TaskError::Io)?;
        let name = entry.file_name();
        let Some(caps) = name.to_str().and_then(|n| TASK_ID.captures(n)) else {
            continue;
        };
        if let Ok(id) = caps[1].parse::<u32>() {
            highest = highest.max(id);
        }
    }
    highest.checked_add(1).ok_or(TaskError::IdOverflow(highest))
}

/// Lower-cases `name` and collapses every run of other characters into `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "task".to_string()
    } else {
        slug.to_string()
    }
}

fn append_to_backlog_index(
    root: &Path,
    id: &str,
    task: &NewTask<'_>,
    filename: &str,
    producer_version: &str,
) -> Result<(), TaskError> {
    let index = resolve_within(root, Path::new(BACKLOG_INDEX_FILE))?;
    let mut content = match std::fs::read_to_string(&index) {
        Ok(content) => strip_trailer(&content),
        Err(e) if e.kind() == ErrorKind::NotFound => BACKLOG_HEADER.trim().to_string(),
        Err(e) => return Err(TaskError::from_io(e, &index)),
    };

    let escape = |s: &str| s.replace('|', "\\|");
    content.push_str(&format!(
        "\n| {id} | {} | [{}](backlog/{filename}) | Todo | P2-M |\n",
        escape(task.task_type),
        escape(task.name)
    ));

    write_atomic(&index, sign(&content, producer_version).as_bytes())
        .map_err(|e| TaskError::from_io(e, &index))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextTask {
    /// File name inside `.project/backlog`.
    pub file: String,
    /// Number of task files in `.project/completed`.
    pub completed_count: usize,
}

/// Finds the next task to work on: the alphabetically first backlog file.
///
/// Returns `Ok(None)` when the backlog is empty.
pub fn next_task(root: &Path) -> Result<Option<NextTask>, TaskError> {
    let project_dir = root.join(PROJECT_DIR);
    if !project_dir.is_dir() {
        return Err(TaskError::NotInstalled);
    }

    let mut backlog = markdown_files(&project_dir.join("backlog"))?;
    backlog.sort();
    let completed_count = markdown_files(&project_dir.join("completed"))?.len();

    Ok(backlog.into_iter().next().map(|file| NextTask {
        file,
        completed_count,
    }))
}

pub(crate) fn markdown_files(dir: &Path) -> Result<Vec<String>, TaskError> {
    let read_dir = match std::fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(TaskError::from_io(e, dir)),
    };

    let mut files = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(TaskError::Io)?;
        if !entry.file_type().map_err(TaskError::Io)?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str()
            && name.ends_with(".md")
        {
            files.push(name.to_string());
        }
    }
    Ok(files)
}

/// Prompt asking an assistant to pick up `next`.
pub fn next_task_prompt(next: &NextTask, session: &str, branch: &str) -> String {
    format!(
        "# Next Task\n\n\
         **Progress:** {} tasks completed\n\
         **Session:** {session}\n\
         **Branch:** {branch}\n\n\
         Please open `.project/backlog/{}`, summarize the objective and the plan, \
         then move it to `.project/current-task.md` and start with the first unchecked item.\n",
        next.completed_count, next.file
    )
}

/// Frontmatter and headings of a task file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskInfo {
    pub title: String,
    pub estimated_hours: String,
    pub actual_hours: String,
    pub status: String,
    /// First `### Phase N: ...` heading.
    pub current_phase: Option<String>,
}

pub fn parse_task(content: &str) -> TaskInfo {
    let mut info = TaskInfo::default();
    for line in content.lines() {
        if let Some(value) = line.strip_prefix("title:") {
            info.title = value.trim().replace('"', "");
        } else if let Some(value) = line.strip_prefix("estimated_hours:") {
            info.estimated_hours = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix("actual_hours:") {
            info.actual_hours = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix("status:") {
            info.status = value.trim().to_string();
        } else if info.current_phase.is_none()
            && let Some(caps) = PHASE_HEADING.captures(line)
        {
            info.current_phase = Some(caps[1].trim().to_string());
        }
    }
    info
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskProgress {
    pub completed: usize,
    pub total: usize,
    /// Rounded to the nearest whole percent; 0 when there are no checkboxes.
    pub percentage: u32,
    /// Up to three checked items preceding `current`, oldest first.
    pub last_completed: Vec<String>,
    /// First unchecked item.
    pub current: Option<String>,
    /// Second unchecked item.
    pub next: Option<String>,
}

/// Counts markdown checkboxes and locates the first open ones.
pub fn task_progress(content: &str) -> TaskProgress {
    let mut progress = TaskProgress::default();
    let mut completed_before_current = Vec::new();

    for line in content.lines() {
        let Some(caps) = CHECKBOX.captures(line) else {
            continue;
        };
        let text = caps[2].trim().to_string();
        progress.total += 1;

        if caps[1].eq_ignore_ascii_case("x") {
            progress.completed += 1;
            if progress.current.is_none() {
                completed_before_current.push(text);
            }
        } else if progress.current.is_none() {
            progress.current = Some(text);
        } else if progress.next.is_none() {
            progress.next = Some(text);
        }
    }

    if progress.total > 0 {
        progress.percentage =
            ((progress.completed as f64 / progress.total as f64) * 100.0).round() as u32;
    }
    let skip = completed_before_current.len().saturating_sub(3);
    progress.last_completed = completed_before_current.split_off(skip);
    progress
}

/// Text of the `## Objective` section, flattened to one line and capped at 200 characters.
pub fn task_objective(content: &str) -> String {
    let mut objective = String::new();
    let mut in_objective = false;

    for line in content.lines() {
        if line.starts_with("## Objective") {
            in_objective = true;
            continue;
        }
        if !in_objective {
            continue;
        }
        if line.starts_with("##") {
            break;
        }
        let line = line.trim();
        if !line.is_empty() && !line.starts_with("**") {
            objective.push_str(line);
            objective.push(' ');
            if objective.len() > 150 {
                break;
            }
        }
    }

    objective.trim().chars().take(200).collect()
}
