//! Task dependency graph built from the `depends_on` and `blocks` lists in
//! task frontmatter.

use crate::backup::PROJECT_DIR;
use crate::session::{FrontmatterValue, parse_frontmatter_line};
use crate::signature::strip_trailer;
use crate::task::{CURRENT_TASK_FILE, TaskError, markdown_files};
use regex::Regex;
use std::fmt;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

static FILE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:TASK-|T)(\d+)").expect("file id pattern is valid"));
static TITLE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:TASK-|T)(\d{3,})\b").expect("title id pattern is valid"));
static REFERENCE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:TASK-|T)?(\d+)$").expect("reference pattern is valid"));

/// Id given to `current-task.md` when its title names no task id.
const CURRENT_ID: &str = "CURRENT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Waiting in the backlog with nothing in its way.
    Ready,
    InProgress,
    /// Depends on a task that is not completed, or on one that does not exist.
    Blocked,
    Completed,
}

impl TaskState {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Ready => "ready",
            TaskState::InProgress => "in-progress",
            TaskState::Blocked => "blocked",
            TaskState::Completed => "completed",
        }
    }

    fn from_status(status: &str) -> Option<Self> {
        match status.trim().to_ascii_lowercase().as_str() {
            "done" | "completed" => Some(TaskState::Completed),
            "in-progress" | "in_progress" => Some(TaskState::InProgress),
            "blocked" => Some(TaskState::Blocked),
            _ => None,
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskNode {
    /// `TASK-<digits>` taken from the file name.
    pub id: String,
    pub title: String,
    pub state: TaskState,
    /// Task ids as written in the frontmatter, plus the tasks that list this
    /// one under `blocks`.
    pub depends_on: Vec<String>,
    pub blocks: Vec<String>,
}

impl TaskNode {
    fn parse(id: String, content: &str, default_state: TaskState) -> Self {
        let frontmatter = DependencyFrontmatter::parse(content);
        let state = frontmatter
            .status
            .as_deref()
            .and_then(TaskState::from_status)
            .unwrap_or(default_state);

        TaskNode {
            id,
            title: frontmatter.title.unwrap_or_else(|| "Untitled".to_string()),
            state,
            depends_on: frontmatter.depends_on,
            blocks: frontmatter.blocks,
        }
    }
}

#[derive(Debug, Default)]
struct DependencyFrontmatter {
    title: Option<String>,
    status: Option<String>,
    depends_on: Vec<String>,
    blocks: Vec<String>,
}

impl DependencyFrontmatter {
    /// Reads the frontmatter fields the graph needs. Lists may be inline
    /// (`depends_on: [TASK-001, TASK-002]`) or one `- item` per line under an
    /// empty `depends_on:` key.
    fn parse(content: &str) -> Self {
        let mut frontmatter = DependencyFrontmatter::default();
        let mut lines = content.lines();
        if lines.next().map(str::trim) != Some("---") {
            return frontmatter;
        }

        let mut open_list: Option<String> = None;
        for line in lines {
            if line.trim() == "---" {
                break;
            }

            if let Some(item) = line.trim().strip_prefix("- ")
                && let Some(key) = &open_list
            {
                let item = item.trim().trim_matches('"').trim_matches('\'').to_string();
                frontmatter.push(key, item);
                continue;
            }

            if let Some(key) = line.trim_end().strip_suffix(':')
                && !key.is_empty()
                && !key.starts_with(char::is_whitespace)
            {
                open_list = Some(key.to_string());
                continue;
            }
            open_list = None;

            match parse_frontmatter_line(line) {
                Some((key, FrontmatterValue::Scalar(value))) => match key.as_str() {
                    "title" => frontmatter.title = Some(value),
                    "status" => frontmatter.status = Some(value),
                    _ => {}
                },
                Some((key, FrontmatterValue::List(items))) => {
                    for item in items {
                        frontmatter.push(&key, item.trim_matches('\'').to_string());
                    }
                }
                None => {}
            }
        }
        frontmatter
    }

    fn push(&mut self, key: &str, item: String) {
        if item.is_empty() {
            return;
        }
        match key {
            "depends_on" => self.depends_on.push(item),
            "blocks" => self.blocks.push(item),
            _ => {}
        }
    }
}

/// Tasks keyed by id, with dependency cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    /// Sorted by id.
    pub nodes: Vec<TaskNode>,
    /// Each cycle starts and ends with the same id.
    pub cycles: Vec<Vec<String>>,
}

impl DependencyGraph {
    /// Links the tasks, marks blocked ones and looks for cycles.
    ///
    /// `blocks` on a task is read as a dependency of the blocked task on it.
    /// A task that is not completed becomes `Blocked` when any dependency is
    /// unknown or not completed.
    pub fn build(mut nodes: Vec<TaskNode>) -> Self {
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        let mut graph = DependencyGraph {
            nodes,
            cycles: Vec::new(),
        };

        let mut implied = Vec::new();
        for node in &graph.nodes {
            for blocked in &node.blocks {
                match graph.resolve(blocked) {
                    Some(index) => implied.push((index, node.id.clone())),
                    None => debug!("{} blocks unknown task {}", node.id, blocked),
                }
            }
        }
        for (index, dependency) in implied {
            let depends_on = &mut graph.nodes[index].depends_on;
            if !depends_on.contains(&dependency) {
                depends_on.push(dependency);
            }
        }

        let blocked: Vec<usize> = (0..graph.nodes.len())
            .filter(|&index| {
                let node = &graph.nodes[index];
                node.state != TaskState::Completed
                    && node.depends_on.iter().any(|dependency| {
                        graph
                            .resolve(dependency)
                            .is_none_or(|dep| graph.nodes[dep].state != TaskState::Completed)
                    })
            })
            .collect();
        for index in blocked {
            graph.nodes[index].state = TaskState::Blocked;
        }

        graph.cycles = graph.find_cycles();
        graph
    }

    /// Index of the task `reference` points to. `T15`, `TASK-015` and `15`
    /// all name the same task.
    pub fn resolve(&self, reference: &str) -> Option<usize> {
        let reference = reference.trim();
        if let Some(index) = self.nodes.iter().position(|node| node.id == reference) {
            return Some(index);
        }
        let number = id_number(reference)?;
        self.nodes
            .iter()
            .position(|node| id_number(&node.id) == Some(number))
    }

    pub fn state_of(&self, reference: &str) -> Option<TaskState> {
        self.resolve(reference).map(|index| self.nodes[index].state)
    }

    pub fn with_state(&self, state: TaskState) -> impl Iterator<Item = &TaskNode> {
        self.nodes.iter().filter(move |node| node.state == state)
    }

    fn find_cycles(&self) -> Vec<Vec<String>> {
        let mut marks = vec![Mark::Unvisited; self.nodes.len()];
        let mut path = Vec::new();
        let mut cycles = Vec::new();
        for index in 0..self.nodes.len() {
            if marks[index] == Mark::Unvisited {
                self.visit(index, &mut marks, &mut path, &mut cycles);
            }
        }
        cycles
    }

    fn visit(
        &self,
        index: usize,
        marks: &mut [Mark],
        path: &mut Vec<usize>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        marks[index] = Mark::OnPath;
        path.push(index);

        for dependency in &self.nodes[index].depends_on {
            let Some(next) = self.resolve(dependency) else {
                continue;
            };
            match marks[next] {
                Mark::Unvisited => self.visit(next, marks, path, cycles),
                Mark::OnPath => {
                    let start = path.iter().position(|&i| i == next).unwrap_or(0);
                    let mut cycle: Vec<String> = path[start..]
                        .iter()
                        .map(|&i| self.nodes[i].id.clone())
                        .collect();
                    cycle.push(self.nodes[next].id.clone());
                    cycles.push(cycle);
                }
                Mark::Done => {}
            }
        }

        path.pop();
        marks[index] = Mark::Done;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnPath,
    Done,
}

fn id_number(id: &str) -> Option<u64> {
    REFERENCE_ID.captures(id)?[1].parse().ok()
}

fn file_id(filename: &str) -> String {
    match FILE_ID.captures(filename) {
        Some(caps) => format!("TASK-{}", &caps[1]),
        None => filename.trim_end_matches(".md").to_string(),
    }
}

/// Reads the current task, the backlog and the completed tasks.
///
/// Files in `completed/` default to `Completed`, the current task to
/// `InProgress` and backlog files to `Ready`; a known `status` in the
/// frontmatter overrides that. When two files share an id the first one read
/// is kept.
pub fn load_tasks(root: &Path) -> Result<Vec<TaskNode>, TaskError> {
    let project_dir = root.join(PROJECT_DIR);
    if !project_dir.is_dir() {
        return Err(TaskError::NotInstalled);
    }

    let mut tasks: Vec<TaskNode> = Vec::new();
    let mut add = |node: TaskNode| {
        if tasks.iter().any(|existing| existing.id == node.id) {
            debug!("Ignoring second task file with id {}", node.id);
        } else {
            tasks.push(node);
        }
    };

    let current_path = root.join(CURRENT_TASK_FILE);
    if let Some(content) = read_task(&current_path)? {
        let content = strip_trailer(&content);
        let title = DependencyFrontmatter::parse(&content).title.unwrap_or_default();
        let id = TITLE_ID
            .captures(&title)
            .map(|caps| format!("TASK-{}", &caps[1]))
            .unwrap_or_else(|| CURRENT_ID.to_string());
        add(TaskNode::parse(id, &content, TaskState::InProgress));
    }

    for (dir, default_state) in [
        ("backlog", TaskState::Ready),
        ("completed", TaskState::Completed),
    ] {
        let dir = project_dir.join(dir);
        let mut files = markdown_files(&dir)?;
        files.sort();
        for file in files {
            let path = dir.join(&file);
            if let Some(content) = read_task(&path)? {
                add(TaskNode::parse(
                    file_id(&file),
                    &strip_trailer(&content),
                    default_state,
                ));
            }
        }
    }

    Ok(tasks)
}

fn read_task(path: &Path) -> Result<Option<String>, TaskError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            Err(TaskError::PermissionDenied(path.to_path_buf()))
        }
        Err(e) => Err(TaskError::Io(e)),
    }
}
