use crate::deps::{DependencyGraph, TaskState};
use crate::scan::ScanResult;
use crate::session::{Freshness, ResumeStatus, ResumeSummary, Snapshot};
use crate::task::TaskProgress;
use crate::update::{UpdateReport, UpdateResult};

const RULE_WIDTH: usize = 60;

pub fn print_scan_results(results: &[ScanResult]) {
    print_lines(results.iter().map(format_scan_line));
}

pub fn print_update_report(report: &UpdateReport) {
    print_lines(report.results.iter().flat_map(format_update_lines));
}

pub fn print_task_progress(progress: &TaskProgress) {
    print_lines(format_task_progress(progress));
}

pub fn print_dependency_graph(graph: &DependencyGraph) {
    print_lines(format_dependency_graph(graph));
}

pub fn print_snapshot(snapshot: &Snapshot) {
    print_lines(format_snapshot(snapshot));
}

pub fn print_resume_summary(summary: &ResumeSummary) {
    print_lines(format_resume_summary(summary));
}

fn print_lines(lines: impl IntoIterator<Item = String>) {
    for line in lines {
        println!("{}", line);
    }
}

fn format_scan_line(result: &ScanResult) -> String {
    format!("{:<9} {}", result.status, result.relative_path.display())
}

fn format_update_lines(result: &UpdateResult) -> Vec<String> {
    let mut lines = vec![format!("{:<8} {}", result.status, result.file.display())];
    if let Some(reason) = &result.reason {
        lines.push(format!("   reason: {}", reason));
    }
    lines
}

fn format_task_progress(progress: &TaskProgress) -> Vec<String> {
    let mut lines = vec![format!(
        "Progress: {}/{} checkboxes ({}%)",
        progress.completed, progress.total, progress.percentage
    )];
    lines.extend(format_checkpoints(progress));
    lines
}

fn format_checkpoints(progress: &TaskProgress) -> Vec<String> {
    let mut lines = Vec::new();
    for item in &progress.last_completed {
        lines.push(format!("   [x] {}", item));
    }
    if let Some(current) = &progress.current {
        lines.push(format!("   >> Working on: {}", current));
    }
    if let Some(next) = &progress.next {
        lines.push(format!("   -- Next: {}", next));
    }
    lines
}

fn format_dependency_graph(graph: &DependencyGraph) -> Vec<String> {
    let mut lines = Vec::new();

    if !graph.cycles.is_empty() {
        lines.push("Circular dependencies:".to_string());
        for cycle in &graph.cycles {
            lines.push(format!("   {}", cycle.join(" -> ")));
        }
        lines.push(String::new());
    }

    for (state, heading) in [
        (TaskState::Blocked, "Blocked:"),
        (TaskState::InProgress, "In progress:"),
        (TaskState::Ready, "Ready to start:"),
        (TaskState::Completed, "Completed:"),
    ] {
        let mut tasks = graph.with_state(state).peekable();
        if tasks.peek().is_none() {
            continue;
        }
        lines.push(heading.to_string());
        for task in tasks {
            lines.push(format!("   {}: {}", task.id, task.title));
            if state != TaskState::Blocked {
                continue;
            }
            for dependency in &task.depends_on {
                let dependency_state = graph
                    .state_of(dependency)
                    .map_or("missing", TaskState::as_str);
                lines.push(format!("      needs {} [{}]", dependency, dependency_state));
            }
        }
        lines.push(String::new());
    }

    lines
}

fn format_snapshot(snapshot: &Snapshot) -> Vec<String> {
    let mut lines = vec![
        "Interruption detected".to_string(),
        format!("   Paused: {}", snapshot.timestamp),
        format!("   Reason: {}", snapshot.reason),
        format!("   Task: {}", snapshot.task),
    ];
    if snapshot.dirty == Some(true) {
        lines.push("   Uncommitted changes were detected.".to_string());
        if snapshot.stashed {
            lines.push("      (Stashed automatically)".to_string());
        }
    }
    lines
}

fn format_resume_summary(summary: &ResumeSummary) -> Vec<String> {
    let rule = "=".repeat(RULE_WIDTH);
    let indicator = match summary.age.freshness {
        Freshness::Recent => "[recent]",
        Freshness::Stale => "[stale]",
        Freshness::Old => "[old]",
    };

    let mut lines = vec![
        rule.clone(),
        "  AIPIM SESSION RESUME".to_string(),
        rule.clone(),
        String::new(),
        format!("{} Last Session: {}", indicator, summary.age.text),
        String::new(),
    ];

    match summary.status {
        ResumeStatus::Fresh => {
            lines.push("[FRESH] You just stopped working.".to_string());
            lines.push(String::new());
        }
        ResumeStatus::NoTask => {
            lines.push("[WARN] No active task".to_string());
            lines.push("  Run `aipim task next` to pick one from the backlog".to_string());
            lines.push(String::new());
        }
        ResumeStatus::Completed => {
            lines.push("[DONE] Task completed!".to_string());
            lines.push("  Choose your next task from the backlog".to_string());
            lines.push(String::new());
        }
        ResumeStatus::Active => {}
    }

    if let Some(task) = summary
        .task
        .as_ref()
        .filter(|_| matches!(summary.status, ResumeStatus::Active | ResumeStatus::Fresh))
    {
        lines.push(format!("You were working on: {}", task.info.title));
        if let Some(phase) = &task.info.current_phase {
            lines.push(format!(
                "   {} ({}h estimated)",
                phase, task.info.estimated_hours
            ));
        }
        lines.push(format!(
            "   Progress: {}/{} checkboxes ({}%)",
            task.progress.completed, task.progress.total, task.progress.percentage
        ));
        lines.push(String::new());

        lines.push("You stopped at:".to_string());
        lines.extend(format_checkpoints(&task.progress));
        lines.push(String::new());

        if !task.objective.is_empty() {
            lines.push("Quick context:".to_string());
            lines.push(format!("   {}", task.objective));
            lines.push(String::new());
        }

        lines.push("Suggested next action:".to_string());
        lines.push(format!("   {}", summary.next_action));
        lines.push(String::new());
    }

    if let Some(commit) = &summary.last_commit {
        lines.push(format!(
            "Last commit: {} \"{}\" ({})",
            commit.hash, commit.subject, commit.age
        ));
        lines.push(String::new());
    }

    lines.push(rule);
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::TaskNode;
    use crate::git::Commit;
    use crate::session::{SessionAge, TaskSummary};
    use crate::signature::FileStatus;
    use crate::task::TaskInfo;
    use crate::update::UpdateStatus;
    use std::path::PathBuf;

    fn progress() -> TaskProgress {
        TaskProgress {
            completed: 2,
            total: 4,
            percentage: 50,
            last_completed: vec!["Form".to_string(), "Route".to_string()],
            current: Some("Session".to_string()),
            next: None,
        }
    }

    fn summary(status: ResumeStatus) -> ResumeSummary {
        ResumeSummary {
            age: SessionAge {
                hours: 30,
                text: "1 day ago".to_string(),
                freshness: Freshness::Stale,
            },
            task: Some(TaskSummary {
                info: TaskInfo {
                    title: "feat: Login".to_string(),
                    estimated_hours: "4".to_string(),
                    actual_hours: "1".to_string(),
                    status: "in-progress".to_string(),
                    current_phase: Some("Phase 2: Build".to_string()),
                },
                progress: progress(),
                objective: "Users can sign in.".to_string(),
            }),
            next_action: "Wire the store".to_string(),
            last_commit: Some(Commit {
                hash: "abc123".to_string(),
                subject: "Add form".to_string(),
                age: "1 day ago".to_string(),
            }),
            status,
        }
    }

    #[test]
    fn scan_line_pads_status() {
        let result = ScanResult {
            absolute_path: None,
            relative_path: PathBuf::from("CLAUDE.md"),
            status: FileStatus::Modified,
        };

        assert_eq!(format_scan_line(&result), "modified  CLAUDE.md");
    }

    #[test]
    fn dependency_graph_lines() {
        let task = |id: &str, state, depends_on: &[&str]| TaskNode {
            id: id.to_string(),
            title: format!("Task {id}"),
            state,
            depends_on: depends_on.iter().map(|d| d.to_string()).collect(),
            blocks: Vec::new(),
        };
        let graph = DependencyGraph::build(vec![
            task("TASK-001", TaskState::Completed, &[]),
            task("TASK-002", TaskState::Ready, &["TASK-001", "TASK-003", "TASK-009"]),
            task("TASK-003", TaskState::InProgress, &[]),
        ]);

        assert_eq!(
            format_dependency_graph(&graph),
            [
                "Blocked:",
                "   TASK-002: Task TASK-002",
                "      needs TASK-001 [completed]",
                "      needs TASK-003 [in-progress]",
                "      needs TASK-009 [missing]",
                "",
                "In progress:",
                "   TASK-003: Task TASK-003",
                "",
                "Completed:",
                "   TASK-001: Task TASK-001",
                "",
            ]
        );
    }

    #[test]
    fn dependency_cycles_come_first() {
        let task = |id: &str, dependency: &str| TaskNode {
            id: id.to_string(),
            title: id.to_string(),
            state: TaskState::Ready,
            depends_on: vec![dependency.to_string()],
            blocks: Vec::new(),
        };
        let graph = DependencyGraph::build(vec![task("TASK-001", "T2"), task("TASK-002", "T1")]);

        let lines = format_dependency_graph(&graph);

        assert_eq!(lines[0], "Circular dependencies:");
        assert_eq!(lines[1], "   TASK-001 -> TASK-002 -> TASK-001");
    }

    #[test]
    fn update_lines_include_reason() {
        let skipped = UpdateResult {
            file: PathBuf::from("GEMINI.md"),
            status: UpdateStatus::Skipped,
            reason: Some("User modified".to_string()),
        };
        let created = UpdateResult {
            file: PathBuf::from("CLAUDE.md"),
            status: UpdateStatus::Created,
            reason: None,
        };

        assert_eq!(
            format_update_lines(&skipped),
            vec!["skipped  GEMINI.md", "   reason: User modified"]
        );
        assert_eq!(format_update_lines(&created), vec!["created  CLAUDE.md"]);
    }

    #[test]
    fn task_progress_lines() {
        assert_eq!(
            format_task_progress(&progress()),
            vec![
                "Progress: 2/4 checkboxes (50%)",
                "   [x] Form",
                "   [x] Route",
                "   >> Working on: Session",
            ]
        );
    }

    #[test]
    fn snapshot_mentions_stash() {
        let snapshot = Snapshot {
            timestamp: "2026-10-19T10:00:00Z".to_string(),
            reason: "meeting".to_string(),
            task: "feat: Login".to_string(),
            dirty: Some(true),
            stashed: true,
        };

        let lines = format_snapshot(&snapshot);

        assert!(lines.contains(&"   Reason: meeting".to_string()));
        assert_eq!(lines.last().unwrap(), "      (Stashed automatically)");
    }

    #[test]
    fn active_resume_shows_task_details() {
        let lines = format_resume_summary(&summary(ResumeStatus::Active));

        assert!(lines.contains(&"[stale] Last Session: 1 day ago".to_string()));
        assert!(lines.contains(&"You were working on: feat: Login".to_string()));
        assert!(lines.contains(&"   Phase 2: Build (4h estimated)".to_string()));
        assert!(lines.contains(&"   >> Working on: Session".to_string()));
        assert!(lines.contains(&"   Wire the store".to_string()));
        assert!(lines.contains(&"Last commit: abc123 \"Add form\" (1 day ago)".to_string()));
    }

    #[test]
    fn completed_resume_hides_task_details() {
        let lines = format_resume_summary(&summary(ResumeStatus::Completed));

        assert!(lines.contains(&"[DONE] Task completed!".to_string()));
        assert!(!lines.iter().any(|line| line.starts_with("You were working on")));
        assert!(lines.contains(&"Last commit: abc123 \"Add form\" (1 day ago)".to_string()));
    }
}
