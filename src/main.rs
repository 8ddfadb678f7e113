mod backup;
mod cli;
mod config;
mod deps;
mod git;
mod install;
mod merge;
mod paths;
mod report;
mod scan;
mod session;
mod signature;
mod task;
mod templates;
mod update;
mod util;

use anyhow::Context as _;
use chrono::Utc;
use cli::{Cli, Command, TaskCommand};
use config::{ConfigFile, ProjectSettings};
use git::{Git, SystemGit};
use install::{InstallOptions, install_project};
use std::fmt as stdfmt;
use std::io::{ErrorKind, IsTerminal, stderr};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use templates::{PRE_SESSION_SCRIPT, ProjectRenderer, Templates, prompt_files};
use tracing::{Event, Level, Subscriber, error, info, warn};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt as tracing_fmt;
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use update::{UpdateOptions, update_project};

const PRODUCER_VERSION: &str = env!("CARGO_PKG_VERSION");

struct AipimExitCode;

impl AipimExitCode {
    /// Exit code used when a command completed but found problems.
    fn unclean() -> ExitCode {
        ExitCode::from(1)
    }

    /// Exit code used for other errors (I/O errors, invalid arguments, etc.).
    fn any_error() -> ExitCode {
        ExitCode::from(255)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    // Change working directory if -C was specified
    if let Some(directory) = &cli.directory
        && let Err(e) = std::env::set_current_dir(directory)
    {
        error!(
            "Failed to change directory to {}: {}",
            directory.display(),
            e
        );
        return AipimExitCode::any_error();
    }

    let root = PathBuf::from(".");
    let templates_dir = cli.templates_dir;

    let result: anyhow::Result<ExitCode> = match cli.command {
        Command::Install {
            ais,
            guidelines,
            dry_run,
        } => handle_install(&root, templates_dir, ais, guidelines, dry_run),
        Command::Update { dry_run } => handle_update(&root, templates_dir, dry_run),
        Command::Status {} => handle_status(&root),
        Command::Validate {} => handle_validate(&root),
        Command::Task(TaskCommand::Init { task_type, name }) => {
            handle_task_init(&root, templates_dir, &task_type, &name)
        }
        Command::Task(TaskCommand::Next {}) => handle_task_next(&root),
        Command::Task(TaskCommand::Progress {}) => handle_task_progress(&root),
        Command::Deps {} => handle_deps(&root),
        Command::Start { full, file } => handle_start(&root, full, file),
        Command::Pause { reason, stash } => handle_pause(&root, &reason, stash),
        Command::Resume { keep_snapshot } => handle_resume(&root, keep_snapshot),
    };

    match result {
        Ok(exit_code) => exit_code,
        Err(err) => {
            error!("{err:#}");
            AipimExitCode::any_error()
        }
    }
}

fn load_settings(root: &Path) -> anyhow::Result<ProjectSettings> {
    Ok(ConfigFile::load_project(root)?
        .map(|config| config.project)
        .unwrap_or_default())
}

/// Command-line choices win over the saved configuration, which wins over defaults.
fn install_settings(
    saved: Option<ProjectSettings>,
    ais: Vec<String>,
    guidelines: Vec<String>,
    templates_dir: Option<PathBuf>,
) -> ProjectSettings {
    let saved = saved.unwrap_or_default();
    ProjectSettings {
        ais: if ais.is_empty() { saved.ais } else { ais },
        guidelines: if guidelines.is_empty() {
            saved.guidelines
        } else {
            guidelines
        },
        templates_dir: templates_dir.or(saved.templates_dir),
    }
}

fn templates_for(templates_dir: Option<PathBuf>, settings: &ProjectSettings) -> Templates {
    match templates_dir.or_else(|| settings.templates_dir.clone()) {
        Some(dir) => Templates::Directory(dir),
        None => Templates::Builtin,
    }
}

fn handle_install(
    root: &Path,
    templates_dir: Option<PathBuf>,
    ais: Vec<String>,
    guidelines: Vec<String>,
    dry_run: bool,
) -> anyhow::Result<ExitCode> {
    let saved = ConfigFile::load_project(root)?.map(|config| config.project);
    let settings = install_settings(saved, ais, guidelines, templates_dir);
    let templates = templates_for(None, &settings);
    let guidelines = settings.guidelines.clone();
    let renderer = ProjectRenderer::new(&templates, &guidelines);

    let report = install_project(
        root,
        &renderer,
        InstallOptions {
            settings,
            producer_version: PRODUCER_VERSION.to_string(),
            dry_run,
        },
    )?;

    if dry_run {
        info!("DRY RUN - no files were modified");
    }
    for path in &report.scaffolded {
        info!("Created {}", path.display());
    }

    report::print_update_report(&report.prompts);

    if report.prompts.has_errors() {
        return Ok(AipimExitCode::unclean());
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_update(
    root: &Path,
    templates_dir: Option<PathBuf>,
    dry_run: bool,
) -> anyhow::Result<ExitCode> {
    let settings = load_settings(root)?;
    settings.validate()?;
    let templates = templates_for(templates_dir, &settings);
    let renderer = ProjectRenderer::new(&templates, &settings.guidelines);

    let report = update_project(
        root,
        &renderer,
        UpdateOptions {
            files: Some(prompt_files(&settings.ais)),
            producer_version: PRODUCER_VERSION.to_string(),
            dry_run,
        },
    )?;

    if dry_run {
        info!("DRY RUN - no files were modified");
    }

    report::print_update_report(&report);

    if report.has_errors() {
        error!(
            "{} file(s) could not be updated",
            report
                .results
                .iter()
                .filter(|r| r.status == update::UpdateStatus::Error)
                .count()
        );
        return Ok(AipimExitCode::unclean());
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_status(root: &Path) -> anyhow::Result<ExitCode> {
    let settings = load_settings(root)?;
    let files = prompt_files(&settings.ais);

    report::print_scan_results(&scan::scan(root, Some(files.as_slice())));

    Ok(ExitCode::SUCCESS)
}

fn validation_problems(root: &Path) -> Vec<String> {
    let mut problems = Vec::new();

    if !root.join(backup::PROJECT_DIR).is_dir() {
        problems.push("No .project directory found (run `aipim install`)".to_string());
        return problems;
    }
    if !root.join(PRE_SESSION_SCRIPT).is_file() {
        problems.push(format!("Missing {PRE_SESSION_SCRIPT}"));
    }
    match ConfigFile::load_project(root) {
        Ok(Some(config)) => {
            if let Err(e) = config.project.validate() {
                problems.push(format!("Invalid {}: {e}", config::CONFIG_FILE));
            }
        }
        Ok(None) => problems.push(format!("Missing {}", config::CONFIG_FILE)),
        Err(e) => problems.push(format!("Invalid {}: {e}", config::CONFIG_FILE)),
    }

    problems
}

fn handle_validate(root: &Path) -> anyhow::Result<ExitCode> {
    let problems = validation_problems(root);

    if problems.is_empty() {
        info!("Validation successful: project setup is complete");
        return Ok(ExitCode::SUCCESS);
    }

    for problem in &problems {
        println!("{problem}");
    }
    error!("Validation failed: {} problem(s) found", problems.len());
    Ok(AipimExitCode::unclean())
}

fn handle_task_init(
    root: &Path,
    templates_dir: Option<PathBuf>,
    task_type: &str,
    name: &str,
) -> anyhow::Result<ExitCode> {
    let settings = load_settings(root)?;
    let templates = templates_for(templates_dir, &settings);

    let path = task::init_task(
        root,
        &templates,
        task::NewTask { task_type, name },
        PRODUCER_VERSION,
        Utc::now(),
    )?;

    println!("{}", path.strip_prefix(root).unwrap_or(&path).display());
    Ok(ExitCode::SUCCESS)
}

fn handle_task_next(root: &Path) -> anyhow::Result<ExitCode> {
    let Some(next) = task::next_task(root)? else {
        warn!("Backlog is empty, create a task with `aipim task init`");
        return Ok(ExitCode::SUCCESS);
    };

    let context = match std::fs::read_to_string(root.join(templates::CONTEXT_FILE)) {
        Ok(content) => session::Context::parse(&content),
        Err(e) if e.kind() == ErrorKind::NotFound => session::Context::default(),
        Err(e) => return Err(e).context("Failed to read context.md"),
    };
    let branch = SystemGit::new(root)
        .current_branch()
        .unwrap_or_else(|| "N/A".to_string());

    print!(
        "{}",
        task::next_task_prompt(&next, context.get("session").unwrap_or("N/A"), &branch)
    );
    Ok(ExitCode::SUCCESS)
}

fn handle_task_progress(root: &Path) -> anyhow::Result<ExitCode> {
    let path = root.join(task::CURRENT_TASK_FILE);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            anyhow::bail!("No current task ({} does not exist)", task::CURRENT_TASK_FILE)
        }
        Err(e) => return Err(e).context(format!("Failed to read {}", path.display())),
    };

    let info = task::parse_task(&content);
    if !info.title.is_empty() {
        println!("{}", info.title);
    }
    report::print_task_progress(&task::task_progress(&content));
    Ok(ExitCode::SUCCESS)
}

fn handle_deps(root: &Path) -> anyhow::Result<ExitCode> {
    let tasks = deps::load_tasks(root)?;
    if tasks.is_empty() {
        warn!("No tasks found, create one with `aipim task init`");
        return Ok(ExitCode::SUCCESS);
    }

    let graph = deps::DependencyGraph::build(tasks);
    report::print_dependency_graph(&graph);

    if !graph.cycles.is_empty() {
        error!("Found {} dependency cycle(s)", graph.cycles.len());
        return Ok(AipimExitCode::unclean());
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_start(root: &Path, full: bool, file: Option<PathBuf>) -> anyhow::Result<ExitCode> {
    info!("Generating session prompt...");
    let prompt = session::session_prompt(root, &SystemGit::new(root), full, Utc::now())?;

    match file {
        Some(file) => {
            util::fs::write_atomic(&file, prompt.as_bytes())
                .with_context(|| format!("Failed to write {}", file.display()))?;
            info!("Session prompt saved to {}", file.display());
        }
        None => print!("{prompt}"),
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_pause(root: &Path, reason: &str, stash: bool) -> anyhow::Result<ExitCode> {
    let snapshot = session::pause(root, &SystemGit::new(root), reason, stash, Utc::now())?;

    if snapshot.dirty == Some(true) && !snapshot.stashed {
        warn!("Uncommitted changes were left in the work tree (use --stash to stash them)");
    }
    println!("Session paused: {}", snapshot.reason);
    println!("Run 'aipim resume' when you return.");
    Ok(ExitCode::SUCCESS)
}

fn handle_resume(root: &Path, keep_snapshot: bool) -> anyhow::Result<ExitCode> {
    let git = SystemGit::new(root);

    if let Some(restored) = session::restore_snapshot(root, &git, keep_snapshot)? {
        report::print_snapshot(&restored.snapshot);
        println!();
        if restored.stash_error.is_some() {
            warn!("Stashed changes could not be restored, run `git stash pop` manually");
        }
    }

    report::print_resume_summary(&session::resume_summary(root, &git, Utc::now())?);
    Ok(ExitCode::SUCCESS)
}

fn init_tracing(verbose: u8) {
    let stderr_is_terminal = stderr().is_terminal();
    let formatter = EmojiFormatter { stderr_is_terminal };

    // -v/-vv take precedence over RUST_LOG
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };

    let fmt_layer = tracing_fmt::layer()
        .event_format(formatter)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

struct EmojiFormatter {
    stderr_is_terminal: bool,
}

impl<S, N> FormatEvent<S, N> for EmojiFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> stdfmt::Result {
        if self.stderr_is_terminal {
            match *event.metadata().level() {
                Level::DEBUG => write!(writer, "🔍 ")?,
                Level::INFO => write!(writer, "ℹ️ ")?,
                Level::WARN => write!(writer, "⚠️  ")?,
                Level::ERROR => write!(writer, "❌️ ")?,
                _ => {}
            }
        } else {
            match *event.metadata().level() {
                Level::DEBUG => writer.write_str("DEBUG: ")?,
                Level::INFO => writer.write_str("INFO: ")?,
                Level::WARN => writer.write_str("WARN: ")?,
                Level::ERROR => writer.write_str("ERROR: ")?,
                _ => {}
            }
        }

        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn install_settings_prefer_command_line() {
        let saved = ProjectSettings {
            ais: strings(&["chatgpt"]),
            guidelines: strings(&["vue"]),
            templates_dir: Some(PathBuf::from("saved")),
        };

        let settings = install_settings(
            Some(saved),
            strings(&["gemini"]),
            Vec::new(),
            Some(PathBuf::from("cli")),
        );

        assert_eq!(settings.ais, ["gemini"]);
        assert_eq!(settings.guidelines, ["vue"]);
        assert_eq!(settings.templates_dir, Some(PathBuf::from("cli")));
    }

    #[test]
    fn install_settings_fall_back_to_defaults() {
        let settings = install_settings(None, Vec::new(), Vec::new(), None);

        assert_eq!(settings, ProjectSettings::default());
    }

    #[test]
    fn templates_dir_flag_overrides_config() {
        let settings = ProjectSettings {
            templates_dir: Some(PathBuf::from("saved")),
            ..ProjectSettings::default()
        };

        assert_eq!(
            templates_for(Some(PathBuf::from("cli")), &settings),
            Templates::Directory(PathBuf::from("cli"))
        );
        assert_eq!(
            templates_for(None, &settings),
            Templates::Directory(PathBuf::from("saved"))
        );
        assert_eq!(
            templates_for(None, &ProjectSettings::default()),
            Templates::Builtin
        );
    }

    #[test]
    fn validation_reports_missing_pieces() {
        let temp = TempDir::new().unwrap();
        assert_eq!(validation_problems(temp.path()).len(), 1);

        fs::create_dir(temp.path().join(".project")).unwrap();
        let problems = validation_problems(temp.path());
        assert_eq!(
            problems,
            vec![
                format!("Missing {PRE_SESSION_SCRIPT}"),
                format!("Missing {}", config::CONFIG_FILE),
            ]
        );
    }
}
