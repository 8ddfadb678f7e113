use crate::backup::PROJECT_DIR;
use crate::config::{CONFIG_FILE, ConfigError, ConfigFile, ProjectSettings};
use crate::paths::{PathError, resolve_within};
use crate::signature::sign;
use crate::templates::{Renderer, SCAFFOLD_FILES, TemplateError, prompt_files};
use crate::update::{UpdateError, UpdateOptions, UpdateReport, update_project};
use crate::util::fs::write_atomic;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directories created below `.project`.
pub const PROJECT_STRUCTURE: [&str; 9] = [
    "backlog",
    "backlog/archived",
    "completed",
    "decisions",
    "docs",
    "ideas",
    "reports",
    "scripts",
    "_templates",
];

#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Update(#[from] UpdateError),
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),
    #[error("Path error: {0}")]
    Path(#[from] PathError),
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
}

impl InstallError {
    fn from_io(e: std::io::Error, path: &Path) -> Self {
        if e.kind() == ErrorKind::PermissionDenied {
            InstallError::PermissionDenied(path.to_path_buf())
        } else {
            InstallError::Io(e)
        }
    }
}

pub struct InstallOptions {
    pub settings: ProjectSettings,
    pub producer_version: String,
    pub dry_run: bool,
}

#[derive(Debug)]
pub struct InstallReport {
    /// Outcome for the prompt files.
    pub prompts: UpdateReport,
    /// Scaffold files written by this run (existing ones are left alone).
    pub scaffolded: Vec<PathBuf>,
}

/// Sets up `.project` and the prompt files in the project at `root`.
///
/// Prompt files go through [`update_project`], so an install over an
/// existing setup has the same safety as an update: backup first, edited
/// files untouched. After that the `.project` directory structure is
/// created, scaffold files that do not exist yet are written (markdown
/// ones signed, scripts made executable), and the settings are saved to
/// `.project/aipim.toml`.
pub fn install_project(
    root: &Path,
    renderer: &dyn Renderer,
    options: InstallOptions,
) -> Result<InstallReport, InstallError> {
    options.settings.validate()?;

    let prompts = update_project(
        root,
        renderer,
        UpdateOptions {
            files: Some(prompt_files(&options.settings.ais)),
            producer_version: options.producer_version.clone(),
            dry_run: options.dry_run,
        },
    )?;

    if !options.dry_run {
        for dir in PROJECT_STRUCTURE {
            let path = root.join(PROJECT_DIR).join(dir);
            std::fs::create_dir_all(&path).map_err(|e| InstallError::from_io(e, &path))?;
        }
    }

    let mut scaffolded = Vec::new();
    for file in SCAFFOLD_FILES {
        let relative = Path::new(file.path);
        let path = resolve_within(root, relative)?;
        if std::fs::symlink_metadata(&path).is_ok() {
            debug!("Keeping existing {}", relative.display());
            continue;
        }

        let content = renderer.render(relative)?;
        let content = if relative.extension().is_some_and(|ext| ext == "md") {
            sign(&content, &options.producer_version)
        } else {
            content
        };

        if !options.dry_run {
            write_atomic(&path, content.as_bytes()).map_err(|e| InstallError::from_io(e, &path))?;
            if file.executable {
                make_executable(&path)?;
            }
        }
        scaffolded.push(relative.to_path_buf());
    }

    if !options.dry_run {
        let config_path = root.join(CONFIG_FILE);
        ConfigFile::new(options.settings).save(&config_path)?;
        info!("Saved {}", config_path.display());
    }

    Ok(InstallReport {
        prompts,
        scaffolded,
    })
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), InstallError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .map_err(|e| InstallError::from_io(e, path))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<(), InstallError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::{FileStatus, verify};
    use crate::templates::{CONTEXT_FILE, PRE_SESSION_SCRIPT, ProjectRenderer, Templates};
    use crate::update::UpdateStatus;
    use std::fs;
    use tempfile::TempDir;

    fn options(ais: &[&str], dry_run: bool) -> InstallOptions {
        InstallOptions {
            settings: ProjectSettings {
                ais: ais.iter().map(|a| a.to_string()).collect(),
                guidelines: vec!["node".to_string()],
                templates_dir: None,
            },
            producer_version: "1.0.0".to_string(),
            dry_run,
        }
    }

    #[test]
    fn fresh_install_creates_everything() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let templates = Templates::Builtin;
        let guidelines = vec!["node".to_string()];
        let renderer = ProjectRenderer::new(&templates, &guidelines);

        let report = install_project(root, &renderer, options(&["claude-code"], false)).unwrap();

        assert_eq!(report.prompts.backup, None);
        assert_eq!(report.prompts.results[0].status, UpdateStatus::Created);
        let claude = fs::read_to_string(root.join("CLAUDE.md")).unwrap();
        assert_eq!(verify(&claude), FileStatus::Pristine);
        assert!(claude.contains("Node.js (Generic)"));

        for dir in PROJECT_STRUCTURE {
            assert!(root.join(".project").join(dir).is_dir(), "{dir}");
        }
        assert_eq!(report.scaffolded.len(), SCAFFOLD_FILES.len());
        let context = fs::read_to_string(root.join(CONTEXT_FILE)).unwrap();
        assert_eq!(verify(&context), FileStatus::Pristine);
        let script = fs::read_to_string(root.join(PRE_SESSION_SCRIPT)).unwrap();
        assert!(!script.contains("@aipim-signature"));

        let config = ConfigFile::load_project(root).unwrap().unwrap();
        assert_eq!(config.project.ais, vec!["claude-code"]);
    }

    #[test]
    #[cfg(unix)]
    fn scripts_are_executable() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let renderer = ProjectRenderer::new(&Templates::Builtin, &[]);

        install_project(temp.path(), &renderer, options(&["gemini"], false)).unwrap();

        let mode = fs::metadata(temp.path().join(PRE_SESSION_SCRIPT))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[test]
    fn existing_scaffold_files_are_kept() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join(".project")).unwrap();
        fs::write(root.join(CONTEXT_FILE), "my own context").unwrap();
        let renderer = ProjectRenderer::new(&Templates::Builtin, &[]);

        let report = install_project(root, &renderer, options(&["gemini"], false)).unwrap();

        assert_eq!(
            fs::read_to_string(root.join(CONTEXT_FILE)).unwrap(),
            "my own context"
        );
        assert!(!report.scaffolded.contains(&PathBuf::from(CONTEXT_FILE)));
        assert!(report.prompts.backup.is_some());
    }

    #[test]
    fn reinstall_skips_edited_prompt() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let renderer = ProjectRenderer::new(&Templates::Builtin, &[]);
        install_project(root, &renderer, options(&["claude-code"], false)).unwrap();
        let edited = format!("{}\nmy notes\n", fs::read_to_string(root.join("CLAUDE.md")).unwrap());
        fs::write(root.join("CLAUDE.md"), &edited).unwrap();

        let report = install_project(root, &renderer, options(&["claude-code"], false)).unwrap();

        assert_eq!(report.prompts.results[0].status, UpdateStatus::Skipped);
        assert_eq!(fs::read_to_string(root.join("CLAUDE.md")).unwrap(), edited);
    }

    #[test]
    fn dry_run_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let renderer = ProjectRenderer::new(&Templates::Builtin, &[]);

        let report = install_project(temp.path(), &renderer, options(&["chatgpt"], true)).unwrap();

        assert_eq!(report.prompts.results[0].file, PathBuf::from("CHATGPT.md"));
        assert_eq!(report.scaffolded.len(), SCAFFOLD_FILES.len());
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn invalid_settings_are_rejected_before_writing() {
        let temp = TempDir::new().unwrap();
        let renderer = ProjectRenderer::new(&Templates::Builtin, &[]);
        let mut opts = options(&["gemini"], false);
        opts.settings.guidelines = vec!["cobol".to_string()];

        assert!(matches!(
            install_project(temp.path(), &renderer, opts),
            Err(InstallError::Config(_))
        ));
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    }
}
