//! Sources of generated content.
//!
//! Content either comes from the templates compiled into the binary or from
//! a templates directory laid out as:
//!
//! ```text
//! <dir>/base/project-manager.md      base prompt with a guidelines slot
//! <dir>/guidelines/<id>.md           one file per framework guideline
//! <dir>/base/.project/<file>         scaffold files copied on install
//! ```
//!
//! The location is decided once at startup and passed around as a
//! [`Templates`] value.

mod builtin;

use crate::merge::merge_guidelines;
use crate::paths::{PathError, resolve_within};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(PathBuf),
    #[error("Unknown guideline '{0}' (known: {known})", known = known_guideline_ids())]
    UnknownGuideline(String),
    #[error("No template generates {0}")]
    NoTemplate(PathBuf),
    #[error("Invalid template path: {0}")]
    Path(#[from] PathError),
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guideline {
    pub id: &'static str,
    pub name: &'static str,
    builtin: &'static str,
}

pub const GUIDELINES: [Guideline; 4] = [
    Guideline {
        id: "nextjs",
        name: "Next.js (App Router)",
        builtin: builtin::GUIDELINE_NEXTJS,
    },
    Guideline {
        id: "astro",
        name: "Astro (modern)",
        builtin: builtin::GUIDELINE_ASTRO,
    },
    Guideline {
        id: "node",
        name: "Node.js (Generic)",
        builtin: builtin::GUIDELINE_NODE,
    },
    Guideline {
        id: "vue",
        name: "Vue 3",
        builtin: builtin::GUIDELINE_VUE,
    },
];

pub fn find_guideline(id: &str) -> Option<&'static Guideline> {
    GUIDELINES.iter().find(|g| g.id == id)
}

fn known_guideline_ids() -> String {
    GUIDELINES.iter().map(|g| g.id).collect::<Vec<_>>().join(", ")
}

/// A file created by `install` when it is not already present.
#[derive(Debug, Clone, Copy)]
pub struct ScaffoldFile {
    /// Path relative to the project root.
    pub path: &'static str,
    pub executable: bool,
    builtin: &'static str,
}

pub const CONTEXT_FILE: &str = ".project/context.md";
pub const TASK_TEMPLATE_FILE: &str = ".project/_templates/v1/task-template.md";
pub const PRE_SESSION_SCRIPT: &str = ".project/scripts/pre-session.sh";

pub const SCAFFOLD_FILES: [ScaffoldFile; 4] = [
    ScaffoldFile {
        path: CONTEXT_FILE,
        executable: false,
        builtin: builtin::CONTEXT,
    },
    ScaffoldFile {
        path: TASK_TEMPLATE_FILE,
        executable: false,
        builtin: builtin::TASK_TEMPLATE,
    },
    ScaffoldFile {
        path: PRE_SESSION_SCRIPT,
        executable: true,
        builtin: builtin::PRE_SESSION_SCRIPT,
    },
    ScaffoldFile {
        path: ".project/scripts/validate-dod.sh",
        executable: true,
        builtin: builtin::VALIDATE_DOD_SCRIPT,
    },
];

/// Where template content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Templates {
    Builtin,
    Directory(PathBuf),
}

impl Templates {
    /// The base AI-assistant prompt, guidelines slot still empty.
    pub fn base_prompt(&self) -> Result<String, TemplateError> {
        match self {
            Templates::Builtin => Ok(builtin::PROJECT_MANAGER.to_string()),
            Templates::Directory(dir) => read_template(dir, Path::new("base/project-manager.md")),
        }
    }

    pub fn guideline(&self, id: &str) -> Result<String, TemplateError> {
        let guideline =
            find_guideline(id).ok_or_else(|| TemplateError::UnknownGuideline(id.to_string()))?;
        match self {
            Templates::Builtin => Ok(guideline.builtin.to_string()),
            Templates::Directory(dir) => {
                read_template(dir, &Path::new("guidelines").join(format!("{id}.md")))
            }
        }
    }

    /// Content of a scaffold file such as `.project/context.md`.
    pub fn scaffold(&self, relative: &Path) -> Result<String, TemplateError> {
        let file = SCAFFOLD_FILES
            .iter()
            .find(|f| Path::new(f.path) == relative)
            .ok_or_else(|| TemplateError::NoTemplate(relative.to_path_buf()))?;
        match self {
            Templates::Builtin => Ok(file.builtin.to_string()),
            Templates::Directory(dir) => read_template(dir, &Path::new("base").join(relative)),
        }
    }
}

fn read_template(dir: &Path, relative: &Path) -> Result<String, TemplateError> {
    let path = resolve_within(dir, relative)?;
    std::fs::read_to_string(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => TemplateError::NotFound(path),
        ErrorKind::PermissionDenied => TemplateError::PermissionDenied(path),
        _ => TemplateError::Io(e),
    })
}

/// Produces the desired content of a managed file.
pub trait Renderer {
    fn render(&self, relative_path: &Path) -> Result<String, TemplateError>;
}

/// Renders prompt files from the base prompt plus the configured guidelines,
/// and scaffold files from their templates.
pub struct ProjectRenderer<'a> {
    templates: &'a Templates,
    guidelines: &'a [String],
}

impl<'a> ProjectRenderer<'a> {
    pub fn new(templates: &'a Templates, guidelines: &'a [String]) -> Self {
        ProjectRenderer {
            templates,
            guidelines,
        }
    }
}

impl Renderer for ProjectRenderer<'_> {
    fn render(&self, relative_path: &Path) -> Result<String, TemplateError> {
        if is_prompt_file(relative_path) {
            let base = self.templates.base_prompt()?;
            let extras = self
                .guidelines
                .iter()
                .map(|id| {
                    if let Some(guideline) = find_guideline(id) {
                        debug!("Merging {} guidelines", guideline.name);
                    }
                    self.templates.guideline(id)
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(merge_guidelines(&base, &extras))
        } else {
            self.templates.scaffold(relative_path)
        }
    }
}

/// Prompt file written for an AI tool identifier.
pub fn prompt_file_for(ai: &str) -> String {
    match ai {
        "claude-code" | "claude-ai" => "CLAUDE.md".to_string(),
        "gemini" => "GEMINI.md".to_string(),
        "chatgpt" => "CHATGPT.md".to_string(),
        other => format!("{}.md", other.to_uppercase()),
    }
}

/// Prompt files for a list of AI tools, in order, without duplicates.
pub fn prompt_files(ais: &[String]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    for ai in ais {
        let file = PathBuf::from(prompt_file_for(ai));
        if !files.contains(&file) {
            files.push(file);
        }
    }
    files
}

/// Whether `path` names a prompt file: a top-level, upper-case `.md` file.
pub fn is_prompt_file(path: &Path) -> bool {
    let mut components = path.components();
    let (Some(Component::Normal(name)), None) = (components.next(), components.next()) else {
        return false;
    };
    let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".md")) else {
        return false;
    };
    !stem.is_empty()
        && stem
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-' || c == '_')
}
